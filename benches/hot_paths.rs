use covid_map::{build_aggregates, derive, resolve, Labels, Location, Series, StatsConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const DAYS: usize = 400;
const DAY: i64 = 86_400;

/// Synthetic feed: 200 countries, every tenth with 20 provinces, plus an
/// admin2 country with 3000 counties.
fn locations() -> Vec<Location> {
    let mut labels = Vec::new();
    for c in 0..200 {
        let country = format!("Country {c}");
        labels.push(Labels::new(&country, None, None));
        if c % 10 == 0 {
            for p in 0..20 {
                labels.push(Labels::new(&country, Some(&format!("Province {p}")), None));
            }
        }
    }
    for a in 0..3000 {
        labels.push(Labels::new(
            "United States",
            Some(&format!("State {}", a % 50)),
            Some(&format!("County {a}")),
        ));
    }

    labels
        .into_iter()
        .enumerate()
        .map(|(id, labels)| {
            let onset = id % 60;
            let mut series = Series::with_capacity(DAYS);
            for day in 0..DAYS {
                let n = day.saturating_sub(onset) as u64;
                let confirmed = n * n * (1 + id as u64 % 7);
                series.push(day as i64 * DAY, confirmed, confirmed / 3, confirmed / 40);
            }
            Location {
                id,
                feature_id: Some(id as i64),
                labels,
                lon: (id % 360) as f64 - 180.0,
                lat: (id % 140) as f64 - 70.0,
                series,
            }
        })
        .collect()
}

fn bench_derive(c: &mut Criterion) {
    let locations = locations();
    let config = StatsConfig::default();
    let location = &locations[0];
    c.bench_function("derive_one_series", |b| {
        b.iter(|| derive(black_box(&location.series), &location.labels, false, &config))
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let locations = locations();
    let mut config = StatsConfig::default();
    config.infer_duplicates(&locations);
    c.bench_function("build_aggregates", |b| {
        b.iter(|| build_aggregates(black_box(&locations), &config))
    });
}

fn bench_resolve(c: &mut Criterion) {
    let locations = locations();
    let mut config = StatsConfig::default();
    config.infer_duplicates(&locations);
    let aggregates = build_aggregates(&locations, &config);

    let mut group = c.benchmark_group("resolve");
    for query in ["Country 17", "State 3, United States", "United States", "42"] {
        group.bench_function(query, |b| {
            b.iter(|| resolve(black_box(query), &locations, &aggregates, &config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_derive, bench_aggregate, bench_resolve);
criterion_main!(benches);
