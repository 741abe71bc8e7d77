//! Summing location series into country and global totals.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::info;

use crate::config::StatsConfig;
use crate::data::{Labels, Location, LocationId, Series};
use crate::stats::derive::{derive_aggregate, DerivedSeries};
use crate::stats::summary::RegionSummary;

/// A series summed over several locations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateSeries {
    pub series: Series,
    /// Latest last-sample time among the contributors.
    pub last_updated: Option<i64>,
    pub contributors: usize,
    /// False when any contributor lacks recovered counts, which leaves the
    /// closed-case CFR of the sum undefined.
    pub reports_recovered: bool,
}

/// Sum `series` aligned on their most recent sample. `None` for no input.
pub fn aggregate<'a>(series: impl IntoIterator<Item = &'a Series>) -> Option<AggregateSeries> {
    let mut iter = series.into_iter();
    let first = iter.next()?;
    let mut total = AggregateSeries {
        series: first.clone(),
        last_updated: first.last_time(),
        contributors: 1,
        reports_recovered: true,
    };
    for s in iter {
        total.series.add_aligned_from_end(s);
        total.last_updated = total.last_updated.max(s.last_time());
        total.contributors += 1;
    }
    Some(total)
}

/// Sum the series of `locations`, tracking whether all of them report
/// recovered counts.
pub fn aggregate_locations<'a>(
    locations: impl IntoIterator<Item = &'a Location>,
    config: &StatsConfig,
) -> Option<AggregateSeries> {
    let locations: Vec<&Location> = locations.into_iter().collect();
    let mut total = aggregate(locations.iter().map(|location| &location.series))?;
    total.reports_recovered = locations
        .iter()
        .all(|location| config.reports_recovered(&location.labels));
    Some(total)
}

/// Whether a row adds to its country's and the global totals.
///
/// Rows of a duplicate-data country count only at province level; rows of
/// the admin2 country count only at admin2 level. Rollups above those levels
/// are display-only.
pub fn counts_toward_totals(location: &Location, config: &StatsConfig) -> bool {
    let labels = &location.labels;
    if !config.displays_country(&labels.country) {
        return false;
    }
    if config.is_admin2_country(&labels.country) {
        labels.admin2.is_some()
    } else if config.is_duplicate_country(&labels.country) {
        labels.province.is_some()
    } else {
        true
    }
}

/// Rows shown in the location list and on the map.
pub fn is_listed(location: &Location, config: &StatsConfig) -> bool {
    counts_toward_totals(location, config) && !location.latest_is_zero()
}

/// Tables computed once after the dataset is loaded.
#[derive(Clone, Debug, Default)]
pub struct AggregationResult {
    /// Listed location ids in feed order.
    pub listed: Vec<LocationId>,
    pub global: AggregateSeries,
    /// Global statistics with leading zero rows kept.
    pub global_stats: DerivedSeries,
    /// Per-country totals, or per-province totals when the config restricts
    /// the view to one country.
    pub regions: BTreeMap<String, AggregateSeries>,
    pub summaries: Vec<RegionSummary>,
    /// Listed location with the most active cases, used as the initial centre.
    pub max_active: Option<LocationId>,
}

impl AggregationResult {
    pub fn is_listed(&self, id: LocationId) -> bool {
        self.listed.binary_search(&id).is_ok()
    }
}

fn region_name<'a>(labels: &'a Labels, config: &StatsConfig) -> &'a str {
    if config.country_to_display.is_some() {
        labels.province.as_deref().unwrap_or(&labels.country)
    } else {
        &labels.country
    }
}

/// Build the global and per-region aggregates over the listed rows.
pub fn build_aggregates(locations: &[Location], config: &StatsConfig) -> AggregationResult {
    let listed: Vec<LocationId> = locations
        .iter()
        .filter(|location| is_listed(location, config))
        .map(|location| location.id)
        .collect();
    let listed_locations = || listed.iter().filter_map(|&id| locations.get(id));

    let global = aggregate_locations(listed_locations(), config).unwrap_or_default();
    let global_stats = derive_aggregate(&global, true, config);

    let mut groups: BTreeMap<&str, Vec<&Location>> = BTreeMap::new();
    for location in listed_locations() {
        groups
            .entry(region_name(&location.labels, config))
            .or_default()
            .push(location);
    }
    let regions: BTreeMap<String, AggregateSeries> = groups
        .into_par_iter()
        .filter_map(|(name, members)| {
            aggregate_locations(members.iter().copied(), config).map(|total| (name.to_string(), total))
        })
        .collect();

    let summaries = regions
        .iter()
        .map(|(name, total)| RegionSummary::from_aggregate(name, total))
        .collect();

    let max_active = listed_locations()
        .map(|location| {
            let (c, r, d) = location.latest();
            (location.id, c as i64 - r as i64 - d as i64)
        })
        .filter(|&(_, active)| active > 0)
        .fold(None, |best: Option<(LocationId, i64)>, candidate| match best {
            Some((_, most)) if most >= candidate.1 => best,
            _ => Some(candidate),
        })
        .map(|(id, _)| id);

    let (confirmed, recovered, deaths) = global.series.latest();
    info!(
        listed = listed.len(),
        regions = regions.len(),
        confirmed,
        recovered,
        deaths,
        "built aggregates"
    );

    AggregationResult {
        listed,
        global,
        global_stats,
        regions,
        summaries,
        max_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DAY: i64 = 86_400;

    fn series_from(start_day: i64, confirmed: &[u64]) -> Series {
        let mut s = Series::default();
        for (i, &c) in confirmed.iter().enumerate() {
            s.push((start_day + i as i64) * DAY, c, c / 3, c / 10);
        }
        s
    }

    fn location(id: usize, labels: Labels, series: Series) -> Location {
        Location {
            id,
            feature_id: Some(id as i64),
            labels,
            lon: id as f64,
            lat: -(id as f64),
            series,
        }
    }

    fn duplicate_config(country: &str) -> StatsConfig {
        let mut config = StatsConfig::default();
        config.duplicate_countries.insert(country.to_string());
        config
    }

    #[test]
    fn test_aggregate_of_nothing_is_none() {
        assert_eq!(aggregate(std::iter::empty::<&Series>()), None);
    }

    #[test]
    fn test_aggregate_of_one_is_identity() {
        let s = series_from(0, &[0, 1, 4]);
        let total = aggregate([&s]).unwrap();
        assert_eq!(total.series, s);
        assert_eq!(total.last_updated, Some(2 * DAY));
        assert_eq!(total.contributors, 1);
    }

    #[test]
    fn test_shorter_histories_align_on_latest_sample() {
        let long = series_from(0, &[1, 2, 3, 4]);
        let short = series_from(2, &[10, 20]);
        let total = aggregate([&short, &long]).unwrap();
        assert_eq!(total.series.confirmed, vec![1, 2, 13, 24]);
        assert_eq!(total.series.time, long.time);
    }

    #[test]
    fn test_last_updated_is_latest_contributor() {
        let a = series_from(0, &[1, 2]);
        let b = series_from(3, &[1, 2]);
        let total = aggregate([&a, &b]).unwrap();
        assert_eq!(total.last_updated, Some(4 * DAY));
    }

    #[test]
    fn test_duplicate_country_counts_only_provinces() {
        let config = duplicate_config("B");
        let rollup = location(0, Labels::new("B", None, None), series_from(0, &[9]));
        let province = location(1, Labels::new("B", Some("P"), None), series_from(0, &[3]));
        assert!(!counts_toward_totals(&rollup, &config));
        assert!(counts_toward_totals(&province, &config));

        let result = build_aggregates(&[rollup, province], &config);
        assert_eq!(result.listed, vec![1]);
        assert_eq!(result.global.series.confirmed, vec![3]);
        assert_eq!(result.regions["B"].series.confirmed, vec![3]);
    }

    #[test]
    fn test_admin2_country_counts_only_admin2_rows() {
        let config = StatsConfig::default();
        let rows = [
            location(0, Labels::new("United States", None, None), series_from(0, &[100])),
            location(1, Labels::new("United States", Some("Ohio"), None), series_from(0, &[60])),
            location(
                2,
                Labels::new("United States", Some("Ohio"), Some("Franklin")),
                series_from(0, &[40]),
            ),
            location(
                3,
                Labels::new("United States", Some("Ohio"), Some("Summit")),
                series_from(0, &[20]),
            ),
        ];
        let result = build_aggregates(&rows, &config);
        assert_eq!(result.listed, vec![2, 3]);
        assert_eq!(result.global.series.confirmed, vec![60]);
    }

    #[test]
    fn test_zero_rows_are_not_listed() {
        let config = StatsConfig::default();
        let rows = [
            location(0, Labels::new("A", None, None), series_from(0, &[5, 0])),
            location(1, Labels::new("C", None, None), series_from(0, &[1, 2])),
        ];
        let result = build_aggregates(&rows, &config);
        assert_eq!(result.listed, vec![1]);
        assert!(result.is_listed(1));
        assert!(!result.is_listed(0));
        assert_eq!(result.global.series.confirmed, vec![1, 2]);
    }

    #[test]
    fn test_restricted_view_groups_by_province() {
        let config = StatsConfig {
            country_to_display: Some("Canada".into()),
            ..StatsConfig::default()
        };
        let rows = [
            location(0, Labels::new("Canada", Some("Ontario"), None), series_from(0, &[4])),
            location(1, Labels::new("Canada", Some("Quebec"), None), series_from(0, &[6])),
            location(2, Labels::new("Mexico", None, None), series_from(0, &[50])),
        ];
        let result = build_aggregates(&rows, &config);
        assert_eq!(result.listed, vec![0, 1]);
        assert_eq!(
            result.regions.keys().cloned().collect::<Vec<_>>(),
            vec!["Ontario".to_string(), "Quebec".to_string()]
        );
        assert_eq!(result.global.series.confirmed, vec![10]);
    }

    #[test]
    fn test_max_active_picks_largest_open_case_count() {
        let config = StatsConfig::default();
        let mut closed = Series::default();
        closed.push(0, 500, 400, 100);
        let rows = [
            location(0, Labels::new("A", None, None), closed),
            location(1, Labels::new("C", None, None), series_from(0, &[30])),
            location(2, Labels::new("D", None, None), series_from(0, &[90])),
        ];
        let result = build_aggregates(&rows, &config);
        assert_eq!(result.max_active, Some(2));
    }

    #[test]
    fn test_admin2_totals_have_no_closed_case_cfr() {
        let config = StatsConfig::default();
        let mut rollup = Series::default();
        rollup.push(0, 100, 60, 10);
        let mut franklin = Series::default();
        franklin.push(0, 40, 0, 4);
        let mut summit = Series::default();
        summit.push(0, 60, 0, 6);
        let rows = [
            location(0, Labels::new("United States", None, None), rollup),
            location(1, Labels::new("United States", Some("Ohio"), Some("Franklin")), franklin),
            location(2, Labels::new("United States", Some("Ohio"), Some("Summit")), summit),
            location(3, Labels::new("Italy", None, None), series_from(0, &[30])),
        ];
        let result = build_aggregates(&rows, &config);
        assert!(!result.global.reports_recovered);
        assert_eq!(result.global_stats.cfr_ddr, None);
        assert!(!result.regions["United States"].reports_recovered);
        assert!(result.regions["Italy"].reports_recovered);

        let us = result.summaries.iter().find(|s| s.name == "United States").unwrap();
        assert_eq!(us.cfr_ddr, None);
        let italy = result.summaries.iter().find(|s| s.name == "Italy").unwrap();
        assert_eq!(italy.cfr_ddr, Some(23.1));
    }

    #[test]
    fn test_global_stats_keep_leading_zeros() {
        let config = StatsConfig::default();
        let rows = [location(0, Labels::new("A", None, None), series_from(0, &[0, 0, 3]))];
        let result = build_aggregates(&rows, &config);
        assert_eq!(result.global_stats.start, 0);
        assert_eq!(result.global_stats.len(), 3);
    }

    fn arb_rows() -> impl Strategy<Value = Vec<(u8, bool, Vec<u64>)>> {
        prop::collection::vec(
            (0u8..4, any::<bool>(), prop::collection::vec(0u64..10_000, 0..12)),
            1..16,
        )
    }

    fn build_rows(raw: &[(u8, bool, Vec<u64>)]) -> Vec<Location> {
        raw.iter()
            .enumerate()
            .map(|(id, (country, has_province, counts))| {
                let mut cumulative = 0;
                let counts: Vec<u64> = counts
                    .iter()
                    .map(|c| {
                        cumulative += c;
                        cumulative
                    })
                    .collect();
                let start_day = 20 - counts.len() as i64;
                let country = format!("C{country}");
                let province = has_province.then_some("P");
                location(id, Labels::new(&country, province, None), series_from(start_day, &counts))
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn test_global_latest_is_sum_of_listed_latest(raw in arb_rows(), duplicate in 0u8..4) {
            let rows = build_rows(&raw);
            let config = duplicate_config(&format!("C{duplicate}"));
            let result = build_aggregates(&rows, &config);

            let mut expected = (0u64, 0u64, 0u64);
            for &id in &result.listed {
                let (c, r, d) = rows[id].latest();
                expected = (expected.0 + c, expected.1 + r, expected.2 + d);
            }
            prop_assert_eq!(result.global.series.latest(), expected);
        }

        #[test]
        fn test_regions_sum_to_global(raw in arb_rows()) {
            let rows = build_rows(&raw);
            let config = StatsConfig::default();
            let result = build_aggregates(&rows, &config);
            let regional = aggregate(result.regions.values().map(|r| &r.series));
            match regional {
                Some(total) => prop_assert_eq!(total.series, result.global.series),
                None => prop_assert!(result.listed.is_empty()),
            }
        }
    }
}
