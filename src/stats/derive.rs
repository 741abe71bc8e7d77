//! Trimmed series, daily increases and case-fatality estimates.

use crate::config::StatsConfig;
use crate::data::{Category, Labels, Series};
use crate::stats::aggregate::AggregateSeries;
use crate::stats::cfr;

/// Day-over-day change per category. Signed: corrections can lower a
/// cumulative count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Increases {
    pub confirmed: Vec<i64>,
    pub recovered: Vec<i64>,
    pub deaths: Vec<i64>,
}

impl Increases {
    pub fn get(&self, category: Category) -> &[i64] {
        match category {
            Category::Confirmed => &self.confirmed,
            Category::Recovered => &self.recovered,
            Category::Deaths => &self.deaths,
        }
    }
}

/// Everything the popup and charts show for one series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivedSeries {
    /// Index into the source series where the trimmed range begins.
    pub start: usize,
    /// The trimmed range `[start, len)` of the source series.
    pub trimmed: Series,
    pub increase: Increases,
    /// Death lag `T` used for `cfr_t`.
    pub lag: usize,
    /// `deaths[i] / confirmed[i - T]` as a percentage.
    pub cfr_t: Vec<Option<f64>>,
    /// `deaths[i] / (deaths[i] + recovered[i])`; `None` when some of the
    /// summed rows do not report recovered counts.
    pub cfr_ddr: Option<Vec<Option<f64>>>,
    pub last_updated: Option<i64>,
}

impl DerivedSeries {
    pub fn len(&self) -> usize {
        self.trimmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trimmed.is_empty()
    }

    pub fn latest(&self) -> (u64, u64, u64) {
        self.trimmed.latest()
    }

    /// Latest `confirmed - recovered - deaths`.
    pub fn active(&self) -> i64 {
        let (c, r, d) = self.latest();
        c as i64 - r as i64 - d as i64
    }

    pub fn last_cfr_t(&self) -> Option<f64> {
        self.cfr_t.last().copied().flatten()
    }

    pub fn last_cfr_ddr(&self) -> Option<f64> {
        self.cfr_ddr.as_ref()?.last().copied().flatten()
    }
}

/// First index where any category is non-zero; the last index if none is.
fn first_reported(series: &Series) -> usize {
    (0..series.len())
        .find(|&i| series.at(i) != (0, 0, 0))
        .unwrap_or_else(|| series.len().saturating_sub(1))
}

fn increases(counts: &[u64]) -> Vec<i64> {
    let mut previous = 0i64;
    counts
        .iter()
        .map(|&count| {
            let count = count as i64;
            let increase = count - previous;
            previous = count;
            increase
        })
        .collect()
}

/// Derive display statistics from a raw series.
///
/// Without `include_leading_zeros` the leading rows where every category is
/// zero are dropped. The lag `T` is the configured average days from
/// confirmation to death, capped by the history that is left after trimming.
pub fn derive(
    series: &Series,
    labels: &Labels,
    include_leading_zeros: bool,
    config: &StatsConfig,
) -> DerivedSeries {
    derive_series(series, config.reports_recovered(labels), include_leading_zeros, config)
}

/// [`derive`] for a sum of locations. The closed-case CFR is kept only when
/// every contributor reports recovered counts.
pub fn derive_aggregate(
    total: &AggregateSeries,
    include_leading_zeros: bool,
    config: &StatsConfig,
) -> DerivedSeries {
    derive_series(&total.series, total.reports_recovered, include_leading_zeros, config)
}

fn derive_series(
    series: &Series,
    reports_recovered: bool,
    include_leading_zeros: bool,
    config: &StatsConfig,
) -> DerivedSeries {
    if series.is_empty() {
        return DerivedSeries {
            cfr_ddr: reports_recovered.then(Vec::new),
            ..DerivedSeries::default()
        };
    }

    let start = if include_leading_zeros {
        0
    } else {
        first_reported(series)
    };
    let trimmed = Series {
        time: series.time[start..].to_vec(),
        confirmed: series.confirmed[start..].to_vec(),
        recovered: series.recovered[start..].to_vec(),
        deaths: series.deaths[start..].to_vec(),
    };

    let increase = Increases {
        confirmed: increases(&trimmed.confirmed),
        recovered: increases(&trimmed.recovered),
        deaths: increases(&trimmed.deaths),
    };

    let last = trimmed.len() - 1;
    let lag = last.min(config.average_days_from_confirmed_to_death);
    let cfr_t = (0..trimmed.len())
        .map(|i| {
            i.checked_sub(lag)
                .and_then(|lagged| cfr(trimmed.deaths[i], trimmed.confirmed[lagged]))
        })
        .collect();

    let cfr_ddr = reports_recovered.then(|| {
        trimmed
            .deaths
            .iter()
            .zip(&trimmed.recovered)
            .map(|(&d, &r)| cfr(d, d + r))
            .collect()
    });

    DerivedSeries {
        start,
        last_updated: trimmed.last_time(),
        trimmed,
        increase,
        lag,
        cfr_t,
        cfr_ddr,
    }
}
