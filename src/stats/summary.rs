use std::cmp::Ordering;

use crate::stats::aggregate::AggregateSeries;
use crate::stats::cfr;

/// Latest totals of one region, as listed in the sortable country bar.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSummary {
    pub name: String,
    pub confirmed: u64,
    pub recovered: u64,
    pub deaths: u64,
    pub active: i64,
    pub cfr_ddr: Option<f64>,
}

impl RegionSummary {
    /// Latest figures of a region total. The closed-case CFR is left out when
    /// part of the region lacks recovered counts.
    pub fn from_aggregate(name: &str, total: &AggregateSeries) -> Self {
        let (confirmed, recovered, deaths) = total.series.latest();
        Self {
            name: name.to_string(),
            confirmed,
            recovered,
            deaths,
            active: confirmed as i64 - recovered as i64 - deaths as i64,
            cfr_ddr: total
                .reports_recovered
                .then(|| cfr(deaths, deaths + recovered))
                .flatten(),
        }
    }
}

/// Column the country bar is sorted by. Selecting the active key again moves
/// on to the next one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Confirmed,
    Recovered,
    Deaths,
    Active,
    CfrDdr,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::Confirmed => SortKey::Recovered,
            SortKey::Recovered => SortKey::Deaths,
            SortKey::Deaths => SortKey::Active,
            SortKey::Active => SortKey::CfrDdr,
            SortKey::CfrDdr => SortKey::Confirmed,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SortKey::Confirmed => "Confirmed",
            SortKey::Recovered => "Recovered",
            SortKey::Deaths => "Deaths",
            SortKey::Active => "Active",
            SortKey::CfrDdr => "CFR d/(d+r)",
        }
    }

    fn compare(self, a: &RegionSummary, b: &RegionSummary) -> Option<Ordering> {
        match self {
            SortKey::Confirmed => Some(a.confirmed.cmp(&b.confirmed)),
            SortKey::Recovered => Some(a.recovered.cmp(&b.recovered)),
            SortKey::Deaths => Some(a.deaths.cmp(&b.deaths)),
            SortKey::Active => Some(a.active.cmp(&b.active)),
            SortKey::CfrDdr => match (a.cfr_ddr, b.cfr_ddr) {
                (Some(x), Some(y)) => Some(x.total_cmp(&y)),
                _ => None,
            },
        }
    }
}

/// Sort by `key`. Regions without a CFR value go last in either direction;
/// ties keep name order.
pub fn sort_summaries(summaries: &mut [RegionSummary], key: SortKey, descending: bool) {
    summaries.sort_by(|a, b| {
        let by_key = match key.compare(a, b) {
            Some(ordering) if descending => ordering.reverse(),
            Some(ordering) => ordering,
            None => a.cfr_ddr.is_none().cmp(&b.cfr_ddr.is_none()),
        };
        by_key.then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Series;
    use crate::stats::aggregate::aggregate;

    fn total(confirmed: u64, recovered: u64, deaths: u64) -> AggregateSeries {
        let mut series = Series::default();
        series.push(0, confirmed, recovered, deaths);
        aggregate([&series]).unwrap()
    }

    fn summary(name: &str, confirmed: u64, recovered: u64, deaths: u64) -> RegionSummary {
        RegionSummary::from_aggregate(name, &total(confirmed, recovered, deaths))
    }

    fn names(summaries: &[RegionSummary]) -> Vec<&str> {
        summaries.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_summary_derives_active_and_cfr() {
        let s = summary("A", 100, 30, 10);
        assert_eq!(s.active, 60);
        assert_eq!(s.cfr_ddr, Some(25.0));
        assert_eq!(summary("B", 5, 0, 0).cfr_ddr, None);
    }

    #[test]
    fn test_region_without_recovered_counts_has_no_cfr() {
        let mut us = total(100, 0, 10);
        us.reports_recovered = false;
        let s = RegionSummary::from_aggregate("United States", &us);
        assert_eq!(s.cfr_ddr, None);
        assert_eq!(s.active, 90);
    }

    #[test]
    fn test_sort_key_cycles_through_every_column() {
        let mut key = SortKey::default();
        let mut seen = vec![key];
        for _ in 0..4 {
            key = key.next();
            seen.push(key);
        }
        assert_eq!(key.next(), SortKey::Confirmed);
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_sorts_descending_and_ascending() {
        let mut list = vec![summary("A", 10, 0, 0), summary("B", 30, 0, 0), summary("C", 20, 0, 0)];
        sort_summaries(&mut list, SortKey::Confirmed, true);
        assert_eq!(names(&list), vec!["B", "C", "A"]);
        sort_summaries(&mut list, SortKey::Confirmed, false);
        assert_eq!(names(&list), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_missing_cfr_sorts_last_both_ways() {
        let mut list = vec![
            summary("none", 10, 0, 0),
            summary("low", 10, 9, 1),
            summary("high", 10, 1, 1),
        ];
        sort_summaries(&mut list, SortKey::CfrDdr, true);
        assert_eq!(names(&list), vec!["high", "low", "none"]);
        sort_summaries(&mut list, SortKey::CfrDdr, false);
        assert_eq!(names(&list), vec!["low", "high", "none"]);
    }

    #[test]
    fn test_ties_keep_name_order() {
        let mut list = vec![summary("b", 1, 0, 0), summary("a", 1, 0, 0)];
        sort_summaries(&mut list, SortKey::Deaths, true);
        assert_eq!(names(&list), vec!["a", "b"]);
    }
}
