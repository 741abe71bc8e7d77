//! Resolving free-text and ordinal queries to locations.

use tracing::debug;

use crate::config::{StatsConfig, OTHERS_PROVINCE};
use crate::data::{Granularity, Labels, Location, LocationId};
use crate::stats::aggregate::{aggregate_locations, AggregateSeries, AggregationResult};
use crate::stats::derive::{derive_aggregate, DerivedSeries};

/// How specific a match is: the query named a country, a province or an
/// admin2 area.
pub type MatchLevel = Granularity;

/// A parsed query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Query<'a> {
    /// 1-based position, or an offset from the end when negative.
    Ordinal(i64),
    Text(&'a str),
}

impl<'a> Query<'a> {
    /// `None` for a blank query.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.parse::<i64>() {
            Ok(n) => Query::Ordinal(n),
            Err(_) => Query::Text(raw),
        })
    }
}

/// Locations selected by a query and their summed series.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSet {
    /// Listed locations to highlight, in feed order.
    pub ids: Vec<LocationId>,
    pub aggregate: Option<AggregateSeries>,
    pub level: MatchLevel,
    /// The place the aggregate describes.
    pub scope: Labels,
}

impl MatchSet {
    fn empty() -> Self {
        Self {
            ids: Vec::new(),
            aggregate: None,
            level: MatchLevel::Country,
            scope: Labels::default(),
        }
    }

    fn single(location: &Location, config: &StatsConfig) -> Self {
        Self {
            ids: vec![location.id],
            aggregate: aggregate_locations([location], config),
            level: location.labels.granularity(),
            scope: location.labels.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.aggregate.is_none()
    }

    /// Popup statistics for the matched set.
    pub fn derived(&self, config: &StatsConfig) -> Option<DerivedSeries> {
        self.aggregate
            .as_ref()
            .map(|total| derive_aggregate(total, false, config))
    }
}

/// Resolve `raw` against the loaded locations.
///
/// Numeric queries select one listed location by position. Text queries
/// select every listed location whose labels contain the query, except that
/// the exact name of a duplicate-data country selects its province rows.
pub fn resolve(
    raw: &str,
    locations: &[Location],
    aggregates: &AggregationResult,
    config: &StatsConfig,
) -> MatchSet {
    let matches = match Query::parse(raw) {
        None => MatchSet::empty(),
        Some(Query::Ordinal(n)) => resolve_ordinal(n, locations, aggregates, config),
        Some(Query::Text(text)) if config.is_duplicate_country(text) => {
            resolve_duplicate_country(text, locations, aggregates, config)
        }
        Some(Query::Text(text)) => resolve_text(text, locations, aggregates, config),
    };
    debug!(query = raw, matches = matches.ids.len(), level = ?matches.level, "resolved query");
    matches
}

fn resolve_ordinal(
    n: i64,
    locations: &[Location],
    aggregates: &AggregationResult,
    config: &StatsConfig,
) -> MatchSet {
    let len = locations.len() as i64;
    let id = match n {
        n if n > 0 => n - 1,
        n if n < 0 => len + n,
        _ => return MatchSet::empty(),
    };
    if !(0..len).contains(&id) || !aggregates.is_listed(id as LocationId) {
        return MatchSet::empty();
    }
    MatchSet::single(&locations[id as usize], config)
}

fn resolve_duplicate_country(
    country: &str,
    locations: &[Location],
    aggregates: &AggregationResult,
    config: &StatsConfig,
) -> MatchSet {
    if !config.displays_country(country) {
        return MatchSet::empty();
    }
    let in_country = || locations.iter().filter(|l| l.labels.country == country);

    let mut chosen: Vec<&Location> = in_country().filter(|l| aggregates.is_listed(l.id)).collect();
    if chosen.is_empty() {
        chosen = in_country()
            .filter(|l| l.labels.province.is_none() && !l.latest_is_zero())
            .collect();
    }

    let mut matches = MatchSet {
        ids: chosen.iter().map(|l| l.id).collect(),
        aggregate: aggregate_locations(chosen.iter().copied(), config),
        level: MatchLevel::Country,
        scope: Labels::new(country, None, None),
    };
    if let [only] = chosen.as_slice() {
        matches.scope = only.labels.clone();
        matches.level = only.labels.granularity();
    }
    matches
}

/// Substring match in precedence order: full admin2 label, province label,
/// province alone, country alone.
fn labels_match(labels: &Labels, query: &str) -> bool {
    if labels.admin2_query().is_some_and(|q| q.contains(query)) {
        return true;
    }
    if labels.province_query().is_some_and(|q| q.contains(query)) {
        return true;
    }
    if query != OTHERS_PROVINCE && labels.province.as_deref().is_some_and(|p| p.contains(query)) {
        return true;
    }
    labels.country.contains(query)
}

/// Which label of the row the query names, judged from its comma structure.
fn match_level(labels: &Labels, query: &str) -> MatchLevel {
    let parts: Vec<&str> = query.split(", ").collect();
    let admin2 = labels.admin2.as_deref();
    let province = labels.province.as_deref();

    if labels.admin2_query().as_deref() == Some(query)
        || admin2 == Some(query)
        || (parts.len() == 3 && admin2 == Some(parts[0]))
    {
        MatchLevel::Admin2
    } else if labels.province_query().as_deref() == Some(query)
        || province == Some(query)
        || (parts.len() == 2 && province == Some(parts[0]))
    {
        MatchLevel::Province
    } else {
        MatchLevel::Country
    }
}

/// `labels` cut down to `level`.
fn labels_at(labels: &Labels, level: MatchLevel) -> Labels {
    Labels {
        country: labels.country.clone(),
        province: (level >= MatchLevel::Province)
            .then(|| labels.province.clone())
            .flatten(),
        admin2: (level >= MatchLevel::Admin2)
            .then(|| labels.admin2.clone())
            .flatten(),
    }
}

fn resolve_text(
    query: &str,
    locations: &[Location],
    aggregates: &AggregationResult,
    config: &StatsConfig,
) -> MatchSet {
    let mut matched: Vec<(&Location, MatchLevel)> = Vec::new();
    for &id in &aggregates.listed {
        let Some(location) = locations.get(id) else {
            continue;
        };
        if labels_match(&location.labels, query) {
            matched.push((location, match_level(&location.labels, query)));
        }
    }

    match matched.as_slice() {
        [] => MatchSet::empty(),
        [(only, _)] => MatchSet::single(only, config),
        [(first, _), ..] => {
            let level = matched
                .iter()
                .map(|&(_, level)| level)
                .min()
                .unwrap_or(MatchLevel::Country);
            let candidate = labels_at(&first.labels, level);
            let shared = matched
                .iter()
                .all(|(location, _)| labels_at(&location.labels, level) == candidate);
            let scope = if shared {
                candidate
            } else {
                Labels::new(query, None, None)
            };

            MatchSet {
                ids: matched.iter().map(|(location, _)| location.id).collect(),
                aggregate: aggregate_locations(matched.iter().map(|&(location, _)| location), config),
                level,
                scope,
            }
        }
    }
}
