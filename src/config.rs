use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::data::{Granularity, Labels, Location};
use crate::error::ConfigError;

/// Sentinel province label meaning "no sub-breakdown" in the feed.
pub const OTHERS_PROVINCE: &str = "Others";

/// A country that does not report recovered counts at `granularity` or finer.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RecoveredUnavailable {
    pub country: String,
    pub granularity: Granularity,
}

/// Knobs consumed by the deriver, aggregator and resolver.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Default death lag `T` in days for the lagged CFR estimate.
    pub average_days_from_confirmed_to_death: usize,
    /// Countries whose feed carries both a rollup row and province rows.
    pub duplicate_countries: BTreeSet<String>,
    /// Add countries whose bare row is the sum of their province rows to
    /// `duplicate_countries` after the dataset is loaded.
    pub infer_duplicate_countries: bool,
    /// The one country broken down to admin2 level.
    pub admin2_country: String,
    pub recovered_unavailable: Vec<RecoveredUnavailable>,
    /// Restrict every computation to a single country.
    pub country_to_display: Option<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            average_days_from_confirmed_to_death: 14,
            duplicate_countries: BTreeSet::new(),
            infer_duplicate_countries: false,
            admin2_country: "United States".to_string(),
            recovered_unavailable: vec![
                RecoveredUnavailable {
                    country: "United States".to_string(),
                    granularity: Granularity::Province,
                },
                RecoveredUnavailable {
                    country: "Chile".to_string(),
                    granularity: Granularity::Province,
                },
            ],
            country_to_display: None,
        }
    }
}

impl StatsConfig {
    /// Load a JSON config file; missing fields keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin2_country.trim().is_empty() {
            return Err(ConfigError::Invalid("admin2_country must not be empty".into()));
        }
        if let Some(country) = &self.country_to_display {
            if country.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "country_to_display must not be empty when set".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn is_duplicate_country(&self, country: &str) -> bool {
        self.duplicate_countries.contains(country)
    }

    pub fn is_admin2_country(&self, country: &str) -> bool {
        self.admin2_country == country
    }

    /// False when `country_to_display` is set to a different country.
    pub fn displays_country(&self, country: &str) -> bool {
        self.country_to_display
            .as_deref()
            .map_or(true, |only| only == country)
    }

    /// Whether the closed-case CFR is meaningful for these labels.
    pub fn reports_recovered(&self, labels: &Labels) -> bool {
        let granularity = labels.granularity();
        !self
            .recovered_unavailable
            .iter()
            .any(|rule| rule.country == labels.country && granularity >= rule.granularity)
    }

    /// Extend `duplicate_countries` with every country whose bare row is a
    /// rollup: its latest counts equal the sum of its province rows' latest
    /// counts. A mainland row next to overseas territories does not qualify.
    /// The admin2 country has its own rule and is never added.
    pub fn infer_duplicates(&mut self, locations: &[Location]) {
        let mut bare: BTreeMap<&str, (u64, u64, u64)> = BTreeMap::new();
        let mut provinces: BTreeMap<&str, (u64, u64, u64)> = BTreeMap::new();
        for location in locations {
            let labels = &location.labels;
            let table = match (&labels.province, &labels.admin2) {
                (None, None) => &mut bare,
                (Some(_), None) => &mut provinces,
                _ => continue,
            };
            let (c, r, d) = location.latest();
            let sum = table.entry(labels.country.as_str()).or_default();
            *sum = (sum.0 + c, sum.1 + r, sum.2 + d);
        }
        for (country, rollup) in &bare {
            if self.is_admin2_country(country) || provinces.get(country) != Some(rollup) {
                continue;
            }
            if self.duplicate_countries.insert(country.to_string()) {
                tracing::debug!(country, "inferred duplicate-data country");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: StatsConfig =
            serde_json::from_str(r#"{"duplicate_countries": ["Australia"]}"#).unwrap();
        assert_eq!(config.average_days_from_confirmed_to_death, 14);
        assert!(config.is_duplicate_country("Australia"));
        assert!(config.is_admin2_country("United States"));
    }

    #[test]
    fn test_granularity_parses_lowercase() {
        let config: StatsConfig = serde_json::from_str(
            r#"{"recovered_unavailable": [{"country": "Peru", "granularity": "admin2"}]}"#,
        )
        .unwrap();
        assert_eq!(config.recovered_unavailable.len(), 1);
        assert_eq!(config.recovered_unavailable[0].granularity, Granularity::Admin2);
    }

    #[test]
    fn test_recovered_rules_apply_below_country() {
        let config = StatsConfig::default();
        assert!(config.reports_recovered(&Labels::new("United States", None, None)));
        assert!(!config.reports_recovered(&Labels::new("United States", Some("Texas"), None)));
        assert!(!config.reports_recovered(&Labels::new(
            "United States",
            Some("Texas"),
            Some("Travis")
        )));
        assert!(!config.reports_recovered(&Labels::new("Chile", Some("Maule"), None)));
        assert!(config.reports_recovered(&Labels::new("Canada", Some("Ontario"), None)));
    }

    #[test]
    fn test_empty_admin2_country_is_rejected() {
        let config = StatsConfig {
            admin2_country: " ".into(),
            ..StatsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    fn row(id: usize, labels: Labels, confirmed: u64) -> Location {
        let mut series = crate::data::Series::default();
        series.push(0, confirmed, 0, 0);
        Location {
            id,
            feature_id: None,
            labels,
            lon: 0.0,
            lat: 0.0,
            series,
        }
    }

    #[test]
    fn test_inference_is_off_by_default() {
        assert!(!StatsConfig::default().infer_duplicate_countries);
    }

    #[test]
    fn test_mainland_with_territory_is_not_a_rollup() {
        let rows = [
            row(0, Labels::new("United Kingdom", None, None), 100),
            row(1, Labels::new("United Kingdom", Some("Bermuda"), None), 5),
        ];
        let mut config = StatsConfig::default();
        config.infer_duplicates(&rows);
        assert!(!config.is_duplicate_country("United Kingdom"));
    }

    #[test]
    fn test_rollup_row_is_inferred() {
        let rows = [
            row(0, Labels::new("Australia", None, None), 9),
            row(1, Labels::new("Australia", Some("Victoria"), None), 3),
            row(2, Labels::new("Australia", Some("New South Wales"), None), 6),
            row(3, Labels::new("United States", None, None), 4),
            row(4, Labels::new("United States", Some("Ohio"), None), 4),
        ];
        let mut config = StatsConfig::default();
        config.infer_duplicates(&rows);
        assert!(config.is_duplicate_country("Australia"));
        assert!(!config.is_duplicate_country("United States"));
    }

    #[test]
    fn test_country_filter() {
        let config = StatsConfig {
            country_to_display: Some("Korea".into()),
            ..StatsConfig::default()
        };
        assert!(config.displays_country("Korea"));
        assert!(!config.displays_country("Japan"));
        assert!(StatsConfig::default().displays_country("Japan"));
    }
}
