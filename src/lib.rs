//! Statistics core for the COVID-19 case map.
//!
//! The library loads the GeoJSON case feed once, then derives, aggregates and
//! resolves queries over it with plain functions. The terminal front end in
//! `main.rs` only renders what these modules compute.

pub mod config;
pub mod data;
pub mod error;
pub mod plot;
pub mod stats;
pub mod symbology;

pub use config::StatsConfig;
pub use data::{Dataset, Granularity, Labels, Location, LocationId, Series};
pub use error::{ConfigError, DatasetError};
pub use stats::aggregate::{aggregate, aggregate_locations, build_aggregates, AggregateSeries, AggregationResult};
pub use stats::derive::{derive, derive_aggregate, DerivedSeries};
pub use stats::query::{resolve, MatchLevel, MatchSet};
pub use stats::summary::{sort_summaries, RegionSummary, SortKey};
