use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or interpreting the case feed.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] simd_json::Error),
    #[error("dataset is not valid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("dataset must be a FeatureCollection, found a {0}")]
    NotFeatureCollection(&'static str),
}

/// Failures while loading a [`crate::StatsConfig`] file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error: {0}")]
    Invalid(String),
}
