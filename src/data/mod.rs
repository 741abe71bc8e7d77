//! Case feed model and loader.

mod series;

pub use series::{Category, Series};

use crate::error::DatasetError;
use geojson::{feature::Id, Feature, GeoJson, Value};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Position of a location in the loaded feature array.
pub type LocationId = usize;

/// How finely a row is broken down. Ordered coarse to fine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Country,
    Province,
    Admin2,
}

/// Place names of a row. Empty labels in the feed are stored as `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels {
    pub country: String,
    pub province: Option<String>,
    pub admin2: Option<String>,
}

impl Labels {
    pub fn new(country: &str, province: Option<&str>, admin2: Option<&str>) -> Self {
        Self {
            country: country.to_string(),
            province: non_empty(province),
            admin2: non_empty(admin2),
        }
    }

    pub fn granularity(&self) -> Granularity {
        if self.admin2.is_some() {
            Granularity::Admin2
        } else if self.province.is_some() {
            Granularity::Province
        } else {
            Granularity::Country
        }
    }

    /// `"province, country"`, if the row has a province.
    pub fn province_query(&self) -> Option<String> {
        self.province
            .as_ref()
            .map(|province| format!("{province}, {}", self.country))
    }

    /// `"admin2, province, country"`, if the row has an admin2 label.
    pub fn admin2_query(&self) -> Option<String> {
        self.admin2.as_ref().map(|admin2| {
            format!(
                "{admin2}, {}, {}",
                self.province.as_deref().unwrap_or_default(),
                self.country
            )
        })
    }

    /// Most specific name first, joined the way queries are written.
    pub fn display_name(&self) -> String {
        self.admin2_query()
            .or_else(|| self.province_query())
            .unwrap_or_else(|| self.country.clone())
    }
}

fn non_empty(label: Option<&str>) -> Option<String> {
    label
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

/// One row of the feed.
#[derive(Clone, Debug)]
pub struct Location {
    pub id: LocationId,
    /// The feed's own feature id, if it had one.
    pub feature_id: Option<i64>,
    pub labels: Labels,
    pub lon: f64,
    pub lat: f64,
    pub series: Series,
}

impl Location {
    /// Counts at the most recent sample, all zero for an empty series.
    pub fn latest(&self) -> (u64, u64, u64) {
        self.series.latest()
    }

    pub fn latest_is_zero(&self) -> bool {
        self.latest() == (0, 0, 0)
    }
}

/// The loaded feed.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub locations: Vec<Location>,
}

impl Dataset {
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let mut bytes = fs::read(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_slice(&mut bytes)?;
        info!(
            path = %path.display(),
            locations = dataset.locations.len(),
            "loaded case dataset"
        );
        Ok(dataset)
    }

    /// Parse a feed held in memory. simd-json parses in place, hence `&mut`.
    pub fn from_slice(bytes: &mut [u8]) -> Result<Self, DatasetError> {
        let value: JsonValue = simd_json::serde::from_slice(bytes)?;
        Self::from_json_value(value)
    }

    pub fn from_json_value(value: JsonValue) -> Result<Self, DatasetError> {
        let geojson = GeoJson::from_json_value(value)?;
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(_) => return Err(DatasetError::NotFeatureCollection("Feature")),
            GeoJson::Geometry(_) => return Err(DatasetError::NotFeatureCollection("Geometry")),
        };

        let locations = collection
            .features
            .iter()
            .enumerate()
            .map(|(id, feature)| location_from_feature(id, feature))
            .collect();
        Ok(Self { locations })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(id)
    }
}

fn location_from_feature(id: LocationId, feature: &Feature) -> Location {
    let props = feature.properties.as_ref();
    let labels = Labels::new(
        prop_str(props, "country").unwrap_or_default(),
        prop_str(props, "province"),
        prop_str(props, "admin2"),
    );
    if labels.country.is_empty() {
        warn!(id, "feature has no country label");
    }

    let feature_id = match &feature.id {
        Some(Id::Number(n)) => n.as_i64(),
        Some(Id::String(s)) => s.parse().ok(),
        None => None,
    };

    let (lon, lat) = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Point(coords)) if coords.len() >= 2 => (coords[0], coords[1]),
        _ => {
            warn!(id, name = %labels.display_name(), "feature is not a point; placing at 0,0");
            (0.0, 0.0)
        }
    };

    let series = props
        .map(|p| series_from_properties(id, &labels, p))
        .unwrap_or_default();

    Location {
        id,
        feature_id,
        labels,
        lon,
        lat,
        series,
    }
}

fn prop_str<'a>(props: Option<&'a Map<String, JsonValue>>, key: &str) -> Option<&'a str> {
    props.and_then(|p| p.get(key)).and_then(|v| v.as_str())
}

/// Raw `{time, count}` entry. Counts are signed here so negative corrections
/// can be clamped with a warning instead of failing the whole row.
#[derive(Deserialize)]
struct RawSample {
    time: i64,
    count: i64,
}

fn samples(id: LocationId, props: &Map<String, JsonValue>, category: Category) -> Option<Vec<RawSample>> {
    let value = props.get(category.key())?;
    match serde_json::from_value::<Vec<RawSample>>(value.clone()) {
        Ok(samples) => Some(samples),
        Err(e) => {
            warn!(id, category = category.key(), error = %e, "malformed samples");
            None
        }
    }
}

fn series_from_properties(id: LocationId, labels: &Labels, props: &Map<String, JsonValue>) -> Series {
    let name = labels.display_name();
    let (Some(confirmed), Some(recovered), Some(deaths)) = (
        samples(id, props, Category::Confirmed),
        samples(id, props, Category::Recovered),
        samples(id, props, Category::Deaths),
    ) else {
        warn!(id, %name, "missing category; series left empty");
        return Series::default();
    };

    if confirmed.len() != recovered.len() || confirmed.len() != deaths.len() {
        warn!(
            id,
            %name,
            confirmed = confirmed.len(),
            recovered = recovered.len(),
            deaths = deaths.len(),
            "category lengths differ; series left empty"
        );
        return Series::default();
    }

    let aligned = confirmed
        .iter()
        .zip(&recovered)
        .zip(&deaths)
        .all(|((c, r), d)| c.time == r.time && c.time == d.time);
    if !aligned {
        warn!(id, %name, "category timestamps differ; series left empty");
        return Series::default();
    }

    let mut clamped = 0usize;
    let mut count = |sample: &RawSample| {
        if sample.count < 0 {
            clamped += 1;
        }
        sample.count.max(0) as u64
    };

    let mut series = Series::with_capacity(confirmed.len());
    for ((c, r), d) in confirmed.iter().zip(&recovered).zip(&deaths) {
        let counts = (count(c), count(r), count(d));
        series.push(c.time, counts.0, counts.1, counts.2);
    }
    if clamped > 0 {
        warn!(id, %name, clamped, "negative counts clamped to zero");
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(value: JsonValue) -> Dataset {
        Dataset::from_json_value(value).unwrap()
    }

    fn samples(counts: &[i64]) -> JsonValue {
        JsonValue::Array(
            counts
                .iter()
                .enumerate()
                .map(|(i, c)| json!({"time": i as i64 * 86_400, "count": c}))
                .collect(),
        )
    }

    fn feature(id: i64, country: &str, province: &str, confirmed: &[i64]) -> JsonValue {
        json!({
            "type": "Feature",
            "id": id,
            "geometry": {"type": "Point", "coordinates": [10.5, -3.25]},
            "properties": {
                "country": country,
                "province": province,
                "confirmed": samples(confirmed),
                "recovered": samples(&vec![0; confirmed.len()]),
                "deaths": samples(&vec![0; confirmed.len()]),
            }
        })
    }

    #[test]
    fn test_loads_points_labels_and_series() {
        let dataset = load(json!({
            "type": "FeatureCollection",
            "features": [feature(7, "Canada", "Ontario", &[0, 2, 5])]
        }));
        let location = &dataset.locations[0];
        assert_eq!(location.id, 0);
        assert_eq!(location.feature_id, Some(7));
        assert_eq!(location.labels, Labels::new("Canada", Some("Ontario"), None));
        assert_eq!((location.lon, location.lat), (10.5, -3.25));
        assert_eq!(location.series.confirmed, vec![0, 2, 5]);
        assert_eq!(location.series.time, vec![0, 86_400, 172_800]);
    }

    #[test]
    fn test_empty_province_is_none() {
        let dataset = load(json!({
            "type": "FeatureCollection",
            "features": [feature(0, "Italy", "", &[1])]
        }));
        assert_eq!(dataset.locations[0].labels.granularity(), Granularity::Country);
    }

    #[test]
    fn test_mismatched_lengths_degrade_to_empty_series() {
        let mut bad = feature(0, "Peru", "", &[1, 2]);
        bad["properties"]["deaths"] = samples(&[0]);
        let dataset = load(json!({
            "type": "FeatureCollection",
            "features": [bad, feature(1, "Chile", "", &[3])]
        }));
        assert!(dataset.locations[0].series.is_empty());
        assert_eq!(dataset.locations[1].series.confirmed, vec![3]);
    }

    #[test]
    fn test_misaligned_timestamps_degrade_to_empty_series() {
        let mut bad = feature(0, "Peru", "", &[1, 2]);
        bad["properties"]["recovered"][1]["time"] = json!(1);
        let dataset = load(json!({"type": "FeatureCollection", "features": [bad]}));
        assert!(dataset.locations[0].series.is_empty());
    }

    #[test]
    fn test_missing_category_degrades_to_empty_series() {
        let mut bad = feature(0, "Peru", "", &[1]);
        bad["properties"].as_object_mut().unwrap().remove("recovered");
        let dataset = load(json!({"type": "FeatureCollection", "features": [bad]}));
        assert!(dataset.locations[0].series.is_empty());
        assert!(dataset.locations[0].latest_is_zero());
    }

    #[test]
    fn test_negative_counts_are_clamped() {
        let dataset = load(json!({
            "type": "FeatureCollection",
            "features": [feature(0, "Peru", "", &[4, -1])]
        }));
        assert_eq!(dataset.locations[0].series.confirmed, vec![4, 0]);
    }

    #[test]
    fn test_rejects_bare_geometry() {
        let err = Dataset::from_json_value(json!({"type": "Point", "coordinates": [0.0, 0.0]}))
            .unwrap_err();
        assert!(matches!(err, DatasetError::NotFeatureCollection("Geometry")));
    }

    #[test]
    fn test_parses_bytes_with_simd_json() {
        let mut bytes = serde_json::to_vec(&json!({
            "type": "FeatureCollection",
            "features": [feature(0, "Japan", "", &[1, 1])]
        }))
        .unwrap();
        let dataset = Dataset::from_slice(&mut bytes).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_admin2_query_label() {
        let labels = Labels::new("United States", Some("Texas"), Some("Travis"));
        assert_eq!(labels.admin2_query().as_deref(), Some("Travis, Texas, United States"));
        assert_eq!(labels.province_query().as_deref(), Some("Texas, United States"));
        assert_eq!(labels.display_name(), "Travis, Texas, United States");
    }
}
