use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use tracing::info;

use super::renderer::LineString;

/// Outline strings of a GeoJSON file: line geometries as-is, polygons by
/// their exterior ring.
pub fn load_basemap(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading basemap {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("parsing basemap {}", path.display()))?;

    let mut lines = Vec::new();
    match &geojson {
        GeoJson::FeatureCollection(fc) => {
            for geometry in fc.features.iter().filter_map(|f| f.geometry.as_ref()) {
                collect_lines(geometry, &mut lines);
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                collect_lines(geometry, &mut lines);
            }
        }
        GeoJson::Geometry(geometry) => collect_lines(geometry, &mut lines),
    }
    info!(path = %path.display(), lines = lines.len(), "loaded basemap");
    Ok(lines)
}

fn to_line(coords: &[Vec<f64>]) -> LineString {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

fn collect_lines(geometry: &Geometry, lines: &mut Vec<LineString>) {
    match &geometry.value {
        Value::LineString(coords) => lines.push(to_line(coords)),
        Value::MultiLineString(parts) => lines.extend(parts.iter().map(|coords| to_line(coords))),
        Value::Polygon(rings) => lines.extend(rings.first().map(|ring| to_line(ring))),
        Value::MultiPolygon(polygons) => {
            lines.extend(polygons.iter().filter_map(|rings| rings.first()).map(|ring| to_line(ring)))
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_lines(g, lines);
            }
        }
        Value::Point(_) | Value::MultiPoint(_) => {}
    }
}
