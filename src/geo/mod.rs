// Landmass dataset
//
// Loads country/continent polygons from a GeoJSON FeatureCollection once per
// session and filters out excluded landmasses before they reach the projector.

use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A closed ring of (longitude, latitude) pairs
pub type Ring = Vec<(f64, f64)>;

#[derive(Debug, Error)]
pub enum LandmassError {
    #[error("cannot download landmass dataset from {url}: {message}")]
    Download { url: String, message: String },

    #[error("cannot read landmass dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("landmass dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("landmass dataset is not a GeoJSON FeatureCollection")]
    NotFeatureCollection,
}

/// One named landmass with its outline rings
#[derive(Debug, Clone, PartialEq)]
pub struct Landmass {
    pub name: Option<String>,
    pub id: Option<String>,
    pub rings: Vec<Ring>,
}

impl Landmass {
    /// Whether this landmass matches any entry of the exclusion list
    ///
    /// Matching is case-insensitive against both the name and the id.
    pub fn is_excluded(&self, exclusions: &[String]) -> bool {
        exclusions.iter().any(|ex| {
            self.name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(ex))
                || self.id.as_deref().is_some_and(|i| i.eq_ignore_ascii_case(ex))
        })
    }
}

/// Drop excluded landmasses
pub fn filter_excluded(landmasses: &[Landmass], exclusions: &[String]) -> Vec<Landmass> {
    landmasses
        .iter()
        .filter(|l| !l.is_excluded(exclusions))
        .cloned()
        .collect()
}

/// Parse a GeoJSON FeatureCollection of Polygon / MultiPolygon features
///
/// Features with other geometry types or unreadable coordinates are skipped.
pub fn parse_geojson(text: &str) -> Result<Vec<Landmass>, LandmassError> {
    let root: Value = serde_json::from_str(text)?;
    let features = root["features"]
        .as_array()
        .ok_or(LandmassError::NotFeatureCollection)?;

    let landmasses = features
        .iter()
        .filter_map(|feature| {
            let rings = geometry_rings(&feature["geometry"]);
            if rings.is_empty() {
                return None;
            }
            Some(Landmass {
                name: feature_name(feature),
                id: feature_id(feature),
                rings,
            })
        })
        .collect();

    Ok(landmasses)
}

fn feature_name(feature: &Value) -> Option<String> {
    let props = &feature["properties"];
    ["name", "NAME", "ADMIN", "admin"]
        .iter()
        .find_map(|key| props[*key].as_str())
        .map(str::to_string)
}

fn feature_id(feature: &Value) -> Option<String> {
    match &feature["id"] {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => feature["properties"]["ISO_A3"].as_str().map(str::to_string),
    }
}

fn geometry_rings(geometry: &Value) -> Vec<Ring> {
    let coords = &geometry["coordinates"];
    match geometry["type"].as_str().unwrap_or("") {
        "Polygon" => polygon_rings(coords),
        "MultiPolygon" => coords
            .as_array()
            .map(|polys| polys.iter().flat_map(polygon_rings).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn polygon_rings(polygon: &Value) -> Vec<Ring> {
    polygon
        .as_array()
        .map(|rings| {
            rings
                .iter()
                .filter_map(|ring| {
                    let points: Ring = ring
                        .as_array()?
                        .iter()
                        .filter_map(|pt| {
                            let pair = pt.as_array()?;
                            Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
                        })
                        .collect();
                    (points.len() >= 3).then_some(points)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Load the dataset from a local path or an http(s) URL
pub fn load(location: &str, timeout: Duration) -> Result<Vec<Landmass>, LandmassError> {
    let text = if location.starts_with("http://") || location.starts_with("https://") {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let download_error = |message: String| LandmassError::Download {
            url: location.to_string(),
            message,
        };
        agent
            .get(location)
            .call()
            .map_err(|e| download_error(e.to_string()))?
            .into_string()
            .map_err(|e| download_error(e.to_string()))?
    } else {
        fs::read_to_string(location).map_err(|e| LandmassError::Io {
            path: PathBuf::from(location),
            source: e,
        })?
    };

    parse_geojson(&text)
}
