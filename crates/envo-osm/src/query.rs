//! Overpass QL query construction and result element parsing.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use envo_model::GeoPoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{OsmError, Result};
use crate::taxonomy::FeatureTaxonomy;

/// Server-side timeout requested in the query header, in seconds.
pub const QUERY_TIMEOUT_SECS: u32 = 180;

/// A feature parsed from an Overpass result, before distances are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriedFeature {
    pub feature_id: String,
    /// `category:value` resolved through the taxonomy.
    pub feature_type: String,
    /// All tags of the element.
    pub tags: BTreeMap<String, String>,
    /// `node`, `way` or `relation`.
    pub geometry_type: String,
    pub coordinates: GeoPoint,
    pub area: Option<f64>,
}

/// Build a query for every taxonomy pair within `radius_m` of `center`.
pub fn build_overpass_query(taxonomy: &FeatureTaxonomy, center: GeoPoint, radius_m: f64) -> String {
    let mut query = format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n");
    for (key, value) in taxonomy.pairs() {
        let _ = writeln!(
            query,
            "  nwr[\"{key}\"=\"{value}\"](around:{radius_m},{},{});",
            center.lat, center.lon
        );
    }
    query.push_str(");\nout body center qt;\n");
    query
}

#[derive(Debug, Deserialize)]
struct RawCenter {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type", default)]
    element_type: String,
    id: Value,
    #[serde(default)]
    tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    center: Option<RawCenter>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    area: Option<Value>,
}

/// Element center: `center` for ways and relations, else `lat`/`lon`.
fn extract_coordinates(element: &RawElement, id: &str) -> Result<GeoPoint> {
    if let Some(center) = &element.center {
        return Ok(GeoPoint::new(center.lat, center.lon));
    }
    match (element.lat, element.lon) {
        (Some(lat), Some(lon)) => Ok(GeoPoint::new(lat, lon)),
        _ => Err(OsmError::MissingCoordinates { id: id.to_string() }),
    }
}

fn element_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_element(raw: &Value, taxonomy: &FeatureTaxonomy) -> Result<Option<QueriedFeature>> {
    let element: RawElement = serde_json::from_value(raw.clone())?;
    let Some(tags) = element.tags.as_ref() else {
        return Ok(None);
    };
    let Some(feature_type) = taxonomy.feature_type(tags) else {
        return Ok(None);
    };

    let feature_id = element_id(&element.id);
    let coordinates = extract_coordinates(&element, &feature_id)?;
    let area = element.area.as_ref().and_then(envo_model::value_as_f64);

    Ok(Some(QueriedFeature {
        feature_id,
        feature_type,
        tags: tags.clone(),
        geometry_type: element.element_type,
        coordinates,
        area,
    }))
}

/// Parse an Overpass JSON response into features.
///
/// Elements without tags or without a taxonomy match are skipped silently.
/// Malformed elements are logged and skipped. Duplicate `(type, id)` pairs
/// keep their first occurrence.
pub fn parse_response(body: &Value, taxonomy: &FeatureTaxonomy) -> Vec<QueriedFeature> {
    let Some(elements) = body.get("elements").and_then(Value::as_array) else {
        warn!("No elements found in Overpass response");
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut features = Vec::new();
    for raw in elements {
        match parse_element(raw, taxonomy) {
            Ok(Some(feature)) => {
                if seen.insert((feature.geometry_type.clone(), feature.feature_id.clone())) {
                    features.push(feature);
                }
            }
            Ok(None) => {}
            Err(e) => {
                let id = raw.get("id").map_or_else(|| "unknown".to_string(), element_id);
                warn!(element_id = %id, error = %e, "Skipping malformed Overpass element");
            }
        }
    }
    debug!(
        elements = elements.len(),
        features = features.len(),
        "Parsed Overpass response"
    );
    features
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn taxonomy() -> FeatureTaxonomy {
        FeatureTaxonomy::from_pairs([("natural", "water"), ("landuse", "forest")])
    }

    #[test]
    fn query_lists_every_pair() {
        let query = build_overpass_query(&taxonomy(), GeoPoint::new(38.5, -77.25), 1000.0);
        assert!(query.starts_with("[out:json][timeout:180];"));
        assert!(query.contains("nwr[\"natural\"=\"water\"](around:1000,38.5,-77.25);"));
        assert!(query.contains("nwr[\"landuse\"=\"forest\"](around:1000,38.5,-77.25);"));
        assert!(query.trim_end().ends_with("out body center qt;"));
    }

    #[test]
    fn center_wins_over_point_coordinates() {
        let body = json!({"elements": [
            {"type": "way", "id": 7, "center": {"lat": 1.0, "lon": 2.0}, "lat": 9.0, "lon": 9.0,
             "tags": {"natural": "water", "name": "Pond"}},
            {"type": "node", "id": 8, "lat": 3.0, "lon": 4.0, "tags": {"landuse": "forest"}}
        ]});
        let features = parse_response(&body, &taxonomy());
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].coordinates, GeoPoint::new(1.0, 2.0));
        assert_eq!(features[0].feature_id, "7");
        assert_eq!(features[0].tags["name"], "Pond");
        assert_eq!(features[1].coordinates, GeoPoint::new(3.0, 4.0));
        assert_eq!(features[1].geometry_type, "node");
    }

    #[test]
    fn malformed_elements_do_not_fail_the_batch() {
        let body = json!({"elements": [
            {"type": "way", "id": 1, "tags": {"natural": "water"}},
            {"type": "node", "id": 2, "lat": 0.5, "lon": 0.5},
            {"type": "node", "id": 3, "lat": 0.5, "lon": 0.5, "tags": {"amenity": "bench"}},
            {"type": "node", "id": 4, "lat": 0.5, "lon": 0.5, "tags": {"natural": "water"}, "area": "1200.5"}
        ]});
        let features = parse_response(&body, &taxonomy());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].feature_id, "4");
        assert_eq!(features[0].area, Some(1200.5));
    }

    #[test]
    fn duplicates_are_dropped() {
        let element = json!({"type": "node", "id": 5, "lat": 0.0, "lon": 0.0, "tags": {"natural": "water"}});
        let body = json!({"elements": [element.clone(), element]});
        assert_eq!(parse_response(&body, &taxonomy()).len(), 1);
    }

    #[test]
    fn missing_elements_yield_empty_list() {
        assert!(parse_response(&json!({"remark": "runtime error"}), &taxonomy()).is_empty());
    }
}
