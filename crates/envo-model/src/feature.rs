//! OpenStreetMap feature types and the per-sample feature summary document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lenient;

/// A latitude/longitude pair in decimal degrees.
///
/// Serialized as a two-element `[lat, lon]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

impl From<GeoPoint> for (f64, f64) {
    fn from(point: GeoPoint) -> Self {
        (point.lat, point.lon)
    }
}

/// An environmental feature near a sample, ready for selection and mapping.
///
/// Created once during extraction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmFeature {
    pub feature_id: String,
    /// `category:subtype`, e.g. `natural:water`.
    pub feature_type: String,
    /// Environmentally relevant tags only.
    pub tags: BTreeMap<String, String>,
    pub coordinates: GeoPoint,
    /// Meters from the sample location, never negative.
    pub distance_from_center: f64,
    /// Square meters, when known.
    pub area: Option<f64>,
}

impl OsmFeature {
    /// Portion of the feature type before the first colon.
    pub fn category(&self) -> &str {
        split_feature_type(&self.feature_type).0
    }
}

/// Split `category:subtype`; a type without a colon has an empty subtype.
pub fn split_feature_type(feature_type: &str) -> (&str, &str) {
    feature_type.split_once(':').unwrap_or((feature_type, ""))
}

/// A feature as stored in a biosample's `osm_features.features` lists.
///
/// Every field is optional on input, and a field of the wrong shape reads as
/// absent, so that partially filled entries can be skipped one at a time
/// instead of rejecting the whole sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntry {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient::option")]
    pub feature_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub coordinates: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub area: Option<f64>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub environmental_tags: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub distance_from_center: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureEntry {
    /// Coordinates when exactly two values are present.
    pub fn point(&self) -> Option<GeoPoint> {
        match self.coordinates.as_deref() {
            Some([lat, lon]) => Some(GeoPoint::new(*lat, *lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetadata {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub total_features: usize,
    #[serde(default, deserialize_with = "lenient::option")]
    pub query_coordinates: Option<GeoPoint>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub timestamp: Option<String>,
    /// category -> subtype -> count
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub feature_type_counts: BTreeMap<String, BTreeMap<String, usize>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Features around one point, grouped by category and sorted by distance.
///
/// Unreadable category lists and entries are dropped on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsmFeatureSummary {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub metadata: SummaryMetadata,
    #[serde(default, deserialize_with = "lenient::grouped")]
    pub features: BTreeMap<String, Vec<FeatureEntry>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OsmFeatureSummary {
    pub fn feature_count(&self) -> usize {
        self.features.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_serializes_as_pair() {
        let json = serde_json::to_string(&GeoPoint::new(37.5, -122.25)).unwrap();
        assert_eq!(json, "[37.5,-122.25]");
    }

    #[test]
    fn entry_point_requires_two_values() {
        let mut entry = FeatureEntry {
            coordinates: Some(vec![1.0, 2.0]),
            ..FeatureEntry::default()
        };
        assert_eq!(entry.point(), Some(GeoPoint::new(1.0, 2.0)));

        entry.coordinates = Some(vec![1.0]);
        assert_eq!(entry.point(), None);

        entry.coordinates = None;
        assert_eq!(entry.point(), None);
    }

    #[test]
    fn summary_keeps_readable_entries_and_unknown_keys() {
        let summary: OsmFeatureSummary = serde_json::from_value(serde_json::json!({
            "metadata": {"total_features": 3, "source": "overpass"},
            "features": {
                "natural": [
                    {"id": 9, "type": "natural:water", "coordinates": [1.0, 2.0], "name": "Mill Pond"},
                    "not an entry",
                    {"id": "10", "coordinates": "1.0,2.0", "area": "big"}
                ],
                "water": "not a list"
            }
        }))
        .unwrap();

        assert_eq!(summary.metadata.total_features, 3);
        assert_eq!(summary.metadata.extra["source"], "overpass");
        assert!(!summary.features.contains_key("water"));
        let natural = &summary.features["natural"];
        assert_eq!(natural.len(), 2);
        assert_eq!(natural[0].id.as_deref(), Some("9"));
        assert_eq!(natural[0].extra["name"], "Mill Pond");
        assert_eq!(natural[1].coordinates, None);
        assert_eq!(natural[1].area, None);
    }

    #[test]
    fn split_without_colon() {
        assert_eq!(split_feature_type("natural:water"), ("natural", "water"));
        assert_eq!(split_feature_type("landuse:farm:land"), ("landuse", "farm:land"));
        assert_eq!(split_feature_type("wetland"), ("wetland", ""));
    }
}
