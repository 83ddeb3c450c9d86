//! Biosample record schema.
//!
//! `Biosample` is a read view over a raw record. Only the keys this workspace
//! reads or writes are typed, and a typed key with an unexpected shape reads
//! as absent instead of rejecting the record. Every other key is kept in
//! `extra`. Batch writers patch the original record rather than serializing
//! this view, so asserted metadata is never rewritten.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::feature::{GeoPoint, OsmFeatureSummary};
use crate::lenient;
use crate::mapping::{EnvoMapping, MappingStats, MappingsByField, TargetField};

/// Raw-value prefix used by some records for underscore-form EnvO ids.
const RAW_ENVO_PREFIX: &str = "ENVO_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Biosample {
    #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub lat_lon: Option<LatLon>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub inferred_lat_lon: Option<LatLon>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub env_broad_scale: Option<EnvField>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub env_local_scale: Option<EnvField>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub env_medium: Option<EnvField>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub osm_features: Option<OsmFeatureSummary>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub envo_mappings: Option<BTreeMap<String, Vec<EnvoMapping>>>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub envo_mappings_by_field: Option<MappingsByField>,
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub envo_mapping_stats: Option<MappingStats>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `id` of a raw record, numbers rendered as text.
pub fn record_id(record: &Value) -> Option<String> {
    record.get("id").and_then(lenient::id_text)
}

impl Biosample {
    /// Identifier for log messages.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<unknown>")
    }

    pub fn env_field(&self, field: TargetField) -> Option<&EnvField> {
        match field {
            TargetField::EnvBroadScale => self.env_broad_scale.as_ref(),
            TargetField::EnvLocalScale => self.env_local_scale.as_ref(),
            TargetField::EnvMedium => self.env_medium.as_ref(),
        }
    }

    /// Asserted environment terms keyed by field.
    ///
    /// A structured `term` wins over `has_raw_value`. Raw values of the form
    /// `ENVO_########` are turned into `ENVO:########`; other raw values keep
    /// an empty id and carry the raw text as the name.
    pub fn asserted_terms(&self) -> BTreeMap<TargetField, AssertedTerm> {
        let mut terms = BTreeMap::new();
        for field in TargetField::ALL {
            let Some(env) = self.env_field(field) else {
                continue;
            };
            if let Some(term) = &env.term {
                terms.insert(
                    field,
                    AssertedTerm {
                        id: term.id.clone().unwrap_or_default(),
                        name: term.name.clone().unwrap_or_default(),
                    },
                );
            } else if let Some(raw) = &env.has_raw_value {
                let id = if raw.starts_with(RAW_ENVO_PREFIX) {
                    raw.replacen(RAW_ENVO_PREFIX, "ENVO:", 1)
                } else {
                    String::new()
                };
                terms.insert(
                    field,
                    AssertedTerm {
                        id,
                        name: raw.clone(),
                    },
                );
            }
        }
        terms
    }

    /// Asserted sample location, if both components parse as numbers.
    pub fn asserted_point(&self) -> Option<GeoPoint> {
        self.lat_lon.as_ref().and_then(LatLon::point)
    }

    pub fn inferred_point(&self) -> Option<GeoPoint> {
        self.inferred_lat_lon.as_ref().and_then(LatLon::point)
    }
}

/// An asserted environment term as `{id, name}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertedTerm {
    pub id: String,
    pub name: String,
}

/// A record's `env_*` slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<EnvTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_raw_value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvTerm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A coordinate slot as found in records.
///
/// Values are kept as raw JSON because sources store them as numbers or as
/// numeric strings; accessors parse on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_asserted_meters: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LatLon {
    pub fn point(&self) -> Option<GeoPoint> {
        let lat = self.latitude.as_ref().and_then(value_as_f64)?;
        let lon = self.longitude.as_ref().and_then(value_as_f64)?;
        Some(GeoPoint::new(lat, lon))
    }

    pub fn distance_from_asserted(&self) -> Option<f64> {
        self.distance_from_asserted_meters
            .as_ref()
            .and_then(value_as_f64)
    }
}

/// Number or numeric string as `f64`.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_keys_survive_round_trip() {
        let raw = json!({
            "id": "nmdc:bsm-11-abc",
            "name": "soil core 3",
            "lat_lon": {"latitude": "38.9", "longitude": -77.0, "has_raw_value": "38.9 -77.0"},
            "env_medium": {"term": {"id": "ENVO:00001998", "name": "soil", "type": "nmdc:OntologyClass"}}
        });
        let sample: Biosample = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(sample.extra.get("name"), Some(&json!("soil core 3")));
        assert_eq!(serde_json::to_value(&sample).unwrap(), raw);
    }

    #[test]
    fn coordinates_accept_numeric_strings() {
        let sample: Biosample = serde_json::from_value(json!({
            "lat_lon": {"latitude": "38.9", "longitude": -77.0}
        }))
        .unwrap();
        assert_eq!(sample.asserted_point(), Some(GeoPoint::new(38.9, -77.0)));
        assert_eq!(sample.inferred_point(), None);
    }

    #[test]
    fn unexpected_shapes_read_as_absent() {
        let raw = json!({
            "id": 42,
            "lat_lon": "38.9 -77.0",
            "env_broad_scale": "freshwater biome",
            "env_medium": {"term": {"id": "ENVO:00002006", "name": "water"}},
            "osm_features": [1, 2]
        });
        let sample: Biosample = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(sample.id.as_deref(), Some("42"));
        assert_eq!(record_id(&raw).as_deref(), Some("42"));
        assert!(sample.lat_lon.is_none());
        assert!(sample.env_broad_scale.is_none());
        assert!(sample.osm_features.is_none());
        let terms = sample.asserted_terms();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[&TargetField::EnvMedium].id, "ENVO:00002006");
    }

    #[test]
    fn null_fields_read_as_absent() {
        let sample: Biosample =
            serde_json::from_value(json!({"id": null, "env_medium": null})).unwrap();
        assert_eq!(sample.display_id(), "<unknown>");
        assert!(sample.env_medium.is_none());
    }

    #[test]
    fn asserted_terms_prefer_structured_term() {
        let sample: Biosample = serde_json::from_value(json!({
            "env_broad_scale": {"term": {"id": "ENVO:01000253", "name": "freshwater river biome"}},
            "env_local_scale": {"has_raw_value": "ENVO_00000022"},
            "env_medium": {"has_raw_value": "river water"}
        }))
        .unwrap();
        let terms = sample.asserted_terms();

        assert_eq!(terms[&TargetField::EnvBroadScale].id, "ENVO:01000253");
        assert_eq!(terms[&TargetField::EnvLocalScale].id, "ENVO:00000022");
        assert_eq!(terms[&TargetField::EnvLocalScale].name, "ENVO_00000022");
        assert_eq!(terms[&TargetField::EnvMedium].id, "");
        assert_eq!(terms[&TargetField::EnvMedium].name, "river water");
    }
}
