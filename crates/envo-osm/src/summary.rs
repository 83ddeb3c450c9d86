//! Group queried features by category around a center point.

use std::collections::BTreeMap;

use chrono::Utc;
use envo_model::{FeatureEntry, GeoPoint, OsmFeature, OsmFeatureSummary, SummaryMetadata};

use crate::distance::haversine_m;
use crate::query::QueriedFeature;
use crate::taxonomy::FeatureTaxonomy;

/// Attach distances to queried features, keeping only environmental tags.
pub fn to_osm_features(
    features: &[QueriedFeature],
    center: GeoPoint,
    taxonomy: &FeatureTaxonomy,
) -> Vec<OsmFeature> {
    features
        .iter()
        .map(|feature| OsmFeature {
            feature_id: feature.feature_id.clone(),
            feature_type: feature.feature_type.clone(),
            tags: taxonomy.environmental_tags(&feature.tags),
            coordinates: feature.coordinates,
            distance_from_center: haversine_m(center, feature.coordinates),
            area: feature.area,
        })
        .collect()
}

/// Summarize features with the current UTC time as timestamp.
pub fn summarize_features(
    features: &[QueriedFeature],
    center: GeoPoint,
    taxonomy: &FeatureTaxonomy,
) -> OsmFeatureSummary {
    summarize_features_at(features, center, taxonomy, Utc::now().to_rfc3339())
}

/// Summarize features with an explicit timestamp.
///
/// Each category list is sorted ascending by distance; equal distances keep
/// their input order.
pub fn summarize_features_at(
    features: &[QueriedFeature],
    center: GeoPoint,
    taxonomy: &FeatureTaxonomy,
    timestamp: impl Into<String>,
) -> OsmFeatureSummary {
    let mut grouped: BTreeMap<String, Vec<FeatureEntry>> = BTreeMap::new();
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

    for feature in to_osm_features(features, center, taxonomy) {
        let (category, subtype) = envo_model::split_feature_type(&feature.feature_type);
        *counts
            .entry(category.to_string())
            .or_default()
            .entry(subtype.to_string())
            .or_default() += 1;

        grouped
            .entry(category.to_string())
            .or_default()
            .push(FeatureEntry {
                id: Some(feature.feature_id),
                feature_type: Some(feature.feature_type),
                coordinates: Some(vec![feature.coordinates.lat, feature.coordinates.lon]),
                area: feature.area,
                environmental_tags: feature.tags,
                distance_from_center: Some(feature.distance_from_center),
                ..FeatureEntry::default()
            });
    }

    for entries in grouped.values_mut() {
        entries.sort_by(|a, b| {
            let da = a.distance_from_center.unwrap_or(f64::INFINITY);
            let db = b.distance_from_center.unwrap_or(f64::INFINITY);
            da.total_cmp(&db)
        });
    }

    OsmFeatureSummary {
        metadata: SummaryMetadata {
            total_features: features.len(),
            query_coordinates: Some(center),
            timestamp: Some(timestamp.into()),
            feature_type_counts: counts,
            ..SummaryMetadata::default()
        },
        features: grouped,
        ..OsmFeatureSummary::default()
    }
}
