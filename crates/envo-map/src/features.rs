//! Read mappable features back out of a biosample's OSM summary.

use envo_model::{FeatureEntry, OsmFeature, OsmFeatureSummary};
use tracing::debug;

/// Categories read before all others.
pub const PRIMARY_CATEGORIES: &[&str] = &["water", "natural", "landuse", "ecosystem", "protected_area"];

/// Features within `max_distance_m`, sorted ascending by distance.
///
/// Primary categories are read first, then the rest in name order; the sort
/// is stable, so equal distances keep that reading order. Entries without a
/// two-value `coordinates` array are skipped. A missing id becomes
/// `unknown-N` and a missing type `<category>:unknown`.
pub fn extract_features(summary: &OsmFeatureSummary, max_distance_m: f64) -> Vec<OsmFeature> {
    let remaining = summary
        .features
        .keys()
        .map(String::as_str)
        .filter(|category| !PRIMARY_CATEGORIES.contains(category));
    let categories = PRIMARY_CATEGORIES.iter().copied().chain(remaining);

    let mut features: Vec<OsmFeature> = Vec::new();
    for category in categories {
        let Some(entries) = summary.features.get(category) else {
            continue;
        };
        for entry in entries {
            let Some(feature) = to_feature(entry, category, features.len()) else {
                debug!(category, "Skipping feature entry without coordinates");
                continue;
            };
            if feature.distance_from_center <= max_distance_m {
                features.push(feature);
            }
        }
    }

    features.sort_by(|a, b| a.distance_from_center.total_cmp(&b.distance_from_center));
    features
}

fn to_feature(entry: &FeatureEntry, category: &str, index: usize) -> Option<OsmFeature> {
    let coordinates = entry.point()?;
    Some(OsmFeature {
        feature_id: entry
            .id
            .clone()
            .unwrap_or_else(|| format!("unknown-{index}")),
        feature_type: entry
            .feature_type
            .clone()
            .unwrap_or_else(|| format!("{category}:unknown")),
        tags: entry.environmental_tags.clone(),
        coordinates,
        distance_from_center: entry.distance_from_center.unwrap_or(0.0).max(0.0),
        area: entry.area,
    })
}
