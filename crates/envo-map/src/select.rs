//! Bounded, type-diverse feature selection.

use std::collections::HashSet;

use envo_model::OsmFeature;

/// Reduce distance-sorted `features` to at most `cap`, biased toward
/// diverse types.
///
/// With more than `cap` features, the closest feature of every type is kept
/// first (in order of first appearance, truncated to `cap` if there are more
/// types than slots), then the remaining slots go to the closest features
/// not yet chosen. The result keeps the input order, so it stays sorted by
/// distance and equal distances keep their relative order.
pub fn select_features(features: Vec<OsmFeature>, cap: usize) -> Vec<OsmFeature> {
    if features.len() <= cap {
        return features;
    }

    let mut seen_types = HashSet::new();
    let mut selected = vec![false; features.len()];
    let mut remaining = cap;

    for (index, feature) in features.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if seen_types.insert(feature.feature_type.as_str()) {
            selected[index] = true;
            remaining -= 1;
        }
    }

    for flag in &mut selected {
        if remaining == 0 {
            break;
        }
        if !*flag {
            *flag = true;
            remaining -= 1;
        }
    }

    features
        .into_iter()
        .zip(selected)
        .filter_map(|(feature, keep)| keep.then_some(feature))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use envo_model::GeoPoint;
    use proptest::prelude::*;

    use super::*;

    fn feature(id: usize, feature_type: &str, distance: f64) -> OsmFeature {
        OsmFeature {
            feature_id: id.to_string(),
            feature_type: feature_type.to_string(),
            tags: BTreeMap::new(),
            coordinates: GeoPoint::new(0.0, 0.0),
            distance_from_center: distance,
            area: None,
        }
    }

    fn sorted(mut features: Vec<OsmFeature>) -> Vec<OsmFeature> {
        features.sort_by(|a, b| a.distance_from_center.total_cmp(&b.distance_from_center));
        features
    }

    #[test]
    fn small_inputs_are_returned_unchanged() {
        let features = vec![feature(1, "natural:water", 1.0), feature(2, "natural:water", 2.0)];
        assert_eq!(select_features(features.clone(), 20), features);
    }

    #[test]
    fn twenty_five_features_of_five_types() {
        let types = [
            "natural:water",
            "landuse:forest",
            "natural:wood",
            "water:pond",
            "waterway:stream",
        ];
        // The four far types only appear beyond the 20 closest features.
        let features: Vec<OsmFeature> = (0..25)
            .map(|i| {
                let feature_type = if i < 21 { types[0] } else { types[i - 20] };
                feature(i, feature_type, i as f64 * 10.0)
            })
            .collect();

        let selected = select_features(features, 20);

        assert_eq!(selected.len(), 20);
        let present: BTreeSet<&str> = selected.iter().map(|f| f.feature_type.as_str()).collect();
        assert_eq!(present.len(), 5);
        assert!(
            selected
                .windows(2)
                .all(|w| w[0].distance_from_center <= w[1].distance_from_center)
        );
        assert_eq!(selected[0].feature_id, "0");
        assert_eq!(selected[15].feature_id, "15");
        assert_eq!(selected[16].feature_id, "21");
    }

    #[test]
    fn more_types_than_slots_keeps_closest_types() {
        let features: Vec<OsmFeature> = (0..5)
            .map(|i| feature(i, &format!("natural:t{i}"), i as f64))
            .collect();
        let ids: Vec<String> = select_features(features, 3)
            .into_iter()
            .map(|f| f.feature_id)
            .collect();
        assert_eq!(ids, ["0", "1", "2"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let features = vec![
            feature(1, "a:x", 5.0),
            feature(2, "a:x", 5.0),
            feature(3, "b:x", 5.0),
            feature(4, "a:x", 5.0),
        ];
        let ids: Vec<String> = select_features(features, 3)
            .into_iter()
            .map(|f| f.feature_id)
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    fn feature_set() -> impl Strategy<Value = Vec<OsmFeature>> {
        prop::collection::vec((0usize..8, 0u32..1000), 0..60).prop_map(|raw| {
            sorted(
                raw.into_iter()
                    .enumerate()
                    .map(|(i, (t, d))| feature(i, &format!("cat:type{t}"), f64::from(d)))
                    .collect(),
            )
        })
    }

    proptest! {
        #[test]
        fn every_type_survives_when_cap_allows(features in feature_set(), extra in 0usize..20) {
            let types: BTreeSet<String> = features.iter().map(|f| f.feature_type.clone()).collect();
            let cap = types.len() + extra;
            let selected = select_features(features.clone(), cap);

            prop_assert_eq!(selected.len(), features.len().min(cap));
            let kept: BTreeSet<String> = selected.iter().map(|f| f.feature_type.clone()).collect();
            prop_assert_eq!(kept, types);
            prop_assert!(selected.windows(2).all(|w| w[0].distance_from_center <= w[1].distance_from_center));
        }

        #[test]
        fn never_exceeds_cap(features in feature_set(), cap in 0usize..30) {
            prop_assert!(select_features(features, cap).len() <= cap);
        }
    }
}
