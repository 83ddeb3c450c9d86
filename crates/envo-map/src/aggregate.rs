//! Merge accepted mappings per feature type and per target field.

use std::collections::BTreeMap;

use envo_model::{
    AssertedTerm, EnvoMapping, MappingStats, MappingsByField, TargetField, agreement_key,
};

/// Mappings and statistics for one biosample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Accepted mappings keyed by feature type.
    pub by_type: BTreeMap<String, Vec<EnvoMapping>>,
    pub by_field: MappingsByField,
    pub stats: MappingStats,
}

/// Group mappings at or above `threshold` by feature type, keeping order.
pub fn accept_mappings(
    mappings: impl IntoIterator<Item = EnvoMapping>,
    threshold: f64,
) -> BTreeMap<String, Vec<EnvoMapping>> {
    let mut by_type: BTreeMap<String, Vec<EnvoMapping>> = BTreeMap::new();
    for mapping in mappings {
        if mapping.confidence >= threshold {
            by_type
                .entry(mapping.feature_type.clone())
                .or_default()
                .push(mapping);
        }
    }
    by_type
}

/// Regroup accepted mappings by target field and compute statistics.
///
/// Mappings without a target field stay in `by_type` only. Each field list
/// is sorted by descending combined confidence; ties keep their order.
pub fn reconcile(
    by_type: BTreeMap<String, Vec<EnvoMapping>>,
    total_features: usize,
    threshold: f64,
    asserted: &BTreeMap<TargetField, AssertedTerm>,
) -> Reconciled {
    let mut by_field = MappingsByField::default();
    for mapping in by_type.values().flatten() {
        if let Some(field) = mapping.target_field {
            by_field.get_mut(field).push(mapping.clone());
        }
    }
    for field in TargetField::ALL {
        by_field
            .get_mut(field)
            .sort_by(|a, b| b.combined_confidence().total_cmp(&a.combined_confidence()));
    }

    let accepted: usize = by_type.values().map(Vec::len).sum();
    let mapping_coverage = if total_features == 0 {
        0.0
    } else {
        (accepted as f64 / total_features as f64).min(1.0)
    };

    let field_coverage = by_field
        .iter()
        .map(|(field, mappings)| (field, !mappings.is_empty()))
        .collect();
    let agreement_with_asserted = by_field
        .iter()
        .map(|(field, mappings)| (field, agrees(asserted.get(&field), mappings)))
        .collect();

    Reconciled {
        by_type,
        by_field,
        stats: MappingStats {
            total_features_processed: total_features,
            features_with_mappings: accepted,
            mapping_coverage,
            confidence_threshold: threshold,
            field_coverage,
            agreement_with_asserted,
        },
    }
}

/// Whether any mapping's id matches the asserted id after `:` -> `_`.
fn agrees(asserted: Option<&AssertedTerm>, mappings: &[EnvoMapping]) -> bool {
    let Some(asserted) = asserted.filter(|term| !term.id.is_empty()) else {
        return false;
    };
    let expected = agreement_key(&asserted.id);
    mappings
        .iter()
        .any(|mapping| agreement_key(&mapping.envo_id.to_string()) == expected)
}

#[cfg(test)]
mod tests {
    use envo_model::TermId;

    use super::*;

    fn mapping(
        id: &str,
        feature_type: &str,
        confidence: f64,
        field: Option<TargetField>,
        field_confidence: Option<f64>,
    ) -> EnvoMapping {
        EnvoMapping {
            envo_id: TermId::parse(id).unwrap(),
            envo_label: "label".to_string(),
            confidence,
            reasoning: "reasoning for test".to_string(),
            feature_id: "1".to_string(),
            feature_type: feature_type.to_string(),
            distance: 10.0,
            target_field: field,
            target_field_confidence: field_confidence,
        }
    }

    #[test]
    fn field_groups_sort_by_combined_confidence() {
        let by_type = accept_mappings(
            [
                mapping("ENVO:00000020", "natural:water", 0.95, Some(TargetField::EnvMedium), Some(0.7)),
                mapping("ENVO:00002006", "water:pond", 0.9, Some(TargetField::EnvMedium), Some(0.8)),
            ],
            0.7,
        );
        let reconciled = reconcile(by_type, 2, 0.7, &BTreeMap::new());
        let medium = reconciled.by_field.get(TargetField::EnvMedium);
        assert_eq!(medium[0].envo_id.to_string(), "ENVO:00002006");
        assert_eq!(medium[1].envo_id.to_string(), "ENVO:00000020");
    }

    #[test]
    fn agreement_normalizes_separator() {
        let asserted = BTreeMap::from([(
            TargetField::EnvMedium,
            AssertedTerm {
                id: "ENVO_00002006".to_string(),
                name: "ENVO_00002006".to_string(),
            },
        )]);
        let by_type = accept_mappings(
            [mapping("ENVO:00002006", "natural:water", 0.9, Some(TargetField::EnvMedium), Some(0.9))],
            0.7,
        );
        let stats = reconcile(by_type, 1, 0.7, &asserted).stats;
        assert!(stats.agreement_with_asserted[&TargetField::EnvMedium]);
        assert!(!stats.agreement_with_asserted[&TargetField::EnvBroadScale]);
    }

    #[test]
    fn unassigned_mappings_only_appear_by_type() {
        let by_type = accept_mappings(
            [
                mapping("ENVO:00000020", "natural:water", 0.9, None, None),
                mapping("ENVO:00000022", "waterway:river", 0.5, Some(TargetField::EnvLocalScale), Some(0.9)),
            ],
            0.7,
        );
        let reconciled = reconcile(by_type, 4, 0.7, &BTreeMap::new());
        assert_eq!(reconciled.by_type.len(), 1);
        assert_eq!(reconciled.by_field.total(), 0);
        assert_eq!(reconciled.stats.features_with_mappings, 1);
        assert!((reconciled.stats.mapping_coverage - 0.25).abs() < 1e-9);
        assert!(reconciled.stats.field_coverage.values().all(|covered| !covered));
    }

    #[test]
    fn empty_input_has_zero_coverage() {
        let stats = reconcile(BTreeMap::new(), 0, 0.7, &BTreeMap::new()).stats;
        assert_eq!(stats.mapping_coverage, 0.0);
        assert_eq!(stats.field_coverage.len(), 3);
        assert_eq!(stats.agreement_with_asserted.len(), 3);
    }
}
