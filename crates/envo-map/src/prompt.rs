//! Prompt text sent to the reasoning collaborator.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use envo_model::{AssertedTerm, EnvoLookupResult, OsmFeature, TargetField, TextAnnotationResult};

pub const SYSTEM_PROMPT: &str = "\
You are an expert in environmental ontology helping to map geographical features \
from OpenStreetMap to standardized Environment Ontology (EnvO) terms for NMDC biosamples.

Determine the most appropriate EnvO term for each feature, considering its feature type, \
its OSM tags, its distance from the sample, any EnvO terms found in its description and \
the biosample's existing EnvO terms.

Only use terms that exist in EnvO. Give a confidence between 0.0 and 1.0, explain your \
reasoning, and say which NMDC field (env_broad_scale, env_local_scale, env_medium) the term \
fits. For features far from the sample (>500m), reduce confidence unless they are likely \
to have broad environmental impact.";

/// Keyword search used to suggest candidate terms for a feature family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionQuery {
    pub heading: &'static str,
    pub query: &'static str,
}

/// Candidate-term search for water, forest and land-use features.
pub fn suggestion_query(feature: &OsmFeature) -> Option<SuggestionQuery> {
    let has_tag = |key: &str| feature.tags.contains_key(key);
    if feature.feature_type.starts_with("natural:water") || has_tag("water") {
        Some(SuggestionQuery {
            heading: "water body",
            query: "water body",
        })
    } else if feature.feature_type.starts_with("natural:forest") || has_tag("forest") {
        Some(SuggestionQuery {
            heading: "forest",
            query: "forest",
        })
    } else if feature.feature_type.starts_with("landuse:") || has_tag("landuse") {
        Some(SuggestionQuery {
            heading: "land use",
            query: "land use",
        })
    } else {
        None
    }
}

/// Short description of a feature, also used as annotation input.
pub fn describe_feature(feature: &OsmFeature) -> String {
    let tags = feature
        .tags
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "OSM Feature Type: {}\nDistance from sample: {:.1} meters\nTags: {tags}\n",
        feature.feature_type, feature.distance_from_center
    )
}

/// Everything gathered about a feature before asking for a decision.
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    pub description: String,
    pub asserted: Option<&'a BTreeMap<TargetField, AssertedTerm>>,
    pub annotation: Option<TextAnnotationResult>,
    pub suggestion: Option<(SuggestionQuery, Vec<EnvoLookupResult>)>,
}

pub fn build_prompt(context: &PromptContext<'_>) -> String {
    let mut prompt = String::from(
        "Analyze this OpenStreetMap feature and map it to the most appropriate EnvO term:\n\n",
    );
    let _ = writeln!(prompt, "Feature Description:\n{}", context.description);

    if let Some(asserted) = context.asserted.filter(|terms| !terms.is_empty()) {
        prompt.push_str("Existing biosample environment terms:\n");
        for (field, term) in asserted {
            let _ = writeln!(prompt, "- {field}: {} ({})", term.id, term.name);
        }
        prompt.push('\n');
    }

    if let Some(annotation) = context.annotation.as_ref().filter(|a| !a.matches.is_empty()) {
        prompt.push_str("EnvO terms found in description:\n");
        for m in &annotation.matches {
            let _ = writeln!(prompt, "- {} ({}): '{}'", m.id, m.label, m.matched);
        }
        prompt.push('\n');
    }

    if let Some((query, terms)) = context.suggestion.as_ref().filter(|(_, t)| !t.is_empty()) {
        let _ = writeln!(prompt, "Suggested {} terms:", query.heading);
        for term in terms {
            let _ = writeln!(prompt, "- {} ({})", term.id, term.label);
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "Determine the most appropriate EnvO term for this feature and the NMDC field it fits.\n\n\
         Target fields:\n",
    );
    for field in TargetField::ALL {
        let _ = writeln!(prompt, "- {field}: {}", field.description());
    }
    prompt.push_str(
        "\nRespond with one JSON object:\n\
         {\n  \"envo_id\": \"ENVO:XXXXXXXX\",\n  \"envo_label\": \"term name\",\n  \
         \"confidence\": 0.95,\n  \"reasoning\": \"explanation\",\n  \
         \"nmdc_field\": \"env_local_scale\",\n  \"nmdc_field_confidence\": 0.85\n}\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use envo_model::GeoPoint;

    use super::*;

    fn feature(feature_type: &str, tags: &[(&str, &str)]) -> OsmFeature {
        OsmFeature {
            feature_id: "1".to_string(),
            feature_type: feature_type.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            coordinates: GeoPoint::new(0.0, 0.0),
            distance_from_center: 42.0,
            area: None,
        }
    }

    #[test]
    fn suggestion_families() {
        let water = feature("natural:water", &[("natural", "water")]);
        assert_eq!(suggestion_query(&water).unwrap().query, "water body");

        let reservoir = feature("landuse:reservoir", &[("landuse", "reservoir"), ("water", "reservoir")]);
        assert_eq!(suggestion_query(&reservoir).unwrap().query, "water body");

        let farm = feature("landuse:farmland", &[("landuse", "farmland")]);
        assert_eq!(suggestion_query(&farm).unwrap().query, "land use");

        let rock = feature("natural:bare_rock", &[("natural", "bare_rock")]);
        assert_eq!(suggestion_query(&rock), None);
    }

    #[test]
    fn prompt_includes_context_sections() {
        let asserted = BTreeMap::from([(
            TargetField::EnvMedium,
            AssertedTerm {
                id: "ENVO:00002006".to_string(),
                name: "water".to_string(),
            },
        )]);
        let pond = feature("water:pond", &[("water", "pond")]);
        let context = PromptContext {
            description: describe_feature(&pond),
            asserted: Some(&asserted),
            annotation: None,
            suggestion: Some((
                suggestion_query(&pond).unwrap(),
                vec![EnvoLookupResult {
                    id: "ENVO:00000033".to_string(),
                    label: "pond".to_string(),
                    is_obsolete: false,
                    definition: None,
                }],
            )),
        };

        let prompt = build_prompt(&context);
        assert!(prompt.contains("OSM Feature Type: water:pond"));
        assert!(prompt.contains("Tags: water=pond"));
        assert!(prompt.contains("- env_medium: ENVO:00002006 (water)"));
        assert!(prompt.contains("Suggested water body terms:\n- ENVO:00000033 (pond)"));
        assert!(!prompt.contains("found in description"));
        assert!(prompt.contains("\"nmdc_field_confidence\""));
    }
}
