//! Structured decisions from free-form reasoning responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The decision the reasoning model is asked to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDecision {
    pub envo_id: String,
    #[serde(default)]
    pub envo_label: Option<String>,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub nmdc_field: Option<String>,
    #[serde(default)]
    pub nmdc_field_confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found in response")]
    NoJson,

    #[error("JSON object does not describe a mapping: {0}")]
    InvalidDecision(String),
}

/// Turns a raw response into a [`MappingDecision`].
pub trait DecisionExtractor: Send + Sync {
    fn extract(&self, response: &str) -> Result<MappingDecision, ExtractError>;
}

/// Finds the first JSON object in a response.
///
/// Tries a fenced code block first, then every `{` in order with a balanced,
/// string-aware brace scan. The first span that parses as a JSON object is
/// used.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecisionExtractor;

impl DecisionExtractor for JsonDecisionExtractor {
    fn extract(&self, response: &str) -> Result<MappingDecision, ExtractError> {
        let object = extract_json_object(response).ok_or(ExtractError::NoJson)?;
        serde_json::from_value(object).map_err(|e| ExtractError::InvalidDecision(e.to_string()))
    }
}

/// First well-formed JSON object embedded in `text`.
pub fn extract_json_object(text: &str) -> Option<Value> {
    fenced_block(text)
        .and_then(parse_object)
        .or_else(|| balanced_objects(text).find_map(parse_object))
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate.trim())
        .ok()
        .filter(Value::is_object)
}

/// Body of the first ```` ``` ```` or ```` ```json ```` block.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let body_start = after.find('\n').map_or(0, |nl| {
        let tag = after[..nl].trim();
        if tag.is_empty() || tag.eq_ignore_ascii_case("json") {
            nl + 1
        } else {
            0
        }
    });
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Every balanced `{...}` span, one per opening brace, in order.
fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(move |(start, _)| balanced_end(&text[start..]).map(|end| &text[start..start + end]))
}

/// Byte length of the balanced object starting at `text[0] == '{'`.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECISION: &str = r#"{"envo_id": "ENVO:00000063", "envo_label": "water body", "confidence": 0.9, "reasoning": "Tagged natural=water.", "nmdc_field": "env_local_scale", "nmdc_field_confidence": 0.8}"#;

    #[test]
    fn reads_fenced_block() {
        let response = format!("Here you go:\n```json\n{DECISION}\n```\nDone.");
        let decision = JsonDecisionExtractor.extract(&response).unwrap();
        assert_eq!(decision.envo_id, "ENVO:00000063");
        assert_eq!(decision.nmdc_field.as_deref(), Some("env_local_scale"));
    }

    #[test]
    fn reads_object_embedded_in_prose() {
        let response = format!("I think {{this}} fits best: {DECISION} Hope that helps.");
        let decision = JsonDecisionExtractor.extract(&response).unwrap();
        assert_eq!(decision.confidence, 0.9);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scan() {
        let response = r#"{"envo_id": "ENVO:00000020", "confidence": 0.8, "reasoning": "a } brace in {text}"} trailing }"#;
        let decision = JsonDecisionExtractor.extract(response).unwrap();
        assert_eq!(decision.reasoning, "a } brace in {text}");
        assert_eq!(decision.envo_label, None);
    }

    #[test]
    fn prose_without_json_fails() {
        assert_eq!(
            JsonDecisionExtractor.extract("I could not find a suitable term."),
            Err(ExtractError::NoJson)
        );
    }

    #[test]
    fn object_missing_fields_is_invalid() {
        assert!(matches!(
            JsonDecisionExtractor.extract(r#"{"envo_id": "ENVO:00000020"}"#),
            Err(ExtractError::InvalidDecision(_))
        ));
    }
}
