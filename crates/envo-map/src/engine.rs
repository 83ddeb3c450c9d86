//! Per-feature mapping: context gathering, reasoning, validation.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use envo_model::{
    AssertedTerm, ENVO_PREFIX, EnvoLookupResult, EnvoMapping, OsmFeature, TargetField, TermId,
    TextAnnotationResult,
};
use envo_ontology::OntologyLookupService;
use tracing::{debug, warn};

use crate::config::NormalizerConfig;
use crate::extract::{DecisionExtractor, JsonDecisionExtractor, MappingDecision};
use crate::prompt::{PromptContext, SYSTEM_PROMPT, build_prompt, describe_feature, suggestion_query};
use crate::reasoning::ReasoningCollaborator;

/// Why a feature produced no mapping.
#[derive(Debug, thiserror::Error)]
pub enum MappingFailure {
    #[error("{call} timed out after {timeout:?}")]
    Timeout {
        call: &'static str,
        timeout: Duration,
    },

    #[error("reasoning call failed: {0}")]
    Reasoning(#[from] crate::error::ReasoningError),

    #[error("ontology call failed: {0}")]
    Ontology(#[from] envo_ontology::OntologyError),

    #[error("could not read decision: {0}")]
    Extract(#[from] crate::extract::ExtractError),

    #[error("suggested id {id} is not a valid EnvO id")]
    MalformedId { id: String },

    #[error("suggested id {id} is not in the ontology")]
    UnknownTerm { id: String },

    #[error("suggested id {id} is obsolete")]
    ObsoleteTerm { id: String },

    #[error("decision rejected: {0}")]
    Invalid(#[from] envo_model::ModelError),
}

/// Maps one feature at a time through the ontology and reasoning collaborators.
pub struct MappingEngine {
    ontology: Arc<dyn OntologyLookupService>,
    reasoner: Arc<dyn ReasoningCollaborator>,
    extractor: Box<dyn DecisionExtractor>,
    call_timeout: Duration,
    search_results: usize,
}

impl MappingEngine {
    pub fn new(
        ontology: Arc<dyn OntologyLookupService>,
        reasoner: Arc<dyn ReasoningCollaborator>,
        config: &NormalizerConfig,
    ) -> Self {
        Self {
            ontology,
            reasoner,
            extractor: Box::new(JsonDecisionExtractor),
            call_timeout: config.call_timeout,
            search_results: config.search_results,
        }
    }

    /// Replace the default JSON extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn DecisionExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Map `feature` to a validated EnvO term, or `None`.
    ///
    /// Failures of any kind are logged and reported as `None`.
    pub async fn map_feature(
        &self,
        feature: &OsmFeature,
        asserted: &BTreeMap<TargetField, AssertedTerm>,
    ) -> Option<EnvoMapping> {
        match self.try_map_feature(feature, asserted).await {
            Ok(mapping) => {
                debug!(
                    feature_id = %feature.feature_id,
                    envo_id = %mapping.envo_id,
                    confidence = mapping.confidence,
                    "Mapped feature"
                );
                Some(mapping)
            }
            Err(e) => {
                warn!(
                    feature_id = %feature.feature_id,
                    feature_type = %feature.feature_type,
                    error = %e,
                    "No mapping produced for feature"
                );
                None
            }
        }
    }

    /// Map `feature`, reporting why no mapping was produced.
    pub async fn try_map_feature(
        &self,
        feature: &OsmFeature,
        asserted: &BTreeMap<TargetField, AssertedTerm>,
    ) -> Result<EnvoMapping, MappingFailure> {
        let description = describe_feature(feature);
        let annotation = self.annotate(&description).await;

        let suggestion = match suggestion_query(feature) {
            Some(query) => {
                let terms = self.search(query.query).await;
                Some((query, terms))
            }
            None => None,
        };

        let prompt = build_prompt(&PromptContext {
            description,
            asserted: Some(asserted),
            annotation: Some(annotation),
            suggestion,
        });

        let response = self
            .timed("reasoning", self.reasoner.complete(SYSTEM_PROMPT, &prompt))
            .await??;
        let decision = self.extractor.extract(&response)?;
        let term = self.validate_term(&decision.envo_id).await?;

        let mapping = to_mapping(decision, &term, feature)?;
        mapping.validate()?;
        Ok(mapping)
    }

    async fn annotate(&self, text: &str) -> TextAnnotationResult {
        self.timed("annotate", self.ontology.annotate(text))
            .await
            .and_then(|result| result.map_err(MappingFailure::from))
            .unwrap_or_else(|e| {
                warn!(error = %e, "Annotation failed");
                TextAnnotationResult::empty(text)
            })
    }

    async fn search(&self, query: &str) -> Vec<EnvoLookupResult> {
        self.timed("search", self.ontology.search(query, self.search_results))
            .await
            .and_then(|result| result.map_err(MappingFailure::from))
            .unwrap_or_else(|e| {
                warn!(query, error = %e, "Term search failed");
                Vec::new()
            })
    }

    /// Look up a suggested id; only known, non-obsolete terms pass.
    async fn validate_term(&self, raw_id: &str) -> Result<EnvoLookupResult, MappingFailure> {
        let id = TermId::parse(raw_id)
            .ok()
            .filter(|id| id.has_prefix(ENVO_PREFIX))
            .ok_or_else(|| MappingFailure::MalformedId {
                id: raw_id.to_string(),
            })?;
        let term = self
            .timed("lookup", self.ontology.lookup(&id.to_string()))
            .await??;

        match term {
            term if term.is_usable() => Ok(term),
            term if term.is_obsolete && !term.is_not_found() => {
                Err(MappingFailure::ObsoleteTerm { id: id.to_string() })
            }
            _ => Err(MappingFailure::UnknownTerm { id: id.to_string() }),
        }
    }

    async fn timed<F, T>(&self, call: &'static str, future: F) -> Result<T, MappingFailure>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.call_timeout, future)
            .await
            .map_err(|_| MappingFailure::Timeout {
                call,
                timeout: self.call_timeout,
            })
    }
}

/// Combine a decision with its validated term and the source feature.
///
/// The canonical label replaces the model's label. An unrecognised field
/// name leaves the mapping without a target field.
fn to_mapping(
    decision: MappingDecision,
    term: &EnvoLookupResult,
    feature: &OsmFeature,
) -> Result<EnvoMapping, MappingFailure> {
    let envo_id = TermId::parse(&term.id).map_err(|_| MappingFailure::MalformedId {
        id: term.id.clone(),
    })?;
    let target_field = decision.nmdc_field.as_deref().and_then(|raw| {
        raw.parse::<TargetField>()
            .inspect_err(|_| debug!(field = raw, "Ignoring unknown target field"))
            .ok()
    });

    Ok(EnvoMapping {
        envo_id,
        envo_label: term.label.clone(),
        confidence: decision.confidence,
        reasoning: decision.reasoning,
        feature_id: feature.feature_id.clone(),
        feature_type: feature.feature_type.clone(),
        distance: feature.distance_from_center,
        target_field,
        target_field_confidence: decision.nmdc_field_confidence,
    })
}
