//! Map OpenStreetMap features near a biosample to EnvO terms.
//!
//! Per biosample: [`extract_features`] reads the stored OSM summary,
//! [`select_features`] bounds it, [`MappingEngine`] asks the reasoning
//! collaborator for one validated mapping per feature, and [`reconcile`]
//! groups the accepted mappings and computes statistics.

#![deny(unsafe_code)]

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod features;
pub mod pipeline;
pub mod prompt;
pub mod reasoning;
pub mod select;

pub use aggregate::{Reconciled, accept_mappings, reconcile};
pub use config::{DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL, NormalizerConfig, ReasoningConfig};
pub use engine::{MappingEngine, MappingFailure};
pub use error::{ReasoningError, Result};
pub use extract::{
    DecisionExtractor, ExtractError, JsonDecisionExtractor, MappingDecision, extract_json_object,
};
pub use features::{PRIMARY_CATEGORIES, extract_features};
pub use pipeline::{NormalizeMetadata, NormalizeOutput, NormalizeRun, Normalizer, SampleReport};
pub use prompt::{SYSTEM_PROMPT, build_prompt, describe_feature};
pub use reasoning::{OpenAiCompatibleClient, ReasoningCollaborator};
pub use select::select_features;
