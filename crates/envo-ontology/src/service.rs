//! Ontology access used by the mapping engine.

use async_trait::async_trait;
use envo_model::{EnvoLookupResult, TextAnnotationResult};

use crate::error::Result;

/// Default number of results returned by [`OntologyLookupService::search`].
pub const DEFAULT_SEARCH_RESULTS: usize = 5;

/// Term lookup, free-text search and text annotation against an ontology.
///
/// Implementations own any caching. An `Err` means the service itself
/// failed; an unknown id is reported through
/// [`EnvoLookupResult::not_found`].
#[async_trait]
pub trait OntologyLookupService: Send + Sync {
    /// Canonical information for `term_id`. A lower-case prefix is accepted.
    async fn lookup(&self, term_id: &str) -> Result<EnvoLookupResult>;

    /// Recognised term mentions in `text`, with coverage.
    async fn annotate(&self, text: &str) -> Result<TextAnnotationResult>;

    /// Up to `max_results` non-obsolete terms matching `query`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EnvoLookupResult>>;
}
