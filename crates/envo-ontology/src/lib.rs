//! Environment Ontology access.
//!
//! [`OntologyLookupService`] is the seam the mapping engine talks to.
//! [`LexicalIndex`] implements it over a local term table.

#![deny(unsafe_code)]

pub mod annotation;
pub mod error;
pub mod lexical;
pub mod service;
pub mod terms;

pub use annotation::{
    MIN_ANNOTATION_LEN, annotation_coverage, filter_annotations, is_whole_word_match,
};
pub use error::{OntologyError, Result};
pub use lexical::LexicalIndex;
pub use service::{DEFAULT_SEARCH_RESULTS, OntologyLookupService};
pub use terms::{TermRecord, bundled_terms, load_terms, load_terms_csv, load_terms_json};
