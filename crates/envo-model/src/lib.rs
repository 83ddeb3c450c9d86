#![deny(unsafe_code)]

pub mod biosample;
mod lenient;
pub mod error;
pub mod feature;
pub mod mapping;
pub mod term;

pub use biosample::{
    AssertedTerm, Biosample, EnvField, EnvTerm, LatLon, record_id, value_as_f64,
};
pub use error::{ModelError, Result};
pub use feature::{
    FeatureEntry, GeoPoint, OsmFeature, OsmFeatureSummary, SummaryMetadata, split_feature_type,
};
pub use mapping::{EnvoMapping, MIN_REASONING_LEN, MappingStats, MappingsByField, TargetField};
pub use term::{
    AnnotationMatch, ENVO_PREFIX, EnvoLookupResult, NOT_FOUND_LABEL, TermId,
    TextAnnotationResult, agreement_key,
};
