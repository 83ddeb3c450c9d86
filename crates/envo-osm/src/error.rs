//! Error types for OpenStreetMap feature queries.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the tag taxonomy or querying Overpass.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OsmError {
    /// Request could not be sent or the connection failed.
    #[error("network error: {0}")]
    Network(String),

    /// Overpass answered with a non-success status.
    #[error("overpass API error ({status}): {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON document.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// A result element carried neither `center` nor `lat`/`lon`.
    #[error("no coordinates found in element {id}")]
    MissingCoordinates { id: String },

    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid feature taxonomy {path}: {message}")]
    InvalidTaxonomy { path: PathBuf, message: String },
}

impl OsmError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Status { .. } | Self::JsonParse(_)
        )
    }
}

impl From<reqwest::Error> for OsmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for OsmError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse(err.to_string())
    }
}

/// Result type alias for OSM operations.
pub type Result<T> = std::result::Result<T, OsmError>;
