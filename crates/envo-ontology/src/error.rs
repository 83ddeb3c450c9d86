use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum OntologyError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("failed to parse JSON {path}: {message}")]
    Json { path: PathBuf, message: String },

    #[error("unsupported term table format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid term row {row} in {path}: {message}")]
    InvalidTerm {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("failed to build text matcher: {0}")]
    Matcher(String),

    /// The backing service could not answer.
    #[error("ontology service unavailable: {0}")]
    Unavailable(String),
}

impl OntologyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, OntologyError>;
