use std::path::PathBuf;

use thiserror::Error;

use crate::index::DocId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("vocabulary not found at {0}: build the TF-IDF data first")]
    MissingVocabulary(PathBuf),
    #[error("dimension mismatch: store holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("malformed record in {source_name} at line {line}: {reason}")]
    MalformedRecord { source_name: String, line: usize, reason: String },
    #[error("no vector for document {0}")]
    NoVectorForId(DocId),
    #[error("invalid vocabulary: {0}")]
    InvalidVocabulary(String),
}

impl Error {
    pub fn malformed(source_name: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord { source_name: source_name.into(), line, reason: reason.into() }
    }
}
