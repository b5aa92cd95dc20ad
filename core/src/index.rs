use serde::{Deserialize, Serialize};

pub type TermId = u32;
pub type DocId = u32;

/// Caller-supplied document metadata, carried opaquely through the stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub filename: String,
    pub topic: String,
    pub subtopic: String,
}

impl DocMeta {
    pub fn new(filename: impl Into<String>, topic: impl Into<String>, subtopic: impl Into<String>) -> Self {
        Self { filename: filename.into(), topic: topic.into(), subtopic: subtopic.into() }
    }
}

/// A tokenized corpus document. `id` follows corpus iteration order.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub tokens: Vec<String>,
    pub meta: DocMeta,
}

impl Document {
    pub fn new(id: DocId, tokens: Vec<String>, meta: DocMeta) -> Self {
        Self { id, tokens, meta }
    }
}
