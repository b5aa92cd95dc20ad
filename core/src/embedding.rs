//! Dense embedding capability.
//!
//! The model itself is external. Callers depend on [`Embedder`]; the
//! [`CachedEmbedder`] handle loads the model on first use and memoizes the
//! vector of every text it has embedded.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::index::DocMeta;
use crate::store::{magnitude, VectorStore};

pub trait Embedder {
    /// Fixed-dimension, L2-normalized embedding of `text`.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Produces the model behind a [`CachedEmbedder`].
pub trait ModelLoader {
    type Model: Embedder;

    fn load(&self) -> Result<Self::Model>;
}

pub struct CachedEmbedder<L: ModelLoader> {
    loader: L,
    model: Mutex<Option<Arc<L::Model>>>,
    memo: Mutex<HashMap<String, Vec<f32>>>,
}

impl<L: ModelLoader> CachedEmbedder<L> {
    pub fn new(loader: L) -> Self {
        Self { loader, model: Mutex::new(None), memo: Mutex::new(HashMap::new()) }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.lock().is_some()
    }

    /// Loads at most once; a failed load is retried on the next call.
    fn model(&self) -> Result<Arc<L::Model>> {
        let mut slot = self.model.lock();
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }
        tracing::info!("loading embedding model");
        let model = Arc::new(self.loader.load().context("loading embedding model")?);
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }
}

impl<L: ModelLoader> Embedder for CachedEmbedder<L> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.memo.lock().get(text) {
            return Ok(hit.clone());
        }
        let vector = self.model()?.embed(text)?;
        self.memo.lock().insert(text.to_string(), vector.clone());
        Ok(vector)
    }
}

/// Embed every document and collect the vectors into a dense store whose
/// ids follow the iteration order. Nothing is stored if any embedding fails
/// or the model returns vectors of differing dimension.
pub fn embed_corpus<'a, E, I>(embedder: &E, documents: I) -> Result<VectorStore<DocMeta>>
where
    E: Embedder + ?Sized,
    I: IntoIterator<Item = (&'a str, DocMeta)>,
{
    let mut items = Vec::new();
    for (text, meta) in documents {
        let vector = embedder
            .embed(text)
            .with_context(|| format!("embedding {}", meta.filename))?;
        let norm = magnitude(&vector);
        if (norm - 1.0).abs() > 1e-3 {
            tracing::warn!(document = %meta.filename, norm, "embedding is not unit length");
        }
        items.push((vector, meta));
    }
    let mut store = VectorStore::new();
    store.insert_all(items)?;
    tracing::info!(documents = store.len(), dimension = ?store.dimension(), "embeddings stored");
    Ok(store)
}
