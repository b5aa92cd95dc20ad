//! Complete pairwise similarity over a vector store.
//!
//! Each stored document is queried once against the whole store; every
//! result whose id is not greater than the query's is dropped, which removes
//! the self pair and the pairs already emitted from the other side.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::index::{DocId, DocMeta};
use crate::store::VectorStore;

/// Where the per-document query vectors come from.
#[derive(Debug, Clone)]
pub enum VectorSource {
    /// Vectors keyed by document id, e.g. reloaded from a persisted store.
    ById(HashMap<DocId, Vec<f32>>),
    /// Vectors in document id order, e.g. still in memory after ingestion.
    ByIndex(Vec<Vec<f32>>),
}

impl VectorSource {
    pub fn from_store<M>(store: &VectorStore<M>) -> Self {
        VectorSource::ById(store.list_all().iter().map(|r| (r.id, r.vector.clone())).collect())
    }

    pub fn vector(&self, id: DocId) -> Option<&[f32]> {
        match self {
            VectorSource::ById(map) => map.get(&id).map(Vec::as_slice),
            VectorSource::ByIndex(vectors) => vectors.get(id as usize).map(Vec::as_slice),
        }
    }
}

/// A canonical unordered document pair: `doc_a < doc_b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityPair {
    pub doc_a: DocId,
    pub doc_b: DocId,
    pub score: f64,
}

/// Every unordered pair of distinct stored documents, best score first.
/// Equal scores keep scan order: ascending `doc_a`, then ascending `doc_b`.
///
/// A document with no vector in `source` is skipped with a warning.
pub fn pairwise_similarities<M>(store: &VectorStore<M>, source: &VectorSource) -> Result<Vec<SimilarityPair>> {
    let n = store.len();
    let mut pairs = Vec::with_capacity(n.saturating_sub(1) * n / 2);
    for i in 0..n as DocId {
        let Some(vector) = source.vector(i) else {
            tracing::warn!(error = %Error::NoVectorForId(i), "skipping document");
            continue;
        };
        for hit in store.query(vector, n)? {
            if hit.id <= i {
                continue;
            }
            pairs.push(SimilarityPair { doc_a: i, doc_b: hit.id, score: hit.score });
        }
    }
    pairs.sort_by(|a, b| b.score.total_cmp(&a.score));
    tracing::debug!(documents = n, pairs = pairs.len(), "pairwise similarities computed");
    Ok(pairs)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicAverage {
    /// A topic name, or two topic names joined by `-` in sorted order.
    pub key: String,
    pub average: f64,
    pub pairs: usize,
}

/// Topic-level view of a pair list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimilaritySummary {
    /// Filenames grouped by topic.
    pub topics: BTreeMap<String, Vec<String>>,
    pub within_topic: Vec<TopicAverage>,
    pub across_topics: Vec<TopicAverage>,
}

impl SimilaritySummary {
    pub fn compute(pairs: &[SimilarityPair], store: &VectorStore<DocMeta>) -> Self {
        let mut topics: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for record in store.list_all() {
            topics.entry(record.metadata.topic.clone()).or_default().push(record.metadata.filename.clone());
        }

        let mut within: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut across: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for pair in pairs {
            let (Some(a), Some(b)) = (store.get(pair.doc_a), store.get(pair.doc_b)) else { continue };
            let (ta, tb) = (&a.metadata.topic, &b.metadata.topic);
            let slot = if ta == tb {
                within.entry(ta.clone()).or_default()
            } else {
                let key = if ta < tb { format!("{ta}-{tb}") } else { format!("{tb}-{ta}") };
                across.entry(key).or_default()
            };
            slot.0 += pair.score;
            slot.1 += 1;
        }
        let averages = |m: BTreeMap<String, (f64, usize)>| -> Vec<TopicAverage> {
            m.into_iter()
                .map(|(key, (sum, count))| TopicAverage { key, average: sum / count as f64, pairs: count })
                .collect()
        };
        Self { topics, within_topic: averages(within), across_topics: averages(across) }
    }
}
