//! Append-only vector store with exact cosine k-nearest-neighbor queries.
//!
//! One store holds one vector space: its dimension is declared up front or
//! fixed by the first insert. Ids are assigned by the store, starting at 0,
//! and are never reused.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::DocId;

/// Compute the L2 norm of a vector.
pub fn magnitude(v: &[f32]) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
}

/// Cosine similarity of two vectors of equal length.
/// Returns 0.0 when either has zero magnitude. Clamped to [-1.0, 1.0].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    cosine_with_magnitude(a, b, magnitude(a), magnitude(b))
}

fn cosine_with_magnitude(a: &[f32], b: &[f32], mag_a: f64, mag_b: f64) -> f64 {
    let denom = mag_a * mag_b;
    if a.len() != b.len() || denom == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum();
    let score = dot / denom;
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord<M> {
    pub id: DocId,
    pub vector: Vec<f32>,
    pub metadata: M,
    norm: f64,
}

impl<M> VectorRecord<M> {
    pub fn norm(&self) -> f64 { self.norm }
}

/// One ranked query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<'a, M> {
    pub id: DocId,
    pub metadata: &'a M,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStore<M> {
    dimension: Option<usize>,
    records: Vec<VectorRecord<M>>,
}

impl<M> Default for VectorStore<M> {
    fn default() -> Self { Self::new() }
}

impl<M> VectorStore<M> {
    /// A store whose dimension is fixed by the first insert.
    pub fn new() -> Self {
        Self { dimension: None, records: Vec::new() }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension: Some(dimension), records: Vec::new() }
    }

    pub fn dimension(&self) -> Option<usize> { self.dimension }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => Err(Error::DimensionMismatch { expected, actual }),
            _ => Ok(()),
        }
    }

    /// Append a record and return its id.
    pub fn insert(&mut self, vector: Vec<f32>, metadata: M) -> Result<DocId> {
        self.check_dimension(vector.len())?;
        self.dimension = Some(vector.len());
        let id = self.records.len() as DocId;
        let norm = magnitude(&vector);
        self.records.push(VectorRecord { id, vector, metadata, norm });
        Ok(id)
    }

    /// Append a batch. Every vector is checked before the first is stored,
    /// so a mismatch leaves the store as it was.
    pub fn insert_all<I>(&mut self, items: I) -> Result<Vec<DocId>>
    where
        I: IntoIterator<Item = (Vec<f32>, M)>,
    {
        let items: Vec<(Vec<f32>, M)> = items.into_iter().collect();
        let expected = self.dimension.or_else(|| items.first().map(|(v, _)| v.len()));
        if let Some(expected) = expected {
            if let Some((v, _)) = items.iter().find(|(v, _)| v.len() != expected) {
                return Err(Error::DimensionMismatch { expected, actual: v.len() });
            }
        }
        items.into_iter().map(|(v, m)| self.insert(v, m)).collect()
    }

    pub fn get(&self, id: DocId) -> Option<&VectorRecord<M>> {
        self.records.get(id as usize)
    }

    /// Every record in insertion order.
    pub fn list_all(&self) -> &[VectorRecord<M>] {
        &self.records
    }

    /// The `k` records most cosine-similar to `vector`, best first; equal
    /// scores are ordered by ascending id. Asking for more than the store
    /// holds returns every record.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Hit<'_, M>>> {
        self.check_dimension(vector.len())?;
        if self.records.is_empty() {
            return Ok(Vec::new());
        }
        let query_norm = magnitude(vector);
        let mut hits: Vec<Hit<'_, M>> = self
            .records
            .iter()
            .map(|r| Hit {
                id: r.id,
                metadata: &r.metadata,
                score: cosine_with_magnitude(vector, &r.vector, query_norm, r.norm),
            })
            .collect();
        hits.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.id.cmp(&b.id),
            ord => ord,
        });
        hits.truncate(k);
        Ok(hits)
    }
}
