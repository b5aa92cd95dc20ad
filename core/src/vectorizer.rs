//! Projection of token sequences into a frozen [`Vocabulary`].
//!
//! Document ingestion and ad hoc queries go through the same code: the
//! vocabulary is the only state involved.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::index::TermId;
use crate::vocabulary::Vocabulary;

/// TF-IDF vector stored densely over the vocabulary dimension.
///
/// Its L2 norm is either 1 or, when no token matched the vocabulary, 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    values: Vec<f32>,
}

impl SparseVector {
    /// Scale raw weights to unit length. A zero vector is returned unchanged.
    fn normalized(raw: Vec<f64>) -> Self {
        let norm = raw.iter().map(|v| v * v).sum::<f64>().sqrt();
        let values = if norm > 0.0 {
            raw.into_iter().map(|v| (v / norm) as f32).collect()
        } else {
            raw.into_iter().map(|v| v as f32).collect()
        };
        Self { values }
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub fn as_slice(&self) -> &[f32] { &self.values }

    pub fn into_vec(self) -> Vec<f32> { self.values }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|&v| (v as f64) * (v as f64)).sum::<f64>().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Non-zero components as `(term_id, value)`, ascending by id.
    pub fn nonzero(&self) -> impl Iterator<Item = (TermId, f32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i as TermId, *v))
    }
}

/// A vocabulary term matched while projecting a token sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoundTerm {
    pub term: String,
    pub term_id: TermId,
    pub tf: u32,
    pub idf: f64,
    /// `tf * idf` before normalization.
    pub tfidf: f64,
}

/// Result of projecting one token sequence.
#[derive(Debug, Clone)]
pub struct Projection {
    pub vector: SparseVector,
    /// Matched terms in first-occurrence order.
    pub found: Vec<FoundTerm>,
    /// Distinct out-of-vocabulary tokens in first-occurrence order.
    pub oov: Vec<String>,
    pub total_tokens: usize,
}

/// Raw frequency of each distinct token, in first-occurrence order.
fn count_tokens(tokens: &[String]) -> Vec<(&str, u32)> {
    let mut order: Vec<(&str, u32)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        match position.get(token.as_str()) {
            Some(&pos) => order[pos].1 += 1,
            None => {
                position.insert(token.as_str(), order.len());
                order.push((token.as_str(), 1));
            }
        }
    }
    order
}

/// Project a token sequence into `vocabulary`.
pub fn vectorize(tokens: &[String], vocabulary: &Vocabulary) -> Projection {
    let mut raw = vec![0.0f64; vocabulary.dimension()];
    let mut found = Vec::new();
    let mut oov = Vec::new();
    for (token, tf) in count_tokens(tokens) {
        match vocabulary.get(token) {
            Some(term) => {
                let tfidf = tf as f64 * term.weight;
                raw[term.id as usize] = tfidf;
                found.push(FoundTerm { term: term.surface.clone(), term_id: term.id, tf, idf: term.weight, tfidf });
            }
            None => oov.push(token.to_string()),
        }
    }
    Projection { vector: SparseVector::normalized(raw), found, oov, total_tokens: tokens.len() }
}

/// Raw in-vocabulary term frequencies of a token sequence, ascending by term
/// id, plus the number of out-of-vocabulary tokens.
pub fn term_counts(tokens: &[String], vocabulary: &Vocabulary) -> (Vec<(TermId, u32)>, usize) {
    let mut counts = Vec::new();
    let mut oov = 0usize;
    for (token, tf) in count_tokens(tokens) {
        match vocabulary.get(token) {
            Some(term) => counts.push((term.id, tf)),
            None => oov += tf as usize,
        }
    }
    counts.sort_unstable_by_key(|&(id, _)| id);
    (counts, oov)
}

/// Build a normalized vector from precomputed `(term_id, tf)` counts, as
/// persisted in the sparse term-frequency table. Ids unknown to the
/// vocabulary contribute nothing.
pub fn vectorize_counts(counts: &[(TermId, u32)], vocabulary: &Vocabulary) -> SparseVector {
    let mut raw = vec![0.0f64; vocabulary.dimension()];
    for &(id, tf) in counts {
        match vocabulary.term(id) {
            Some(term) => raw[id as usize] += tf as f64 * term.weight,
            None => tracing::debug!(term_id = id, "term id not in vocabulary"),
        }
    }
    SparseVector::normalized(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VocabularyConfig;
    use crate::vocabulary::VocabularyBuilder;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn vocab() -> Vocabulary {
        VocabularyBuilder::new(VocabularyConfig::default())
            .build(vec![toks(&["cat", "dog", "cat"]), toks(&["dog", "bird"])])
    }

    #[test]
    fn nonzero_vectors_have_unit_norm() {
        let v = vocab();
        for words in [&["cat"][..], &["cat", "dog", "cat"], &["bird", "dog", "dog", "cat"]] {
            let p = vectorize(&toks(words), &v);
            assert!((p.vector.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn out_of_vocabulary_gives_zero_vector() {
        let v = vocab();
        let p = vectorize(&toks(&["elephant", "elephant", "zebra"]), &v);
        assert!(p.vector.is_zero());
        assert_eq!(p.vector.len(), 3);
        assert!(p.found.is_empty());
        assert_eq!(p.oov, vec!["elephant".to_string(), "zebra".to_string()]);
        assert_eq!(p.total_tokens, 3);
    }

    #[test]
    fn reports_tf_and_idf_of_found_terms() {
        let v = vocab();
        let p = vectorize(&toks(&["cat", "elephant", "cat"]), &v);
        assert_eq!(p.found.len(), 1);
        let cat = &p.found[0];
        assert_eq!(cat.tf, 2);
        assert!((cat.tfidf - 2.0 * cat.idf).abs() < 1e-12);
        assert_eq!(p.oov, vec!["elephant".to_string()]);
    }

    #[test]
    fn counts_and_tokens_agree() {
        let v = vocab();
        let tokens = toks(&["dog", "cat", "cat", "fish"]);
        let (counts, oov) = term_counts(&tokens, &v);
        assert_eq!(oov, 1);
        assert_eq!(vectorize_counts(&counts, &v), vectorize(&tokens, &v).vector);
    }

    #[test]
    fn empty_vocabulary_gives_empty_vectors() {
        let v = Vocabulary::default();
        let p = vectorize(&toks(&["cat"]), &v);
        assert!(p.vector.is_empty());
        assert_eq!(p.oov.len(), 1);
    }

    #[test]
    fn nonzero_lists_components_by_id() {
        let v = vocab();
        let p = vectorize(&toks(&["dog", "cat"]), &v);
        let ids: Vec<TermId> = p.vector.nonzero().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
