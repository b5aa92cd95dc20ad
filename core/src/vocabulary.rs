//! Frozen term vocabulary.
//!
//! A [`Vocabulary`] is built once from the whole corpus and never changes
//! afterwards. Term ids are assigned by descending weight with ties broken by
//! ascending surface, so the same corpus and configuration always yield the
//! same dimension for every term.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::{Bm25Params, VocabularyConfig};
use crate::error::{Error, Result};
use crate::index::TermId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub surface: String,
    pub document_frequency: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    /// Sorted by id.
    terms: Vec<Term>,
    lookup: HashMap<String, usize>,
    /// Highest id + 1; dimensions without a term stay zero in every vector.
    dimension: usize,
    num_docs: u32,
}

impl Vocabulary {
    /// Rebuild a vocabulary from persisted terms. Ids must be unique, as must
    /// surfaces; gaps in the id range are tolerated.
    pub fn from_terms(mut terms: Vec<Term>, num_docs: u32) -> Result<Self> {
        terms.sort_by_key(|t| t.id);
        let mut lookup = HashMap::with_capacity(terms.len());
        for (pos, term) in terms.iter().enumerate() {
            if pos > 0 && terms[pos - 1].id == term.id {
                return Err(Error::InvalidVocabulary(format!("duplicate term id {}", term.id)));
            }
            if lookup.insert(term.surface.clone(), pos).is_some() {
                return Err(Error::InvalidVocabulary(format!("duplicate term '{}'", term.surface)));
            }
        }
        let dimension = terms.last().map_or(0, |t| t.id as usize + 1);
        if dimension != terms.len() {
            tracing::warn!(dimension, num_terms = terms.len(), "vocabulary has gaps in its term ids");
        }
        Ok(Self { terms, lookup, dimension, num_docs })
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// Length of every vector projected into this vocabulary.
    pub fn dimension(&self) -> usize { self.dimension }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    pub fn terms(&self) -> &[Term] { &self.terms }

    pub fn get(&self, surface: &str) -> Option<&Term> {
        self.lookup.get(surface).map(|&pos| &self.terms[pos])
    }

    pub fn term(&self, id: TermId) -> Option<&Term> {
        self.terms
            .binary_search_by_key(&id, |t| t.id)
            .ok()
            .map(|pos| &self.terms[pos])
    }

    /// The `k` highest BM25-weighted terms of one document, given its raw
    /// term counts and length in tokens.
    pub fn top_terms(
        &self,
        counts: &[(TermId, u32)],
        doc_len: usize,
        avg_len: f64,
        params: &Bm25Params,
        k: usize,
    ) -> Vec<(&str, f64)> {
        let mut scored: Vec<(&str, f64)> = counts
            .iter()
            .filter_map(|&(id, tf)| {
                let term = self.term(id)?;
                Some((term.surface.as_str(), params.term_weight(tf, doc_len, avg_len, term.weight)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        scored.truncate(k);
        scored
    }
}

/// One-shot builder for a [`Vocabulary`].
pub struct VocabularyBuilder {
    config: VocabularyConfig,
}

impl VocabularyBuilder {
    pub fn new(config: VocabularyConfig) -> Self { Self { config } }

    pub fn config(&self) -> &VocabularyConfig { &self.config }

    /// Build the vocabulary from every document's token sequence. An empty
    /// corpus, or one where no token survives filtering, yields an empty
    /// vocabulary.
    pub fn build<I, D>(&self, documents: I) -> Vocabulary
    where
        I: IntoIterator<Item = D>,
        D: AsRef<[String]>,
    {
        let mut num_docs: u32 = 0;
        let mut df: HashMap<String, u32> = HashMap::new();
        for doc in documents {
            num_docs += 1;
            let mut seen_in_doc: HashSet<&str> = HashSet::new();
            for token in doc.as_ref() {
                if !self.config.filter.retain(token) || !seen_in_doc.insert(token.as_str()) {
                    continue;
                }
                match df.get_mut(token.as_str()) {
                    Some(count) => *count += 1,
                    None => { df.insert(token.clone(), 1); }
                }
            }
        }

        let scheme = self.config.idf;
        let mut ranked: Vec<(String, u32, f64)> = df
            .into_iter()
            .map(|(surface, df_t)| {
                let weight = scheme.weight(num_docs, df_t);
                (surface, df_t, weight)
            })
            .collect();
        ranked.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

        let mut lookup = HashMap::with_capacity(ranked.len());
        let terms: Vec<Term> = ranked
            .into_iter()
            .enumerate()
            .map(|(pos, (surface, document_frequency, weight))| {
                lookup.insert(surface.clone(), pos);
                Term { id: pos as TermId, surface, document_frequency, weight }
            })
            .collect();
        tracing::debug!(num_docs, num_terms = terms.len(), idf = ?scheme, "vocabulary built");
        let dimension = terms.len();
        Vocabulary { terms, lookup, dimension, num_docs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdfScheme;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn sample() -> Vec<Vec<String>> {
        vec![toks(&["cat", "dog", "cat"]), toks(&["dog", "bird"])]
    }

    #[test]
    fn counts_documents_not_occurrences() {
        let vocab = VocabularyBuilder::new(VocabularyConfig::default()).build(sample());
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.num_docs(), 2);
        assert_eq!(vocab.get("cat").unwrap().document_frequency, 1);
        assert_eq!(vocab.get("dog").unwrap().document_frequency, 2);
    }

    #[test]
    fn ids_follow_weight_then_surface() {
        let vocab = VocabularyBuilder::new(VocabularyConfig::default()).build(sample());
        let order: Vec<&str> = vocab.terms().iter().map(|t| t.surface.as_str()).collect();
        assert_eq!(order, vec!["bird", "cat", "dog"]);
        for (i, t) in vocab.terms().iter().enumerate() {
            assert_eq!(t.id as usize, i);
            assert_eq!(vocab.term(t.id), Some(t));
        }
    }

    #[test]
    fn filter_is_applied_before_counting() {
        let docs = vec![toks(&["x", "42", "a", "ok"])];
        let vocab = VocabularyBuilder::new(VocabularyConfig::default()).build(docs);
        let mut surfaces: Vec<&str> = vocab.terms().iter().map(|t| t.surface.as_str()).collect();
        surfaces.sort();
        assert_eq!(surfaces, vec!["a", "ok"]);
    }

    #[test]
    fn empty_corpus_is_valid() {
        let vocab = VocabularyBuilder::new(VocabularyConfig::default()).build(Vec::<Vec<String>>::new());
        assert!(vocab.is_empty());
        assert_eq!(vocab.dimension(), 0);
    }

    #[test]
    fn classic_scheme_zeroes_shared_terms() {
        let cfg = VocabularyConfig { idf: IdfScheme::Classic, ..Default::default() };
        let vocab = VocabularyBuilder::new(cfg).build(sample());
        assert_eq!(vocab.get("dog").unwrap().weight, 0.0);
        assert_eq!(vocab.get("dog").unwrap().id, 2);
    }

    #[test]
    fn from_terms_rejects_duplicates() {
        let t = |id, s: &str| Term { id, surface: s.into(), document_frequency: 1, weight: 1.0 };
        assert!(Vocabulary::from_terms(vec![t(0, "a"), t(0, "b")], 1).is_err());
        assert!(Vocabulary::from_terms(vec![t(0, "a"), t(1, "a")], 1).is_err());
        let vocab = Vocabulary::from_terms(vec![t(2, "c"), t(0, "a")], 1).unwrap();
        assert_eq!(vocab.dimension(), 3);
        assert_eq!(vocab.get("c").unwrap().id, 2);
        assert!(vocab.term(1).is_none());
    }

    #[test]
    fn top_terms_ranks_by_bm25() {
        let vocab = VocabularyBuilder::new(VocabularyConfig::default()).build(sample());
        let cat = vocab.get("cat").unwrap().id;
        let dog = vocab.get("dog").unwrap().id;
        let top = vocab.top_terms(&[(cat, 2), (dog, 1)], 3, 2.5, &Bm25Params::default(), 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0, "cat");
    }
}
