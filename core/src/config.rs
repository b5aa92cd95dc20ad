//! Vocabulary build configuration.
//!
//! Everything here affects reproducibility of term ids and weights, so it is
//! a value passed to the builder rather than a set of constants.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Corpus-level token filtering applied before terms enter the vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermFilter {
    /// Terms shorter than this (in chars) are dropped unless allow-listed.
    pub min_length: usize,
    pub allow_short: Vec<String>,
    /// Drop tokens made only of ASCII digits.
    pub drop_numeric: bool,
}

impl Default for TermFilter {
    fn default() -> Self {
        Self { min_length: 2, allow_short: vec!["i".into(), "a".into()], drop_numeric: true }
    }
}

impl TermFilter {
    pub fn retain(&self, term: &str) -> bool {
        if term.is_empty() {
            return false;
        }
        if self.drop_numeric && term.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        term.chars().count() >= self.min_length || self.allow_short.iter().any(|w| w == term)
    }
}

/// Inverse-document-frequency formula. Every variant is monotonically
/// non-increasing in `df` for a fixed corpus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfScheme {
    /// `ln(1 + (N - df + 0.5) / (df + 0.5))`
    #[default]
    Bm25,
    /// `ln(1 + N / df)`
    Smoothed,
    /// `ln(N / df)`, exactly 0 for terms present in every document.
    Classic,
}

impl IdfScheme {
    pub fn weight(self, num_docs: u32, df: u32) -> f64 {
        let n = num_docs as f64;
        // df clamped into [1, N]
        let df = (df.max(1) as f64).min(n.max(1.0));
        match self {
            IdfScheme::Bm25 => (1.0 + (n - df + 0.5) / (df + 0.5)).ln(),
            IdfScheme::Smoothed => (1.0 + n / df).ln(),
            IdfScheme::Classic => (n.max(1.0) / df).ln(),
        }
    }
}

impl std::str::FromStr for IdfScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bm25" => Ok(IdfScheme::Bm25),
            "smoothed" => Ok(IdfScheme::Smoothed),
            "classic" => Ok(IdfScheme::Classic),
            other => bail!("unknown idf scheme '{other}' (expected bm25, smoothed or classic)"),
        }
    }
}

/// BM25 term-frequency saturation (`k1`) and length normalization (`b`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 2.0, b: 0.75 }
    }
}

impl Bm25Params {
    /// BM25 weight of a term occurring `tf` times in a document of `doc_len`
    /// tokens, given the corpus average length and the term's idf.
    pub fn term_weight(&self, tf: u32, doc_len: usize, avg_len: f64, idf: f64) -> f64 {
        if tf == 0 {
            return 0.0;
        }
        let tf = tf as f64;
        let len_ratio = if avg_len > 0.0 { doc_len as f64 / avg_len } else { 1.0 };
        let denom = tf + self.k1 * (1.0 - self.b + self.b * len_ratio);
        idf * tf * (self.k1 + 1.0) / denom
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub filter: TermFilter,
    pub idf: IdfScheme,
    pub bm25: Bm25Params,
}

impl VocabularyConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: VocabularyConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.bm25.b) {
            bail!("bm25.b must lie in [0, 1], got {}", self.bm25.b);
        }
        if self.bm25.k1 < 0.0 {
            bail!("bm25.k1 must be non-negative, got {}", self.bm25.k1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_drops_short_and_numeric() {
        let f = TermFilter::default();
        assert!(f.retain("cat"));
        assert!(f.retain("a"));
        assert!(!f.retain("x"));
        assert!(!f.retain("2024"));
        assert!(f.retain("h2o"));
    }

    #[test]
    fn idf_is_monotone_in_df() {
        for scheme in [IdfScheme::Bm25, IdfScheme::Smoothed, IdfScheme::Classic] {
            let weights: Vec<f64> = (1..=10).map(|df| scheme.weight(10, df)).collect();
            assert!(weights.windows(2).all(|w| w[0] >= w[1]), "{scheme:?}: {weights:?}");
        }
    }

    #[test]
    fn classic_idf_vanishes_for_ubiquitous_terms() {
        assert_eq!(IdfScheme::Classic.weight(5, 5), 0.0);
        assert!(IdfScheme::Bm25.weight(5, 5) < IdfScheme::Bm25.weight(5, 1));
    }

    #[test]
    fn bm25_saturates_with_tf() {
        let p = Bm25Params::default();
        let w1 = p.term_weight(1, 10, 10.0, 1.0);
        let w10 = p.term_weight(10, 10, 10.0, 1.0);
        assert!(w10 > w1);
        assert!(w10 < p.k1 + 1.0);
    }

    #[test]
    fn config_parses_partial_json() {
        let cfg: VocabularyConfig = serde_json::from_str(r#"{"idf":"classic","bm25":{"k1":1.2}}"#).unwrap();
        assert_eq!(cfg.idf, IdfScheme::Classic);
        assert_eq!(cfg.bm25.k1, 1.2);
        assert_eq!(cfg.bm25.b, 0.75);
        assert_eq!(cfg.filter, TermFilter::default());
    }

    #[test]
    fn rejects_out_of_range_b() {
        let mut cfg = VocabularyConfig::default();
        cfg.bm25.b = 1.5;
        assert!(cfg.validate().is_err());
    }
}
