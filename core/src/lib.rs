//! Document similarity over two vector spaces: a frozen TF-IDF vocabulary
//! built in-house and dense embeddings produced by an external model.

pub mod config;
pub mod csv;
pub mod embedding;
pub mod error;
pub mod index;
pub mod persist;
pub mod similarity;
pub mod store;
pub mod tokenizer;
pub mod vectorizer;
pub mod vocabulary;

pub use config::{Bm25Params, IdfScheme, TermFilter, VocabularyConfig};
pub use error::{Error, Result};
pub use index::{DocId, DocMeta, Document, TermId};
pub use similarity::{pairwise_similarities, SimilarityPair, SimilaritySummary, VectorSource};
pub use store::{cosine_similarity, Hit, VectorRecord, VectorStore};
pub use vectorizer::{vectorize, FoundTerm, Projection, SparseVector};
pub use vocabulary::{Term, Vocabulary, VocabularyBuilder};
