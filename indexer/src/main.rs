mod corpus;
mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docsim_core::persist::{
    load_document_index, load_embeddings, load_store, load_tf_sparse, load_term_index, load_vocabulary,
    save_document_index, save_idf_report, save_store, save_term_index, save_tf_report, save_tf_sparse,
    write_similarity_report, write_vectors, StorePaths, TfidfPaths, TermFrequencies,
};
use docsim_core::tokenizer::tokenize;
use docsim_core::vectorizer::{term_counts, vectorize_counts};
use docsim_core::{
    pairwise_similarities, vectorize, DocId, DocMeta, Document, IdfScheme, SimilaritySummary, VectorSource, VectorStore,
    VocabularyBuilder, VocabularyConfig,
};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docsim")]
#[command(about = "TF-IDF and embedding document similarity", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct VocabularyArgs {
    /// JSON file with a vocabulary configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// IDF formula: bm25, smoothed or classic
    #[arg(long)]
    idf: Option<String>,
    /// BM25 term-frequency saturation
    #[arg(long)]
    k1: Option<f64>,
    /// BM25 length normalization, in [0, 1]
    #[arg(long)]
    b: Option<f64>,
    /// Shortest term kept in the vocabulary
    #[arg(long)]
    min_term_length: Option<usize>,
}

impl VocabularyArgs {
    fn resolve(&self) -> Result<VocabularyConfig> {
        let mut config = match &self.config {
            Some(path) => VocabularyConfig::from_json_file(path)?,
            None => VocabularyConfig::default(),
        };
        if let Some(idf) = &self.idf {
            config.idf = idf.parse::<IdfScheme>()?;
        }
        if let Some(k1) = self.k1 { config.bm25.k1 = k1; }
        if let Some(b) = self.b { config.bm25.b = b; }
        if let Some(len) = self.min_term_length { config.filter.min_length = len; }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vocabulary and term-frequency tables from a markdown corpus
    Tfidf {
        /// Directory of .md documents
        #[arg(long, default_value = "./test_corpus")]
        corpus: PathBuf,
        /// Output directory for the TF-IDF tables
        #[arg(long, default_value = "./tfidf-data")]
        output: PathBuf,
        #[command(flatten)]
        vocabulary: VocabularyArgs,
    },
    /// Build the normalized TF-IDF vector store from the TF-IDF tables
    Vectors {
        #[arg(long, default_value = "./tfidf-data")]
        data: PathBuf,
        /// Output vector store directory
        #[arg(long, default_value = "./tfidf-vector-index")]
        index: PathBuf,
        /// CSV export of the normalized vectors
        #[arg(long, default_value = "tfidf_vectors.csv")]
        export: PathBuf,
    },
    /// Rank every document pair of a vector store by cosine similarity
    Similarity {
        /// Persisted vector store to analyze; receives the imported store
        /// when --embeddings is given
        #[arg(long, default_value = "./vector-index")]
        index: PathBuf,
        /// Analyze dense vectors from an embeddings CSV instead of a store
        #[arg(long)]
        embeddings: Option<PathBuf>,
        #[arg(long, default_value = "similarity_results.csv")]
        output: PathBuf,
        /// Pairs shown in the console summary
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Project free text into the TF-IDF space and list the closest documents
    Query {
        text: String,
        #[arg(long, default_value = "./tfidf-data")]
        data: PathBuf,
        #[arg(long, default_value = "./tfidf-vector-index")]
        index: PathBuf,
        #[arg(short, long, default_value_t = 10)]
        k: usize,
    },
}

fn main() -> Result<()> {
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tfidf { corpus, output, vocabulary } => build_tfidf(&corpus, &output, vocabulary.resolve()?),
        Commands::Vectors { data, index, export } => build_vectors(&data, &index, &export),
        Commands::Similarity { index, embeddings, output, top } => {
            analyze_similarity(&index, embeddings.as_deref(), &output, top)
        }
        Commands::Query { text, data, index, k } => query(&text, &data, &index, k),
    }
}

fn build_tfidf(corpus_dir: &Path, output: &Path, config: VocabularyConfig) -> Result<()> {
    let docs = corpus::read_corpus(corpus_dir)?;
    tracing::info!(documents = docs.len(), corpus = %corpus_dir.display(), "read corpus");

    let documents: Vec<Document> = docs
        .into_iter()
        .enumerate()
        .map(|(i, d)| Document::new(i as DocId, tokenize(&d.content), d.meta))
        .collect();
    let builder = VocabularyBuilder::new(config);
    let vocabulary = builder.build(documents.iter().map(|d| &d.tokens));
    tracing::info!(num_docs = documents.len(), num_terms = vocabulary.len(), "vocabulary frozen");

    let counts: Vec<TermFrequencies> = documents.iter().map(|d| term_counts(&d.tokens, &vocabulary).0).collect();

    let paths = TfidfPaths::new(output);
    save_document_index(&paths, &documents)?;
    save_term_index(&paths, &vocabulary)?;
    let sparse: Vec<(DocId, TermFrequencies)> =
        documents.iter().zip(&counts).map(|(d, c)| (d.id, c.clone())).collect();
    save_tf_sparse(&paths, &sparse)?;
    save_tf_report(&paths, &documents, &counts, &vocabulary)?;
    save_idf_report(&paths, &vocabulary)?;
    tracing::info!(output = %output.display(), "TF-IDF tables written");

    let lengths: Vec<usize> = counts.iter().map(|c| c.iter().map(|&(_, tf)| tf as usize).sum()).collect();
    let avg_len = if lengths.is_empty() { 0.0 } else { lengths.iter().sum::<usize>() as f64 / lengths.len() as f64 };
    report::banner("TOP 10 TERMS PER DOCUMENT");
    for ((doc, c), len) in documents.iter().zip(&counts).zip(&lengths) {
        let top = vocabulary.top_terms(c, *len, avg_len, &builder.config().bm25, 10);
        report::print_top_terms(&doc.meta, &top);
    }
    Ok(())
}

fn build_vectors(data: &Path, index: &Path, export: &Path) -> Result<()> {
    let paths = TfidfPaths::new(data);
    let docs = load_document_index(&paths)?;
    let vocabulary = load_term_index(&paths, docs.len() as u32)?;
    let tf = load_tf_sparse(&paths)?;
    tracing::info!(documents = docs.len(), terms = vocabulary.len(), "loaded TF-IDF tables");

    let mut items = Vec::with_capacity(docs.len());
    for (pos, (doc_id, meta)) in docs.into_iter().enumerate() {
        if doc_id as usize != pos {
            tracing::warn!(doc_id, store_id = pos, "document ids are not contiguous; store ids follow row order");
        }
        let vector = vectorize_counts(tf.get(&doc_id).map(Vec::as_slice).unwrap_or(&[]), &vocabulary);
        if vector.is_zero() {
            tracing::warn!(document = %meta.filename, "zero vector, left unnormalized");
        }
        items.push((vector.into_vec(), meta));
    }
    let mut store = VectorStore::with_dimension(vocabulary.dimension());
    store.insert_all(items)?;

    save_store(&StorePaths::new(index), &store)?;
    write_vectors(export, &store, "term_")?;
    tracing::info!(index = %index.display(), export = %export.display(), vectors = store.len(), "TF-IDF vector store written");

    for r in store.list_all().iter().take(5) {
        tracing::info!(document = %r.metadata.filename, magnitude = r.norm(), "vector magnitude");
    }
    Ok(())
}

/// The vectors to analyze. Imported embeddings are also saved as a store at
/// `index`.
fn load_vectors(index: &Path, embeddings: Option<&Path>) -> Result<(VectorStore<DocMeta>, VectorSource)> {
    match embeddings {
        Some(csv) => {
            let store = load_embeddings(csv).with_context(|| format!("loading embeddings from {}", csv.display()))?;
            save_store(&StorePaths::new(index), &store)?;
            tracing::info!(index = %index.display(), vectors = store.len(), "embedding store written");
            let vectors = store.list_all().iter().map(|r| r.vector.clone()).collect();
            Ok((store, VectorSource::ByIndex(vectors)))
        }
        None => {
            let store = load_store(&StorePaths::new(index))?;
            let source = VectorSource::from_store(&store);
            Ok((store, source))
        }
    }
}

fn analyze_similarity(index: &Path, embeddings: Option<&Path>, output: &Path, top: usize) -> Result<()> {
    let (store, source) = load_vectors(index, embeddings)?;
    tracing::info!(documents = store.len(), dimension = ?store.dimension(), "loaded vectors");

    let pairs = pairwise_similarities(&store, &source)?;
    let summary = SimilaritySummary::compute(&pairs, &store);
    report::print_summary(&summary, &pairs, &store, top);
    write_similarity_report(output, &pairs, &store)
}

fn query(text: &str, data: &Path, index: &Path, k: usize) -> Result<()> {
    let vocabulary = load_vocabulary(&TfidfPaths::new(data))?;
    let store = load_store(&StorePaths::new(index))?;

    report::banner("TF-IDF VECTOR SIMILARITY SEARCH");
    let tokens = tokenize(text);
    let projection = vectorize(&tokens, &vocabulary);
    report::print_projection(&tokens, &projection);

    let hits = store.query(projection.vector.as_slice(), k)?;
    report::print_hits(&hits);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsim_core::persist::write_embeddings;
    use tempfile::tempdir;

    #[test]
    fn imported_embeddings_are_reusable_from_the_index() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("embeddings.csv");
        let index = dir.path().join("vector-index");
        let mut store = VectorStore::new();
        store.insert(vec![1.0, 0.0], DocMeta::new("a.md", "Math", "Algebra")).unwrap();
        store.insert(vec![0.6, 0.8], DocMeta::new("b.md", "Art", "Paint")).unwrap();
        write_embeddings(&csv, &store).unwrap();

        let (imported, _) = load_vectors(&index, Some(&csv)).unwrap();
        assert_eq!(imported.len(), 2);

        let (reloaded, source) = load_vectors(&index, None).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(1).unwrap().metadata.filename, "b.md");
        let pairs = pairwise_similarities(&reloaded, &source).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].score - 0.6).abs() < 1e-6);
    }

    #[test]
    fn missing_index_without_embeddings_fails() {
        let dir = tempdir().unwrap();
        assert!(load_vectors(&dir.path().join("vector-index"), None).is_err());
    }
}
