use crate::csv::{self, Record};
use crate::similarity::SimilarityPair;
use crate::store::VectorStore;
use crate::vocabulary::{Term, Vocabulary};
use crate::{DocId, DocMeta, Document, Error, TermId};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const STORE_FORMAT_VERSION: u32 = 1;

/// Per-document raw term frequencies, ascending by term id.
pub type TermFrequencies = Vec<(TermId, u32)>;

/// Layout of the TF-IDF data directory.
pub struct TfidfPaths {
    pub root: PathBuf,
}

impl TfidfPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn document_index(&self) -> PathBuf { self.root.join("document_index.csv") }
    pub fn term_index(&self) -> PathBuf { self.root.join("term_index.csv") }
    pub fn tf_sparse(&self) -> PathBuf { self.root.join("tf_sparse.csv") }
    pub fn tf_report(&self) -> PathBuf { self.root.join("tf.csv") }
    pub fn idf_report(&self) -> PathBuf { self.root.join("idf.csv") }
}

/// Layout of a persisted vector store.
pub struct StorePaths {
    pub root: PathBuf,
}

impl StorePaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn records(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreMeta {
    pub dimension: Option<usize>,
    pub count: usize,
    pub created_at: String,
    pub version: u32,
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(f))
}

fn read_text(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(buf)
}

fn source_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

/// Parse every data row of a CSV table (header skipped, blank lines
/// ignored). Rows failing `parse` are logged and skipped.
fn parse_rows<T>(path: &Path, text: &str, mut parse: impl FnMut(&Record) -> Result<T, String>) -> Vec<T> {
    let name = source_name(path);
    let mut out = Vec::new();
    for record in csv::records(text).skip(1).filter(|r| !r.is_blank()) {
        match parse(&record) {
            Ok(row) => out.push(row),
            Err(reason) => {
                tracing::warn!(error = %Error::malformed(name.as_str(), record.line, reason), "skipping row");
            }
        }
    }
    out
}

fn expect_fields(record: &Record, n: usize) -> Result<(), String> {
    if record.fields.len() != n {
        return Err(format!("expected {n} fields, found {}", record.fields.len()));
    }
    Ok(())
}

fn field<T: std::str::FromStr>(record: &Record, idx: usize, name: &str) -> Result<T, String> {
    let raw = record.fields[idx].trim();
    raw.parse().map_err(|_| format!("invalid {name} '{raw}'"))
}

pub fn save_document_index(paths: &TfidfPaths, docs: &[Document]) -> Result<()> {
    let mut w = create_writer(&paths.document_index())?;
    csv::write_record(&mut w, ["document_id", "document", "topic", "subtopic"])?;
    for doc in docs {
        let id = doc.id.to_string();
        csv::write_record(&mut w, [id.as_str(), doc.meta.filename.as_str(), doc.meta.topic.as_str(), doc.meta.subtopic.as_str()])?;
    }
    w.flush()?;
    Ok(())
}

/// Documents ordered by id.
pub fn load_document_index(paths: &TfidfPaths) -> Result<Vec<(DocId, DocMeta)>> {
    let path = paths.document_index();
    let text = read_text(&path)?;
    let mut docs = parse_rows(&path, &text, |r| {
        expect_fields(r, 4)?;
        let id: DocId = field(r, 0, "document_id")?;
        Ok((id, DocMeta::new(r.fields[1].as_str(), r.fields[2].as_str(), r.fields[3].as_str())))
    });
    docs.sort_by_key(|(id, _)| *id);
    Ok(docs)
}

pub fn save_term_index(paths: &TfidfPaths, vocabulary: &Vocabulary) -> Result<()> {
    let mut w = create_writer(&paths.term_index())?;
    csv::write_record(&mut w, ["term_id", "term", "idf_weight", "collection_frequency"])?;
    for t in vocabulary.terms() {
        csv::write_record(&mut w, [
            t.id.to_string(),
            t.surface.clone(),
            format!("{:.6}", t.weight),
            t.document_frequency.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Load the frozen vocabulary. A missing term index is
/// [`Error::MissingVocabulary`]; rows whose id lies outside the table's row
/// count are skipped as malformed.
pub fn load_term_index(paths: &TfidfPaths, num_docs: u32) -> Result<Vocabulary> {
    let path = paths.term_index();
    if !path.is_file() {
        return Err(Error::MissingVocabulary(path).into());
    }
    let text = read_text(&path)?;
    // term ids must fall within [0, rows)
    let rows = csv::records(&text).skip(1).filter(|r| !r.is_blank()).count();
    let terms = parse_rows(&path, &text, |r| {
        expect_fields(r, 4)?;
        let id: TermId = field(r, 0, "term_id")?;
        if id as usize >= rows {
            return Err(format!("term_id {id} outside [0, {rows})"));
        }
        let surface = r.fields[1].clone();
        if surface.is_empty() {
            return Err("empty term".into());
        }
        let weight: f64 = field(r, 2, "idf_weight")?;
        if !weight.is_finite() {
            return Err(format!("non-finite idf_weight {weight}"));
        }
        Ok(Term { id, surface, weight, document_frequency: field(r, 3, "collection_frequency")? })
    });
    let vocabulary = Vocabulary::from_terms(terms, num_docs)?;
    tracing::debug!(terms = vocabulary.len(), path = %path.display(), "loaded term index");
    Ok(vocabulary)
}

/// Load the vocabulary, taking the corpus size from the document index when
/// one is present.
pub fn load_vocabulary(paths: &TfidfPaths) -> Result<Vocabulary> {
    let num_docs = if paths.document_index().is_file() {
        load_document_index(paths)?.len() as u32
    } else {
        0
    };
    load_term_index(paths, num_docs)
}

pub fn save_tf_sparse(paths: &TfidfPaths, rows: &[(DocId, TermFrequencies)]) -> Result<()> {
    let mut w = create_writer(&paths.tf_sparse())?;
    csv::write_record(&mut w, ["document_id", "term_id", "frequency"])?;
    for (doc_id, counts) in rows {
        for (term_id, tf) in counts.iter().filter(|(_, tf)| *tf > 0) {
            csv::write_record(&mut w, [doc_id.to_string(), term_id.to_string(), tf.to_string()])?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Nonzero term frequencies per document. Documents without a row are
/// absent from the map.
pub fn load_tf_sparse(paths: &TfidfPaths) -> Result<HashMap<DocId, TermFrequencies>> {
    let path = paths.tf_sparse();
    let text = read_text(&path)?;
    let rows = parse_rows(&path, &text, |r| {
        expect_fields(r, 3)?;
        let doc: DocId = field(r, 0, "document_id")?;
        let term: TermId = field(r, 1, "term_id")?;
        let tf: u32 = field(r, 2, "frequency")?;
        Ok((doc, term, tf))
    });
    let mut out: HashMap<DocId, TermFrequencies> = HashMap::new();
    for (doc, term, tf) in rows.into_iter().filter(|r| r.2 > 0) {
        out.entry(doc).or_default().push((term, tf));
    }
    for counts in out.values_mut() {
        counts.sort_unstable_by_key(|(id, _)| *id);
    }
    Ok(out)
}

/// Dense term-frequency matrix for inspection: one row per document, one
/// column per term in id order.
pub fn save_tf_report(paths: &TfidfPaths, docs: &[Document], counts: &[TermFrequencies], vocabulary: &Vocabulary) -> Result<()> {
    let mut w = create_writer(&paths.tf_report())?;
    let header = ["document", "topic", "subtopic"]
        .into_iter()
        .map(str::to_string)
        .chain(vocabulary.terms().iter().map(|t| t.surface.clone()));
    csv::write_record(&mut w, header)?;
    for (doc, doc_counts) in docs.iter().zip(counts) {
        let by_id: HashMap<TermId, u32> = doc_counts.iter().copied().collect();
        let row = [doc.meta.filename.clone(), doc.meta.topic.clone(), doc.meta.subtopic.clone()]
            .into_iter()
            .chain(vocabulary.terms().iter().map(|t| by_id.get(&t.id).copied().unwrap_or(0).to_string()));
        csv::write_record(&mut w, row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn save_idf_report(paths: &TfidfPaths, vocabulary: &Vocabulary) -> Result<()> {
    let mut w = create_writer(&paths.idf_report())?;
    csv::write_record(&mut w, ["term", "idf_weight", "collection_frequency"])?;
    for t in vocabulary.terms() {
        csv::write_record(&mut w, [t.surface.clone(), format!("{:.6}", t.weight), t.document_frequency.to_string()])?;
    }
    w.flush()?;
    Ok(())
}

pub fn save_store(paths: &StorePaths, store: &VectorStore<DocMeta>) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.records())?;
    let bytes = bincode::serialize(store)?;
    f.write_all(&bytes)?;
    let meta = StoreMeta {
        dimension: store.dimension(),
        count: store.len(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: STORE_FORMAT_VERSION,
    };
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(&meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_store_meta(paths: &StorePaths) -> Result<StoreMeta> {
    let buf = read_text(&paths.meta())?;
    let meta: StoreMeta = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn load_store(paths: &StorePaths) -> Result<VectorStore<DocMeta>> {
    if !paths.records().is_file() {
        bail!("vector store not found at {}", paths.root.display());
    }
    let mut f = File::open(paths.records())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let store: VectorStore<DocMeta> = bincode::deserialize(&buf)
        .with_context(|| format!("decoding {}", paths.records().display()))?;
    match load_store_meta(paths) {
        Ok(meta) if meta.count != store.len() || meta.dimension != store.dimension() => {
            tracing::warn!(meta_count = meta.count, count = store.len(), "store meta does not match its records");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "store meta unreadable"),
    }
    Ok(store)
}

/// Export stored vectors with their metadata. Vector columns are named
/// `{column_prefix}{i}`, e.g. `dim_0` for embeddings or `term_0` for TF-IDF.
pub fn write_vectors(path: &Path, store: &VectorStore<DocMeta>, column_prefix: &str) -> Result<()> {
    let mut w = create_writer(path)?;
    let dimension = store.dimension().unwrap_or(0);
    let header = ["filename", "topic", "subtopic"]
        .into_iter()
        .map(str::to_string)
        .chain((0..dimension).map(|i| format!("{column_prefix}{i}")));
    csv::write_record(&mut w, header)?;
    for r in store.list_all() {
        let row = [r.metadata.filename.clone(), r.metadata.topic.clone(), r.metadata.subtopic.clone()]
            .into_iter()
            .chain(r.vector.iter().map(|v| v.to_string()));
        csv::write_record(&mut w, row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_embeddings(path: &Path, store: &VectorStore<DocMeta>) -> Result<()> {
    write_vectors(path, store, "dim_")
}

/// Read an embeddings export into a dense store. Ids follow row order;
/// malformed rows are skipped, non-finite components become 0.
pub fn load_embeddings(path: &Path) -> Result<VectorStore<DocMeta>> {
    let text = read_text(path)?;
    let Some(header) = csv::records(&text).next() else {
        bail!("{} is empty", path.display());
    };
    if header.fields.len() < 3 || header.fields[0] != "filename" {
        bail!("{} does not start with a filename,topic,subtopic header", path.display());
    }
    let width = header.fields.len();
    let dimension = width - 3;
    let rows = parse_rows(path, &text, |r| {
        expect_fields(r, width)?;
        let mut vector = Vec::with_capacity(dimension);
        for idx in 3..width {
            let v: f32 = field(r, idx, "component")?;
            if v.is_finite() {
                vector.push(v);
            } else {
                tracing::warn!(line = r.line, dimension = idx - 3, "non-finite component replaced with 0");
                vector.push(0.0);
            }
        }
        Ok((vector, DocMeta::new(r.fields[0].as_str(), r.fields[1].as_str(), r.fields[2].as_str())))
    });
    let mut store = VectorStore::with_dimension(dimension);
    store.insert_all(rows)?;
    Ok(store)
}

/// Write the ranked pair list with both documents' metadata.
pub fn write_similarity_report(path: &Path, pairs: &[SimilarityPair], store: &VectorStore<DocMeta>) -> Result<()> {
    let mut w = create_writer(path)?;
    csv::write_record(&mut w, [
        "document1_filename", "document1_topic", "document1_subtopic",
        "document2_filename", "document2_topic", "document2_subtopic",
        "similarity_score", "same_topic",
    ])?;
    let mut written = 0usize;
    for pair in pairs {
        let (Some(a), Some(b)) = (store.get(pair.doc_a), store.get(pair.doc_b)) else {
            tracing::warn!(doc_a = pair.doc_a, doc_b = pair.doc_b, "pair references unknown document");
            continue;
        };
        let (a, b) = (&a.metadata, &b.metadata);
        let score = format!("{:.6}", pair.score);
        csv::write_record(&mut w, [
            a.filename.as_str(), a.topic.as_str(), a.subtopic.as_str(),
            b.filename.as_str(), b.topic.as_str(), b.subtopic.as_str(),
            score.as_str(),
            if a.topic == b.topic { "true" } else { "false" },
        ])?;
        written += 1;
    }
    w.flush()?;
    tracing::info!(pairs = written, path = %path.display(), "similarity report written");
    Ok(())
}
