use anyhow::{Context, Result};
use docsim_core::DocMeta;
use lazy_static::lazy_static;
use regex::Regex;
use walkdir::WalkDir;

use std::fs;
use std::path::Path;

lazy_static! {
    static ref TOPIC: Regex = Regex::new(r"\*\*Topic:\*\*\s*(.+)").expect("valid regex");
    static ref SUBTOPIC: Regex = Regex::new(r"\*\*Sub-Topic:\*\*\s*(.+)").expect("valid regex");
}

pub struct CorpusDoc {
    pub meta: DocMeta,
    pub content: String,
}

fn capture(re: &Regex, content: &str) -> String {
    re.captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Topic and subtopic from the `**Topic:**` / `**Sub-Topic:**` lines.
pub fn extract_topics(content: &str) -> (String, String) {
    (capture(&TOPIC, content), capture(&SUBTOPIC, content))
}

/// Every markdown file directly inside `dir`, sorted by file name. The
/// position in the returned list is the document id.
pub fn read_corpus(dir: &Path) -> Result<Vec<CorpusDoc>> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("reading corpus directory {}", dir.display()))?;
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }
        let content = fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
        let (topic, subtopic) = extract_topics(&content);
        let filename = entry.file_name().to_string_lossy().into_owned();
        docs.push(CorpusDoc { meta: DocMeta::new(filename, topic, subtopic), content });
    }
    Ok(docs)
}
