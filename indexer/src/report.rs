use docsim_core::{DocMeta, FoundTerm, Hit, Projection, SimilarityPair, SimilaritySummary, VectorStore};

fn rule(c: char) -> String {
    std::iter::repeat(c).take(80).collect()
}

pub fn banner(title: &str) {
    println!("{}", rule('='));
    println!("{title}");
    println!("{}", rule('='));
}

pub fn print_top_terms(meta: &DocMeta, terms: &[(&str, f64)]) {
    println!("\n{} ({}/{}):", meta.filename, meta.topic, meta.subtopic);
    for (rank, (term, weight)) in terms.iter().enumerate() {
        println!("  {}. {}: {:.4}", rank + 1, term, weight);
    }
}

pub fn print_summary(summary: &SimilaritySummary, pairs: &[SimilarityPair], store: &VectorStore<DocMeta>, top: usize) {
    banner("TEXT SIMILARITY ANALYSIS");
    println!("\nDocuments by Topic:");
    println!("{}", rule('-'));
    for (topic, files) in &summary.topics {
        println!("{topic}: {} documents", files.len());
        println!("  {}", files.join(", "));
    }

    println!("\nTop {top} Most Similar Document Pairs:");
    println!("{}", rule('-'));
    for pair in pairs.iter().take(top) {
        let (Some(a), Some(b)) = (store.get(pair.doc_a), store.get(pair.doc_b)) else { continue };
        let (a, b) = (&a.metadata, &b.metadata);
        let mark = if a.topic == b.topic { '✓' } else { '✗' };
        println!("{:.2}% {mark} | {} ({}/{})", pair.score * 100.0, a.filename, a.topic, a.subtopic);
        println!("           {} ({}/{})", b.filename, b.topic, b.subtopic);
    }

    println!("\nAverage Similarity Within Topics:");
    println!("{}", rule('-'));
    for avg in &summary.within_topic {
        println!("{}: {:.2}% ({} pairs)", avg.key, avg.average * 100.0, avg.pairs);
    }
    println!("\nAverage Similarity Across Topics:");
    println!("{}", rule('-'));
    for avg in &summary.across_topics {
        println!("{}: {:.2}% ({} pairs)", avg.key, avg.average * 100.0, avg.pairs);
    }
}

pub fn print_projection(tokens: &[String], projection: &Projection) {
    println!("Stemmed text: \"{}\"", tokens.join(" "));
    println!("Total terms: {}", projection.total_tokens);
    println!("Known terms found: {}", projection.found.len());
    if projection.found.is_empty() {
        println!("\nNo known terms found in the corpus vocabulary.");
    } else {
        let mut found: Vec<&FoundTerm> = projection.found.iter().collect();
        found.sort_by(|a, b| b.tfidf.total_cmp(&a.tfidf));
        println!("\nFound terms with TF-IDF weights:");
        for t in found.iter().take(10) {
            println!("  - {}: TF={}, IDF={:.4}, TF-IDF={:.4}", t.term, t.tf, t.idf, t.tfidf);
        }
    }
    if !projection.oov.is_empty() {
        println!("Out-of-vocabulary: {}", projection.oov.join(", "));
    }
}

pub fn print_hits(hits: &[Hit<'_, DocMeta>]) {
    println!("\nTop {} most similar documents:\n", hits.len());
    println!("{}", rule('-'));
    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. [{:.2}%] {}", rank + 1, hit.score * 100.0, hit.metadata.filename);
        println!("   Topic: {} / {}", hit.metadata.topic, hit.metadata.subtopic);
    }
}
