use docsim_core::{
    cosine_similarity, pairwise_similarities, vectorize, IdfScheme, SimilaritySummary, DocMeta, VectorSource,
    VectorStore, Vocabulary, VocabularyBuilder, VocabularyConfig,
};

fn toks(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn corpus() -> Vec<Vec<String>> {
    vec![toks(&["cat", "dog", "cat"]), toks(&["dog", "bird"])]
}

fn build(config: VocabularyConfig) -> Vocabulary {
    VocabularyBuilder::new(config).build(corpus())
}

fn store_for(vocab: &Vocabulary, docs: &[Vec<String>]) -> VectorStore<DocMeta> {
    let mut store = VectorStore::with_dimension(vocab.dimension());
    for (i, tokens) in docs.iter().enumerate() {
        let meta = DocMeta::new(format!("doc{i}.md"), "Animals", "Pets");
        store.insert(vectorize(tokens, vocab).vector.into_vec(), meta).unwrap();
    }
    store
}

#[test]
fn shared_term_gets_the_lowest_weight() {
    for scheme in [IdfScheme::Bm25, IdfScheme::Smoothed, IdfScheme::Classic] {
        let vocab = build(VocabularyConfig { idf: scheme, ..Default::default() });
        assert_eq!(vocab.len(), 3);
        let (cat, dog, bird) = (vocab.get("cat").unwrap(), vocab.get("dog").unwrap(), vocab.get("bird").unwrap());
        assert!(dog.weight < cat.weight, "{scheme:?}");
        assert_eq!(cat.weight, bird.weight);
        assert_eq!(dog.id, 2);
    }
}

#[test]
fn two_documents_make_one_partial_pair() {
    let vocab = build(VocabularyConfig::default());
    let store = store_for(&vocab, &corpus());
    let pairs = pairwise_similarities(&store, &VectorSource::from_store(&store)).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].doc_a, pairs[0].doc_b), (0, 1));
    assert!(pairs[0].score > 0.0 && pairs[0].score < 1.0);
}

#[test]
fn out_of_vocabulary_query_scores_zero() {
    let vocab = build(VocabularyConfig::default());
    let store = store_for(&vocab, &corpus());
    let projection = vectorize(&toks(&["elephant"]), &vocab);
    assert!(projection.vector.is_zero());
    assert!(projection.found.is_empty());
    assert_eq!(projection.oov, vec!["elephant".to_string()]);

    let hits = store.query(projection.vector.as_slice(), 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.score == 0.0));
    // ties resolve by ascending id
    assert_eq!(hits[0].id, 0);
}

#[test]
fn vectors_are_unit_length_or_zero() {
    let vocab = build(VocabularyConfig::default());
    for tokens in corpus().iter().chain([toks(&["cat"]), toks(&["zebra"])].iter()) {
        let v = vectorize(tokens, &vocab).vector;
        assert!(v.is_zero() || (v.norm() - 1.0).abs() < 1e-6);
    }
}

#[test]
fn rebuilding_is_deterministic() {
    let a = build(VocabularyConfig::default());
    let b = build(VocabularyConfig::default());
    assert_eq!(a.terms(), b.terms());
}

#[test]
fn idf_never_increases_with_document_frequency() {
    let docs = vec![
        toks(&["common", "rare"]),
        toks(&["common", "mid"]),
        toks(&["common", "mid"]),
        toks(&["common"]),
    ];
    let vocab = VocabularyBuilder::new(VocabularyConfig::default()).build(docs);
    let mut terms: Vec<_> = vocab.terms().to_vec();
    terms.sort_by_key(|t| t.document_frequency);
    for w in terms.windows(2) {
        if w[0].document_frequency < w[1].document_frequency {
            assert!(w[0].weight >= w[1].weight);
        }
    }
}

#[test]
fn stored_vector_finds_itself_first() {
    let docs = vec![toks(&["cat", "cat"]), toks(&["dog", "fish"]), toks(&["bird", "cat"])];
    let vocab = VocabularyBuilder::new(VocabularyConfig::default()).build(docs.clone());
    let store = store_for(&vocab, &docs);
    for record in store.list_all() {
        let hits = store.query(&record.vector, 1).unwrap();
        assert_eq!(hits[0].id, record.id);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }
}

#[test]
fn every_pair_appears_once_with_its_direct_cosine() {
    let docs = vec![
        toks(&["apple", "banana", "apple"]),
        toks(&["banana", "cherry"]),
        toks(&["cherry", "date", "date"]),
        toks(&["apple", "date"]),
        toks(&["elder"]),
    ];
    let vocab = VocabularyBuilder::new(VocabularyConfig::default()).build(docs.clone());
    let store = store_for(&vocab, &docs);
    let pairs = pairwise_similarities(&store, &VectorSource::from_store(&store)).unwrap();
    assert_eq!(pairs.len(), 5 * 4 / 2);
    for w in pairs.windows(2) {
        assert!(w[0].score >= w[1].score);
    }
    for p in &pairs {
        assert!(p.doc_a < p.doc_b);
        let a = &store.get(p.doc_a).unwrap().vector;
        let b = &store.get(p.doc_b).unwrap().vector;
        assert!((p.score - cosine_similarity(a, b)).abs() < 1e-6);
    }
}

#[test]
fn by_index_source_matches_by_id() {
    let docs = corpus();
    let vocab = build(VocabularyConfig::default());
    let store = store_for(&vocab, &docs);
    let by_index = VectorSource::ByIndex(store.list_all().iter().map(|r| r.vector.clone()).collect());
    let a = pairwise_similarities(&store, &by_index).unwrap();
    let b = pairwise_similarities(&store, &VectorSource::from_store(&store)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn summary_groups_single_topic() {
    let vocab = build(VocabularyConfig::default());
    let store = store_for(&vocab, &corpus());
    let pairs = pairwise_similarities(&store, &VectorSource::from_store(&store)).unwrap();
    let summary = SimilaritySummary::compute(&pairs, &store);
    assert_eq!(summary.topics["Animals"], vec!["doc0.md".to_string(), "doc1.md".to_string()]);
    assert_eq!(summary.within_topic.len(), 1);
    assert_eq!(summary.within_topic[0].pairs, 1);
    assert!(summary.across_topics.is_empty());
}
