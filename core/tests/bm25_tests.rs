use hybrid_core::tokenizer::{LanguageVariant, Tokenizer};
use hybrid_core::{bm25_search, create_bm25, Bm25Index, Bm25Params, Error};

fn docs(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

fn english_index(texts: &[&str]) -> Bm25Index {
    create_bm25(docs(texts), "english", Bm25Params::default(), None).unwrap()
}

#[test]
fn statistics_match_the_corpus() {
    let index = english_index(&["rust systems programming", "learning rust", "python scripting"]);
    assert_eq!(index.doc_count(), 3);
    assert_eq!(index.doc_lengths(), &[3, 2, 2]);
    let mean = index.doc_lengths().iter().sum::<u32>() as f64 / 3.0;
    assert!((index.avg_doc_length() - mean).abs() < 1e-12);
    assert_eq!(index.document_frequency("rust"), 2);
    assert_eq!(index.term_frequency(1, "rust"), 1);
}

#[test]
fn scores_follow_the_bm25_formula() {
    let index = english_index(&["rust systems programming", "learning rust", "python scripting"]);
    let (k1, b) = (1.5_f64, 0.75_f64);
    let n = 3.0_f64;
    let df = 2.0_f64;
    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
    let avg = 7.0 / 3.0;
    let expected = |len: f64| idf * (k1 + 1.0) / (1.0 + k1 * (1.0 - b + b * len / avg));

    let hits = index.search("rust", 3).unwrap();
    assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![1, 0, 2]);
    assert!((hits[0].score - expected(2.0)).abs() < 1e-12);
    assert!((hits[1].score - expected(3.0)).abs() < 1e-12);
    assert_eq!(hits[2].score, 0.0);
}

#[test]
fn unknown_terms_score_zero_everywhere() {
    let index = english_index(&["alpha beta", "gamma delta", "epsilon"]);
    let hits = index.search("zeta omega", 3).unwrap();
    assert!(hits.iter().all(|h| h.score == 0.0));
    // ties keep corpus order
    assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn known_terms_never_score_negative() {
    // "common" is in every document, which is where plain BM25 idf turns negative
    let index = english_index(&["common apple", "common banana", "common cherry", "common"]);
    for doc_id in 0..index.doc_count() {
        assert!(index.score("common apple", doc_id) >= 0.0);
    }
}

#[test]
fn equal_scores_break_ties_by_doc_id() {
    let index = english_index(&["vector search", "lexical search", "vector search", "vector search"]);
    let hits = index.search("vector", 4).unwrap();
    assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![0, 2, 3, 1]);
}

#[test]
fn top_k_is_bounded_by_the_corpus() {
    let index = english_index(&["one doc", "two docs"]);
    assert_eq!(index.search("doc", 10).unwrap().len(), 2);
    assert_eq!(index.search("doc", 1).unwrap().len(), 1);
}

#[test]
fn invalid_inputs_are_rejected() {
    let index = english_index(&["something"]);
    assert!(matches!(index.search("something", 0), Err(Error::InvalidInput(_))));
    assert!(matches!(
        create_bm25(Vec::new(), "english", Bm25Params::default(), None),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        create_bm25(docs(&["x"]), "german", Bm25Params::default(), None),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        create_bm25(docs(&["x"]), "en", Bm25Params { k1: 1.2, b: 1.5 }, None),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn zero_saturation_is_rejected() {
    // k1 = 0 would divide zero by zero for documents lacking a query term
    let corpus = docs(&["rust code", "go code", "python"]);
    let params = Bm25Params { k1: 0.0, b: 0.75 };
    assert!(matches!(create_bm25(corpus, "en", params, None), Err(Error::InvalidInput(_))));
    assert!(Bm25Params { k1: -1.0, b: 0.75 }.validate().is_err());
}

#[test]
fn small_saturation_keeps_scores_finite_and_ordered() {
    let corpus = docs(&["rust code", "go code", "python"]);
    let index = create_bm25(corpus, "en", Bm25Params { k1: 1e-6, b: 0.75 }, None).unwrap();
    let hits = index.search("rust", 3).unwrap();
    assert_eq!(hits[0].doc_id, 0);
    assert!(hits.iter().all(|h| h.score.is_finite() && h.score >= 0.0));
    assert_eq!(hits[1].score, 0.0);
    assert_eq!(hits[1].doc_id, 1);
}

#[test]
fn chinese_index_matches_segmented_words() {
    let index = create_bm25(
        docs(&["北京是中国的首都", "上海是一个大城市", "清华大学在北京"]),
        "cn",
        Bm25Params::default(),
        None,
    )
    .unwrap();
    assert_eq!(index.language(), LanguageVariant::Chinese);
    let hits = index.search("北京", 3).unwrap();
    let mut top: Vec<usize> = hits[..2].iter().map(|h| h.doc_id).collect();
    top.sort();
    assert_eq!(top, vec![0, 2]);
    assert!(hits[0].score > 0.0 && hits[1].score > 0.0);
    assert_eq!(hits[2].doc_id, 1);
    assert_eq!(hits[2].score, 0.0);
}

#[test]
fn mixed_index_finds_latin_words_inside_chinese_text() {
    let index = create_bm25(
        docs(&["我喜欢Rust编程", "Python is popular for scripting", "今天天气很好"]),
        "mixed",
        Bm25Params::default(),
        None,
    )
    .unwrap();
    let hits = index.search("Rust", 1).unwrap();
    assert_eq!(hits[0].doc_id, 0);
    assert!(hits[0].score > 0.0);
}

#[test]
fn custom_stopwords_are_honoured_by_the_factory() {
    let stopwords = vec!["rust".to_string()];
    let index = create_bm25(docs(&["rust code", "go code"]), "en", Bm25Params::default(), Some(stopwords.as_slice())).unwrap();
    assert_eq!(index.document_frequency("rust"), 0);
    assert!(index.search("rust", 2).unwrap().iter().all(|h| h.score == 0.0));
}

#[test]
fn one_shot_search_returns_text() {
    let corpus = docs(&["cats purr", "dogs bark"]);
    let hits = bm25_search(&corpus, "dogs", "english", 1, Bm25Params::default()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, 1);
    assert_eq!(hits[0].2, "dogs bark");
}

#[test]
fn index_is_shareable_across_threads() {
    let index = Bm25Index::new(
        docs(&["parallel readers", "single writer"]),
        Tokenizer::new(LanguageVariant::English),
        Bm25Params::default(),
    )
    .unwrap();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| index.search("readers", 1).unwrap()[0].doc_id)).collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 0);
        }
    });
}
