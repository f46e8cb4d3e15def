use hybrid_core::tokenizer::{LanguageVariant, Tokenizer};
use hybrid_core::{Bm25Index, Bm25Params, Error};
use std::io::Write;

fn english() -> Tokenizer {
    Tokenizer::new(LanguageVariant::English)
}

#[test]
fn it_normalizes_and_stems() {
    let words = english().tokenize("The quick brown foxes are running!");
    assert_eq!(words, vec!["quick", "brown", "fox", "run"]);
}

#[test]
fn it_folds_full_width_letters() {
    let words = english().tokenize("ＲＡＧ　ｓｙｓｔｅｍｓ");
    assert_eq!(words, vec!["rag", "system"]);
}

#[test]
fn it_filters_stopwords() {
    let words = english().tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"lazi".to_string()) || words.contains(&"lazy".to_string()));
}

#[test]
fn chinese_segments_for_search() {
    let words = Tokenizer::new(LanguageVariant::Chinese).tokenize("我来到北京清华大学");
    assert!(words.contains(&"北京".to_string()));
    assert!(words.contains(&"清华大学".to_string()));
    assert!(words.contains(&"大学".to_string()));
    assert!(!words.contains(&"我".to_string()));
}

#[test]
fn mixed_routes_english_text_to_the_stemmer() {
    let mixed = Tokenizer::new(LanguageVariant::Mixed);
    assert_eq!(mixed.tokenize("BM25 ranking functions"), vec!["bm25", "rank", "function"]);
}

#[test]
fn mixed_chinese_lowercases_latin_and_drops_whitespace() {
    let mixed = Tokenizer::new(LanguageVariant::Mixed);
    let words = mixed.tokenize("我喜欢 Rust 编程");
    assert!(words.contains(&"rust".to_string()));
    assert!(words.contains(&"喜欢".to_string()));
    assert!(!words.contains(&"我".to_string()));
    assert!(words.iter().all(|w| !w.chars().any(char::is_whitespace)));
}

#[test]
fn empty_and_punctuation_only_inputs_yield_nothing() {
    for variant in [
        LanguageVariant::English,
        LanguageVariant::Chinese,
        LanguageVariant::Mixed,
        LanguageVariant::MixedChinese,
    ] {
        let t = Tokenizer::new(variant);
        assert!(t.tokenize("").is_empty(), "{variant}");
        assert!(t.tokenize("!!! ??? @@@ ...").is_empty(), "{variant}");
    }
}

#[test]
fn tokenization_is_deterministic() {
    let text = "混合檢索 hybrid retrieval 結合 BM25 與向量搜尋。";
    for variant in [LanguageVariant::English, LanguageVariant::Chinese, LanguageVariant::Mixed] {
        let t = Tokenizer::new(variant);
        assert_eq!(t.tokenize(text), t.tokenize(text));
    }
}

#[test]
fn custom_stopwords_replace_the_defaults() {
    let t = Tokenizer::with_stopwords(LanguageVariant::English, ["quick"]);
    assert_eq!(t.tokenize("the quick fox"), vec!["the", "fox"]);
}

#[test]
fn unknown_variant_name_is_rejected() {
    assert!(matches!(Tokenizer::from_name("french"), Err(Error::InvalidInput(_))));
    assert_eq!(Tokenizer::from_name("CN").unwrap().variant(), LanguageVariant::Chinese);
}

#[test]
fn custom_dictionary_drives_segmentation() {
    let mut dict = tempfile::NamedTempFile::new().unwrap();
    writeln!(dict, "檢索系統 1000 n").unwrap();
    writeln!(dict, "混合 500 v").unwrap();
    dict.flush().unwrap();

    let t = Tokenizer::new(LanguageVariant::Chinese).with_dictionary(dict.path()).unwrap();
    assert!(t.has_custom_dictionary());
    assert!(t.tokenize("混合檢索系統").contains(&"檢索系統".to_string()));

    let index = Bm25Index::new(vec!["混合檢索系統".to_string(), "其他文件".to_string()], t, Bm25Params::default())
        .unwrap();
    assert_eq!(index.term_frequency(0, "檢索系統"), 1);
    let hits = index.search("檢索系統", 1).unwrap();
    assert_eq!(hits[0].doc_id, 0);
}

#[test]
fn missing_dictionary_file_is_an_io_error() {
    let err = Tokenizer::new(LanguageVariant::Chinese)
        .with_dictionary("/nonexistent/dict.txt.big")
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
