//! Character-range language detection used to route tokenization.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CJK: Regex = Regex::new(r"[\x{4E00}-\x{9FFF}]").expect("valid regex");
    static ref ENGLISH_WORD: Regex = Regex::new(r"\b[a-zA-Z]+\b").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
}

/// Classify a whole document: Chinese only when CJK ideographs outnumber
/// English words more than two to one.
pub fn detect_language(text: &str) -> Language {
    let chinese_chars = CJK.find_iter(text).count();
    let english_words = ENGLISH_WORD.find_iter(text).count();
    if chinese_chars > english_words * 2 {
        Language::Chinese
    } else {
        Language::English
    }
}

/// Classify a fragment for tokenizer routing. A single ideograph is enough,
/// the Chinese segmenter copes with embedded Latin text.
pub fn detect_fragment_language(text: &str) -> Language {
    if CJK.is_match(text) {
        Language::Chinese
    } else {
        Language::English
    }
}
