use crate::error::{Error, Result};
use crate::language::{detect_fragment_language, Language};
use crate::stopwords::{CHINESE_SET, COMBINED_SET, ENGLISH_SET};
use jieba_rs::Jieba;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Everything but ideographs, ASCII alphanumerics and whitespace.
    static ref NON_WORD: Regex = Regex::new(r"[^\x{4E00}-\x{9FA5}a-zA-Z0-9\s]").expect("valid regex");
    /// Everything but ideographs and ASCII letters.
    static ref NON_HAN_OR_LETTER: Regex = Regex::new(r"[^\x{4E00}-\x{9FA5}a-zA-Z]").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref JIEBA: Jieba = Jieba::new();
}

/// The tokenization strategies an index can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageVariant {
    English,
    Chinese,
    /// Routes each call to `English` or `MixedChinese` by detected language.
    Mixed,
    /// Search segmentation followed by English lowercasing and stemming.
    MixedChinese,
}

impl LanguageVariant {
    /// Parse a user-facing selector: `english`/`en`, `chinese`/`cn` or `mixed`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(LanguageVariant::English),
            "chinese" | "cn" => Ok(LanguageVariant::Chinese),
            "mixed" => Ok(LanguageVariant::Mixed),
            other => Err(Error::invalid(format!(
                "unsupported language '{other}', choose 'english/en', 'chinese/cn' or 'mixed'"
            ))),
        }
    }

    /// Tag written into persisted index records.
    pub fn tag(self) -> &'static str {
        match self {
            LanguageVariant::English => "english",
            LanguageVariant::Chinese => "chinese",
            LanguageVariant::Mixed => "mixlanguage",
            LanguageVariant::MixedChinese => "mixedchinese",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "english" => Some(LanguageVariant::English),
            "chinese" => Some(LanguageVariant::Chinese),
            "mixlanguage" => Some(LanguageVariant::Mixed),
            "mixedchinese" => Some(LanguageVariant::MixedChinese),
            _ => None,
        }
    }

    pub fn default_stopwords(self) -> &'static HashSet<String> {
        match self {
            LanguageVariant::English => &*ENGLISH_SET,
            LanguageVariant::Chinese => &*CHINESE_SET,
            LanguageVariant::Mixed | LanguageVariant::MixedChinese => &*COMBINED_SET,
        }
    }
}

impl fmt::Display for LanguageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A language variant together with the stopword set it filters against.
#[derive(Clone)]
pub struct Tokenizer {
    variant: LanguageVariant,
    stopwords: HashSet<String>,
    /// Segmenter loaded from a custom dictionary; the bundled one otherwise.
    dictionary: Option<Arc<Jieba>>,
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("variant", &self.variant)
            .field("stopwords", &self.stopwords.len())
            .field("custom_dictionary", &self.dictionary.is_some())
            .finish()
    }
}

impl Tokenizer {
    pub fn new(variant: LanguageVariant) -> Self {
        Self { variant, stopwords: variant.default_stopwords().clone(), dictionary: None }
    }

    pub fn with_stopwords<I, S>(variant: LanguageVariant, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { variant, stopwords: stopwords.into_iter().map(Into::into).collect(), dictionary: None }
    }

    /// Segment with a jieba dictionary file (`word [freq] [tag]` per line),
    /// e.g. a Traditional Chinese one, instead of the bundled dictionary.
    pub fn with_dictionary<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let jieba = Jieba::with_dict(&mut reader)
            .map_err(|e| Error::invalid(format!("bad jieba dictionary {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded custom segmentation dictionary");
        self.dictionary = Some(Arc::new(jieba));
        Ok(self)
    }

    pub fn has_custom_dictionary(&self) -> bool {
        self.dictionary.is_some()
    }

    fn segmenter(&self) -> &Jieba {
        self.dictionary.as_deref().unwrap_or(&*JIEBA)
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(LanguageVariant::from_name(name)?))
    }

    pub fn variant(&self) -> LanguageVariant {
        self.variant
    }

    pub fn stopwords(&self) -> &HashSet<String> {
        &self.stopwords
    }

    fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>();
        match self.variant {
            LanguageVariant::English => self.tokenize_english(&normalized),
            LanguageVariant::Chinese => self.tokenize_chinese(&normalized),
            LanguageVariant::MixedChinese => self.tokenize_mixed_chinese(&normalized),
            LanguageVariant::Mixed => match detect_fragment_language(&normalized) {
                Language::English => self.tokenize_english(&normalized),
                Language::Chinese => self.tokenize_mixed_chinese(&normalized),
            },
        }
    }

    fn tokenize_english(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let cleaned = NON_WORD.replace_all(&lowered, "");
        cleaned
            .split_whitespace()
            .filter(|token| !self.is_stopword(token))
            .map(|token| STEMMER.stem(token).into_owned())
            .collect()
    }

    fn tokenize_chinese(&self, text: &str) -> Vec<String> {
        let cleaned = NON_HAN_OR_LETTER.replace_all(text, "");
        self.segmenter()
            .cut_for_search(&cleaned, true)
            .into_iter()
            .filter(|token| !token.is_empty() && !self.is_stopword(token))
            .map(str::to_string)
            .collect()
    }

    fn tokenize_mixed_chinese(&self, text: &str) -> Vec<String> {
        let cleaned = NON_WORD.replace_all(text, "");
        self.segmenter()
            .cut_for_search(&cleaned, true)
            .into_iter()
            .filter(|token| !token.chars().any(char::is_whitespace))
            .map(str::to_lowercase)
            .filter(|token| !token.is_empty() && !self.is_stopword(token))
            .map(|token| STEMMER.stem(&token).into_owned())
            .collect()
    }
}
