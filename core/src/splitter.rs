//! Token-budgeted splitting of over-long text.
//!
//! Budgets are measured with the tokenizer of the downstream model, not with
//! the BM25 tokenizers, so the splitter is generic over [`BudgetTokenizer`].

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref SENTENCE_END: Regex = Regex::new(r"[。！？]").expect("valid regex");
    static ref CLAUSE_BREAK: Regex = Regex::new(r"[；，、]").expect("valid regex");
    static ref NEWLINE: Regex = Regex::new(r"\n").expect("valid regex");
    static ref SPACE: Regex = Regex::new(r"\s").expect("valid regex");
    static ref UNICODE_TOKEN: Regex =
        Regex::new(r"\s*(?:[\x{4E00}-\x{9FFF}]|[A-Za-z0-9]+|\S)").expect("valid regex");
}

/// Extra tokens a packed chunk may carry from re-tokenizing joined text.
const BOUNDARY_SLACK: usize = 2;

/// Tokenizer used to measure and cut text against a token budget.
pub trait BudgetTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;

    /// Turn a run of tokens produced by `tokenize` back into text.
    fn detokenize(&self, tokens: &[String]) -> Result<String>;

    fn count(&self, text: &str) -> Result<usize> {
        Ok(self.tokenize(text)?.len())
    }
}

impl<T: BudgetTokenizer + ?Sized> BudgetTokenizer for &T {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        (**self).tokenize(text)
    }

    fn detokenize(&self, tokens: &[String]) -> Result<String> {
        (**self).detokenize(tokens)
    }

    fn count(&self, text: &str) -> Result<usize> {
        (**self).count(text)
    }
}

/// Model-free approximation: one token per ideograph, per ASCII alphanumeric
/// run and per other visible character. Leading whitespace sticks to the
/// following token, so detokenizing is plain concatenation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeTokenizer;

impl BudgetTokenizer for UnicodeTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(UNICODE_TOKEN.find_iter(text).map(|m| m.as_str().to_string()).collect())
    }

    fn detokenize(&self, tokens: &[String]) -> Result<String> {
        Ok(tokens.concat())
    }

    fn count(&self, text: &str) -> Result<usize> {
        Ok(UNICODE_TOKEN.find_iter(text).count())
    }
}

#[cfg(feature = "hf-tokenizer")]
pub use hf::HfTokenizer;

#[cfg(feature = "hf-tokenizer")]
mod hf {
    use super::BudgetTokenizer;
    use crate::error::{Error, Result};
    use std::path::Path;

    /// A Hugging Face `tokenizer.json`, normally the embedding model's own.
    pub struct HfTokenizer {
        inner: tokenizers::Tokenizer,
    }

    impl HfTokenizer {
        pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
            let inner = tokenizers::Tokenizer::from_file(path.as_ref()).map_err(|e| {
                Error::invalid(format!("cannot load tokenizer {}: {e}", path.as_ref().display()))
            })?;
            Ok(Self { inner })
        }
    }

    impl BudgetTokenizer for HfTokenizer {
        fn tokenize(&self, text: &str) -> Result<Vec<String>> {
            let encoding = self
                .inner
                .encode(text, false)
                .map_err(|e| Error::invalid(format!("tokenizer failed to encode text: {e}")))?;
            Ok(encoding.get_tokens().to_vec())
        }

        fn detokenize(&self, tokens: &[String]) -> Result<String> {
            let ids: Vec<u32> = tokens.iter().filter_map(|t| self.inner.token_to_id(t)).collect();
            self.inner
                .decode(&ids, true)
                .map_err(|e| Error::invalid(format!("tokenizer failed to decode tokens: {e}")))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub max_tokens: usize,
    /// Tokens of the previous chunk repeated at the start of the next one.
    pub overlap: usize,
    /// A final chunk shorter than `max_tokens * min_length_ratio` is topped
    /// up from the previous chunk instead of getting the regular overlap.
    pub min_length_ratio: f64,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self { max_tokens: 1024, overlap: 100, min_length_ratio: 0.7 }
    }
}

impl SplitterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens < 1 {
            return Err(Error::invalid("max_tokens must be at least 1"));
        }
        if self.overlap >= self.max_tokens {
            return Err(Error::invalid(format!(
                "overlap ({}) must be smaller than max_tokens ({})",
                self.overlap, self.max_tokens
            )));
        }
        if !(0.0..=1.0).contains(&self.min_length_ratio) {
            return Err(Error::invalid(format!(
                "min_length_ratio must be within [0, 1], got {}",
                self.min_length_ratio
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Separator {
    /// Cut right after every match.
    After(&'static Regex),
    /// Cut right before every match.
    Before(&'static Regex),
    EveryChar,
}

fn separators() -> [Separator; 5] {
    [
        Separator::After(&*SENTENCE_END),
        Separator::After(&*CLAUSE_BREAK),
        Separator::Before(&*NEWLINE),
        Separator::Before(&*SPACE),
        Separator::EveryChar,
    ]
}

fn split_pieces(text: &str, separator: Separator) -> Vec<&str> {
    let cuts: Vec<usize> = match separator {
        Separator::After(re) => re.find_iter(text).map(|m| m.end()).collect(),
        Separator::Before(re) => re.find_iter(text).map(|m| m.start()).collect(),
        Separator::EveryChar => text.char_indices().map(|(i, _)| i).collect(),
    };
    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(text.len())) {
        if cut > start {
            pieces.push(&text[start..cut]);
            start = cut;
        }
    }
    pieces.retain(|p| !p.trim().is_empty());
    pieces
}

pub struct TextSplitter<T> {
    tokenizer: T,
    config: SplitterConfig,
}

impl<T: BudgetTokenizer> TextSplitter<T> {
    pub fn new(tokenizer: T, config: SplitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { tokenizer, config })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn token_len(&self, text: &str) -> Result<usize> {
        self.tokenizer.count(text)
    }

    /// Split `text` into chunks of at most `max_tokens` (plus boundary
    /// slack), trying coarse separators first. Text already within budget is
    /// returned unchanged as a single chunk.
    pub fn split_text(&self, text: &str) -> Result<Vec<String>> {
        if self.token_len(text)? <= self.config.max_tokens {
            return Ok(vec![text.to_string()]);
        }
        for (level, separator) in separators().into_iter().enumerate() {
            let pieces = split_pieces(text, separator);
            let chunks = self.pack(&pieces)?;
            if self.within_limit(&chunks)? {
                tracing::debug!(level, chunks = chunks.len(), "split text on separator");
                return Ok(chunks);
            }
        }
        tracing::debug!("no separator fits the budget, forcing token split");
        self.force_split(text)
    }

    fn within_limit(&self, chunks: &[String]) -> Result<bool> {
        let limit = self.config.max_tokens + BOUNDARY_SLACK;
        for chunk in chunks {
            if self.token_len(chunk)? > limit {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Greedily merge pieces into chunks of at most `max_tokens`, then add
    /// overlap.
    fn pack(&self, pieces: &[&str]) -> Result<Vec<String>> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        for piece in pieces {
            let candidate = format!("{current}{piece}");
            if self.token_len(&candidate)? <= self.config.max_tokens {
                current = candidate;
            } else {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                current = piece.to_string();
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        self.apply_overlap(chunks)
    }

    fn apply_overlap(&self, chunks: Vec<String>) -> Result<Vec<String>> {
        let last = chunks.len().saturating_sub(1);
        let mut result: Vec<String> = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.into_iter().enumerate() {
            let Some(prev) = result.last() else {
                result.push(chunk);
                continue;
            };
            let prev_tokens = self.tokenizer.tokenize(prev)?;
            let current_len = self.token_len(&chunk)?;
            let short_tail = (current_len as f64)
                < self.config.max_tokens as f64 * self.config.min_length_ratio;
            let take = if i == last && short_tail {
                self.config.max_tokens.saturating_sub(current_len)
            } else {
                self.config.overlap
            }
            .min(prev_tokens.len());
            let prefix = self.tokenizer.detokenize(&prev_tokens[prev_tokens.len() - take..])?;
            result.push(prefix + &chunk);
        }
        Ok(result)
    }

    /// Cut the raw token stream into `max_tokens` windows stepping by
    /// `max_tokens - overlap`. A short final window is back-filled from the
    /// left unless it is the only one.
    pub fn force_split(&self, text: &str) -> Result<Vec<String>> {
        let tokens = self.tokenizer.tokenize(text)?;
        let total = tokens.len();
        let max = self.config.max_tokens;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let end = (start + max).min(total);
            let window_start = if end == total && end - start < max && start != 0 {
                end.saturating_sub(max)
            } else {
                start
            };
            chunks.push(self.tokenizer.detokenize(&tokens[window_start..end])?);
            if end == total {
                break;
            }
            start = end - self.config.overlap;
        }
        Ok(chunks)
    }

    /// Replace every over-budget chunk by its split pieces, each inheriting
    /// the original metadata. Chunks within budget pass through untouched.
    pub fn rechunk(&self, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if self.token_len(&chunk.text)? > self.config.max_tokens {
                let pieces = self.split_text(&chunk.text)?;
                tracing::debug!(pieces = pieces.len(), "rechunked oversized chunk");
                out.extend(pieces.into_iter().map(|text| Chunk::new(text, chunk.metadata.clone())));
            } else {
                out.push(chunk);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_tokens_detokenize_to_the_input() {
        let text = "BM25 排序，works well!";
        let tokens = UnicodeTokenizer.tokenize(text).unwrap();
        assert_eq!(tokens, vec!["BM25", " 排", "序", "，", " works", " well", "!"]);
        assert_eq!(UnicodeTokenizer.detokenize(&tokens).unwrap(), text);
    }

    #[test]
    fn pieces_cut_after_terminators_and_before_whitespace() {
        assert_eq!(split_pieces("甲。乙！丙", separators()[0]), vec!["甲。", "乙！", "丙"]);
        assert_eq!(split_pieces("a b\n\nc", separators()[2]), vec!["a b", "\nc"]);
        assert_eq!(split_pieces("a b", separators()[3]), vec!["a", " b"]);
        assert_eq!(split_pieces("ab", separators()[4]), vec!["a", "b"]);
    }

    #[test]
    fn config_validation() {
        assert!(SplitterConfig::default().validate().is_ok());
        let bad = SplitterConfig { max_tokens: 10, overlap: 10, min_length_ratio: 0.5 };
        assert!(matches!(bad.validate(), Err(Error::InvalidInput(_))));
        let bad = SplitterConfig { max_tokens: 0, overlap: 0, min_length_ratio: 0.5 };
        assert!(bad.validate().is_err());
    }

    struct BrokenTokenizer;

    impl BudgetTokenizer for BrokenTokenizer {
        fn tokenize(&self, _text: &str) -> Result<Vec<String>> {
            Err(Error::invalid("encode failed"))
        }

        fn detokenize(&self, _tokens: &[String]) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn tokenizer_failure_is_an_error_not_an_empty_count() {
        let splitter = TextSplitter::new(BrokenTokenizer, SplitterConfig::default()).unwrap();
        assert!(matches!(splitter.split_text("任何文字"), Err(Error::InvalidInput(_))));
        let chunks = vec![Chunk::new("任何文字", Default::default())];
        assert!(splitter.rechunk(chunks).is_err());
    }
}
