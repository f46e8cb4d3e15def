use crate::error::{Error, Result};
use crate::tokenizer::{LanguageVariant, Tokenizer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Position of a document in the corpus the index was built from.
pub type DocId = usize;

/// Token counts for one document.
pub type TermFrequency = HashMap<String, u32>;

/// BM25 tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term-frequency saturation, usually between 1.2 and 2.0. Must be
    /// positive.
    pub k1: f64,
    /// Length normalization weight in `[0, 1]`.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 <= 0.0 {
            return Err(Error::invalid(format!("k1 must be a positive number, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::invalid(format!("b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Exhaustive BM25 index over an in-memory corpus.
///
/// All statistics are computed eagerly in [`Bm25Index::new`]; once built the
/// index is only read, so `search` can run from several threads at once.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) params: Bm25Params,
    pub(crate) corpus: Vec<String>,
    pub(crate) term_frequency: Vec<TermFrequency>,
    pub(crate) document_frequency: HashMap<String, u32>,
    pub(crate) doc_lengths: Vec<u32>,
    pub(crate) avg_doc_length: f64,
}

impl Bm25Index {
    pub fn new(corpus: Vec<String>, tokenizer: Tokenizer, params: Bm25Params) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::invalid("corpus cannot be empty"));
        }
        params.validate()?;

        let mut term_frequency = Vec::with_capacity(corpus.len());
        let mut document_frequency: HashMap<String, u32> = HashMap::new();
        for doc in &corpus {
            let mut tf: TermFrequency = HashMap::new();
            for token in tokenizer.tokenize(doc) {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            term_frequency.push(tf);
        }

        let mut index = Self {
            tokenizer,
            params,
            corpus,
            term_frequency,
            document_frequency,
            doc_lengths: Vec::new(),
            avg_doc_length: 0.0,
        };
        index.recompute_lengths();
        tracing::info!(
            num_docs = index.doc_count(),
            num_terms = index.document_frequency.len(),
            language = %index.tokenizer.variant(),
            "built bm25 index"
        );
        Ok(index)
    }

    /// Lengths are always derived from the term-frequency table so that the
    /// two can never disagree.
    pub(crate) fn recompute_lengths(&mut self) {
        self.doc_lengths = self.term_frequency.iter().map(|tf| tf.values().sum()).collect();
        let total: u64 = self.doc_lengths.iter().map(|&l| l as u64).sum();
        self.avg_doc_length = if self.doc_lengths.is_empty() {
            0.0
        } else {
            total as f64 / self.doc_lengths.len() as f64
        };
    }

    pub fn doc_count(&self) -> usize {
        self.corpus.len()
    }

    pub fn avg_doc_length(&self) -> f64 {
        self.avg_doc_length
    }

    pub fn doc_lengths(&self) -> &[u32] {
        &self.doc_lengths
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn language(&self) -> LanguageVariant {
        self.tokenizer.variant()
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Re-attach the custom segmentation dictionary a restored index was
    /// built with; saved records do not carry it.
    pub fn with_dictionary<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.tokenizer = self.tokenizer.with_dictionary(path)?;
        Ok(self)
    }

    pub fn stopwords(&self) -> &HashSet<String> {
        self.tokenizer.stopwords()
    }

    pub fn corpus(&self) -> &[String] {
        &self.corpus
    }

    pub fn document(&self, doc_id: DocId) -> Option<&str> {
        self.corpus.get(doc_id).map(String::as_str)
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    pub fn term_frequency(&self, doc_id: DocId, term: &str) -> u32 {
        self.term_frequency
            .get(doc_id)
            .and_then(|tf| tf.get(term))
            .copied()
            .unwrap_or(0)
    }

    pub fn num_terms(&self) -> usize {
        self.document_frequency.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        let df = *self.document_frequency.get(term)? as f64;
        let n = self.doc_count() as f64;
        Some(((n - df + 0.5) / (df + 0.5) + 1.0).ln())
    }

    /// BM25 score of an already tokenized query against one document.
    /// Out-of-vocabulary tokens contribute nothing.
    pub fn score_tokens(&self, query_tokens: &[String], doc_id: DocId) -> f64 {
        let Some(tf) = self.term_frequency.get(doc_id) else {
            return 0.0;
        };
        let doc_len = self.doc_lengths[doc_id] as f64;
        let Bm25Params { k1, b } = self.params;
        let length_ratio = if self.avg_doc_length > 0.0 { doc_len / self.avg_doc_length } else { 1.0 };

        let mut score = 0.0;
        for term in query_tokens {
            let Some(idf) = self.idf(term) else { continue };
            let freq = tf.get(term).copied().unwrap_or(0) as f64;
            let tf_part = freq * (k1 + 1.0) / (freq + k1 * (1.0 - b + b * length_ratio));
            score += idf * tf_part;
        }
        score
    }

    pub fn score(&self, query: &str, doc_id: DocId) -> f64 {
        self.score_tokens(&self.tokenizer.tokenize(query), doc_id)
    }

    /// Score every document and return the best `top_k`, highest first.
    /// Equal scores keep ascending `doc_id` order.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDoc>> {
        if top_k < 1 {
            return Err(Error::invalid("top_k must be at least 1"));
        }
        let query_tokens = self.tokenizer.tokenize(query);
        let mut scored: Vec<ScoredDoc> = (0..self.doc_count())
            .map(|doc_id| ScoredDoc { doc_id, score: self.score_tokens(&query_tokens, doc_id) })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        tracing::debug!(query_terms = query_tokens.len(), hits = scored.len(), "bm25 search");
        Ok(scored)
    }

    /// Like [`search`](Self::search) but pairs each hit with its document text.
    pub fn search_with_text(&self, query: &str, top_k: usize) -> Result<Vec<(DocId, f64, &str)>> {
        Ok(self
            .search(query, top_k)?
            .into_iter()
            .map(|hit| (hit.doc_id, hit.score, self.corpus[hit.doc_id].as_str()))
            .collect())
    }
}

/// Build an index for a language selector (`english`/`en`, `chinese`/`cn`,
/// `mixed`), optionally overriding the variant's default stopwords.
pub fn create_bm25(
    corpus: Vec<String>,
    language: &str,
    params: Bm25Params,
    stopwords: Option<&[String]>,
) -> Result<Bm25Index> {
    let variant = LanguageVariant::from_name(language)?;
    let tokenizer = match stopwords {
        Some(words) => Tokenizer::with_stopwords(variant, words.iter().cloned()),
        None => Tokenizer::new(variant),
    };
    Bm25Index::new(corpus, tokenizer, params)
}

/// One-shot search over a throwaway index.
pub fn bm25_search(
    corpus: &[String],
    query: &str,
    language: &str,
    top_k: usize,
    params: Bm25Params,
) -> Result<Vec<(DocId, f64, String)>> {
    let index = create_bm25(corpus.to_vec(), language, params, None)?;
    Ok(index
        .search_with_text(query, top_k)?
        .into_iter()
        .map(|(doc_id, score, text)| (doc_id, score, text.to_string()))
        .collect())
}
