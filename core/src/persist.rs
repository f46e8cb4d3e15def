//! Save and restore BM25 statistics. The corpus text itself is never written;
//! callers hand the same documents back, in the same order, on load.

use crate::error::{Error, Result};
use crate::tokenizer::{LanguageVariant, Tokenizer};
use crate::{Bm25Index, Bm25Params, TermFrequency};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(rename = "df")]
    pub document_frequency: HashMap<String, u32>,
    #[serde(rename = "tf")]
    pub term_frequency: Vec<TermFrequency>,
    pub k1: f64,
    pub b: f64,
    pub language: String,
    pub stopwords: Vec<String>,
    /// Number of documents the statistics were computed over.
    #[serde(default)]
    pub doc_count: Option<usize>,
    /// blake3 digest of the corpus, checked on restore when present.
    #[serde(default)]
    pub corpus_fingerprint: Option<String>,
}

fn default_version() -> u32 {
    RECORD_VERSION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// Pretty-printed JSON, `.json`.
    Json,
    /// bincode, `.bin` or `.bincode`.
    Binary,
}

impl IndexFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Ok(IndexFormat::Json),
            Some("bin") | Some("bincode") => Ok(IndexFormat::Binary),
            _ => Err(Error::invalid(format!(
                "unsupported index file extension for {}, use .json, .bin or .bincode",
                path.display()
            ))),
        }
    }
}

/// Digest of the documents in order. Each document is length-prefixed so
/// that `["ab", "c"]` and `["a", "bc"]` differ.
pub fn corpus_fingerprint(corpus: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    for doc in corpus {
        hasher.update(&(doc.len() as u64).to_le_bytes());
        hasher.update(doc.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

impl Bm25Index {
    pub fn to_record(&self) -> IndexRecord {
        let mut stopwords: Vec<String> = self.tokenizer.stopwords().iter().cloned().collect();
        stopwords.sort();
        IndexRecord {
            version: RECORD_VERSION,
            document_frequency: self.document_frequency.clone(),
            term_frequency: self.term_frequency.clone(),
            k1: self.params.k1,
            b: self.params.b,
            language: self.tokenizer.variant().tag().to_string(),
            stopwords,
            doc_count: Some(self.corpus.len()),
            corpus_fingerprint: Some(corpus_fingerprint(&self.corpus)),
        }
    }

    /// Rebuild an index from a record and the corpus it was computed over.
    /// Document lengths are recomputed from the term frequencies rather than
    /// trusted from the record.
    pub fn from_record(record: IndexRecord, corpus: Vec<String>) -> Result<Self> {
        let variant = LanguageVariant::from_tag(&record.language).ok_or_else(|| {
            Error::CorruptIndex(format!("unsupported language '{}' in saved index", record.language))
        })?;
        let params = Bm25Params { k1: record.k1, b: record.b };
        params
            .validate()
            .map_err(|e| Error::CorruptIndex(format!("bad parameters in saved index: {e}")))?;

        if corpus.is_empty() {
            return Err(Error::invalid("corpus cannot be empty"));
        }
        if record.term_frequency.len() != corpus.len() {
            return Err(Error::invalid(format!(
                "saved index covers {} documents but the corpus has {}",
                record.term_frequency.len(),
                corpus.len()
            )));
        }
        if let Some(count) = record.doc_count {
            if count != corpus.len() {
                return Err(Error::invalid(format!(
                    "saved index was built over {count} documents but the corpus has {}",
                    corpus.len()
                )));
            }
        }
        if let Some(expected) = &record.corpus_fingerprint {
            if *expected != corpus_fingerprint(&corpus) {
                return Err(Error::invalid(
                    "corpus does not match the documents the index was built from",
                ));
            }
        }

        let mut index = Bm25Index {
            tokenizer: Tokenizer::with_stopwords(variant, record.stopwords),
            params,
            corpus,
            term_frequency: record.term_frequency,
            document_frequency: record.document_frequency,
            doc_lengths: Vec::new(),
            avg_doc_length: 0.0,
        };
        index.recompute_lengths();
        Ok(index)
    }

    /// Persist the index; the format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let format = IndexFormat::from_path(path)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        let record = self.to_record();
        let mut f = BufWriter::new(File::create(path)?);
        match format {
            IndexFormat::Json => {
                let json = serde_json::to_string_pretty(&record).map_err(std::io::Error::from)?;
                f.write_all(json.as_bytes())?;
            }
            IndexFormat::Binary => {
                let bytes = bincode::serialize(&record)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
                f.write_all(&bytes)?;
            }
        }
        f.flush()?;
        tracing::info!(path = %path.display(), num_docs = self.doc_count(), "saved bm25 index");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P, corpus: Vec<String>) -> Result<Self> {
        let path = path.as_ref();
        let record = load_record(path)?;
        let index = Self::from_record(record, corpus)?;
        tracing::info!(
            path = %path.display(),
            num_docs = index.doc_count(),
            language = %index.language(),
            "loaded bm25 index"
        );
        Ok(index)
    }
}

pub fn load_record(path: &Path) -> Result<IndexRecord> {
    let format = IndexFormat::from_path(path)?;
    let mut f = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    match format {
        IndexFormat::Json => serde_json::from_slice(&buf)
            .map_err(|e| Error::CorruptIndex(format!("{}: {e}", path.display()))),
        IndexFormat::Binary => bincode::deserialize(&buf)
            .map_err(|e| Error::CorruptIndex(format!("{}: {e}", path.display()))),
    }
}
