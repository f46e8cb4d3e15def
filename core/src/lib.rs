//! Bilingual (Chinese/English) hybrid retrieval core: BM25 lexical index,
//! token-budgeted text splitting, and rank fusion with re-ranked selection.

pub mod chunk;
pub mod config;
pub mod error;
pub mod fusion;
pub mod language;
pub mod persist;
pub mod retriever;
pub mod splitter;
pub mod stopwords;
pub mod table;
pub mod tokenizer;

mod index;

pub use error::{Error, Result};
pub use index::*;
