use crate::error::{Error, Result};
use crate::fusion::{SelectionPolicy, DEFAULT_RRF_K};
use crate::tokenizer::LanguageVariant;
use crate::Bm25Params;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one hybrid retrieval pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Index factory selector used for the lexical leg.
    pub language: String,
    pub bm25: Bm25Params,
    /// Candidates requested from each leg before fusion.
    pub top_k: usize,
    pub rrf_k: f64,
    pub selection: SelectionPolicy,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            language: "mixed".to_string(),
            bm25: Bm25Params::default(),
            top_k: 20,
            rrf_k: DEFAULT_RRF_K,
            selection: SelectionPolicy::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::invalid(format!("bad retrieval config {}: {e}", path.as_ref().display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        LanguageVariant::from_name(&self.language)?;
        self.bm25.validate()?;
        if self.top_k < 1 {
            return Err(Error::invalid("top_k must be at least 1"));
        }
        if !self.rrf_k.is_finite() || self.rrf_k <= 0.0 {
            return Err(Error::invalid(format!("rrf_k must be positive, got {}", self.rrf_k)));
        }
        self.selection.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RetrievalConfig::default();
        config.validate().unwrap();
        assert_eq!(config.top_k, 20);
        assert_eq!(config.rrf_k, 1.0);
        assert_eq!(config.selection.threshold, 0.45);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RetrievalConfig = serde_json::from_str(r#"{"language": "en", "top_k": 5}"#).unwrap();
        assert_eq!(config.language, "en");
        assert_eq!(config.top_k, 5);
        assert_eq!(config.bm25, Bm25Params::default());
        config.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_language() {
        let config = RetrievalConfig { language: "fr".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }
}
