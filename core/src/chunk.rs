use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provenance carried alongside every chunk. The retrieval core never
/// interprets it; unknown keys are kept in `extra` and written back as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_ref: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_ref: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkMetadata {
    pub fn for_file(filename: impl Into<String>) -> Self {
        Self { filename: Some(filename.into()), ..Default::default() }
    }
}

/// A unit of indexed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { text: text.into(), metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let raw = r#"{"filename":"report_7.pdf","kb_name":"finance","page_ref":[3,4],"section":"2.1"}"#;
        let meta: ChunkMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.filename.as_deref(), Some("report_7.pdf"));
        assert_eq!(meta.extra.get("section"), Some(&Value::String("2.1".into())));
        let back: Value = serde_json::to_value(&meta).unwrap();
        assert_eq!(back, serde_json::from_str::<Value>(raw).unwrap());
    }
}
