use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::config::defaults;

/// Metadata keys owned by the store rather than the caller.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
pub const CHUNK_COUNT_KEY: &str = "chunk_count";
pub const CHUNK_START_KEY: &str = "chunk_start";
pub const DOCUMENT_ID_KEY: &str = "document_id";

pub const CHUNK_METADATA_KEYS: [&str; 3] = [CHUNK_INDEX_KEY, CHUNK_COUNT_KEY, CHUNK_START_KEY];

/// A persisted window of a document with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn chunk_index(&self) -> usize {
        self.metadata
            .get(CHUNK_INDEX_KEY)
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    }

    pub fn chunk_start(&self) -> Option<usize> {
        self.metadata
            .get(CHUNK_START_KEY)
            .and_then(Value::as_u64)
            .map(|start| start as usize)
    }
}

/// A document reconstructed from its chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub metadata: Map<String, Value>,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: Map<String, Value>,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub chunk_count: usize,
    pub document_count: usize,
    pub avg_chunks_per_document: f64,
    pub config: LightRagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub similarity_threshold: f32,
    pub storage: StorageConfig,
}

impl Default for LightRagConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::DEFAULT_CHUNK_SIZE,
            chunk_overlap: defaults::DEFAULT_CHUNK_OVERLAP,
            similarity_threshold: defaults::DEFAULT_SIMILARITY_THRESHOLD,
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Relative paths resolve against the user data dir.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}
