//! Backend families and configured backend instances.
//!
//! A [`BackendType`] names a family of retrieval implementation and is fixed at
//! compile time. A [`BackendInstance`] is an addressable, configured backend of
//! some type; the [`BackendRegistry`] owns the instances known to the process.

mod registry;

pub use registry::{BackendInstanceConfig, BackendRegistry, LOCAL_LIGHTRAG_ID};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum BackendType {
    /// Lightweight in-process store (brute-force cosine search).
    #[serde(rename = "lightrag")]
    LightRag,
    /// Managed, horizontally scalable vector index.
    ManagedVector,
    /// Semantic index with metadata filtering and graph features.
    Semantic,
    /// Combined keyword + semantic retrieval.
    Hybrid,
    /// Portable, self-hosted and versioned store.
    Portable,
    /// Index keyed by query tags.
    TaggedIndex,
    Code,
    Legal,
    Multimodal,
    Custom,
}

impl BackendType {
    pub const COUNT: usize = 10;

    /// Every backend type, in table order.
    pub const ALL: [BackendType; BackendType::COUNT] = [
        BackendType::LightRag,
        BackendType::ManagedVector,
        BackendType::Semantic,
        BackendType::Hybrid,
        BackendType::Portable,
        BackendType::TaggedIndex,
        BackendType::Code,
        BackendType::Legal,
        BackendType::Multimodal,
        BackendType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::LightRag => "lightrag",
            BackendType::ManagedVector => "managed_vector",
            BackendType::Semantic => "semantic",
            BackendType::Hybrid => "hybrid",
            BackendType::Portable => "portable",
            BackendType::TaggedIndex => "tagged_index",
            BackendType::Code => "code",
            BackendType::Legal => "legal",
            BackendType::Multimodal => "multimodal",
            BackendType::Custom => "custom",
        }
    }

    /// Position of this type in [`BackendType::ALL`].
    pub fn index(&self) -> usize {
        match self {
            BackendType::LightRag => 0,
            BackendType::ManagedVector => 1,
            BackendType::Semantic => 2,
            BackendType::Hybrid => 3,
            BackendType::Portable => 4,
            BackendType::TaggedIndex => 5,
            BackendType::Code => 6,
            BackendType::Legal => 7,
            BackendType::Multimodal => 8,
            BackendType::Custom => 9,
        }
    }

    /// Domain-specialised types whose embeddings do not carry over to other families.
    pub fn is_specialized(&self) -> bool {
        matches!(
            self,
            BackendType::Multimodal | BackendType::Code | BackendType::Legal
        )
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = ApiError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
        let backend = match normalized.as_str() {
            "lightrag" | "light_rag" | "lightweight" => BackendType::LightRag,
            "managed_vector" | "managed" | "scalable" => BackendType::ManagedVector,
            "semantic" => BackendType::Semantic,
            "hybrid" => BackendType::Hybrid,
            "portable" | "self_hosted" | "versioned" => BackendType::Portable,
            "tagged_index" | "tagged" => BackendType::TaggedIndex,
            "code" => BackendType::Code,
            "legal" => BackendType::Legal,
            "multimodal" => BackendType::Multimodal,
            "custom" => BackendType::Custom,
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "Unknown backend type: {}",
                    raw
                )))
            }
        };
        Ok(backend)
    }
}

impl TryFrom<String> for BackendType {
    type Error = ApiError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendMetrics {
    #[serde(default)]
    pub document_count: u64,
    #[serde(default)]
    pub avg_latency_ms: f64,
    #[serde(default)]
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendInstance {
    pub id: String,
    pub backend_type: BackendType,
    pub is_active: bool,
    pub metrics: BackendMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_position_in_all() {
        for (position, backend) in BackendType::ALL.iter().enumerate() {
            assert_eq!(backend.index(), position, "{}", backend);
        }
    }

    #[test]
    fn parses_canonical_names_and_aliases() {
        for backend in BackendType::ALL {
            assert_eq!(backend.as_str().parse::<BackendType>().unwrap(), backend);
        }
        assert_eq!("Light-RAG".parse::<BackendType>().unwrap(), BackendType::LightRag);
        assert_eq!("self hosted".parse::<BackendType>().unwrap(), BackendType::Portable);
        assert!("elasticsearch".parse::<BackendType>().is_err());
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&BackendType::LightRag).unwrap();
        assert_eq!(json, "\"lightrag\"");
        let parsed: BackendType = serde_json::from_str("\"tagged_index\"").unwrap();
        assert_eq!(parsed, BackendType::TaggedIndex);
        let alias: BackendType = serde_json::from_str("\"managed\"").unwrap();
        assert_eq!(alias, BackendType::ManagedVector);
        assert!(serde_json::from_str::<BackendType>("\"graphdb\"").is_err());
    }
}
