//! Text embedding: an optional remote OpenAI-compatible endpoint backed by a
//! deterministic offline fallback.

mod hashed;
mod remote;

pub use hashed::hashed_embedding;
pub use remote::RemoteEmbedder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::config::defaults;
use crate::core::errors::ApiError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a vector of `dimensions()` floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;

    fn dimensions(&self) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimensions: usize,
    pub remote: Option<RemoteEmbeddingConfig>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: defaults::DEFAULT_EMBEDDING_DIMENSIONS,
            remote: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEmbeddingConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    defaults::DEFAULT_EMBEDDING_TIMEOUT_SECS
}

/// Remote-first embedder that never surfaces provider failures.
pub struct EmbeddingProvider {
    remote: Option<Box<dyn Embedder>>,
    dimensions: usize,
}

impl EmbeddingProvider {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ApiError> {
        if config.dimensions == 0 {
            return Err(ApiError::InvalidConfig(
                "embedding.dimensions must be positive".to_string(),
            ));
        }

        let remote = match &config.remote {
            Some(remote) => {
                let embedder = RemoteEmbedder::new(remote, config.dimensions)?;
                tracing::info!("Remote embeddings enabled at {}", embedder.endpoint());
                Some(Box::new(embedder) as Box<dyn Embedder>)
            }
            None => {
                tracing::info!(
                    "No remote embedding endpoint configured; using hashed embeddings ({} dims)",
                    config.dimensions
                );
                None
            }
        };

        Ok(Self {
            remote,
            dimensions: config.dimensions,
        })
    }

    /// Offline-only provider.
    pub fn hashed(dimensions: usize) -> Self {
        Self {
            remote: None,
            dimensions,
        }
    }

    pub fn with_remote(remote: Box<dyn Embedder>, dimensions: usize) -> Self {
        Self {
            remote: Some(remote),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        if let Some(remote) = &self.remote {
            match remote.embed(text).await {
                Ok(vector) if vector.len() == self.dimensions => return Ok(vector),
                Ok(vector) => tracing::warn!(
                    "Remote embedding returned {} dims, expected {}; using hashed fallback",
                    vector.len(),
                    self.dimensions
                ),
                Err(e) => tracing::warn!("Remote embedding failed, using hashed fallback: {}", e),
            }
        }

        Ok(hashed_embedding(text, self.dimensions))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ApiError> {
            Err(ApiError::Dependency("connection refused".to_string()))
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ApiError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ApiError> {
            Ok(vec![0.5; 8])
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_hashed_embedding() {
        let provider = EmbeddingProvider::with_remote(Box::new(FailingEmbedder), 8);
        let vector = provider.embed("fallback please").await.unwrap();
        assert_eq!(vector, hashed_embedding("fallback please", 8));
    }

    #[tokio::test]
    async fn wrong_dimension_falls_back_to_hashed_embedding() {
        let provider = EmbeddingProvider::with_remote(Box::new(ShortEmbedder), 8);
        let vector = provider.embed("x").await.unwrap();
        assert_eq!(vector.len(), 8);
        assert_eq!(vector, hashed_embedding("x", 8));
    }

    #[tokio::test]
    async fn healthy_remote_is_preferred() {
        let provider = EmbeddingProvider::with_remote(Box::new(FixedEmbedder), 8);
        assert_eq!(provider.embed("anything").await.unwrap(), vec![0.5; 8]);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let config = EmbeddingConfig {
            dimensions: 0,
            remote: None,
        };
        assert!(matches!(
            EmbeddingProvider::from_config(&config),
            Err(ApiError::InvalidConfig(_))
        ));
    }
}
