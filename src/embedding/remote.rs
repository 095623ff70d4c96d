use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{Embedder, RemoteEmbeddingConfig};
use crate::core::errors::ApiError;

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
#[derive(Clone)]
pub struct RemoteEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
    client: Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    pub fn new(config: &RemoteEmbeddingConfig, dimensions: usize) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("embedding client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            dimensions,
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let body = json!({
            "model": self.model,
            "input": [text],
        });

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let res = request.send().await.map_err(ApiError::dependency)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Dependency(format!(
                "embedding endpoint returned {}: {}",
                status, text
            )));
        }

        let payload: EmbeddingsResponse = res.json().await.map_err(ApiError::dependency)?;
        let embedding = payload
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| ApiError::Dependency("embedding response had no data".to_string()))?;

        if embedding.len() != self.dimensions {
            return Err(ApiError::Dependency(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash_and_blank_keys_are_dropped() {
        let config = RemoteEmbeddingConfig {
            base_url: "http://localhost:1234/".to_string(),
            model: "nomic-embed".to_string(),
            api_key: Some("   ".to_string()),
            timeout_secs: 5,
        };
        let embedder = RemoteEmbedder::new(&config, 16).unwrap();

        assert_eq!(embedder.endpoint(), "http://localhost:1234/v1/embeddings");
        assert!(embedder.api_key.is_none());
        assert_eq!(embedder.dimensions(), 16);
    }
}
