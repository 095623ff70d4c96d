use serde::{Deserialize, Serialize};

use super::defaults;
use crate::backends::BackendInstanceConfig;
use crate::embedding::EmbeddingConfig;
use crate::migration::MigrationConfig;
use crate::rag::LightRagConfig;
use crate::selection::SelectionThresholds;

/// Typed view of the merged `config.yml` + `secrets.yaml` tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub light_rag: LightRagConfig,
    pub selection: SelectionThresholds,
    pub migration: MigrationConfig,
    pub backends: Vec<BackendInstanceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT,
            cors_allowed_origins: defaults::default_cors_origins(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::StorageBackend;
    use serde_json::json;

    #[test]
    fn empty_tree_yields_defaults() {
        let config: AppConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.server.port, defaults::DEFAULT_PORT);
        assert_eq!(config.light_rag.chunk_size, defaults::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.light_rag.storage.backend, StorageBackend::Json);
        assert!(config.embedding.remote.is_none());
        assert!(config.backends.is_empty());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: AppConfig = serde_json::from_value(json!({
            "server": { "port": 9100 },
            "light_rag": { "chunk_overlap": 10, "storage": { "backend": "sqlite" } },
            "migration": { "seed": 7 },
            "backends": [{ "id": "prod", "type": "managed_vector" }]
        }))
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, defaults::DEFAULT_HOST);
        assert_eq!(config.light_rag.chunk_overlap, 10);
        assert_eq!(config.light_rag.chunk_size, defaults::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.light_rag.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.migration.seed, Some(7));
        assert!(config.backends[0].is_active);
    }
}
