use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::{BackendInstance, BackendMetrics, BackendType};
use crate::core::errors::ApiError;

pub const LOCAL_LIGHTRAG_ID: &str = "lightrag-local";

/// One entry of the `backends:` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendInstanceConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub backend_type: BackendType,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub metrics: BackendMetrics,
}

fn default_active() -> bool {
    true
}

/// Configured backend instances, addressable by id.
pub struct BackendRegistry {
    instances: RwLock<BTreeMap<String, BackendInstance>>,
}

impl BackendRegistry {
    /// Builds the registry; the in-process LightRAG instance is always present.
    pub fn from_configs(configs: &[BackendInstanceConfig]) -> Result<Self, ApiError> {
        let mut instances = BTreeMap::new();
        instances.insert(
            LOCAL_LIGHTRAG_ID.to_string(),
            BackendInstance {
                id: LOCAL_LIGHTRAG_ID.to_string(),
                backend_type: BackendType::LightRag,
                is_active: true,
                metrics: BackendMetrics::default(),
            },
        );

        for config in configs {
            let id = config.id.trim();
            if id.is_empty() {
                return Err(ApiError::InvalidConfig(
                    "backend instance id cannot be empty".to_string(),
                ));
            }
            if id == LOCAL_LIGHTRAG_ID && config.backend_type != BackendType::LightRag {
                return Err(ApiError::InvalidConfig(format!(
                    "'{}' is reserved for the in-process lightrag backend",
                    LOCAL_LIGHTRAG_ID
                )));
            }
            if id != LOCAL_LIGHTRAG_ID && instances.contains_key(id) {
                return Err(ApiError::InvalidConfig(format!(
                    "duplicate backend instance id '{}'",
                    id
                )));
            }
            instances.insert(
                id.to_string(),
                BackendInstance {
                    id: id.to_string(),
                    backend_type: config.backend_type,
                    is_active: config.is_active,
                    metrics: config.metrics.clone(),
                },
            );
        }

        Ok(Self {
            instances: RwLock::new(instances),
        })
    }

    pub fn get(&self, id: &str) -> Result<BackendInstance, ApiError> {
        let guard = self.instances.read().map_err(ApiError::internal)?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Backend instance '{}' not found", id)))
    }

    pub fn list(&self) -> Result<Vec<BackendInstance>, ApiError> {
        let guard = self.instances.read().map_err(ApiError::internal)?;
        Ok(guard.values().cloned().collect())
    }

    /// Credits a target instance with documents moved by a completed transfer.
    pub fn record_transfer(&self, target_id: &str, documents: u64) -> Result<(), ApiError> {
        let mut guard = self.instances.write().map_err(ApiError::internal)?;
        let instance = guard
            .get_mut(target_id)
            .ok_or_else(|| ApiError::NotFound(format!("Backend instance '{}' not found", target_id)))?;
        instance.metrics.document_count = instance.metrics.document_count.saturating_add(documents);
        Ok(())
    }
}
