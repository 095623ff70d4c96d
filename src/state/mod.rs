use std::sync::Arc;

use crate::backends::BackendRegistry;
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::embedding::EmbeddingProvider;
use crate::migration::{CompatibilityModel, MigrationOrchestrator, MigrationPlanner};
use crate::rag::{open_persistence, LightRagStore};
use crate::selection::SelectionEngine;

pub mod error;

pub use error::InitializationError;

/// Application state shared across all routes.
///
/// Every component is constructed once here and injected; nothing is global.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config_service: ConfigService,
    pub config: Arc<AppConfig>,
    pub compatibility: Arc<CompatibilityModel>,
    pub planner: Arc<MigrationPlanner>,
    pub selector: Arc<SelectionEngine>,
    pub registry: Arc<BackendRegistry>,
    pub orchestrator: Arc<MigrationOrchestrator>,
    pub chunk_store: Arc<LightRagStore>,
}

impl AppState {
    /// Loads `config.yml` + `secrets.yaml` and builds every component.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_app_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        Self::from_config(paths, config).await
    }

    /// Builds every component from an already loaded configuration.
    ///
    /// 1. Completeness-checked compatibility table
    /// 2. Backend registry from the `backends:` section
    /// 3. Embedding provider and LightRAG store with its persistence
    /// 4. Planner, selection engine and transfer orchestrator
    pub async fn from_config(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());

        let compatibility = Arc::new(
            CompatibilityModel::builtin()
                .map_err(|e| InitializationError::Compatibility(e.into()))?,
        );

        let registry = Arc::new(
            BackendRegistry::from_configs(&config.backends)
                .map_err(|e| InitializationError::Backends(e.into()))?,
        );

        let embedder = Arc::new(
            EmbeddingProvider::from_config(&config.embedding)
                .map_err(|e| InitializationError::Embedding(e.into()))?,
        );

        let persistence = open_persistence(&config.light_rag.storage, &paths)
            .await
            .map_err(|e| InitializationError::ChunkStore(e.into()))?;
        let chunk_store = Arc::new(
            LightRagStore::open(config.light_rag.clone(), embedder, persistence)
                .await
                .map_err(|e| InitializationError::ChunkStore(e.into()))?,
        );

        let planner = Arc::new(MigrationPlanner::new(compatibility.clone()));
        let selector = Arc::new(SelectionEngine::new(config.selection.clone()));
        let orchestrator = Arc::new(
            MigrationOrchestrator::from_config(
                registry.clone(),
                compatibility.clone(),
                config.migration.clone(),
            )
            .map_err(|e| InitializationError::Migration(e.into()))?,
        );

        Ok(Arc::new(AppState {
            paths,
            config_service,
            config: Arc::new(config),
            compatibility,
            planner,
            selector,
            registry,
            orchestrator,
            chunk_store,
        }))
    }
}
