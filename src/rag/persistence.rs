use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::sqlite::SqliteChunkPersistence;
use super::types::{Chunk, StorageBackend, StorageConfig};
use crate::core::config::{defaults, AppPaths};
use crate::core::errors::ApiError;

/// Durable home of the chunk table. Every save replaces the whole table.
#[async_trait]
pub trait ChunkPersistence: Send + Sync {
    async fn load(&self) -> Result<Vec<Chunk>, ApiError>;

    async fn save_all(&self, chunks: &[Chunk]) -> Result<(), ApiError>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

pub async fn open_persistence(
    config: &StorageConfig,
    paths: &AppPaths,
) -> Result<Arc<dyn ChunkPersistence>, ApiError> {
    let persistence: Arc<dyn ChunkPersistence> = match config.backend {
        StorageBackend::Json => {
            let path = config
                .path
                .as_deref()
                .map(|raw| paths.resolve(raw))
                .unwrap_or_else(|| paths.chunk_store_path.clone());
            Arc::new(JsonFilePersistence::new(path))
        }
        StorageBackend::Sqlite => {
            let path = paths.resolve(
                config
                    .path
                    .as_deref()
                    .unwrap_or(defaults::DEFAULT_CHUNK_DB_FILE),
            );
            Arc::new(SqliteChunkPersistence::with_path(path).await?)
        }
        StorageBackend::Memory => Arc::new(InMemoryPersistence::default()),
    };

    tracing::info!("Chunk persistence: {}", persistence.describe());
    Ok(persistence)
}

/// Chunk table serialised as one JSON array.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ChunkPersistence for JsonFilePersistence {
    async fn load(&self) -> Result<Vec<Chunk>, ApiError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ApiError::internal(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::Internal(format!(
                "failed to parse chunk store {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn save_all(&self, chunks: &[Chunk]) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ApiError::internal)?;
        }

        let payload = serde_json::to_vec(chunks).map_err(ApiError::internal)?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(ApiError::internal)?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

/// Process-local table, lost on restart.
#[derive(Default)]
pub struct InMemoryPersistence {
    chunks: Mutex<Vec<Chunk>>,
}

#[async_trait]
impl ChunkPersistence for InMemoryPersistence {
    async fn load(&self) -> Result<Vec<Chunk>, ApiError> {
        let guard = self.chunks.lock().map_err(ApiError::internal)?;
        Ok(guard.clone())
    }

    async fn save_all(&self, chunks: &[Chunk]) -> Result<(), ApiError> {
        let mut guard = self.chunks.lock().map_err(ApiError::internal)?;
        *guard = chunks.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
