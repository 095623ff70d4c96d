use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::persistence::ChunkPersistence;
use super::types::{
    Chunk, Document, DocumentSummary, LightRagConfig, RetrievedChunk, StoreStats,
    CHUNK_COUNT_KEY, CHUNK_INDEX_KEY, CHUNK_METADATA_KEYS, CHUNK_START_KEY, DOCUMENT_ID_KEY,
};
use crate::core::errors::ApiError;
use crate::embedding::Embedder;
use crate::vector_math;

/// In-process chunk store with brute-force cosine retrieval.
///
/// Writers serialise on `write_lock` for the whole embed/persist/publish
/// cycle. Readers clone the current `Arc` snapshot and never wait on a writer.
pub struct LightRagStore {
    config: LightRagConfig,
    embedder: Arc<dyn Embedder>,
    persistence: Arc<dyn ChunkPersistence>,
    write_lock: Mutex<()>,
    chunks: RwLock<Arc<Vec<Chunk>>>,
}

impl LightRagStore {
    pub async fn open(
        config: LightRagConfig,
        embedder: Arc<dyn Embedder>,
        persistence: Arc<dyn ChunkPersistence>,
    ) -> Result<Self, ApiError> {
        if config.chunk_size == 0 || config.chunk_size <= config.chunk_overlap {
            return Err(ApiError::InvalidConfig(format!(
                "chunk_size ({}) must be greater than chunk_overlap ({})",
                config.chunk_size, config.chunk_overlap
            )));
        }

        let dimensions = embedder.dimensions();
        let loaded = persistence.load().await?;
        let total = loaded.len();
        let chunks: Vec<Chunk> = loaded
            .into_iter()
            .filter(|chunk| chunk.embedding.len() == dimensions)
            .collect();
        if chunks.len() < total {
            tracing::warn!(
                "Discarded {} persisted chunks whose embedding dimension differs from {}",
                total - chunks.len(),
                dimensions
            );
        }

        tracing::info!(
            "LightRAG store opened with {} chunks ({})",
            chunks.len(),
            persistence.describe()
        );

        Ok(Self {
            config,
            embedder,
            persistence,
            write_lock: Mutex::new(()),
            chunks: RwLock::new(Arc::new(chunks)),
        })
    }

    /// Splits, embeds and stores `content`, returning its document id.
    /// An existing document with the same id is replaced.
    pub async fn ingest(
        &self,
        content: &str,
        metadata: Map<String, Value>,
    ) -> Result<String, ApiError> {
        if content.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Document content cannot be empty".to_string(),
            ));
        }

        let document_id = metadata
            .get(DOCUMENT_ID_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let windows = vector_math::split_into_chunks(
            content,
            self.config.chunk_size,
            self.config.chunk_overlap,
        )?;
        let chunk_count = windows.len();

        let _guard = self.write_lock.lock().await;

        let mut new_chunks = Vec::with_capacity(chunk_count);
        for (index, window) in windows.into_iter().enumerate() {
            let embedding = self.embedder.embed(&window.text).await?;
            if embedding.len() != self.embedder.dimensions() {
                return Err(ApiError::Internal(format!(
                    "embedder returned {} dims, expected {}",
                    embedding.len(),
                    self.embedder.dimensions()
                )));
            }

            let mut chunk_metadata = metadata.clone();
            chunk_metadata.insert(CHUNK_INDEX_KEY.to_string(), json!(index));
            chunk_metadata.insert(CHUNK_COUNT_KEY.to_string(), json!(chunk_count));
            chunk_metadata.insert(CHUNK_START_KEY.to_string(), json!(window.start));

            new_chunks.push(Chunk {
                id: format!("{}-{}", document_id, index),
                document_id: document_id.clone(),
                content: window.text,
                metadata: chunk_metadata,
                embedding,
            });
        }

        let current = self.snapshot()?;
        let replaced = current
            .iter()
            .filter(|chunk| chunk.document_id == document_id)
            .count();
        let mut table: Vec<Chunk> = current
            .iter()
            .filter(|chunk| chunk.document_id != document_id)
            .cloned()
            .collect();
        table.extend(new_chunks);

        self.persistence.save_all(&table).await?;
        self.publish(table)?;

        if replaced > 0 {
            tracing::info!(
                "Replaced document {} ({} -> {} chunks)",
                document_id,
                replaced,
                chunk_count
            );
        } else {
            tracing::info!("Added document {} ({} chunks)", document_id, chunk_count);
        }
        Ok(document_id)
    }

    /// Like [`LightRagStore::ingest`] but reports failure as `false`.
    pub async fn add_document(&self, content: &str, metadata: Map<String, Value>) -> bool {
        match self.ingest(content, metadata).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to add document: {}", e);
                false
            }
        }
    }

    pub async fn delete_document(&self, document_id: &str) -> bool {
        let _guard = self.write_lock.lock().await;

        let current = match self.snapshot() {
            Ok(current) => current,
            Err(e) => {
                tracing::error!("Failed to delete document {}: {}", document_id, e);
                return false;
            }
        };
        let table: Vec<Chunk> = current
            .iter()
            .filter(|chunk| chunk.document_id != document_id)
            .cloned()
            .collect();
        if table.len() == current.len() {
            return false;
        }

        let removed = current.len() - table.len();
        if let Err(e) = self.persistence.save_all(&table).await {
            tracing::error!("Failed to persist deletion of {}: {}", document_id, e);
            return false;
        }
        if let Err(e) = self.publish(table) {
            tracing::error!("Failed to publish deletion of {}: {}", document_id, e);
            return false;
        }

        tracing::info!("Deleted document {} ({} chunks)", document_id, removed);
        true
    }

    pub async fn query(&self, text: &str, limit: usize) -> Result<Vec<RetrievedChunk>, ApiError> {
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest("Query text cannot be empty".to_string()));
        }

        let snapshot = self.snapshot()?;
        if snapshot.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(text).await?;
        let hits = vector_math::nearest_neighbors(
            &query_embedding,
            snapshot.iter().map(|chunk| chunk.embedding.as_slice()),
            limit,
            self.config.similarity_threshold,
        )?;

        Ok(hits
            .into_iter()
            .map(|(idx, score)| {
                let chunk = &snapshot[idx];
                RetrievedChunk {
                    content: chunk.content.clone(),
                    metadata: chunk.metadata.clone(),
                    score,
                }
            })
            .collect())
    }

    pub fn stats(&self) -> Result<StoreStats, ApiError> {
        let snapshot = self.snapshot()?;
        let chunk_count = snapshot.len();
        let document_count = group_by_document(&snapshot).len();
        let avg_chunks_per_document = if document_count == 0 {
            0.0
        } else {
            chunk_count as f64 / document_count as f64
        };

        Ok(StoreStats {
            chunk_count,
            document_count,
            avg_chunks_per_document,
            config: self.config.clone(),
        })
    }

    pub fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        let snapshot = self.snapshot()?;
        Ok(group_by_document(&snapshot)
            .into_iter()
            .map(|(id, chunks)| DocumentSummary {
                id: id.to_string(),
                metadata: document_metadata(&chunks),
                chunk_count: chunks.len(),
            })
            .collect())
    }

    pub fn get_document(&self, document_id: &str) -> Result<Document, ApiError> {
        let snapshot = self.snapshot()?;
        let mut chunks: Vec<&Chunk> = snapshot
            .iter()
            .filter(|chunk| chunk.document_id == document_id)
            .collect();
        if chunks.is_empty() {
            return Err(ApiError::NotFound(format!(
                "Document '{}' not found",
                document_id
            )));
        }
        chunks.sort_by_key(|chunk| chunk.chunk_index());

        Ok(Document {
            id: document_id.to_string(),
            content: reconstruct_content(&chunks),
            metadata: document_metadata(&chunks),
            chunk_count: chunks.len(),
        })
    }

    fn snapshot(&self) -> Result<Arc<Vec<Chunk>>, ApiError> {
        let guard = self.chunks.read().map_err(ApiError::internal)?;
        Ok(Arc::clone(&guard))
    }

    fn publish(&self, table: Vec<Chunk>) -> Result<(), ApiError> {
        let mut guard = self.chunks.write().map_err(ApiError::internal)?;
        *guard = Arc::new(table);
        Ok(())
    }
}

/// Chunks grouped by document, in order of first appearance.
fn group_by_document(chunks: &[Chunk]) -> Vec<(&str, Vec<&Chunk>)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&Chunk>)> = Vec::new();
    for chunk in chunks {
        let document_id = chunk.document_id.as_str();
        match positions.get(document_id) {
            Some(&position) => groups[position].1.push(chunk),
            None => {
                positions.insert(document_id, groups.len());
                groups.push((document_id, vec![chunk]));
            }
        }
    }
    for (_, group) in groups.iter_mut() {
        group.sort_by_key(|chunk| chunk.chunk_index());
    }
    groups
}

fn document_metadata(chunks: &[&Chunk]) -> Map<String, Value> {
    let mut metadata = chunks
        .first()
        .map(|chunk| chunk.metadata.clone())
        .unwrap_or_default();
    for key in CHUNK_METADATA_KEYS {
        metadata.remove(key);
    }
    metadata
}

/// Stitches ordered windows back together, skipping overlapped characters.
fn reconstruct_content(chunks: &[&Chunk]) -> String {
    let mut content = String::new();
    let mut covered = 0usize;
    for chunk in chunks {
        let start = chunk.chunk_start().unwrap_or(covered);
        let length = chunk.content.chars().count();
        let skip = covered.saturating_sub(start).min(length);
        content.extend(chunk.content.chars().skip(skip));
        covered = covered.max(start + length);
    }
    content
}
