//! SQLite-backed chunk persistence.
//!
//! The chunk table is replaced wholesale inside one transaction, so readers
//! of the database never observe a half-written table.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::persistence::ChunkPersistence;
use super::types::Chunk;
use crate::core::errors::ApiError;

pub struct SqliteChunkPersistence {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteChunkPersistence {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ApiError::internal)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS lightrag_chunks (
                chunk_id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_lightrag_document ON lightrag_chunks(document_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk, ApiError> {
        let metadata_str: String = row.try_get("metadata").map_err(ApiError::internal)?;
        let metadata = match serde_json::from_str::<Value>(&metadata_str) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let blob: Vec<u8> = row.try_get("embedding").map_err(ApiError::internal)?;

        Ok(Chunk {
            id: row.try_get("chunk_id").map_err(ApiError::internal)?,
            document_id: row.try_get("document_id").map_err(ApiError::internal)?,
            content: row.try_get("content").map_err(ApiError::internal)?,
            metadata,
            embedding: Self::deserialize_embedding(&blob),
        })
    }
}

#[async_trait]
impl ChunkPersistence for SqliteChunkPersistence {
    async fn load(&self) -> Result<Vec<Chunk>, ApiError> {
        let rows = sqlx::query(
            "SELECT chunk_id, document_id, content, metadata, embedding
             FROM lightrag_chunks ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        rows.iter().map(Self::row_to_chunk).collect()
    }

    async fn save_all(&self, chunks: &[Chunk]) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM lightrag_chunks")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        for (position, chunk) in chunks.iter().enumerate() {
            let metadata_str =
                serde_json::to_string(&chunk.metadata).map_err(ApiError::internal)?;
            sqlx::query(
                "INSERT INTO lightrag_chunks (chunk_id, document_id, position, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(position as i64)
            .bind(&chunk.content)
            .bind(&metadata_str)
            .bind(Self::serialize_embedding(&chunk.embedding))
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite {}", self.db_path.display())
    }
}
