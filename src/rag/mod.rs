//! LightRAG: the in-process chunk store.
//!
//! - `LightRagStore`: chunking, embedding and brute-force cosine retrieval
//! - `ChunkPersistence`: where the chunk table lives (JSON file, SQLite, memory)

mod persistence;
mod sqlite;
mod store;
mod types;

pub use persistence::{open_persistence, ChunkPersistence, InMemoryPersistence, JsonFilePersistence};
pub use sqlite::SqliteChunkPersistence;
pub use store::LightRagStore;
pub use types::{
    Chunk, Document, DocumentSummary, LightRagConfig, RetrievedChunk, StorageBackend,
    StorageConfig, StoreStats,
};
