pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.2;
pub const DEFAULT_CHUNK_STORE_FILE: &str = "lightrag_chunks.json";
pub const DEFAULT_CHUNK_DB_FILE: &str = "lightrag_chunks.db";

pub const DEFAULT_SMALL_FILE_BYTES: u64 = 1_000_000;
pub const DEFAULT_LARGE_DATASET_RECORDS: u64 = 100_000;
pub const DEFAULT_HIGH_LATENCY_MS: f64 = 2_000.0;
pub const DEFAULT_MAX_FAILURES: u32 = 3;
pub const DEFAULT_LOW_PROMPT_SIMILARITY: f64 = 0.3;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 500;
pub const DEFAULT_RETENTION_SECS: u64 = 3_600;
pub const DEFAULT_COMPATIBILITY_FAILURE_FLOOR: u8 = 40;

pub fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
