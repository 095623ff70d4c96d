use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to build compatibility table: {0}")]
    Compatibility(#[source] anyhow::Error),

    #[error("Failed to register backends: {0}")]
    Backends(#[source] anyhow::Error),

    #[error("Failed to initialize embedding provider: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to open LightRAG chunk store: {0}")]
    ChunkStore(#[source] anyhow::Error),

    #[error("Failed to initialize migration orchestrator: {0}")]
    Migration(#[source] anyhow::Error),
}
