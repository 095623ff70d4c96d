//! Context-aware selection, compatibility scoring and migration across
//! retrieval-augmented-generation backends, plus a lightweight local
//! chunk store.

pub mod backends;
pub mod core;
pub mod embedding;
pub mod migration;
pub mod rag;
pub mod selection;
pub mod server;
pub mod state;
pub mod vector_math;
