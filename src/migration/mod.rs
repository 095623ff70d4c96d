//! Moving documents between backends.
//!
//! - `CompatibilityModel`: pairwise type scores and feature-loss rules
//! - `MigrationPlanner`: batch size, time estimate and advice for a move
//! - `MigrationOrchestrator`: asynchronous transfers between backend instances

mod compatibility;
mod orchestrator;
mod planner;

pub use compatibility::{CompatibilityInfo, CompatibilityModel, FeatureReport, TransferComplexity};
pub use orchestrator::{
    ImmediateTicks, IntervalTicks, MigrationConfig, MigrationOrchestrator, TickSource,
    TransferOperation, TransferStatus,
};
pub use planner::{MigrationPlanner, TransferPlan};
