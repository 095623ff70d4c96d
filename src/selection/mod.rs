//! Context-sensitive backend selection.
//!
//! An ordered, short-circuiting rule list maps a [`SelectionContext`] to a
//! [`crate::backends::BackendType`]; when nothing matches the lightweight
//! store is chosen.

mod context;
mod engine;

pub use context::{AgentContext, SelectionContext, SelectionThresholds, UserPlan};
pub use engine::{RuleMatch, SelectionDecision, SelectionEngine, SelectionRule};
