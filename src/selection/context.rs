use serde::{Deserialize, Serialize};

use crate::core::config::defaults;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserPlan {
    Free,
    Pro,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentContext {
    Single,
    Multi,
}

/// Request-scoped facts the selection rules look at. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionContext {
    pub file_size: Option<u64>,
    pub dataset_size: Option<u64>,
    pub requires_metadata_filtering: Option<bool>,
    pub requires_structured_memory: Option<bool>,
    /// Backend type name the caller already runs, e.g. `"managed_vector"`.
    pub bring_your_own_backend: Option<String>,
    pub user_plan: Option<UserPlan>,
    pub query_tagging: Option<bool>,
    pub ocr_injected: Option<bool>,
    pub agent_context: Option<AgentContext>,
    pub delta_memory: Option<bool>,
    pub domain_tags: Vec<String>,
    pub latency_ms: Option<f64>,
    pub failure_count: Option<u32>,
    pub requires_knowledge_graph: Option<bool>,
    /// Similarity between the prompt and indexed content, in `[0, 1]`.
    pub prompt_similarity: Option<f64>,
    pub versioning_enabled: Option<bool>,
}

impl SelectionContext {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(similarity) = self.prompt_similarity {
            if !similarity.is_finite() || !(0.0..=1.0).contains(&similarity) {
                return Err(ApiError::BadRequest(format!(
                    "prompt_similarity must be within [0, 1], got {}",
                    similarity
                )));
            }
        }
        if let Some(latency) = self.latency_ms {
            if !latency.is_finite() || latency < 0.0 {
                return Err(ApiError::BadRequest(format!(
                    "latency_ms must be a non-negative number, got {}",
                    latency
                )));
            }
        }
        if let Some(backend) = &self.bring_your_own_backend {
            if backend.trim().is_empty() {
                return Err(ApiError::BadRequest(
                    "bring_your_own_backend cannot be blank".to_string(),
                ));
            }
        }
        if self.domain_tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(ApiError::BadRequest(
                "domain_tags cannot contain blank tags".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionThresholds {
    /// Files strictly below this size go to the lightweight store.
    pub small_file_bytes: u64,
    pub large_dataset_records: u64,
    pub high_latency_ms: f64,
    pub max_failures: u32,
    pub low_prompt_similarity: f64,
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            small_file_bytes: defaults::DEFAULT_SMALL_FILE_BYTES,
            large_dataset_records: defaults::DEFAULT_LARGE_DATASET_RECORDS,
            high_latency_ms: defaults::DEFAULT_HIGH_LATENCY_MS,
            max_failures: defaults::DEFAULT_MAX_FAILURES,
            low_prompt_similarity: defaults::DEFAULT_LOW_PROMPT_SIMILARITY,
        }
    }
}
