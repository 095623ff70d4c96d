use serde::Serialize;

use super::context::{SelectionContext, SelectionThresholds, UserPlan};
use crate::backends::BackendType;
use crate::core::errors::ApiError;

pub const ENTERPRISE_DATASET_TAG: &str = "enterprise_dataset";
pub const DEFAULT_RULE: &str = "default";

type RuleFn = fn(&SelectionContext, &SelectionThresholds) -> Option<BackendType>;

/// One entry of the ordered rule list.
pub struct SelectionRule {
    pub name: &'static str,
    evaluate: RuleFn,
}

impl SelectionRule {
    pub fn evaluate(
        &self,
        ctx: &SelectionContext,
        thresholds: &SelectionThresholds,
    ) -> Option<BackendType> {
        (self.evaluate)(ctx, thresholds)
    }
}

fn when(condition: bool, backend: BackendType) -> Option<BackendType> {
    condition.then_some(backend)
}

fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

/// First match wins.
static RULES: [SelectionRule; 16] = [
    SelectionRule {
        name: "small_file",
        evaluate: |ctx, t| {
            when(
                ctx.file_size.is_some_and(|size| size < t.small_file_bytes),
                BackendType::LightRag,
            )
        },
    },
    SelectionRule {
        name: "large_dataset",
        evaluate: |ctx, t| {
            when(
                ctx.dataset_size
                    .is_some_and(|size| size > t.large_dataset_records),
                BackendType::ManagedVector,
            )
        },
    },
    SelectionRule {
        name: "metadata_filtering",
        evaluate: |ctx, _| when(flag(ctx.requires_metadata_filtering), BackendType::Semantic),
    },
    SelectionRule {
        name: "structured_memory",
        evaluate: |ctx, _| when(flag(ctx.requires_structured_memory), BackendType::Semantic),
    },
    SelectionRule {
        name: "bring_your_own_backend",
        evaluate: |ctx, _| {
            ctx.bring_your_own_backend
                .as_deref()
                .and_then(|raw| raw.parse::<BackendType>().ok())
        },
    },
    SelectionRule {
        name: "free_plan",
        evaluate: |ctx, _| when(ctx.user_plan == Some(UserPlan::Free), BackendType::Portable),
    },
    SelectionRule {
        name: "query_tagging",
        evaluate: |ctx, _| when(flag(ctx.query_tagging), BackendType::TaggedIndex),
    },
    SelectionRule {
        name: "ocr_injected",
        evaluate: |ctx, _| when(flag(ctx.ocr_injected), BackendType::Portable),
    },
    SelectionRule {
        name: "agent_context",
        evaluate: |ctx, _| when(ctx.agent_context.is_some(), BackendType::LightRag),
    },
    SelectionRule {
        name: "delta_memory",
        evaluate: |ctx, _| when(flag(ctx.delta_memory), BackendType::LightRag),
    },
    SelectionRule {
        name: "enterprise_dataset",
        evaluate: |ctx, _| {
            when(
                ctx.domain_tags
                    .iter()
                    .any(|tag| tag.trim() == ENTERPRISE_DATASET_TAG),
                BackendType::ManagedVector,
            )
        },
    },
    SelectionRule {
        name: "high_latency",
        evaluate: |ctx, t| {
            when(
                ctx.latency_ms.is_some_and(|ms| ms > t.high_latency_ms),
                BackendType::LightRag,
            )
        },
    },
    SelectionRule {
        name: "repeated_failures",
        evaluate: |ctx, t| {
            when(
                ctx.failure_count.is_some_and(|n| n > t.max_failures),
                BackendType::LightRag,
            )
        },
    },
    SelectionRule {
        name: "knowledge_graph",
        evaluate: |ctx, _| when(flag(ctx.requires_knowledge_graph), BackendType::Semantic),
    },
    SelectionRule {
        name: "low_prompt_similarity",
        evaluate: |ctx, t| {
            when(
                ctx.prompt_similarity
                    .is_some_and(|s| s < t.low_prompt_similarity),
                BackendType::Portable,
            )
        },
    },
    SelectionRule {
        name: "versioning",
        evaluate: |ctx, _| when(flag(ctx.versioning_enabled), BackendType::Portable),
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub backend_type: BackendType,
    /// False when an earlier rule already decided.
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionDecision {
    pub selected_type: BackendType,
    pub applied_rule: &'static str,
    pub matched_rules: Vec<RuleMatch>,
    pub fallback_chain: Vec<BackendType>,
}

pub struct SelectionEngine {
    thresholds: SelectionThresholds,
}

impl SelectionEngine {
    pub fn new(thresholds: SelectionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn rules() -> &'static [SelectionRule] {
        &RULES
    }

    pub fn select(&self, ctx: &SelectionContext) -> BackendType {
        RULES
            .iter()
            .find_map(|rule| rule.evaluate(ctx, &self.thresholds))
            .unwrap_or(BackendType::LightRag)
    }

    /// Validates `ctx` and explains the selection.
    pub fn decide(&self, ctx: &SelectionContext) -> Result<SelectionDecision, ApiError> {
        ctx.validate()?;

        let matched_rules: Vec<RuleMatch> = RULES
            .iter()
            .filter_map(|rule| {
                rule.evaluate(ctx, &self.thresholds)
                    .map(|backend_type| (rule.name, backend_type))
            })
            .enumerate()
            .map(|(position, (rule, backend_type))| RuleMatch {
                rule,
                backend_type,
                applied: position == 0,
            })
            .collect();

        let (selected_type, applied_rule) = matched_rules
            .first()
            .map(|m| (m.backend_type, m.rule))
            .unwrap_or((BackendType::LightRag, DEFAULT_RULE));

        tracing::debug!(
            "Selected {} via rule '{}' ({} rules matched)",
            selected_type,
            applied_rule,
            matched_rules.len()
        );

        Ok(SelectionDecision {
            selected_type,
            applied_rule,
            matched_rules,
            fallback_chain: Self::fallback_chain(selected_type),
        })
    }

    /// Designated one-hop fallback for each type.
    pub fn fallback(backend: BackendType) -> BackendType {
        match backend {
            BackendType::LightRag => BackendType::Portable,
            BackendType::ManagedVector => BackendType::Portable,
            BackendType::Semantic => BackendType::ManagedVector,
            BackendType::Hybrid => BackendType::Semantic,
            BackendType::Portable => BackendType::LightRag,
            BackendType::TaggedIndex => BackendType::Semantic,
            BackendType::Code => BackendType::Hybrid,
            BackendType::Legal => BackendType::Hybrid,
            BackendType::Multimodal => BackendType::ManagedVector,
            BackendType::Custom => BackendType::LightRag,
        }
    }

    /// Successive fallbacks from `backend`, stopping before any type repeats.
    pub fn fallback_chain(backend: BackendType) -> Vec<BackendType> {
        let mut chain = Vec::new();
        let mut current = backend;
        loop {
            let next = Self::fallback(current);
            if next == backend || chain.contains(&next) {
                return chain;
            }
            chain.push(next);
            current = next;
        }
    }

    pub fn high_reliability_chain() -> [BackendType; 2] {
        [BackendType::LightRag, BackendType::Portable]
    }
}
