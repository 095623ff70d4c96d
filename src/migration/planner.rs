use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::compatibility::CompatibilityModel;
use crate::backends::BackendType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub source: BackendType,
    pub target: BackendType,
    pub document_count: u64,
    pub compatibility_score: u8,
    pub batch_size: u32,
    pub estimated_time: String,
    pub estimated_seconds: f64,
    pub preserve_metadata: bool,
    pub reembedding: bool,
    pub data_transformation: bool,
    pub recommendations: Vec<String>,
}

pub struct MigrationPlanner {
    compatibility: Arc<CompatibilityModel>,
}

impl MigrationPlanner {
    pub fn new(compatibility: Arc<CompatibilityModel>) -> Self {
        Self { compatibility }
    }

    pub fn transfer_recommendations(
        &self,
        source: BackendType,
        target: BackendType,
        document_count: u64,
    ) -> TransferPlan {
        let score = self.compatibility.score(source, target);
        let reembedding = self.compatibility.needs_reembedding(source, target);
        let preserve_metadata = score >= 70;
        let data_transformation = score < 80;
        let estimated_seconds = estimate_seconds(document_count, score, reembedding);

        let mut plan = TransferPlan {
            source,
            target,
            document_count,
            compatibility_score: score,
            batch_size: batch_size(document_count, score),
            estimated_time: format_duration(estimated_seconds),
            estimated_seconds,
            preserve_metadata,
            reembedding,
            data_transformation,
            recommendations: Vec::new(),
        };
        plan.recommendations = recommendations(&plan);
        plan
    }
}

fn batch_size(document_count: u64, score: u8) -> u32 {
    let base = match document_count {
        0..=10 => 10,
        11..=100 => 20,
        101..=1000 => 50,
        _ => 100,
    };
    if score < 60 {
        (base / 2).max(5)
    } else {
        base
    }
}

fn estimate_seconds(document_count: u64, score: u8, reembedding: bool) -> f64 {
    let per_document = if reembedding { 2.0 } else { 0.5 };
    let score = f64::from(score.max(1));
    per_document * document_count as f64 * (100.0 / score)
}

fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return plural(seconds.ceil() as u64, "second");
    }

    let total_minutes = (seconds / 60.0).ceil() as u64;
    if seconds < 3600.0 {
        return plural(total_minutes, "minute");
    }

    format!(
        "{} {}",
        plural(total_minutes / 60, "hour"),
        plural(total_minutes % 60, "minute")
    )
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

fn recommendations(plan: &TransferPlan) -> Vec<String> {
    let mut advice: Vec<String> = Vec::new();
    let mut push = |text: &str| {
        if !advice.iter().any(|existing| existing == text) {
            advice.push(text.to_string());
        }
    };

    if plan.document_count > 1000 {
        push("Schedule the migration during a low-traffic window");
    }
    if plan.document_count > 100 {
        push("Validate a sample batch before migrating the full collection");
    }
    if plan.reembedding {
        push("Budget time and compute for re-embedding every document");
    }
    if !plan.preserve_metadata {
        push("Export document metadata separately before migrating");
    }
    if plan.data_transformation {
        push("Review transformed documents for formatting and structure loss");
    }

    if plan.source != plan.target {
        match plan.source {
            BackendType::Multimodal => {
                push("Keep the original multimodal backend for image content")
            }
            BackendType::Code => push("Keep the original code backend for symbol-aware search"),
            BackendType::Legal => push("Keep the original legal backend for citation lookups"),
            _ => {}
        }
    }

    if plan.target == BackendType::LightRag && plan.document_count > 1000 {
        push("Consider a managed vector index for collections larger than 1000 documents");
    }
    if plan.target == BackendType::Hybrid && plan.source != BackendType::Hybrid {
        push("Tune keyword and semantic weighting after migration");
    }

    if plan.compatibility_score < 60 {
        push("Keep the source backend active until retrieval quality is verified");
    }
    if plan.compatibility_score < 50 {
        push("Review lost features before decommissioning the source backend");
    }

    advice
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> MigrationPlanner {
        MigrationPlanner::new(Arc::new(CompatibilityModel::builtin().unwrap()))
    }

    #[test]
    fn batch_size_buckets_and_halving() {
        assert_eq!(batch_size(0, 100), 10);
        assert_eq!(batch_size(10, 100), 10);
        assert_eq!(batch_size(11, 100), 20);
        assert_eq!(batch_size(1000, 100), 50);
        assert_eq!(batch_size(1001, 100), 100);
        assert_eq!(batch_size(50, 59), 10);
        assert_eq!(batch_size(5, 30), 5);
    }

    #[test]
    fn duration_formatting_bands() {
        assert_eq!(format_duration(0.5), "1 second");
        assert_eq!(format_duration(45.0), "45 seconds");
        assert_eq!(format_duration(60.0), "1 minute");
        assert_eq!(format_duration(150.0), "3 minutes");
        assert_eq!(format_duration(3600.0), "1 hour 0 minutes");
        assert_eq!(format_duration(7_500.0), "2 hours 5 minutes");
    }

    #[test]
    fn zero_score_does_not_divide_by_zero() {
        let seconds = estimate_seconds(10, 0, false);
        assert!(seconds.is_finite());
        assert!((seconds - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reembedding_increases_estimate() {
        for count in [1, 10, 500, 20_000] {
            for score in [1, 40, 75, 100] {
                assert!(estimate_seconds(count, score, true) > estimate_seconds(count, score, false));
            }
        }

        let planner = planner();
        let with = planner.transfer_recommendations(BackendType::Code, BackendType::Portable, 200);
        let without = planner.transfer_recommendations(BackendType::Semantic, BackendType::Portable, 200);
        assert!(with.reembedding);
        assert!(!without.reembedding);
        assert!(with.estimated_seconds > without.estimated_seconds);
    }

    #[test]
    fn multimodal_to_lightrag_plan() {
        let plan = planner().transfer_recommendations(
            BackendType::Multimodal,
            BackendType::LightRag,
            5000,
        );

        assert_eq!(plan.compatibility_score, 35);
        assert_eq!(plan.batch_size, 50);
        assert!(plan.reembedding);
        assert!(!plan.preserve_metadata);
        assert!(plan.data_transformation);
        assert_eq!(plan.estimated_time, "7 hours 57 minutes");

        let recommendations = &plan.recommendations;
        assert_eq!(
            recommendations[0],
            "Schedule the migration during a low-traffic window"
        );
        assert!(recommendations
            .iter()
            .any(|r| r == "Keep the original multimodal backend for image content"));
        assert!(recommendations
            .iter()
            .any(|r| r.starts_with("Consider a managed vector index")));

        let mut deduped = recommendations.clone();
        deduped.dedup();
        assert_eq!(&deduped, recommendations);
        let keep_source = recommendations
            .iter()
            .filter(|r| r.starts_with("Keep the source backend"))
            .count();
        assert_eq!(keep_source, 1);
    }

    #[test]
    fn small_compatible_plan_has_little_advice() {
        let plan = planner().transfer_recommendations(BackendType::LightRag, BackendType::Portable, 5);

        assert_eq!(plan.batch_size, 10);
        assert!(plan.preserve_metadata);
        assert!(!plan.data_transformation);
        assert!(!plan.reembedding);
        assert_eq!(plan.estimated_time, "3 seconds");
        assert!(plan.recommendations.is_empty());
    }
}
