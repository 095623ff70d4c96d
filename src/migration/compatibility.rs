use serde::{Deserialize, Serialize};

use crate::backends::BackendType;
use crate::core::errors::ApiError;

const N: usize = BackendType::COUNT;

/// Built-in scores, rows are sources and columns targets, both in
/// [`BackendType::ALL`] order.
const BUILTIN_ROWS: [(BackendType, [u8; N]); N] = [
    (BackendType::LightRag, [100, 85, 80, 80, 90, 80, 70, 70, 60, 75]),
    (BackendType::ManagedVector, [80, 100, 85, 80, 85, 80, 70, 70, 60, 75]),
    (BackendType::Semantic, [75, 85, 100, 85, 80, 80, 65, 70, 55, 70]),
    (BackendType::Hybrid, [60, 70, 80, 100, 65, 70, 60, 65, 50, 65]),
    (BackendType::Portable, [85, 85, 80, 75, 100, 80, 70, 70, 60, 75]),
    (BackendType::TaggedIndex, [75, 80, 80, 75, 80, 100, 65, 65, 55, 70]),
    (BackendType::Code, [45, 50, 55, 60, 50, 50, 100, 40, 35, 60]),
    (BackendType::Legal, [50, 55, 60, 65, 55, 55, 40, 100, 35, 60]),
    (BackendType::Multimodal, [35, 45, 45, 40, 40, 40, 30, 30, 100, 55]),
    (BackendType::Custom, [65, 70, 70, 70, 70, 65, 60, 60, 50, 100]),
];

/// Pairs whose vectors live in incompatible embedding spaces.
const DIFFERENT_EMBEDDING_SPACES: [(BackendType, BackendType); 7] = [
    (BackendType::LightRag, BackendType::ManagedVector),
    (BackendType::ManagedVector, BackendType::LightRag),
    (BackendType::Hybrid, BackendType::LightRag),
    (BackendType::Hybrid, BackendType::Portable),
    (BackendType::TaggedIndex, BackendType::Semantic),
    (BackendType::Custom, BackendType::LightRag),
    (BackendType::Custom, BackendType::ManagedVector),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferComplexity {
    Simple,
    Moderate,
    Complex,
}

impl TransferComplexity {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            TransferComplexity::Simple
        } else if score >= 60 {
            TransferComplexity::Moderate
        } else {
            TransferComplexity::Complex
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    pub preserved: Vec<String>,
    pub degraded: Vec<String>,
    pub lost: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityInfo {
    pub source: BackendType,
    pub target: BackendType,
    pub score: u8,
    pub transfer_complexity: TransferComplexity,
    pub features: FeatureReport,
    pub warnings: Vec<String>,
    pub needs_reembedding: bool,
}

/// Complete, asymmetric `source x target -> 0..=100` table.
#[derive(Debug, Clone)]
pub struct CompatibilityModel {
    scores: [[u8; N]; N],
}

impl CompatibilityModel {
    pub fn builtin() -> Result<Self, ApiError> {
        Self::from_rows(&BUILTIN_ROWS)
    }

    /// Builds a table from one row per source type. Every source must appear
    /// exactly once with a score for every target, self pairs must be 100 and
    /// no score may exceed 100.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[(BackendType, R)]) -> Result<Self, ApiError> {
        let mut scores = [[0u8; N]; N];
        let mut seen = [false; N];

        for (source, row) in rows {
            let row = row.as_ref();
            let i = source.index();
            if seen[i] {
                return Err(ApiError::InvalidConfig(format!(
                    "compatibility table has a duplicate row for '{}'",
                    source
                )));
            }
            seen[i] = true;

            if row.len() != N {
                return Err(ApiError::InvalidConfig(format!(
                    "compatibility row for '{}' has {} scores, expected {}",
                    source,
                    row.len(),
                    N
                )));
            }
            for (j, &score) in row.iter().enumerate() {
                if score > 100 {
                    return Err(ApiError::InvalidConfig(format!(
                        "compatibility score {} -> {} is {}, above 100",
                        source,
                        BackendType::ALL[j],
                        score
                    )));
                }
            }
            if row[i] != 100 {
                return Err(ApiError::InvalidConfig(format!(
                    "self compatibility for '{}' must be 100, got {}",
                    source, row[i]
                )));
            }
            scores[i].copy_from_slice(row);
        }

        if let Some(missing) = BackendType::ALL.iter().find(|t| !seen[t.index()]) {
            return Err(ApiError::InvalidConfig(format!(
                "compatibility table has no row for '{}'",
                missing
            )));
        }

        Ok(Self { scores })
    }

    pub fn score(&self, source: BackendType, target: BackendType) -> u8 {
        self.scores[source.index()][target.index()]
    }

    pub fn needs_reembedding(&self, source: BackendType, target: BackendType) -> bool {
        if source == target {
            return false;
        }
        source.is_specialized() || DIFFERENT_EMBEDDING_SPACES.contains(&(source, target))
    }

    pub fn compatibility_info(&self, source: BackendType, target: BackendType) -> CompatibilityInfo {
        let score = self.score(source, target);
        let needs_reembedding = self.needs_reembedding(source, target);

        CompatibilityInfo {
            source,
            target,
            score,
            transfer_complexity: TransferComplexity::from_score(score),
            features: feature_report(source, target, score),
            warnings: warnings(source, target, score, needs_reembedding),
            needs_reembedding,
        }
    }
}

fn feature_report(source: BackendType, target: BackendType, score: u8) -> FeatureReport {
    let mut report = FeatureReport::default();
    report.preserved.push("document content".to_string());
    if score >= 70 {
        report.preserved.push("metadata".to_string());
    } else {
        report.degraded.push("metadata".to_string());
    }

    match source {
        BackendType::Multimodal if target != BackendType::Multimodal => {
            report.lost.push("image support".to_string());
        }
        BackendType::Code if target != BackendType::Code => {
            report.lost.push("symbol extraction".to_string());
        }
        BackendType::Hybrid
            if !matches!(target, BackendType::Hybrid | BackendType::Semantic) =>
        {
            report
                .lost
                .push("combined keyword+semantic search".to_string());
        }
        BackendType::Legal if target != BackendType::Legal => {
            report.degraded.push("citation-aware chunking".to_string());
        }
        _ => {}
    }

    if score >= 90 {
        report
            .preserved
            .push("most specialized features".to_string());
    } else if score >= 70 {
        report
            .degraded
            .push("some specialized features".to_string());
    } else {
        report.lost.push("most specialized features".to_string());
    }

    report
}

fn warnings(
    source: BackendType,
    target: BackendType,
    score: u8,
    needs_reembedding: bool,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if score < 50 {
        warnings.push(format!(
            "Significant data loss likely (compatibility score {})",
            score
        ));
    }

    if source != target {
        match source {
            BackendType::Multimodal => warnings.push(format!(
                "Image and other non-text content will not carry over to {}",
                target
            )),
            BackendType::Code => warnings.push(format!(
                "Code structure and symbol information will be flattened in {}",
                target
            )),
            BackendType::Legal => warnings.push(format!(
                "Legal citation structure may be degraded in {}",
                target
            )),
            _ => {}
        }
    }

    if score < 70 {
        warnings.push("Metadata may not be preserved".to_string());
    }

    if needs_reembedding {
        warnings.push(format!(
            "Documents must be re-embedded for the {} embedding space",
            target
        ));
    }

    warnings
}
