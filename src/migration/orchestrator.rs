use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};
use uuid::Uuid;

use super::compatibility::CompatibilityModel;
use crate::backends::{BackendRegistry, BackendType};
use crate::core::config::defaults;
use crate::core::errors::ApiError;

const METADATA_WARNING_PROGRESS: u8 = 30;
const METADATA_WARNING: &str = "Some metadata fields could not be preserved";
const CANCELLED_ERROR: &str = "Transfer cancelled by caller";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub tick_interval_ms: u64,
    /// How long finished operations stay queryable.
    pub retention_secs: u64,
    /// Per-tick failure probability added to every transfer.
    pub chaos_failure_rate: f64,
    /// Transfers between types scoring below this floor may fail at random.
    pub compatibility_failure_floor: u8,
    /// Fail every transfer once it reaches this progress.
    pub fail_at_progress: Option<u8>,
    pub seed: Option<u64>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: defaults::DEFAULT_TICK_INTERVAL_MS,
            retention_secs: defaults::DEFAULT_RETENTION_SECS,
            chaos_failure_rate: 0.0,
            compatibility_failure_floor: defaults::DEFAULT_COMPATIBILITY_FAILURE_FLOOR,
            fail_at_progress: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub operation_id: String,
    pub source_id: String,
    pub target_id: String,
    pub source_type: BackendType,
    pub target_type: BackendType,
    pub compatibility_score: u8,
    pub document_ids: Vec<String>,
    pub status: TransferStatus,
    pub progress: u8,
    pub documents_processed: usize,
    pub total_documents: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl TransferOperation {
    fn fail(&mut self, error: String) {
        self.status = TransferStatus::Failed;
        self.end_time = Some(Utc::now());
        self.errors.push(error);
    }
}

/// Paces the progress driver.
#[async_trait]
pub trait TickSource: Send + Sync {
    async fn wait_tick(&self);
}

pub struct IntervalTicks {
    interval: Duration,
}

impl IntervalTicks {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn wait_tick(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Ticks as fast as the scheduler allows.
pub struct ImmediateTicks;

#[async_trait]
impl TickSource for ImmediateTicks {
    async fn wait_tick(&self) {
        tokio::task::yield_now().await;
    }
}

struct TransferHandle {
    state: Arc<watch::Sender<TransferOperation>>,
    cancel: Arc<Notify>,
}

/// Failure signals for one transfer, fixed at start.
struct FailurePolicy {
    probability: f64,
    fail_at_progress: Option<u8>,
}

pub struct MigrationOrchestrator {
    registry: Arc<BackendRegistry>,
    compatibility: Arc<CompatibilityModel>,
    config: MigrationConfig,
    ticks: Arc<dyn TickSource>,
    rng: Mutex<StdRng>,
    operations: RwLock<HashMap<String, TransferHandle>>,
}

impl MigrationOrchestrator {
    pub fn new(
        registry: Arc<BackendRegistry>,
        compatibility: Arc<CompatibilityModel>,
        config: MigrationConfig,
        ticks: Arc<dyn TickSource>,
    ) -> Result<Self, ApiError> {
        if !(0.0..=1.0).contains(&config.chaos_failure_rate) {
            return Err(ApiError::InvalidConfig(format!(
                "migration.chaos_failure_rate must be within [0, 1], got {}",
                config.chaos_failure_rate
            )));
        }
        if config.fail_at_progress.is_some_and(|p| p > 100) {
            return Err(ApiError::InvalidConfig(
                "migration.fail_at_progress must be within [0, 100]".to_string(),
            ));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            registry,
            compatibility,
            config,
            ticks,
            rng: Mutex::new(rng),
            operations: RwLock::new(HashMap::new()),
        })
    }

    /// Orchestrator paced by `migration.tick_interval_ms`.
    pub fn from_config(
        registry: Arc<BackendRegistry>,
        compatibility: Arc<CompatibilityModel>,
        config: MigrationConfig,
    ) -> Result<Self, ApiError> {
        let ticks = Arc::new(IntervalTicks::new(Duration::from_millis(
            config.tick_interval_ms.max(1),
        )));
        Self::new(registry, compatibility, config, ticks)
    }

    /// Registers a transfer and spawns its driver. Must be called inside a
    /// Tokio runtime.
    pub fn start_transfer(
        &self,
        source_id: &str,
        target_id: &str,
        document_ids: Vec<String>,
    ) -> Result<String, ApiError> {
        if source_id == target_id {
            return Err(ApiError::BadRequest(
                "Source and target backends must differ".to_string(),
            ));
        }
        if document_ids.is_empty() {
            return Err(ApiError::BadRequest(
                "document_ids cannot be empty".to_string(),
            ));
        }
        if document_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ApiError::BadRequest(
                "document_ids cannot contain blank ids".to_string(),
            ));
        }

        let source = self.registry.get(source_id)?;
        let target = self.registry.get(target_id)?;
        if !target.is_active {
            return Err(ApiError::BadRequest(format!(
                "Target backend '{}' is not active",
                target_id
            )));
        }

        self.purge_expired();

        let score = self
            .compatibility
            .score(source.backend_type, target.backend_type);
        let policy = self.failure_policy(score);
        let driver_rng = {
            let mut master = self.rng.lock().map_err(ApiError::internal)?;
            StdRng::seed_from_u64(master.random())
        };

        let operation_id = Uuid::new_v4().to_string();
        let operation = TransferOperation {
            operation_id: operation_id.clone(),
            source_id: source.id.clone(),
            target_id: target.id.clone(),
            source_type: source.backend_type,
            target_type: target.backend_type,
            compatibility_score: score,
            total_documents: document_ids.len(),
            document_ids,
            status: TransferStatus::Pending,
            progress: 0,
            documents_processed: 0,
            start_time: Utc::now(),
            end_time: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        let (state, _) = watch::channel(operation);
        let state = Arc::new(state);
        let cancel = Arc::new(Notify::new());
        {
            let mut operations = self.operations.write().map_err(ApiError::internal)?;
            operations.insert(
                operation_id.clone(),
                TransferHandle {
                    state: state.clone(),
                    cancel: cancel.clone(),
                },
            );
        }

        tracing::info!(
            "Transfer {} started: {} ({}) -> {} ({}), score {}",
            operation_id,
            source.id,
            source.backend_type,
            target.id,
            target.backend_type,
            score
        );

        tokio::spawn(drive_transfer(
            state,
            cancel,
            self.ticks.clone(),
            self.registry.clone(),
            policy,
            driver_rng,
        ));

        Ok(operation_id)
    }

    pub fn status(&self, operation_id: &str) -> Result<TransferOperation, ApiError> {
        self.purge_expired();
        let operations = self.operations.read().map_err(ApiError::internal)?;
        operations
            .get(operation_id)
            .map(|handle| handle.state.borrow().clone())
            .ok_or_else(|| not_found(operation_id))
    }

    /// Every retained operation, newest first.
    pub fn list(&self) -> Result<Vec<TransferOperation>, ApiError> {
        self.purge_expired();
        let operations = self.operations.read().map_err(ApiError::internal)?;
        let mut snapshots: Vec<TransferOperation> = operations
            .values()
            .map(|handle| handle.state.borrow().clone())
            .collect();
        snapshots.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(snapshots)
    }

    /// Receiver that observes every snapshot the driver publishes.
    pub fn subscribe(
        &self,
        operation_id: &str,
    ) -> Result<watch::Receiver<TransferOperation>, ApiError> {
        let operations = self.operations.read().map_err(ApiError::internal)?;
        operations
            .get(operation_id)
            .map(|handle| handle.state.subscribe())
            .ok_or_else(|| not_found(operation_id))
    }

    pub fn cancel(&self, operation_id: &str) -> Result<TransferOperation, ApiError> {
        let operations = self.operations.read().map_err(ApiError::internal)?;
        let handle = operations
            .get(operation_id)
            .ok_or_else(|| not_found(operation_id))?;

        let cancelled = handle.state.send_if_modified(|operation| {
            if operation.status.is_terminal() {
                return false;
            }
            operation.fail(CANCELLED_ERROR.to_string());
            true
        });
        if !cancelled {
            return Err(ApiError::BadRequest(format!(
                "Transfer '{}' has already finished",
                operation_id
            )));
        }

        handle.cancel.notify_one();
        tracing::info!("Transfer {} cancelled", operation_id);
        let snapshot = handle.state.borrow().clone();
        Ok(snapshot)
    }

    /// Drops terminal operations that ended longer ago than the retention window.
    pub fn purge_expired(&self) {
        let retention = chrono::Duration::seconds(self.config.retention_secs as i64);
        let cutoff = Utc::now() - retention;

        let Ok(mut operations) = self.operations.write() else {
            tracing::warn!("Transfer table lock poisoned; skipping purge");
            return;
        };
        let before = operations.len();
        operations.retain(|_, handle| {
            let operation = handle.state.borrow();
            !(operation.status.is_terminal()
                && operation.end_time.is_some_and(|end| end <= cutoff))
        });
        let purged = before - operations.len();
        if purged > 0 {
            tracing::debug!("Purged {} expired transfer operations", purged);
        }
    }

    fn failure_policy(&self, score: u8) -> FailurePolicy {
        let floor = self.config.compatibility_failure_floor;
        let compatibility_term = if score < floor {
            f64::from(floor - score) / 200.0
        } else {
            0.0
        };

        FailurePolicy {
            probability: (self.config.chaos_failure_rate + compatibility_term).clamp(0.0, 1.0),
            fail_at_progress: self.config.fail_at_progress,
        }
    }
}

fn not_found(operation_id: &str) -> ApiError {
    ApiError::NotFound(format!("Transfer operation '{}' not found", operation_id))
}

enum TickOutcome {
    Running,
    Completed { target_id: String, total: usize },
    Failed,
    Stopped,
}

async fn drive_transfer(
    state: Arc<watch::Sender<TransferOperation>>,
    cancel: Arc<Notify>,
    ticks: Arc<dyn TickSource>,
    registry: Arc<BackendRegistry>,
    policy: FailurePolicy,
    mut rng: StdRng,
) {
    state.send_if_modified(|operation| {
        if operation.status != TransferStatus::Pending {
            return false;
        }
        operation.status = TransferStatus::InProgress;
        true
    });

    loop {
        tokio::select! {
            _ = cancel.notified() => return,
            _ = ticks.wait_tick() => {}
        }

        let step: u8 = rng.random_range(5..=15);
        let random_failure = policy.probability > 0.0 && rng.random_bool(policy.probability);

        let mut outcome = TickOutcome::Stopped;
        state.send_if_modified(|operation| {
            if operation.status.is_terminal() {
                return false;
            }

            let previous = operation.progress;
            let next = previous.saturating_add(step).min(100);
            operation.progress = next;
            operation.documents_processed =
                (next as usize * operation.total_documents) / 100;

            if previous < METADATA_WARNING_PROGRESS && next >= METADATA_WARNING_PROGRESS {
                operation.warnings.push(METADATA_WARNING.to_string());
            }

            let forced = policy.fail_at_progress.is_some_and(|at| next >= at);
            if forced || random_failure {
                // The failing tick's batch is not counted.
                operation.documents_processed =
                    (previous as usize * operation.total_documents) / 100;
                let reason = if forced { "chaos injection" } else { "backend error" };
                operation.fail(format!(
                    "Transfer failed at {}% ({}; compatibility score {} for {} -> {})",
                    next,
                    reason,
                    operation.compatibility_score,
                    operation.source_type,
                    operation.target_type
                ));
                outcome = TickOutcome::Failed;
                return true;
            }

            if next == 100 {
                operation.status = TransferStatus::Completed;
                operation.documents_processed = operation.total_documents;
                operation.end_time = Some(Utc::now());
                outcome = TickOutcome::Completed {
                    target_id: operation.target_id.clone(),
                    total: operation.total_documents,
                };
                return true;
            }

            outcome = TickOutcome::Running;
            true
        });

        match outcome {
            TickOutcome::Running => continue,
            TickOutcome::Completed { target_id, total } => {
                if let Err(e) = registry.record_transfer(&target_id, total as u64) {
                    tracing::warn!("Could not update metrics for {}: {}", target_id, e);
                }
                tracing::info!(
                    "Transfer {} completed ({} documents)",
                    state.borrow().operation_id,
                    total
                );
                return;
            }
            TickOutcome::Failed => {
                let operation = state.borrow();
                tracing::warn!(
                    "Transfer {} failed: {}",
                    operation.operation_id,
                    operation.errors.last().map(String::as_str).unwrap_or("")
                );
                return;
            }
            TickOutcome::Stopped => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BackendInstanceConfig, BackendMetrics, LOCAL_LIGHTRAG_ID};

    fn registry() -> Arc<BackendRegistry> {
        let configs = [
            ("archive", BackendType::Portable, true),
            ("images", BackendType::Multimodal, true),
            ("repo", BackendType::Code, true),
            ("retired", BackendType::Semantic, false),
        ]
        .into_iter()
        .map(|(id, backend_type, is_active)| BackendInstanceConfig {
            id: id.to_string(),
            backend_type,
            is_active,
            metrics: BackendMetrics::default(),
        })
        .collect::<Vec<_>>();
        Arc::new(BackendRegistry::from_configs(&configs).unwrap())
    }

    fn orchestrator(config: MigrationConfig) -> MigrationOrchestrator {
        MigrationOrchestrator::new(
            registry(),
            Arc::new(CompatibilityModel::builtin().unwrap()),
            config,
            Arc::new(ImmediateTicks),
        )
        .unwrap()
    }

    fn seeded(seed: u64) -> MigrationConfig {
        MigrationConfig {
            seed: Some(seed),
            ..MigrationConfig::default()
        }
    }

    fn docs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("doc-{}", i)).collect()
    }

    async fn wait_terminal(
        orchestrator: &MigrationOrchestrator,
        operation_id: &str,
    ) -> Vec<TransferOperation> {
        let mut rx = orchestrator.subscribe(operation_id).unwrap();
        let mut seen = vec![rx.borrow_and_update().clone()];
        while !seen.last().unwrap().status.is_terminal() {
            rx.changed().await.unwrap();
            seen.push(rx.borrow_and_update().clone());
        }
        seen
    }

    #[tokio::test]
    async fn transfer_completes_with_all_documents_processed() {
        let orchestrator = orchestrator(seeded(7));
        let id = orchestrator
            .start_transfer(LOCAL_LIGHTRAG_ID, "archive", docs(37))
            .unwrap();

        let history = wait_terminal(&orchestrator, &id).await;
        let finished = orchestrator.status(&id).unwrap();

        assert_eq!(finished.status, TransferStatus::Completed);
        assert_eq!(finished.progress, 100);
        assert_eq!(finished.documents_processed, 37);
        assert!(finished.end_time.is_some());
        assert!(finished.errors.is_empty());
        assert_eq!(finished.warnings, vec![METADATA_WARNING.to_string()]);
        assert!(history
            .windows(2)
            .all(|pair| pair[0].progress <= pair[1].progress));
        assert!(history.iter().all(|op| op.documents_processed <= op.total_documents));

        let archive = orchestrator.registry.get("archive").unwrap();
        assert_eq!(archive.metrics.document_count, 37);
    }

    #[tokio::test]
    async fn documents_processed_equals_total_only_when_completed() {
        let orchestrator = orchestrator(seeded(99));
        let id = orchestrator
            .start_transfer("archive", LOCAL_LIGHTRAG_ID, docs(1000))
            .unwrap();

        for snapshot in wait_terminal(&orchestrator, &id).await {
            let all_done = snapshot.documents_processed == snapshot.total_documents;
            assert_eq!(all_done, snapshot.status == TransferStatus::Completed);
        }
    }

    #[tokio::test]
    async fn fail_at_progress_fails_the_transfer() {
        let orchestrator = orchestrator(MigrationConfig {
            fail_at_progress: Some(50),
            ..seeded(3)
        });
        let id = orchestrator
            .start_transfer(LOCAL_LIGHTRAG_ID, "archive", docs(10))
            .unwrap();

        wait_terminal(&orchestrator, &id).await;
        let failed = orchestrator.status(&id).unwrap();

        assert_eq!(failed.status, TransferStatus::Failed);
        assert!(failed.progress >= 50);
        assert!(failed.documents_processed < failed.total_documents);
        assert_eq!(failed.errors.len(), 1);
        assert!(failed.errors[0].contains("compatibility score 90"));
        assert!(failed.end_time.is_some());
    }

    #[tokio::test]
    async fn failure_on_final_tick_leaves_documents_unfinished() {
        let orchestrator = orchestrator(MigrationConfig {
            fail_at_progress: Some(100),
            ..seeded(1)
        });
        let id = orchestrator
            .start_transfer(LOCAL_LIGHTRAG_ID, "archive", docs(3))
            .unwrap();

        let history = wait_terminal(&orchestrator, &id).await;
        let failed = history.last().unwrap();

        assert_eq!(failed.status, TransferStatus::Failed);
        assert_eq!(failed.progress, 100);
        assert!(failed.documents_processed < failed.total_documents);
        for snapshot in &history {
            let all_done = snapshot.documents_processed == snapshot.total_documents;
            assert_eq!(all_done, snapshot.status == TransferStatus::Completed);
        }
        assert_eq!(
            orchestrator.registry.get("archive").unwrap().metrics.document_count,
            0
        );
    }

    #[tokio::test]
    async fn certain_chaos_failure_fails_on_first_tick() {
        let orchestrator = orchestrator(MigrationConfig {
            chaos_failure_rate: 1.0,
            ..seeded(11)
        });
        let id = orchestrator
            .start_transfer("images", "repo", docs(4))
            .unwrap();

        let history = wait_terminal(&orchestrator, &id).await;
        let failed = history.last().unwrap();
        assert_eq!(failed.status, TransferStatus::Failed);
        assert!(failed.progress <= 15);
        assert!(failed.errors[0].contains("compatibility score 30"));
    }

    #[tokio::test]
    async fn operations_are_independent() {
        let orchestrator = orchestrator(MigrationConfig {
            fail_at_progress: None,
            ..seeded(5)
        });
        let first = orchestrator
            .start_transfer(LOCAL_LIGHTRAG_ID, "archive", docs(3))
            .unwrap();
        let second = orchestrator
            .start_transfer("archive", LOCAL_LIGHTRAG_ID, docs(5))
            .unwrap();
        assert_ne!(first, second);

        wait_terminal(&orchestrator, &first).await;
        wait_terminal(&orchestrator, &second).await;
        assert_eq!(orchestrator.status(&first).unwrap().total_documents, 3);
        assert_eq!(orchestrator.status(&second).unwrap().total_documents, 5);
        assert_eq!(orchestrator.list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancel_marks_operation_failed_and_rejects_second_cancel() {
        let orchestrator = MigrationOrchestrator::new(
            registry(),
            Arc::new(CompatibilityModel::builtin().unwrap()),
            seeded(1),
            Arc::new(IntervalTicks::new(Duration::from_secs(60))),
        )
        .unwrap();
        let id = orchestrator
            .start_transfer(LOCAL_LIGHTRAG_ID, "archive", docs(2))
            .unwrap();

        let cancelled = orchestrator.cancel(&id).unwrap();
        assert_eq!(cancelled.status, TransferStatus::Failed);
        assert_eq!(cancelled.errors, vec![CANCELLED_ERROR.to_string()]);
        assert!(matches!(
            orchestrator.cancel(&id),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let orchestrator = orchestrator(seeded(2));

        assert!(matches!(
            orchestrator.start_transfer("archive", "archive", docs(1)),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            orchestrator.start_transfer("archive", "nowhere", docs(1)),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            orchestrator.start_transfer("archive", LOCAL_LIGHTRAG_ID, Vec::new()),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            orchestrator.start_transfer("archive", "retired", docs(1)),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            orchestrator.status("missing"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn finished_operations_are_purged_after_retention() {
        let orchestrator = orchestrator(MigrationConfig {
            retention_secs: 0,
            ..seeded(8)
        });
        let id = orchestrator
            .start_transfer(LOCAL_LIGHTRAG_ID, "archive", docs(1))
            .unwrap();
        wait_terminal(&orchestrator, &id).await;

        assert!(matches!(
            orchestrator.status(&id),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn low_compatibility_raises_failure_probability() {
        let orchestrator = MigrationOrchestrator::new(
            registry(),
            Arc::new(CompatibilityModel::builtin().unwrap()),
            seeded(0),
            Arc::new(ImmediateTicks),
        )
        .unwrap();

        assert_eq!(orchestrator.failure_policy(90).probability, 0.0);
        assert_eq!(orchestrator.failure_policy(40).probability, 0.0);
        assert!((orchestrator.failure_policy(30).probability - 0.05).abs() < 1e-9);
    }

    #[test]
    fn invalid_chaos_rate_is_rejected() {
        let result = MigrationOrchestrator::new(
            registry(),
            Arc::new(CompatibilityModel::builtin().unwrap()),
            MigrationConfig {
                chaos_failure_rate: 2.0,
                ..MigrationConfig::default()
            },
            Arc::new(ImmediateTicks),
        );
        assert!(matches!(result, Err(ApiError::InvalidConfig(_))));
    }
}
