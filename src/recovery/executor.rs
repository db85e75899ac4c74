//! Recovery execution.
//!
//! # Data Flow
//! ```text
//! execute_recovery_plan(failure_type, context)
//!     → pipeline_failure only: gated failure-history fetch → classify
//!     → planner.plan(...)
//!     → each step executed in order; failures are recorded, never abort
//!     → audit entry written to object storage
//!     → RecoveryReport
//! ```
//!
//! Side-effecting steps are function scaling, storage cleanup and dependency
//! probing. Every other step is reported as taken.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::compute::{ComputeError, FunctionConfig, ResourceConfigService};
use crate::config::RecoveryConfig;
use crate::error::RecoveryError;
use crate::observability::metrics;
use crate::recovery::actions::{overall_success, ActionKind, ActionRecord, RecoveryAction};
use crate::recovery::audit::{write_entry, AuditEntry};
use crate::recovery::classifier::{classify, FailurePattern};
use crate::recovery::planner::{FailureType, RecoveryContext, RecoveryPlanner};
use crate::recovery::prober::AvailabilityProber;
use crate::recovery::Collaborators;
use crate::resilience::{with_deadline, CircuitBreakerManager};
use crate::storage::{ObjectPage, ObjectStore, StorageError, MAX_DELETE_BATCH};
use crate::vcs::{FailureHistoryProvider, FailureRecord, VcsError};

/// Result of one invocation's recovery run.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub failure_type: String,
    pub actions: Vec<ActionRecord>,
    pub success: bool,
    pub duration_ms: u64,
    /// Key of the audit entry, when it could be written.
    pub audit_key: Option<String>,
}

impl RecoveryReport {
    pub fn descriptions(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.description.clone()).collect()
    }
}

/// New allocation after scaling `current` by `factor`, capped at `max`.
pub fn scaled_memory(current: u32, factor: f64, max: u32) -> u32 {
    let scaled = (f64::from(current) * factor).round();
    if scaled >= f64::from(max) {
        max
    } else {
        scaled as u32
    }
}

pub struct RecoveryExecutor {
    config: Arc<RecoveryConfig>,
    breaker: CircuitBreakerManager,
    history: Arc<dyn FailureHistoryProvider>,
    compute: Arc<dyn ResourceConfigService>,
    storage: Arc<dyn ObjectStore>,
    prober: Arc<dyn AvailabilityProber>,
    clock: Arc<dyn Clock>,
    planner: RecoveryPlanner,
}

impl RecoveryExecutor {
    pub fn new(
        config: Arc<RecoveryConfig>,
        breaker: CircuitBreakerManager,
        history: Arc<dyn FailureHistoryProvider>,
        deps: &Collaborators,
    ) -> Self {
        let planner = RecoveryPlanner::new(config.planner.clone(), config.storage.cleanup_age_days);
        Self {
            config,
            breaker,
            history,
            compute: Arc::clone(&deps.compute),
            storage: Arc::clone(&deps.storage),
            prober: Arc::clone(&deps.prober),
            clock: Arc::clone(&deps.clock),
            planner,
        }
    }

    /// Plan and carry out recovery for `failure_type`.
    ///
    /// Fails when the context requires failure history and it cannot be
    /// obtained, or when the lookback window is out of range. Individual step
    /// failures are part of the report.
    pub async fn execute_recovery_plan(
        &self,
        failure_type: &FailureType,
        context: RecoveryContext,
    ) -> Result<RecoveryReport, RecoveryError> {
        let started = Instant::now();
        let started_at = self.clock.now();

        let (patterns, recent_failure_count) = if *failure_type == FailureType::PipelineFailure {
            let since = self.lookback_start()?;
            match self.collect_failure_history(since).await {
                Ok(records) => (classify(&records, &self.config.classifier), records.len()),
                Err(e) if context.require_failure_history => {
                    return Err(RecoveryError::DependencyApi(e));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Proceeding without failure history");
                    (BTreeSet::<FailurePattern>::new(), 0)
                }
            }
        } else {
            (BTreeSet::new(), 0)
        };

        let plan = self
            .planner
            .plan(failure_type, &patterns, recent_failure_count, &context);

        let mut actions = Vec::with_capacity(plan.len());
        for step in &plan.steps {
            let records = self.execute_step(step).await;
            for record in &records {
                metrics::record_action(record.kind.as_str(), record.is_success());
            }
            actions.extend(records);
        }

        let success = overall_success(&actions);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let entry = AuditEntry {
            id: Uuid::new_v4(),
            timestamp: started_at,
            failure_type: failure_type.to_string(),
            context: context.raw().clone(),
            actions: actions.clone(),
            overall_success: success,
            duration_ms,
        };
        let audit_key = self.write_audit(&entry).await;

        tracing::info!(
            failure_type = %failure_type,
            actions = actions.len(),
            success,
            duration_ms,
            "Executed recovery actions"
        );

        Ok(RecoveryReport {
            failure_type: failure_type.to_string(),
            actions,
            success,
            duration_ms,
            audit_key,
        })
    }

    /// Breaker-gated fetch of recent failures. Outcomes feed the breaker.
    async fn collect_failure_history(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<FailureRecord>, VcsError> {
        let service = self.config.github.service_name.as_str();

        if !self.breaker.should_allow_request(service).await {
            tracing::warn!(service = %service, "Circuit breaker is open, skipping failure history");
            metrics::record_history_fetch("circuit_open");
            return Err(VcsError::CircuitOpen(service.to_string()));
        }

        let result = match with_deadline(
            "recent_failures",
            self.history_deadline(),
            self.history.recent_failures(since),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(VcsError::Timeout),
        };

        match &result {
            Ok(records) => {
                self.breaker.record_success(service).await;
                metrics::record_history_fetch("success");
                tracing::debug!(count = records.len(), "Collected failure history");
            }
            Err(e) => {
                self.breaker.record_failure(service).await;
                metrics::record_history_fetch("error");
                tracing::error!(error = %e, "Error fetching recent workflow failures");
            }
        }
        result
    }

    fn lookback_start(&self) -> Result<DateTime<Utc>, RecoveryError> {
        let hours = self.config.github.lookback_hours;
        Duration::try_hours(hours)
            .and_then(|window| self.clock.now().checked_sub_signed(window))
            .ok_or_else(|| {
                RecoveryError::Configuration(format!("github.lookback_hours {} is out of range", hours))
            })
    }

    fn compute_deadline(&self) -> StdDuration {
        StdDuration::from_millis(self.config.compute.timeout_ms)
    }

    fn storage_deadline(&self) -> StdDuration {
        StdDuration::from_millis(self.config.storage.timeout_ms)
    }

    async fn get_function(&self, name: &str) -> Result<FunctionConfig, ComputeError> {
        with_deadline("compute_get_config", self.compute_deadline(), self.compute.get_config(name))
            .await
            .map_err(|e| ComputeError::Unavailable(e.to_string()))?
    }

    async fn set_function_memory(&self, name: &str, memory_mb: u32) -> Result<(), ComputeError> {
        with_deadline(
            "compute_set_config",
            self.compute_deadline(),
            self.compute.set_config(name, memory_mb),
        )
        .await
        .map_err(|e| ComputeError::Unavailable(e.to_string()))?
    }

    async fn list_objects(&self, prefix: &str, token: Option<String>) -> Result<ObjectPage, StorageError> {
        with_deadline("storage_list", self.storage_deadline(), self.storage.list(prefix, token))
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<usize, StorageError> {
        with_deadline("storage_delete_batch", self.storage_deadline(), self.storage.delete_batch(keys))
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
    }

    /// Upper bound for every page and retry of a history fetch.
    fn history_deadline(&self) -> StdDuration {
        let github = &self.config.github;
        let retries = &self.config.retries;
        let attempts = u64::from(retries.max_attempts.max(1));
        let per_request = github.request_timeout_secs.saturating_mul(attempts);
        StdDuration::from_secs(per_request.saturating_mul(u64::from(github.max_pages.max(1))))
            + StdDuration::from_millis(retries.max_delay_ms.saturating_mul(attempts))
    }

    async fn execute_step(&self, step: &RecoveryAction) -> Vec<ActionRecord> {
        let now = self.clock.now();
        match step {
            RecoveryAction::ScaleFunctions { factor } => {
                let mut records = vec![ActionRecord::succeeded(step.kind(), step.to_string(), now)];
                records.extend(self.scale_functions(*factor).await);
                records
            }
            RecoveryAction::CleanupStorage { older_than_days } => {
                let mut records = vec![ActionRecord::succeeded(step.kind(), step.to_string(), now)];
                records.extend(self.cleanup_storage(*older_than_days).await);
                records
            }
            RecoveryAction::ProbeDependency { service } => vec![self.probe_dependency(service).await],
            other => vec![ActionRecord::succeeded(other.kind(), other.to_string(), now)],
        }
    }

    async fn scale_functions(&self, factor: f64) -> Vec<ActionRecord> {
        let compute = &self.config.compute;
        let mut records = Vec::new();

        for suffix in &compute.function_suffixes {
            let name = format!(
                "{}-{}-{}",
                self.config.github.owner, self.config.github.repo, suffix
            );

            let current = match self.get_function(&name).await {
                Ok(config) => config.memory_mb,
                Err(ComputeError::NotFound(_)) => {
                    tracing::debug!(function = %name, "Function not deployed, skipping scale");
                    continue;
                }
                Err(e) => {
                    tracing::error!(function = %name, error = %e, "Error scaling function");
                    records.push(ActionRecord::failed(
                        ActionKind::Scale,
                        format!("Scaling {} failed: {}", name, e),
                        self.clock.now(),
                    ));
                    continue;
                }
            };

            let target = scaled_memory(current, factor, compute.max_memory_mb);
            if target == current {
                continue;
            }

            match self.set_function_memory(&name, target).await {
                Ok(()) => records.push(ActionRecord::succeeded(
                    ActionKind::Scale,
                    format!("Scaled {} memory from {}MB to {}MB", name, current, target),
                    self.clock.now(),
                )),
                Err(e) => {
                    tracing::error!(function = %name, error = %e, "Error scaling function");
                    records.push(ActionRecord::failed(
                        ActionKind::Scale,
                        format!("Scaling {} failed: {}", name, e),
                        self.clock.now(),
                    ));
                }
            }
        }
        records
    }

    async fn cleanup_storage(&self, older_than_days: i64) -> Vec<ActionRecord> {
        let mut records = Vec::new();
        let Some(cutoff) = Duration::try_days(older_than_days)
            .and_then(|age| self.clock.now().checked_sub_signed(age))
        else {
            records.push(ActionRecord::failed(
                ActionKind::ClearCache,
                format!("Storage cleanup failed: age of {} days is out of range", older_than_days),
                self.clock.now(),
            ));
            return records;
        };
        if let Err(e) = self.delete_objects_before(cutoff, &mut records).await {
            tracing::error!(error = %e, "Error cleaning up stored data");
            records.push(ActionRecord::failed(
                ActionKind::ClearCache,
                format!("Storage cleanup failed: {}", e),
                self.clock.now(),
            ));
        }
        records
    }

    /// Delete objects modified at or before `cutoff`, in bounded batches.
    async fn delete_objects_before(
        &self,
        cutoff: DateTime<Utc>,
        records: &mut Vec<ActionRecord>,
    ) -> Result<(), StorageError> {
        let batch_size = self.config.storage.delete_batch_size.clamp(1, MAX_DELETE_BATCH);
        let prefix = self.config.storage.cleanup_prefix.as_str();

        let mut pending: Vec<String> = Vec::new();
        let mut token = None;
        loop {
            let page = self.list_objects(prefix, token.take()).await?;
            for object in page.objects {
                if object.last_modified <= cutoff {
                    pending.push(object.key);
                }
                if pending.len() >= batch_size {
                    let deleted = self.delete_objects(&pending).await?;
                    records.push(ActionRecord::succeeded(
                        ActionKind::ClearCache,
                        format!("Deleted batch of {} old objects", deleted),
                        self.clock.now(),
                    ));
                    pending.clear();
                }
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        if !pending.is_empty() {
            let deleted = self.delete_objects(&pending).await?;
            records.push(ActionRecord::succeeded(
                ActionKind::ClearCache,
                format!("Deleted final batch of {} old objects", deleted),
                self.clock.now(),
            ));
        }
        Ok(())
    }

    async fn probe_dependency(&self, service: &str) -> ActionRecord {
        if !self.breaker.should_allow_request(service).await {
            return ActionRecord::succeeded(
                ActionKind::BypassStep,
                format!("Circuit breaker active for {}, using fallback mechanisms", service),
                self.clock.now(),
            );
        }

        let deadline = StdDuration::from_secs(self.config.probes.timeout_secs.saturating_add(1));
        let available = with_deadline("availability_probe", deadline, self.prober.is_available(service))
            .await
            .unwrap_or(false);

        if available {
            self.breaker.record_success(service).await;
            ActionRecord::succeeded(
                ActionKind::Probe,
                format!("Service {} recovered, circuit breaker reset", service),
                self.clock.now(),
            )
        } else {
            self.breaker.record_failure(service).await;
            ActionRecord::failed(
                ActionKind::Probe,
                format!("Service {} still failing, circuit breaker activated", service),
                self.clock.now(),
            )
        }
    }

    async fn write_audit(&self, entry: &AuditEntry) -> Option<String> {
        let prefix = self.config.storage.audit_prefix.as_str();
        match with_deadline(
            "audit_write",
            self.storage_deadline(),
            write_entry(self.storage.as_ref(), prefix, entry),
        )
        .await
        {
            Ok(Ok(key)) => Some(key),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Error logging recovery actions");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Error logging recovery actions");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::compute::MemoryResourceConfig;
    use crate::recovery::actions::ActionStatus;
    use crate::recovery::prober::StaticProber;
    use crate::state::{BreakerState, CircuitStateStore, MemoryCircuitStore};
    use crate::storage::MemoryObjectStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedHistory {
        result: Result<Vec<FailureRecord>, VcsError>,
        calls: AtomicUsize,
    }

    impl FixedHistory {
        fn ok(records: Vec<FailureRecord>) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(records),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(e: VcsError) -> Arc<Self> {
            Arc::new(Self {
                result: Err(e),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FailureHistoryProvider for FixedHistory {
        async fn recent_failures(&self, _since: DateTime<Utc>) -> Result<Vec<FailureRecord>, VcsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct Harness {
        executor: RecoveryExecutor,
        circuits: MemoryCircuitStore,
        storage: MemoryObjectStore,
        compute: MemoryResourceConfig,
        clock: Arc<ManualClock>,
    }

    fn base_config() -> RecoveryConfig {
        let mut config = RecoveryConfig::default();
        config.github.owner = "acme".to_string();
        config.github.repo = "widgets".to_string();
        config.storage.audit_prefix = "recovery-logs".to_string();
        config.storage.cleanup_prefix = "metrics/".to_string();
        config
    }

    fn harness(history: Arc<dyn FailureHistoryProvider>, prober: StaticProber) -> Harness {
        harness_with(base_config(), history, prober, |_| {})
    }

    /// `customize` may swap collaborators before the executor is built.
    fn harness_with(
        config: RecoveryConfig,
        history: Arc<dyn FailureHistoryProvider>,
        prober: StaticProber,
        customize: impl FnOnce(&mut Collaborators),
    ) -> Harness {
        let config = Arc::new(config);

        let circuits = MemoryCircuitStore::new();
        let storage = MemoryObjectStore::new();
        let compute = MemoryResourceConfig::new();
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let mut deps = Collaborators {
            circuit_store: Arc::new(circuits.clone()),
            storage: Arc::new(storage.clone()),
            compute: Arc::new(compute.clone()),
            prober: Arc::new(prober),
            notifier: Arc::new(crate::notify::MemoryNotifier::new()),
            secrets: Arc::new(crate::secrets::StaticSecretStore::new()),
            clock: clock.clone(),
        };
        customize(&mut deps);
        let breaker = CircuitBreakerManager::new(
            Arc::clone(&deps.circuit_store),
            clock.clone(),
            config.circuit_breaker.clone(),
        );

        Harness {
            executor: RecoveryExecutor::new(config, breaker, history, &deps),
            circuits,
            storage,
            compute,
            clock,
        }
    }

    fn failure(conclusion: &str) -> FailureRecord {
        FailureRecord {
            timestamp: Utc::now(),
            conclusion: conclusion.to_string(),
            commit_message: "refactor".to_string(),
        }
    }

    fn context(value: serde_json::Value) -> RecoveryContext {
        RecoveryContext::from_value(value, "github")
    }

    #[test]
    fn test_scaled_memory() {
        assert_eq!(scaled_memory(1024, 1.5, 3008), 1536);
        assert_eq!(scaled_memory(2048, 1.5, 3008), 3008);
        assert_eq!(scaled_memory(3008, 1.5, 3008), 3008);
        assert_eq!(scaled_memory(129, 1.5, 3008), 194);
    }

    #[tokio::test]
    async fn test_pipeline_failure_with_history() {
        let history = FixedHistory::ok(vec![failure("timeout"), failure("timeout"), failure("failure")]);
        let h = harness(history.clone(), StaticProber::new());

        let report = h
            .executor
            .execute_recovery_plan(&FailureType::PipelineFailure, context(json!({})))
            .await
            .unwrap();

        assert_eq!(history.calls.load(Ordering::SeqCst), 1);
        let descriptions = report.descriptions();
        assert!(descriptions.contains(&"Restarting failed workflow".to_string()));
        assert!(descriptions.contains(&"Increasing workflow timeout limits".to_string()));
        assert!(descriptions.contains(&"Scaling up runner resources".to_string()));
        assert!(report.success);

        let key = report.audit_key.unwrap();
        assert!(key.starts_with("recovery-logs/"));
        assert!(h.storage.get(&key).is_some());
    }

    #[tokio::test]
    async fn test_history_error_degrades_to_basic_plan() {
        let h = harness(FixedHistory::err(VcsError::Unauthorized), StaticProber::new());

        let report = h
            .executor
            .execute_recovery_plan(&FailureType::PipelineFailure, context(json!({})))
            .await
            .unwrap();

        assert_eq!(report.actions.len(), 3);
        let state = h.circuits.get("github").await.unwrap().unwrap();
        assert_eq!(state.failure_count, 1);
    }

    #[tokio::test]
    async fn test_required_history_surfaces_dependency_error() {
        let h = harness(FixedHistory::err(VcsError::NotFound), StaticProber::new());

        let result = h
            .executor
            .execute_recovery_plan(
                &FailureType::PipelineFailure,
                context(json!({"require_failure_history": true})),
            )
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert!(matches!(err, RecoveryError::DependencyApi(VcsError::NotFound)));
    }

    #[tokio::test]
    async fn test_open_breaker_skips_history_fetch() {
        let history = FixedHistory::ok(vec![]);
        let h = harness(history.clone(), StaticProber::new());
        for _ in 0..5 {
            h.executor.breaker.record_failure("github").await;
        }

        let report = h
            .executor
            .execute_recovery_plan(&FailureType::PipelineFailure, context(json!({})))
            .await
            .unwrap();

        assert_eq!(history.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.actions.len(), 3);
    }

    #[tokio::test]
    async fn test_performance_regression_scales_functions() {
        let h = harness(FixedHistory::ok(vec![]), StaticProber::new());
        h.compute.insert("acme-widgets-pipeline-metrics-collector", 1024);
        h.compute.insert("acme-widgets-performance-monitor", 3008);

        let report = h
            .executor
            .execute_recovery_plan(&FailureType::PerformanceRegression, context(json!({})))
            .await
            .unwrap();

        assert_eq!(h.compute.memory_of("acme-widgets-pipeline-metrics-collector"), Some(1536));
        assert_eq!(h.compute.memory_of("acme-widgets-performance-monitor"), Some(3008));
        assert!(report.descriptions().contains(
            &"Scaled acme-widgets-pipeline-metrics-collector memory from 1024MB to 1536MB".to_string()
        ));
        assert!(report.success);
    }

    #[tokio::test]
    async fn test_cleanup_deletes_old_objects() {
        let h = harness(FixedHistory::ok(vec![]), StaticProber::new());
        let now = h.clock.now();
        for (key, age) in [("metrics/a", 10), ("metrics/b", 40), ("metrics/c", 60)] {
            h.storage.insert_at(key, vec![], now - Duration::days(age));
        }

        let report = h
            .executor
            .execute_recovery_plan(
                &FailureType::ResourceExhaustion,
                context(json!({"storage_full": true})),
            )
            .await
            .unwrap();

        assert!(h.storage.get("metrics/a").is_some());
        assert!(h.storage.get("metrics/b").is_none());
        assert!(h.storage.get("metrics/c").is_none());
        assert!(report
            .descriptions()
            .contains(&"Deleted final batch of 2 old objects".to_string()));
    }

    /// Compute service whose calls never complete.
    struct HangingCompute;

    #[async_trait]
    impl ResourceConfigService for HangingCompute {
        async fn get_config(&self, _: &str) -> Result<FunctionConfig, ComputeError> {
            std::future::pending().await
        }
        async fn set_config(&self, _: &str, _: u32) -> Result<(), ComputeError> {
            std::future::pending().await
        }
    }

    /// Object store that records the size of every delete call.
    struct BatchRecordingStore {
        inner: MemoryObjectStore,
        batches: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ObjectStore for BatchRecordingStore {
        async fn list(&self, prefix: &str, token: Option<String>) -> Result<ObjectPage, StorageError> {
            self.inner.list(prefix, token).await
        }
        async fn delete_batch(&self, keys: &[String]) -> Result<usize, StorageError> {
            assert!(keys.len() <= MAX_DELETE_BATCH, "delete call with {} keys", keys.len());
            self.batches.lock().unwrap().push(keys.len());
            self.inner.delete_batch(keys).await
        }
        async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
            self.inner.put(key, body, content_type).await
        }
    }

    #[tokio::test]
    async fn test_hanging_compute_fails_scale_step() {
        let mut config = base_config();
        config.compute.timeout_ms = 50;
        let h = harness_with(config, FixedHistory::ok(vec![]), StaticProber::new(), |deps| {
            deps.compute = Arc::new(HangingCompute);
        });

        let run = h
            .executor
            .execute_recovery_plan(&FailureType::PerformanceRegression, context(json!({})));
        let report = tokio::time::timeout(StdDuration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap();

        let failed: Vec<_> = report
            .actions
            .iter()
            .filter(|a| a.status == ActionStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|a| a.kind == ActionKind::Scale));
        assert!(failed[0].description.contains("timed out"));
        assert!(!report.success);
    }

    #[tokio::test]
    async fn test_large_cleanup_is_split_into_bounded_batches() {
        let store = Arc::new(BatchRecordingStore {
            inner: MemoryObjectStore::with_page_size(300),
            batches: std::sync::Mutex::new(Vec::new()),
        });
        let shared = Arc::clone(&store);
        let h = harness_with(base_config(), FixedHistory::ok(vec![]), StaticProber::new(), |deps| {
            deps.storage = shared;
        });
        let old = h.clock.now() - Duration::days(45);
        for i in 0..2500 {
            store.inner.insert_at(&format!("metrics/{:04}", i), vec![], old);
        }

        let report = h
            .executor
            .execute_recovery_plan(
                &FailureType::ResourceExhaustion,
                context(json!({"storage_full": true})),
            )
            .await
            .unwrap();

        assert_eq!(*store.batches.lock().unwrap(), vec![1000, 1000, 500]);
        let descriptions = report.descriptions();
        assert_eq!(
            &descriptions[1..],
            &[
                "Deleted batch of 1000 old objects".to_string(),
                "Deleted batch of 1000 old objects".to_string(),
                "Deleted final batch of 500 old objects".to_string(),
            ]
        );
        assert!(store.inner.keys().iter().all(|k| !k.starts_with("metrics/")));
        assert!(report.success);
    }

    #[tokio::test]
    async fn test_out_of_range_lookback_is_configuration_error() {
        let mut config = base_config();
        config.github.lookback_hours = i64::MAX;
        let h = harness_with(config, FixedHistory::ok(vec![]), StaticProber::new(), |_| {});

        let err = h
            .executor
            .execute_recovery_plan(&FailureType::PipelineFailure, context(json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, RecoveryError::Configuration(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_out_of_range_cleanup_age_fails_step() {
        let mut config = base_config();
        config.storage.cleanup_age_days = i64::MAX;
        let h = harness_with(config, FixedHistory::ok(vec![]), StaticProber::new(), |_| {});

        let report = h
            .executor
            .execute_recovery_plan(
                &FailureType::ResourceExhaustion,
                context(json!({"storage_full": true})),
            )
            .await
            .unwrap();

        let last = report.actions.last().unwrap();
        assert_eq!(last.status, ActionStatus::Failed);
        assert!(last.description.contains("out of range"));
    }

    #[tokio::test]
    async fn test_probe_outcomes_drive_breaker() {
        let h = harness(
            FixedHistory::ok(vec![]),
            StaticProber::new().with("github", true).with("registry", false),
        );

        let report = h
            .executor
            .execute_recovery_plan(
                &FailureType::ExternalDependencyFailure,
                context(json!({"failing_services": ["github", "registry"]})),
            )
            .await
            .unwrap();

        assert_eq!(report.actions[0].status, ActionStatus::Succeeded);
        assert_eq!(
            report.actions[0].description,
            "Service github recovered, circuit breaker reset"
        );
        assert_eq!(report.actions[1].status, ActionStatus::Failed);
        assert!(!report.success);

        let registry = h.circuits.get("registry").await.unwrap().unwrap();
        assert_eq!(registry.failure_count, 1);
        assert_eq!(registry.state, BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_open_breaker_uses_fallback() {
        let h = harness(FixedHistory::ok(vec![]), StaticProber::new());
        for _ in 0..5 {
            h.executor.breaker.record_failure("github").await;
        }

        let report = h
            .executor
            .execute_recovery_plan(&FailureType::ExternalDependencyFailure, context(json!({})))
            .await
            .unwrap();

        assert_eq!(
            report.descriptions(),
            vec!["Circuit breaker active for github, using fallback mechanisms".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_plan_is_not_success() {
        let h = harness(FixedHistory::ok(vec![]), StaticProber::new());
        let report = h
            .executor
            .execute_recovery_plan(&FailureType::ResourceExhaustion, context(json!({})))
            .await
            .unwrap();
        assert!(report.actions.is_empty());
        assert!(!report.success);
    }
}
