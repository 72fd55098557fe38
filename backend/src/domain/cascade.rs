//! Best-effort cascading deletion of a subject and its dependent records.
//!
//! Deleting a patient means deleting its attendance, history, payment and
//! test-report rows first, then the patient itself. Not every patient has rows
//! in every collection, and a dependent store may be unreachable, so the
//! cascade favours best-effort cleanup over atomicity:
//!
//! 1. Every dependent collection is attempted, concurrently.
//! 2. A dependent failure is logged and recorded, never fatal.
//! 3. The primary deletion starts only once every dependent attempt resolved.
//! 4. Only a failed primary deletion fails the operation.
//!
//! Deleters are injected through [`DependentDeleter`] and [`PrimaryDeleter`],
//! so the same orchestration runs against local storage on the server and
//! against the REST API from a client.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{join_all, AbortRegistration, Abortable};
use shared::{CascadeReport, DependentDeletion, RecordKind, SubjectKind};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Removes every record of one kind that belongs to a subject
#[async_trait]
pub trait DependentDeleter: Send + Sync {
    fn kind(&self) -> RecordKind;

    /// Returns the number of rows removed; zero rows is a success
    async fn delete_for_subject(&self, subject_id: &str) -> anyhow::Result<usize>;
}

/// Removes the subject record itself
#[async_trait]
pub trait PrimaryDeleter: Send + Sync {
    fn subject_kind(&self) -> SubjectKind;

    /// Returns `false` when no such subject exists
    async fn delete_subject(&self, subject_id: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CascadeError {
    #[error("{operation} timed out after {after:?}")]
    TimedOut { operation: String, after: Duration },
    #[error("{operation} failed: {message}")]
    Failed { operation: String, message: String },
    #[error("{} {subject_id} not found", subject_kind.label())]
    NotFound {
        subject_kind: SubjectKind,
        subject_id: String,
    },
    #[error("Cascade delete of {subject_id} was cancelled")]
    Cancelled { subject_id: String },
    #[error("Failed to delete {subject_kind} {subject_id}: {cause}")]
    PrimaryFailed {
        subject_kind: SubjectKind,
        subject_id: String,
        #[source]
        cause: Box<CascadeError>,
    },
}

/// Everything that happened during one cascade
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    pub subject_kind: SubjectKind,
    pub subject_id: String,
    /// One entry per dependent deleter, in the order they were supplied
    pub dependent_results: Vec<(RecordKind, Result<usize, CascadeError>)>,
    pub primary_result: Result<(), CascadeError>,
}

impl CascadeOutcome {
    pub fn is_success(&self) -> bool {
        self.primary_result.is_ok()
    }

    /// Dependent kinds whose cleanup failed and may have left orphans
    pub fn failed_dependents(&self) -> Vec<RecordKind> {
        self.dependent_results
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Total dependent rows removed
    pub fn deleted_dependents(&self) -> usize {
        self.dependent_results
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
            .sum()
    }

    /// Fail with a composed error when the primary deletion failed
    pub fn into_result(self) -> Result<Self, CascadeError> {
        match &self.primary_result {
            Ok(()) => Ok(self),
            Err(cause) => Err(CascadeError::PrimaryFailed {
                subject_kind: self.subject_kind,
                subject_id: self.subject_id.clone(),
                cause: Box::new(cause.clone()),
            }),
        }
    }

    pub fn to_report(&self) -> CascadeReport {
        CascadeReport {
            subject_kind: self.subject_kind,
            subject_id: self.subject_id.clone(),
            dependents: self
                .dependent_results
                .iter()
                .map(|(kind, result)| DependentDeletion {
                    kind: *kind,
                    deleted_count: result.as_ref().ok().copied(),
                    error: result.as_ref().err().map(|e| e.to_string()),
                })
                .collect(),
            primary_deleted: self.primary_result.is_ok(),
        }
    }
}

/// Orchestrates cascades with per-call timeouts and per-subject serialisation
#[derive(Clone)]
pub struct CascadeDeleter {
    call_timeout: Duration,
    subject_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CascadeDeleter {
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(call_timeout: Duration) -> Self {
        Self {
            call_timeout,
            subject_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Delete a subject after attempting every dependent collection
    ///
    /// Two cascades for the same subject never overlap; the second waits for
    /// the first and then finds nothing left to delete.
    pub async fn delete_subject(
        &self,
        subject_id: &str,
        dependents: &[Arc<dyn DependentDeleter>],
        primary: &dyn PrimaryDeleter,
    ) -> CascadeOutcome {
        let key = Self::lock_key(primary.subject_kind(), subject_id);
        let lock = self.lock_for(&key);

        let outcome = {
            let _guard = lock.lock().await;
            self.run(subject_id, dependents, primary).await
        };

        drop(lock);
        self.release_lock(&key);
        outcome
    }

    /// [`delete_subject`](Self::delete_subject), abandoned when the matching
    /// `AbortHandle` fires
    ///
    /// Cancellation can interrupt dependent cleanup, but it can never cause the
    /// primary deletion to run before the dependents were attempted.
    pub async fn delete_subject_cancellable(
        &self,
        subject_id: &str,
        dependents: &[Arc<dyn DependentDeleter>],
        primary: &dyn PrimaryDeleter,
        registration: AbortRegistration,
    ) -> Result<CascadeOutcome, CascadeError> {
        let cascade = self.delete_subject(subject_id, dependents, primary);
        match Abortable::new(cascade, registration).await {
            Ok(outcome) => Ok(outcome),
            Err(_aborted) => {
                warn!("Cascade delete of {} {} cancelled", primary.subject_kind(), subject_id);
                self.release_lock(&Self::lock_key(primary.subject_kind(), subject_id));
                Err(CascadeError::Cancelled {
                    subject_id: subject_id.to_string(),
                })
            }
        }
    }

    async fn run(
        &self,
        subject_id: &str,
        dependents: &[Arc<dyn DependentDeleter>],
        primary: &dyn PrimaryDeleter,
    ) -> CascadeOutcome {
        let subject_kind = primary.subject_kind();
        info!(
            "🗑️ Cascade delete of {} {} across {} dependent collections",
            subject_kind,
            subject_id,
            dependents.len()
        );

        let attempts = dependents.iter().map(|deleter| async move {
            let kind = deleter.kind();
            let operation = format!("deleting {} of {} {}", kind, subject_kind, subject_id);
            let result = self
                .call(operation, deleter.delete_for_subject(subject_id))
                .await;
            match &result {
                Ok(count) => info!("Removed {} {} rows for {}", count, kind, subject_id),
                Err(e) => warn!("Dependent cleanup failed, continuing: {}", e),
            }
            (kind, result)
        });
        let dependent_results = join_all(attempts).await;

        let operation = format!("deleting {} {}", subject_kind, subject_id);
        let primary_result = match self.call(operation, primary.delete_subject(subject_id)).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CascadeError::NotFound {
                subject_kind,
                subject_id: subject_id.to_string(),
            }),
            Err(e) => Err(e),
        };

        match &primary_result {
            Ok(()) => info!("✅ Deleted {} {}", subject_kind, subject_id),
            Err(e) => error!("❌ Primary delete failed: {}", e),
        }

        CascadeOutcome {
            subject_kind,
            subject_id: subject_id.to_string(),
            dependent_results,
            primary_result,
        }
    }

    async fn call<T, F>(&self, operation: String, call: F) -> Result<T, CascadeError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CascadeError::Failed {
                operation,
                message: format!("{:#}", e),
            }),
            Err(_elapsed) => Err(CascadeError::TimedOut {
                operation,
                after: self.call_timeout,
            }),
        }
    }

    fn lock_key(subject_kind: SubjectKind, subject_id: &str) -> String {
        format!("{}:{}", subject_kind.segment(), subject_id)
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.subject_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once nobody else is holding or waiting on it
    fn release_lock(&self, key: &str) {
        self.subject_locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.subject_locks.len()
    }
}

impl Default for CascadeDeleter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CALL_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use futures::future::AbortHandle;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory stand-in for one dependent collection
    struct MemoryDependent {
        kind: RecordKind,
        rows: Arc<std::sync::Mutex<HashMap<String, usize>>>,
        fail: bool,
        delay: Duration,
        finished: Arc<AtomicUsize>,
    }

    impl MemoryDependent {
        fn new(kind: RecordKind, subject_id: &str, rows: usize, finished: Arc<AtomicUsize>) -> Self {
            let mut map = HashMap::new();
            map.insert(subject_id.to_string(), rows);
            Self {
                kind,
                rows: Arc::new(std::sync::Mutex::new(map)),
                fail: false,
                delay: Duration::ZERO,
                finished,
            }
        }

        fn remaining(&self, subject_id: &str) -> usize {
            self.rows.lock().unwrap().get(subject_id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl DependentDeleter for MemoryDependent {
        fn kind(&self) -> RecordKind {
            self.kind
        }

        async fn delete_for_subject(&self, subject_id: &str) -> anyhow::Result<usize> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.finished.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.rows.lock().unwrap().remove(subject_id).unwrap_or(0))
        }
    }

    struct MemoryPrimary {
        exists: AtomicBool,
        fail: bool,
        /// Number of dependent attempts observed finished when the primary ran
        dependents_seen: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl MemoryPrimary {
        fn new(finished: Arc<AtomicUsize>) -> Self {
            Self {
                exists: AtomicBool::new(true),
                fail: false,
                dependents_seen: Arc::new(AtomicUsize::new(0)),
                finished,
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PrimaryDeleter for MemoryPrimary {
        fn subject_kind(&self) -> SubjectKind {
            SubjectKind::Patient
        }

        async fn delete_subject(&self, _subject_id: &str) -> anyhow::Result<bool> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.dependents_seen
                .store(self.finished.load(Ordering::SeqCst), Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("database is locked"));
            }
            Ok(self.exists.swap(false, Ordering::SeqCst))
        }
    }

    fn patient_dependents(finished: &Arc<AtomicUsize>) -> Vec<MemoryDependent> {
        vec![
            MemoryDependent::new(RecordKind::PatientAttendance, "P7", 3, finished.clone()),
            MemoryDependent::new(RecordKind::PatientHistory, "P7", 0, finished.clone()),
            MemoryDependent::new(RecordKind::PatientPayment, "P7", 2, finished.clone()),
        ]
    }

    fn as_dyn(deps: &[Arc<MemoryDependent>]) -> Vec<Arc<dyn DependentDeleter>> {
        deps.iter()
            .map(|d| d.clone() as Arc<dyn DependentDeleter>)
            .collect()
    }

    #[tokio::test]
    async fn test_cascade_removes_dependents_then_subject() {
        let finished = Arc::new(AtomicUsize::new(0));
        let deps: Vec<Arc<MemoryDependent>> = patient_dependents(&finished).into_iter().map(Arc::new).collect();
        let primary = MemoryPrimary::new(finished.clone());
        let deleter = CascadeDeleter::default();

        let outcome = deleter.delete_subject("P7", &as_dyn(&deps), &primary).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.deleted_dependents(), 5);
        assert!(outcome.failed_dependents().is_empty());
        for dep in &deps {
            assert_eq!(dep.remaining("P7"), 0);
        }
        assert_eq!(primary.dependents_seen.load(Ordering::SeqCst), 3);
        assert!(outcome.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_failed_dependent_does_not_block_primary() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut deps = patient_dependents(&finished);
        deps[0].fail = true;
        let deps: Vec<Arc<MemoryDependent>> = deps.into_iter().map(Arc::new).collect();
        let primary = MemoryPrimary::new(finished.clone());
        let deleter = CascadeDeleter::default();

        let outcome = deleter.delete_subject("P7", &as_dyn(&deps), &primary).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.failed_dependents(), vec![RecordKind::PatientAttendance]);
        assert_eq!(deps[2].remaining("P7"), 0);
        assert_eq!(primary.dependents_seen.load(Ordering::SeqCst), 3);

        let report = outcome.to_report();
        assert!(report.primary_deleted);
        assert_eq!(report.dependents[0].deleted_count, None);
        assert!(report.dependents[0]
            .error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
        assert_eq!(report.dependents[2].deleted_count, Some(2));
    }

    #[tokio::test]
    async fn test_hung_dependent_times_out_and_primary_still_runs() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut deps = patient_dependents(&finished);
        deps[1].delay = Duration::from_secs(30);
        let deps: Vec<Arc<MemoryDependent>> = deps.into_iter().map(Arc::new).collect();
        let primary = MemoryPrimary::new(finished.clone());
        let deleter = CascadeDeleter::new(Duration::from_millis(100));

        let outcome = deleter.delete_subject("P7", &as_dyn(&deps), &primary).await;

        assert!(outcome.is_success());
        assert!(matches!(
            outcome.dependent_results[1].1,
            Err(CascadeError::TimedOut { .. })
        ));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_failure_is_composed() {
        let finished = Arc::new(AtomicUsize::new(0));
        let deps: Vec<Arc<MemoryDependent>> = patient_dependents(&finished).into_iter().map(Arc::new).collect();
        let mut primary = MemoryPrimary::new(finished.clone());
        primary.fail = true;
        let deleter = CascadeDeleter::default();

        let outcome = deleter.delete_subject("P7", &as_dyn(&deps), &primary).await;
        assert!(!outcome.is_success());

        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, CascadeError::PrimaryFailed { .. }));
        let message = err.to_string();
        assert!(message.starts_with("Failed to delete patient P7"));
        assert!(message.contains("database is locked"));
    }

    #[tokio::test]
    async fn test_missing_subject_reports_not_found() {
        let finished = Arc::new(AtomicUsize::new(0));
        let primary = MemoryPrimary::new(finished);
        primary.exists.store(false, Ordering::SeqCst);
        let deleter = CascadeDeleter::default();

        let outcome = deleter.delete_subject("P404", &[], &primary).await;
        assert_eq!(
            outcome.primary_result,
            Err(CascadeError::NotFound {
                subject_kind: SubjectKind::Patient,
                subject_id: "P404".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_same_subject_cascades_are_serialised() {
        let finished = Arc::new(AtomicUsize::new(0));
        let deps: Vec<Arc<MemoryDependent>> = patient_dependents(&finished).into_iter().map(Arc::new).collect();
        let deps = as_dyn(&deps);
        let primary = MemoryPrimary::new(finished.clone());
        let deleter = CascadeDeleter::default();

        let (first, second) = tokio::join!(
            deleter.delete_subject("P7", &deps, &primary),
            deleter.delete_subject("P7", &deps, &primary),
        );

        assert_eq!(primary.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
        // Exactly one of the two actually removed the patient
        assert_ne!(first.is_success(), second.is_success());
        assert_eq!(deleter.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_cascade_never_reaches_primary() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut deps = patient_dependents(&finished);
        deps[0].delay = Duration::from_secs(30);
        let deps: Vec<Arc<MemoryDependent>> = deps.into_iter().map(Arc::new).collect();
        let dependents = as_dyn(&deps);
        let primary = MemoryPrimary::new(finished.clone());
        let deleter = CascadeDeleter::new(Duration::from_secs(60));
        let (handle, registration) = AbortHandle::new_pair();

        let abort_later = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.abort();
        };
        let (result, ()) = tokio::join!(
            deleter.delete_subject_cancellable("P7", &dependents, &primary, registration),
            abort_later,
        );

        assert_eq!(
            result,
            Err(CascadeError::Cancelled {
                subject_id: "P7".to_string()
            })
        );
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(deleter.tracked_locks(), 0);
    }
}
