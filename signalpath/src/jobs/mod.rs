//! Asynchronous job tracking.
//!
//! Predictions run in the background; callers poll a job store keyed by an
//! opaque task id. Every entry expires a fixed interval after its last
//! lifecycle event, so neither abandoned results nor jobs whose worker
//! died mid-flight accumulate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;

use crate::predict::{CoverageArtifacts, LosPredictionResult};

/// Opaque identifier for a submitted prediction job.
///
/// Combines a process-local counter with wall-clock nanoseconds so ids
/// stay unique across restarts without coordination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(String);

static JOB_COUNTER: AtomicU64 = AtomicU64::new(0);

impl JobId {
    /// Generates a fresh id.
    pub fn generate() -> Self {
        let seq = JOB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        JobId(format!("{nanos:x}-{seq:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result payload of a finished job.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobPayload {
    Los(Box<LosPredictionResult>),
    Coverage(CoverageArtifacts),
}

/// Lifecycle state of a job.
///
/// Transitions are one-way: `Processing` to exactly one terminal state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobState {
    Processing,
    Completed { result: JobPayload },
    Failed { error: String },
}

struct JobEntry {
    state: JobState,
    created_at: Instant,
    /// Set when the job reaches a terminal state; restarts the expiry clock.
    finished_at: Option<Instant>,
}

/// Concurrent in-memory job store with TTL-based expiry.
pub struct JobStore {
    jobs: DashMap<JobId, JobEntry>,
    ttl: Duration,
}

impl JobStore {
    /// Creates a store whose jobs expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            ttl,
        }
    }

    /// Registers a new job in the `Processing` state and returns its id.
    pub fn create(&self) -> JobId {
        let id = JobId::generate();
        self.jobs.insert(
            id.clone(),
            JobEntry {
                state: JobState::Processing,
                created_at: Instant::now(),
                finished_at: None,
            },
        );
        tracing::debug!(job = %id, "job created");
        id
    }

    /// Marks a processing job completed. No-op for unknown ids or jobs
    /// already in a terminal state.
    pub fn complete(&self, id: &JobId, result: JobPayload) {
        self.finish(id, JobState::Completed { result });
    }

    /// Marks a processing job failed. No-op for unknown ids or jobs
    /// already in a terminal state.
    pub fn fail(&self, id: &JobId, error: String) {
        tracing::warn!(job = %id, error = %error, "job failed");
        self.finish(id, JobState::Failed { error });
    }

    fn finish(&self, id: &JobId, state: JobState) {
        if let Some(mut entry) = self.jobs.get_mut(id) {
            if matches!(entry.state, JobState::Processing) && !self.is_expired(&entry) {
                entry.state = state;
                entry.finished_at = Some(Instant::now());
            }
        }
    }

    /// Returns the current state of a job, or `None` if the id is unknown
    /// or the job has expired.
    pub fn get(&self, id: &JobId) -> Option<JobState> {
        let entry = self.jobs.get(id)?;
        if self.is_expired(&entry) {
            return None;
        }
        Some(entry.state.clone())
    }

    /// Drops expired jobs; returns how many were removed.
    ///
    /// Expired entries are already invisible through [`get`](Self::get);
    /// this reclaims their memory.
    pub fn purge_expired(&self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, entry| !self.is_expired(entry));
        let removed = before - self.jobs.len();
        if removed > 0 {
            tracing::debug!(removed, "purged expired jobs");
        }
        removed
    }

    /// A job expires `ttl` after its last lifecycle event: creation for
    /// `Processing` entries, the terminal transition otherwise. A worker
    /// that dies without reporting therefore cannot leak its entry.
    fn is_expired(&self, entry: &JobEntry) -> bool {
        entry.finished_at.unwrap_or(entry.created_at).elapsed() > self.ttl
    }
}
