//! Task registry
//!
//! Owns every video task's lifecycle record. The lock is a plain
//! `std::sync::Mutex`: it is only ever held for map lookups and mutations,
//! never across an `.await`.

use crate::error::RegistryError;
use crate::result::VideoAnalysisResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Opaque task identifier (random 128-bit UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TaskId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| RegistryError::NotFound(s.to_string()))
    }
}

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// Exactly one of result/error exists once a task leaves Processing
#[derive(Debug, Clone)]
enum TaskState {
    Processing,
    Completed(Arc<VideoAnalysisResult>),
    Failed(String),
}

#[derive(Debug)]
struct TaskRecord {
    state: TaskState,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    /// Monotonic completion time, drives eviction
    finished: Option<Instant>,
}

/// Records plus a running count of the finished ones
#[derive(Debug, Default)]
struct TaskTable {
    records: HashMap<TaskId, TaskRecord>,
    finished: usize,
}

impl TaskRecord {
    fn status(&self) -> TaskStatus {
        match self.state {
            TaskState::Processing => TaskStatus::Processing,
            TaskState::Completed(_) => TaskStatus::Completed,
            TaskState::Failed(_) => TaskStatus::Failed,
        }
    }
}

/// Point-in-time copy of a task
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<Arc<VideoAnalysisResult>>,
    pub error: Option<String>,
}

/// Number of tasks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Retention limits for finished tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Finished tasks older than this are dropped
    pub ttl_secs: u64,
    /// At most this many finished tasks are kept; oldest go first
    pub max_retained: usize,
    /// How often the background sweeper runs
    pub sweep_interval_secs: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_retained: 1024,
            sweep_interval_secs: 60,
        }
    }
}

impl EvictionConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Shared, cloneable handle to the task store
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<TaskTable>>,
    eviction: EvictionConfig,
}

impl TaskRegistry {
    #[must_use]
    pub fn new(eviction: EvictionConfig) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(TaskTable {
                records: HashMap::with_capacity(64),
                finished: 0,
            })),
            eviction,
        }
    }

    #[must_use]
    pub fn eviction(&self) -> &EvictionConfig {
        &self.eviction
    }

    // A panic elsewhere while holding the lock leaves the map itself intact
    fn lock(&self) -> MutexGuard<'_, TaskTable> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new task in Processing state
    ///
    /// Trims the oldest finished tasks when over the retention limit; TTL
    /// expiry is left to the sweeper.
    pub fn create(&self) -> TaskId {
        let id = TaskId::new();
        let mut tasks = self.lock();
        if tasks.finished > self.eviction.max_retained {
            let evicted = Self::evict_overflow(&mut tasks, self.eviction.max_retained);
            debug!("Evicted {} finished tasks over the retention limit", evicted);
        }
        tasks.records.insert(
            id,
            TaskRecord {
                state: TaskState::Processing,
                created_at: Utc::now(),
                finished_at: None,
                finished: None,
            },
        );
        debug!("Registered task {}", id);
        id
    }

    pub fn get(&self, id: &TaskId) -> Result<TaskSnapshot, RegistryError> {
        let tasks = self.lock();
        let record = tasks
            .records
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let (result, error) = match &record.state {
            TaskState::Processing => (None, None),
            TaskState::Completed(result) => (Some(Arc::clone(result)), None),
            TaskState::Failed(error) => (None, Some(error.clone())),
        };

        Ok(TaskSnapshot {
            id: *id,
            status: record.status(),
            created_at: record.created_at,
            finished_at: record.finished_at,
            result,
            error,
        })
    }

    /// Transition Processing → Completed
    pub fn complete(&self, id: &TaskId, result: VideoAnalysisResult) -> Result<(), RegistryError> {
        self.finish(id, TaskState::Completed(Arc::new(result)))
    }

    /// Transition Processing → Failed
    pub fn fail(&self, id: &TaskId, error: impl Into<String>) -> Result<(), RegistryError> {
        self.finish(id, TaskState::Failed(error.into()))
    }

    fn finish(&self, id: &TaskId, state: TaskState) -> Result<(), RegistryError> {
        let mut tasks = self.lock();
        let Some(record) = tasks.records.get_mut(id) else {
            error!("Attempted to finish unknown task {}", id);
            return Err(RegistryError::NotFound(id.to_string()));
        };

        if !matches!(record.state, TaskState::Processing) {
            error!(
                "Task {} is already {}; refusing to overwrite terminal state",
                id,
                record.status().as_str()
            );
            return Err(RegistryError::AlreadyTerminal(id.to_string()));
        }

        record.state = state;
        record.finished_at = Some(Utc::now());
        record.finished = Some(Instant::now());
        info!("Task {} {}", id, record.status().as_str());
        tasks.finished += 1;
        Ok(())
    }

    #[must_use]
    pub fn counts(&self) -> TaskCounts {
        let tasks = self.lock();
        let mut counts = TaskCounts::default();
        for record in tasks.records.values() {
            match record.status() {
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Drop finished tasks past their TTL or beyond the retention limit
    pub fn evict_expired(&self) -> usize {
        self.evict_at(Instant::now())
    }

    /// [`TaskRegistry::evict_expired`] as of `now`
    pub fn evict_at(&self, now: Instant) -> usize {
        let ttl = self.eviction.ttl();
        let mut tasks = self.lock();
        let before = tasks.records.len();

        tasks.records.retain(|_, record| match record.finished {
            Some(finished) => now.saturating_duration_since(finished) < ttl,
            None => true,
        });
        let expired = before - tasks.records.len();
        tasks.finished -= expired;

        let evicted = expired + Self::evict_overflow(&mut tasks, self.eviction.max_retained);
        if evicted > 0 {
            debug!("Evicted {} finished tasks", evicted);
        }
        evicted
    }

    /// Drop the oldest finished tasks beyond `max_retained`
    fn evict_overflow(tasks: &mut TaskTable, max_retained: usize) -> usize {
        let excess = tasks.finished.saturating_sub(max_retained);
        if excess == 0 {
            return 0;
        }

        let mut finished: Vec<(Instant, TaskId)> = tasks
            .records
            .iter()
            .filter_map(|(id, record)| record.finished.map(|at| (at, *id)))
            .collect();
        if excess < finished.len() {
            finished.select_nth_unstable(excess);
        }
        for (_, id) in finished.into_iter().take(excess) {
            tasks.records.remove(&id);
        }
        tasks.finished -= excess;
        excess
    }
}
