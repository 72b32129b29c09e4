//! Task runner
//!
//! Launches one worker per submitted video off the caller's path. Workers wait
//! on a semaphore so at most `max_concurrent` pipelines run at once, and no
//! more than `max_pending` tasks may be admitted but unfinished. Each worker is
//! the single writer of its task's terminal state.

use crate::error::{PipelineError, SubmitError};
use crate::pipeline::VideoPipeline;
use crate::registry::{TaskId, TaskRegistry};
use crate::result::VideoAnalysisResult;
use emotion_analyzers::LanguageHint;
use emotion_media::ScratchDir;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const INTERNAL_ERROR: &str = "internal error";

/// Runner limits
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub max_concurrent: usize,
    pub max_pending: usize,
    /// Parent directory for per-task scratch dirs (system temp dir when `None`)
    pub scratch_root: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_pending: 64,
            scratch_root: None,
        }
    }
}

struct RunnerShared {
    registry: TaskRegistry,
    pipeline: Arc<VideoPipeline>,
    permits: Arc<Semaphore>,
    pending: AtomicUsize,
    idle: Notify,
    config: RunnerConfig,
    shutdown: CancellationToken,
}

/// Executes video tasks in the background
#[derive(Clone)]
pub struct TaskRunner {
    shared: Arc<RunnerShared>,
}

impl TaskRunner {
    pub fn new(registry: TaskRegistry, pipeline: Arc<VideoPipeline>, config: RunnerConfig) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            shared: Arc::new(RunnerShared {
                registry,
                pipeline,
                permits: Arc::new(Semaphore::new(max_concurrent)),
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
                config,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TaskRegistry {
        &self.shared.registry
    }

    /// Tasks admitted but not yet finished
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Token cancelled when the runner shuts down
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shared.shutdown
    }

    /// Register a task and start analyzing `video` in the background
    ///
    /// Returns as soon as the task id exists. Must be called from within a
    /// Tokio runtime.
    pub fn submit(&self, video: PathBuf, language: LanguageHint) -> Result<TaskId, SubmitError> {
        let shared = &self.shared;
        let max_pending = shared.config.max_pending;
        shared
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max_pending).then_some(n + 1)
            })
            .map_err(|_| {
                warn!("Rejecting video task: {} tasks pending", max_pending);
                SubmitError::QueueFull(max_pending)
            })?;

        // Checked after admission: a concurrent shutdown either sees this task
        // in `pending` or this check sees the cancellation.
        if shared.shutdown.is_cancelled() {
            Self::release(shared);
            return Err(SubmitError::ShuttingDown);
        }

        let id = shared.registry.create();
        let cancel = shared.shutdown.child_token();
        info!("Submitted video task {} for {}", id, video.display());

        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let outcome = Self::execute(&shared, id, video, language, cancel).await;
            let recorded = match outcome {
                Ok(result) => shared.registry.complete(&id, result),
                Err(message) => shared.registry.fail(&id, message),
            };
            if let Err(e) = recorded {
                error!("Could not record outcome of task {}: {}", id, e);
            }

            Self::release(&shared);
        });

        Ok(id)
    }

    fn release(shared: &RunnerShared) {
        shared.pending.fetch_sub(1, Ordering::AcqRel);
        shared.idle.notify_waiters();
    }

    /// Run the pipeline for one task; the error is the user-facing message
    async fn execute(
        shared: &RunnerShared,
        id: TaskId,
        video: PathBuf,
        language: LanguageHint,
        cancel: CancellationToken,
    ) -> Result<VideoAnalysisResult, String> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled.user_message()),
            permit = Arc::clone(&shared.permits).acquire_owned() => permit.map_err(|e| {
                error!("Task {}: worker pool closed: {}", id, e);
                INTERNAL_ERROR.to_string()
            })?,
        };

        let scratch = ScratchDir::new_in(
            shared.config.scratch_root.as_deref(),
            &format!("emotion-task-{id}-"),
        )
        .map_err(|e| {
            error!("Task {}: cannot create scratch dir: {}", id, e);
            INTERNAL_ERROR.to_string()
        })?;

        // Separate task so a panicking pipeline still leaves a terminal state.
        // The scratch dir moves in and is removed on every exit, unwinding included.
        let pipeline = Arc::clone(&shared.pipeline);
        let handle = tokio::spawn(async move {
            let result = pipeline.run(&video, &language, &scratch, &cancel).await;
            (result, scratch)
        });

        match handle.await {
            Ok((result, scratch)) => {
                let scratch_path = scratch.path().to_path_buf();
                if let Err(e) = scratch.close() {
                    warn!(
                        "Task {}: failed to remove scratch dir {}: {}",
                        id,
                        scratch_path.display(),
                        e
                    );
                }
                result.map_err(|e| {
                    if e.is_input_error() || matches!(e, PipelineError::Cancelled) {
                        warn!("Task {} failed: {}", id, e);
                    } else {
                        error!("Task {} failed: {}", id, e);
                    }
                    e.user_message()
                })
            }
            Err(join_error) if join_error.is_panic() => {
                error!("Task {}: pipeline panicked", id);
                Err(INTERNAL_ERROR.to_string())
            }
            Err(join_error) => {
                error!("Task {}: pipeline aborted: {}", id, join_error);
                Err(PipelineError::Cancelled.user_message())
            }
        }
    }

    /// Periodically evict expired tasks until shutdown
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let period = shared.registry.eviction().sweep_interval();
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shared.shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let evicted = shared.registry.evict_expired();
                        if evicted > 0 {
                            debug!("Sweeper evicted {} tasks", evicted);
                        }
                    }
                }
            }
            debug!("Sweeper stopped");
        })
    }

    /// Cancel every in-flight task and wait for their workers to record it
    pub async fn shutdown(&self) {
        let shared = &self.shared;
        info!("Shutting down task runner ({} pending)", self.pending());
        shared.shutdown.cancel();

        loop {
            let idle = shared.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if shared.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            idle.await;
        }
        info!("Task runner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.max_pending, 64);
        assert!(config.scratch_root.is_none());
    }
}
