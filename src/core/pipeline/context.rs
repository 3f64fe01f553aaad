//! Per-stage run context and structured task groups.

use super::PipelineConfig;
use crate::core::relay::CancellationToken;
use crate::core::throttle::Throttle;
use crate::error::{panic_message, PipelineError, Result, SignerError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Everything a stage may touch besides its relays.
///
/// One context per stage per run; all contexts of a run share the same
/// cancellation token, throttle and config.
#[derive(Clone)]
pub struct StageContext {
    index: usize,
    name: Arc<str>,
    cancel: CancellationToken,
    throttle: Arc<Throttle>,
    config: Arc<PipelineConfig>,
}

impl StageContext {
    pub(crate) fn new(
        index: usize,
        name: &str,
        cancel: CancellationToken,
        throttle: Arc<Throttle>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            index,
            name: Arc::from(name),
            cancel,
            throttle,
            config,
        }
    }

    /// Position of the stage in the pipeline
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stage name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The run's cancellation token
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The run's slow-hash throttle
    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// The run's configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start a task group for per-item work in this stage
    pub fn task_group(&self) -> TaskGroup {
        TaskGroup {
            stage: Arc::clone(&self.name),
            cancel: self.cancel.clone(),
            failure: Arc::new(Mutex::new(None)),
        }
    }
}

/// Failure bookkeeping for tasks spawned inside a `std::thread::scope`.
///
/// The scope gives the structure (every task is joined before the stage
/// returns); the group gives the policy: the first task fault is kept
/// and cancels the whole run so sibling tasks stop at their next
/// suspension point.
///
/// ```rust,ignore
/// let tasks = ctx.task_group();
/// let received = std::thread::scope(|scope| {
///     while let Some(item) = input.recv()? {
///         scope.spawn(tasks.task(move || work(item)));
///     }
///     Ok(())
/// });
/// tasks.finish(received)
/// ```
#[derive(Clone)]
pub struct TaskGroup {
    stage: Arc<str>,
    cancel: CancellationToken,
    failure: Arc<Mutex<Option<SignerError>>>,
}

impl TaskGroup {
    /// Wrap fallible work as a closure suitable for `Scope::spawn`.
    pub fn task<'a, F>(&self, work: F) -> impl FnOnce() + Send + 'a
    where
        F: FnOnce() -> Result<()> + Send + 'a,
    {
        let group = self.clone();
        move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
                Err(PipelineError::StagePanicked {
                    stage: group.stage.to_string(),
                    message: panic_message(payload.as_ref()),
                }
                .into())
            });
            if let Err(error) = outcome {
                group.record(error);
            }
        }
    }

    /// Keep `error` if it is the first real fault, then cancel the run.
    pub fn record(&self, error: SignerError) {
        if !error.is_cancellation() {
            warn!(stage = %self.stage, %error, "task failed, cancelling run");
        }
        {
            let mut slot = self
                .failure
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let replace = match slot.as_ref() {
                None => true,
                Some(existing) => existing.is_cancellation() && !error.is_cancellation(),
            };
            if replace {
                *slot = Some(error);
            }
        }
        self.cancel.cancel();
    }

    /// Combine the stage's own result with its tasks' outcome.
    ///
    /// Call after the scope has joined every task. A task fault wins over
    /// a cancellation error from the stage loop it triggered.
    pub fn finish(self, stage_result: Result<()>) -> Result<()> {
        let task_failure = self
            .failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match (stage_result, task_failure) {
            (Ok(()), None) => Ok(()),
            (Ok(()), Some(error)) => Err(error),
            (Err(error), None) => Err(error),
            (Err(error), Some(task_error)) => {
                if error.is_cancellation() {
                    Err(task_error)
                } else {
                    Err(error)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HashError, RelayError};
    use std::thread;

    fn context() -> StageContext {
        StageContext::new(
            0,
            "test-stage",
            CancellationToken::new(),
            Arc::new(Throttle::new(1, None)),
            Arc::new(PipelineConfig::default()),
        )
    }

    fn hash_failure() -> SignerError {
        HashError::Failed {
            function: "hash_a",
            input: "x".to_string(),
            reason: "bad".to_string(),
        }
        .into()
    }

    #[test]
    fn successful_tasks_finish_ok() {
        let ctx = context();
        let tasks = ctx.task_group();
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(tasks.task(|| Ok(())));
            }
        });
        assert!(!ctx.is_cancelled());
        assert!(tasks.finish(Ok(())).is_ok());
    }

    #[test]
    fn task_failure_cancels_the_run() {
        let ctx = context();
        let tasks = ctx.task_group();
        thread::scope(|scope| {
            scope.spawn(tasks.task(|| Err(hash_failure())));
        });
        assert!(ctx.is_cancelled());
        assert!(matches!(
            tasks.finish(Ok(())),
            Err(SignerError::Hash(HashError::Failed { .. }))
        ));
    }

    #[test]
    fn task_panic_becomes_a_stage_error() {
        let ctx = context();
        let tasks = ctx.task_group();
        thread::scope(|scope| {
            scope.spawn(tasks.task(|| panic!("kaboom")));
        });
        match tasks.finish(Ok(())) {
            Err(SignerError::Pipeline(PipelineError::StagePanicked { stage, message })) => {
                assert_eq!(stage, "test-stage");
                assert_eq!(message, "kaboom");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn real_fault_beats_cancellation() {
        let ctx = context();
        let tasks = ctx.task_group();
        tasks.record(RelayError::Cancelled.into());
        tasks.record(hash_failure());
        tasks.record(RelayError::Cancelled.into());

        let result = tasks.finish(Err(RelayError::Cancelled.into()));
        assert!(matches!(result, Err(SignerError::Hash(_))));
    }

    #[test]
    fn context_exposes_run_resources() {
        let ctx = context();
        assert_eq!(ctx.index(), 0);
        assert_eq!(ctx.name(), "test-stage");
        assert_eq!(ctx.throttle().permits(), 1);
        assert_eq!(ctx.config().sextet_width, 6);
        ctx.cancel_token().cancel();
        assert!(ctx.is_cancelled());
    }
}
