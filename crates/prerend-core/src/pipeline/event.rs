use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tracing::{debug, error};

use crate::pipeline::{PipelineError, PipelineReport, PipelineState};

/// Notifications emitted while a pipeline runs.
///
/// Each run emits any number of `Transition`s followed by exactly one of
/// `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy)]
pub enum PipelineEvent<'a> {
    Transition {
        from: PipelineState,
        to: PipelineState,
    },
    Succeeded {
        report: &'a PipelineReport,
    },
    Failed {
        stage: PipelineState,
        error: &'a PipelineError,
    },
}

/// Receiver of [`PipelineEvent`]s.
///
/// Called synchronously on the pipeline's task; implementations should be quick.
/// A panicking observer is logged and does not affect the run.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent<'_>);
}

/// Tracks the current state and fans events out to observers.
pub(crate) struct StateTracker<'a> {
    state: PipelineState,
    observers: &'a [Arc<dyn PipelineObserver>],
    completed: bool,
}

impl<'a> StateTracker<'a> {
    pub(crate) fn new(observers: &'a [Arc<dyn PipelineObserver>]) -> Self {
        Self {
            state: PipelineState::Idle,
            observers,
            completed: false,
        }
    }

    pub(crate) fn current(&self) -> PipelineState {
        self.state
    }

    /// Move to `next`; re-entering the current state emits nothing.
    pub(crate) fn enter(&mut self, next: PipelineState) {
        if next == self.state {
            return;
        }
        let from = std::mem::replace(&mut self.state, next);
        debug!(from = %from, to = %next, "pipeline state changed");
        self.emit(&PipelineEvent::Transition { from, to: next });
    }

    /// Report the terminal outcome. Only the first call has any effect.
    pub(crate) fn complete(&mut self, result: &Result<PipelineReport, PipelineError>) {
        if self.completed {
            return;
        }
        self.completed = true;

        match result {
            Ok(report) => {
                self.enter(PipelineState::Done);
                self.emit(&PipelineEvent::Succeeded { report });
            }
            Err(error) => {
                let stage = error.stage();
                self.enter(PipelineState::Failed);
                self.emit(&PipelineEvent::Failed { stage, error });
            }
        }
    }

    fn emit(&self, event: &PipelineEvent<'_>) {
        for (idx, observer) in self.observers.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| observer.on_event(event))).is_err() {
                error!(observer = idx, "pipeline observer panicked");
            }
        }
    }
}
