use std::time::Duration;

use thiserror::Error;

use crate::{
    pipeline::PipelineState,
    relocate::RelocationError,
    server::ServerError,
    snapshot::FetchError,
    task::TaskFailure,
};

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{failure}")]
    Task {
        stage: PipelineState,
        #[source]
        failure: TaskFailure,
    },

    #[error("failed to start server: {0}")]
    Spawn(#[source] ServerError),

    #[error("server did not become ready within {}ms", timeout.as_millis())]
    ReadyTimeout {
        timeout: Duration,
        stderr_tail: Vec<String>,
    },

    #[error("server stopped before becoming ready: {0}")]
    ServerExited(#[source] ServerError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Relocation(#[from] RelocationError),
}

impl PipelineError {
    /// State the run was in when it failed.
    pub fn stage(&self) -> PipelineState {
        match self {
            PipelineError::Task { stage, .. } => *stage,
            PipelineError::Spawn(_) => PipelineState::Starting,
            PipelineError::ReadyTimeout { .. } | PipelineError::ServerExited(_) => {
                PipelineState::AwaitingReady
            }
            PipelineError::Fetch(_) => PipelineState::Snapshotting,
            PipelineError::Relocation(e) if e.is_write() => PipelineState::Writing,
            PipelineError::Relocation(_) => PipelineState::Snapshotting,
        }
    }

    /// Short machine-friendly error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Task { .. } => "task",
            PipelineError::Spawn(_) => "spawn",
            PipelineError::ReadyTimeout { .. } => "timeout",
            PipelineError::ServerExited(_) => "server-exited",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Relocation(_) => "relocation",
        }
    }
}
