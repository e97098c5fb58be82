use std::fmt;

use prerend_model::Stage;

/// Lifecycle of a single pipeline run.
///
/// Moves strictly forward through the list below; `Failed` is reachable
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Verifying,
    Testing,
    Cleaning,
    Building,
    Starting,
    AwaitingReady,
    Snapshotting,
    Relocated,
    Writing,
    Stopping,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Verifying => "verifying",
            PipelineState::Testing => "testing",
            PipelineState::Cleaning => "cleaning",
            PipelineState::Building => "building",
            PipelineState::Starting => "starting",
            PipelineState::AwaitingReady => "awaiting-ready",
            PipelineState::Snapshotting => "snapshotting",
            PipelineState::Relocated => "relocated",
            PipelineState::Writing => "writing",
            PipelineState::Stopping => "stopping",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl From<Stage> for PipelineState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Verify => PipelineState::Verifying,
            Stage::Test => PipelineState::Testing,
            Stage::Clean => PipelineState::Cleaning,
            Stage::Build => PipelineState::Building,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
