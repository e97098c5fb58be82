//! Pipeline event logging.
//!
//! Maps pipeline events to tracing records: state changes at DEBUG, the
//! outcome at INFO or ERROR with the failed stage and error kind.

use prerend_core::pipeline::{PipelineError, PipelineEvent, PipelineObserver, PipelineState};
use tracing::{debug, error, info};

/// Observer that logs every pipeline event.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineLogger;

impl PipelineObserver for PipelineLogger {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        log_event(event);
    }
}

fn log_event(event: &PipelineEvent<'_>) {
    match event {
        PipelineEvent::Transition { from, to } => {
            debug!(from = %from, to = %to, "{}", message_for(*to))
        }
        PipelineEvent::Succeeded { report } => info!(
            pages = report.written.len(),
            relocated = report.relocated,
            assets = %report.assets_dir.display(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "prerender succeeded"
        ),
        PipelineEvent::Failed { stage, error } => error!(
            stage = %stage,
            kind = error.kind(),
            error = %error,
            "{}",
            failure_detail(error)
        ),
    }
}

fn failure_detail(error: &PipelineError) -> String {
    match error {
        PipelineError::ReadyTimeout { stderr_tail, .. } if !stderr_tail.is_empty() => {
            format!("prerender failed; server stderr: {}", stderr_tail.join(" | "))
        }
        _ => "prerender failed".to_string(),
    }
}

/// Human-readable description of entering each state.
#[inline]
fn message_for(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Idle => "pipeline idle",
        PipelineState::Verifying => "verifying sources",
        PipelineState::Testing => "running tests",
        PipelineState::Cleaning => "cleaning build output",
        PipelineState::Building => "building",
        PipelineState::Starting => "starting server",
        PipelineState::AwaitingReady => "waiting for server readiness",
        PipelineState::Snapshotting => "capturing routes and relocating build output",
        PipelineState::Relocated => "build output relocated",
        PipelineState::Writing => "writing rendered pages",
        PipelineState::Stopping => "stopping server",
        PipelineState::Done => "pipeline done",
        PipelineState::Failed => "pipeline failed",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn every_state_has_a_message() {
        for state in [
            PipelineState::Idle,
            PipelineState::Verifying,
            PipelineState::Testing,
            PipelineState::Cleaning,
            PipelineState::Building,
            PipelineState::Starting,
            PipelineState::AwaitingReady,
            PipelineState::Snapshotting,
            PipelineState::Relocated,
            PipelineState::Writing,
            PipelineState::Stopping,
            PipelineState::Done,
            PipelineState::Failed,
        ] {
            assert!(!message_for(state).is_empty());
        }
    }

    #[test]
    fn timeout_detail_includes_stderr_tail() {
        let err = PipelineError::ReadyTimeout {
            timeout: Duration::from_secs(60),
            stderr_tail: vec!["EADDRINUSE".into(), "exiting".into()],
        };
        assert_eq!(
            failure_detail(&err),
            "prerender failed; server stderr: EADDRINUSE | exiting"
        );
    }

    #[test]
    fn logging_events_without_a_subscriber_is_harmless() {
        let err = PipelineError::ReadyTimeout {
            timeout: Duration::from_secs(1),
            stderr_tail: Vec::new(),
        };
        let logger = PipelineLogger;
        logger.on_event(&PipelineEvent::Transition {
            from: PipelineState::Idle,
            to: PipelineState::Starting,
        });
        logger.on_event(&PipelineEvent::Failed {
            stage: err.stage(),
            error: &err,
        });
    }
}
