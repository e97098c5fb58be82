//! Contract between the orchestrator and the application server process.
//!
//! The orchestrator only sees these traits; `prerend-exec` provides the
//! OS-process implementation. Readiness is decided by a [`ReadinessProbe`]
//! applied to each stdout line, so a log-marker check can be swapped for
//! something structured without touching the pipeline.
mod error;
pub use error::ServerError;

mod guard;
pub use guard::ServerGuard;

use std::time::Duration;

use async_trait::async_trait;
use prerend_model::{CommandSpec, Env};

/// Predicate deciding whether a stdout line announces readiness.
pub trait ReadinessProbe: Send + Sync {
    fn matches(&self, line: &str) -> bool;
}

/// Ready once a line contains a fixed substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerProbe {
    marker: String,
}

impl MarkerProbe {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl ReadinessProbe for MarkerProbe {
    fn matches(&self, line: &str) -> bool {
        line.contains(self.marker.as_str())
    }
}

impl<F> ReadinessProbe for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, line: &str) -> bool {
        self(line)
    }
}

/// A started server process.
///
/// Owned by whoever started it; must not be used after [`ServerHandle::stop`].
#[async_trait]
pub trait ServerHandle: Send {
    /// OS process id, if the platform exposes one.
    fn id(&self) -> Option<u32>;

    /// `true` once [`ServerHandle::await_ready`] has observed a matching line.
    fn is_ready(&self) -> bool;

    /// Wait for the first stdout line accepted by `probe`.
    ///
    /// Fails with [`ServerError::ReadyTimeout`] if `timeout` elapses first; the
    /// process is left running and still has to be stopped by the caller.
    async fn await_ready(
        &mut self,
        probe: &dyn ReadinessProbe,
        timeout: Duration,
    ) -> Result<(), ServerError>;

    /// Deliver a termination signal. Calling it again is a no-op.
    fn stop(&mut self) -> Result<(), ServerError>;

    fn is_stopped(&self) -> bool;

    /// Most recent stderr lines, oldest first.
    fn stderr_tail(&self) -> Vec<String>;
}

/// Starts server processes.
pub trait ServerLauncher: Send + Sync {
    /// Spawn `command` with `env` layered over the command's own environment.
    ///
    /// Returns as soon as the process exists; it does not wait for readiness.
    fn start(&self, command: &CommandSpec, env: &Env) -> Result<Box<dyn ServerHandle>, ServerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_probe_matches_substring() {
        let probe = MarkerProbe::new("Server started");
        assert!(probe.matches("[app] Server started on port 8000"));
        assert!(!probe.matches("compiling bundle"));
        assert!(!probe.matches("server started"));
    }

    #[test]
    fn closures_are_probes() {
        let probe = |line: &str| line.starts_with("READY ");
        let probe: &dyn ReadinessProbe = &probe;
        assert!(probe.matches("READY pid=1"));
        assert!(!probe.matches("not READY"));
    }
}
