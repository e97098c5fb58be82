use std::time::Duration;

use async_trait::async_trait;
use prerend_core::server::{ReadinessProbe, ServerError, ServerHandle, ServerLauncher};
use prerend_model::{CommandSpec, Env};
use tokio::{
    process::Child,
    sync::mpsc::{self, UnboundedReceiver},
    time,
};
use tracing::{debug, info, warn};

use crate::{
    command::build_command,
    output::{LogConfig, Sink, StderrTail, Stream, spawn_pump},
};

/// Starts the application server as a child process.
///
/// Stdout and stderr are piped and pumped by background tasks for the
/// lifetime of the process, so the child never blocks on a full pipe.
#[derive(Debug, Clone, Default)]
pub struct ProcessController {
    log: LogConfig,
}

impl ProcessController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: LogConfig) -> Self {
        Self { log }
    }

    /// Typed variant of [`ServerLauncher::start`].
    pub fn spawn(&self, command: &CommandSpec, env: &Env) -> Result<ChildServer, ServerError> {
        let mut cmd = build_command(command, env)?;
        let mut child = cmd.spawn().map_err(|source| ServerError::Spawn {
            command: command.to_string(),
            source,
        })?;
        let pid = child.id();
        let name = match pid {
            Some(pid) => format!("server[{pid}]"),
            None => "server".to_string(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let tail = StderrTail::new(self.log.stderr_tail);
        if let Some(out) = child.stdout.take() {
            spawn_pump(out, Stream::Stdout, name.clone(), self.log, Sink::Lines(tx));
        }
        if let Some(err) = child.stderr.take() {
            spawn_pump(err, Stream::Stderr, name, self.log, Sink::Tail(tail.clone()));
        }
        info!(?pid, command = %command, "server process spawned");

        Ok(ChildServer {
            child,
            pid,
            lines: Some(rx),
            tail,
            ready: false,
            stopped: false,
        })
    }
}

impl ServerLauncher for ProcessController {
    fn start(&self, command: &CommandSpec, env: &Env) -> Result<Box<dyn ServerHandle>, ServerError> {
        Ok(Box::new(self.spawn(command, env)?))
    }
}

/// A running server child process.
///
/// Stopped on drop unless [`ServerHandle::stop`] was already called.
pub struct ChildServer {
    child: Child,
    pid: Option<u32>,
    /// Stdout lines for the readiness scan; `None` once readiness is decided.
    lines: Option<UnboundedReceiver<String>>,
    tail: StderrTail,
    ready: bool,
    stopped: bool,
}

impl ChildServer {
    fn exit_status(&mut self) -> String {
        match self.child.try_wait() {
            Ok(Some(status)) => status.to_string(),
            Ok(None) => "stdout closed".to_string(),
            Err(e) => format!("status unavailable: {e}"),
        }
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<(), ServerError> {
        match self.pid {
            Some(pid) => crate::signal::terminate(pid).map_err(|source| ServerError::Signal { pid, source }),
            None => Ok(()),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<(), ServerError> {
        self.child.start_kill().map_err(|source| ServerError::Signal {
            pid: self.pid.unwrap_or_default(),
            source,
        })
    }
}

#[async_trait]
impl ServerHandle for ChildServer {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn await_ready(
        &mut self,
        probe: &dyn ReadinessProbe,
        timeout: Duration,
    ) -> Result<(), ServerError> {
        if self.ready {
            return Ok(());
        }
        let Some(mut lines) = self.lines.take() else {
            return Err(ServerError::Exited {
                status: self.exit_status(),
            });
        };

        let scan = async {
            while let Some(line) = lines.recv().await {
                if probe.matches(&line) {
                    return true;
                }
            }
            false
        };

        // On success or exit the receiver is dropped: later lines are only logged.
        match time::timeout(timeout, scan).await {
            Ok(true) => {
                self.ready = true;
                debug!(pid = ?self.pid, "readiness line observed");
                Ok(())
            }
            Ok(false) => Err(ServerError::Exited {
                status: self.exit_status(),
            }),
            Err(_) => {
                self.lines = Some(lines);
                Err(ServerError::ReadyTimeout { timeout })
            }
        }
    }

    fn stop(&mut self) -> Result<(), ServerError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.lines = None;

        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(pid = ?self.pid, %status, "server already exited");
            return Ok(());
        }
        self.terminate()?;
        info!(pid = ?self.pid, "server terminated");
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn stderr_tail(&self) -> Vec<String> {
        self.tail.snapshot()
    }
}

impl Drop for ChildServer {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        if let Err(e) = self.stop() {
            warn!(pid = ?self.pid, error = %e, "failed to stop server on drop");
        }
    }
}
