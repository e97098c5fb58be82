use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid server command: {0}")]
    InvalidCommand(String),

    #[error("readiness not observed within {}ms", timeout.as_millis())]
    ReadyTimeout { timeout: Duration },

    #[error("server output closed before readiness ({status})")]
    Exited { status: String },

    #[error("failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}
