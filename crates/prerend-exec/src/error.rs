use taskvisor::TaskError;
use thiserror::Error;

use prerend_core::server::ServerError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid command: {0}")]
    InvalidSpec(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExecError> for TaskError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::InvalidSpec(_) => TaskError::Fatal {
                reason: e.to_string(),
            },
            ExecError::Io(_) => TaskError::Fail {
                reason: e.to_string(),
            },
        }
    }
}

impl From<ExecError> for ServerError {
    fn from(e: ExecError) -> Self {
        ServerError::InvalidCommand(e.to_string())
    }
}
