use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("route must start with '/': {0}")]
    InvalidRoute(String),

    #[error("invalid output filename for route '{route}': {reason}")]
    InvalidOutput { route: String, reason: &'static str },

    #[error("output '{file}' is claimed by both '{first}' and '{second}'")]
    DuplicateOutput {
        file: String,
        first: String,
        second: String,
    },

    #[error("unknown build mode: {0}")]
    UnknownMode(String),

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
