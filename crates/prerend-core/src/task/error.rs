use taskvisor::TaskError;
use thiserror::Error;

/// First failure of a task sequence, attributed to the task that produced it.
#[derive(Debug, Error)]
#[error("task '{task}' failed: {cause}")]
pub struct TaskFailure {
    pub task: String,
    #[source]
    pub cause: TaskError,
}
