//! OS-process side of the pipeline: external build steps and the server child.
mod error;
pub use error::ExecError;

mod output;
pub use output::{LogConfig, StderrTail};

mod command;
pub use command::CommandTask;

mod process;
pub use process::{ChildServer, ProcessController};

pub mod signal;
