mod command;
pub use command::CommandSpec;

mod step;
pub use step::{Stage, StepKind, StepSpec};

mod server;
pub use server::ServerSpec;

mod pipeline;
pub use pipeline::PipelineSpec;
