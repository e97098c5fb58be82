mod domain;
pub use domain::{BuildMode, Env, KeyValue, RenderEnv, RouteMap, TimeoutMs};
pub use domain::{ENV_APP_VERSION, ENV_MODE, ENV_SERVERLESS};

mod error;
pub use error::{ModelError, ModelResult};

mod spec;
pub use spec::{CommandSpec, PipelineSpec, ServerSpec, Stage, StepKind, StepSpec};
