mod kv;
pub use kv::KeyValue;

mod env;
pub use env::Env;

mod mode;
pub use mode::{BuildMode, RenderEnv};

mod routes;
pub use routes::RouteMap;

mod constants;
pub use constants::{ENV_APP_VERSION, ENV_MODE, ENV_SERVERLESS};

/// Timeout value in milliseconds.
///
/// Used for readiness waits and per-request HTTP limits.
pub type TimeoutMs = u64;
