//! Environment variable names understood by the rendered application.
//!
//! The server and the bundler read these to select production behaviour and
//! static-render mode; keeping them here avoids magic strings in the pipeline.

/// Build mode variable (`production` / `development`).
pub const ENV_MODE: &str = "NODE_ENV";

/// Set to `true` when the server is launched only to be prerendered.
pub const ENV_SERVERLESS: &str = "IS_SERVERLESS";

/// Build identifier used by the application for crash reporting.
pub const ENV_APP_VERSION: &str = "appVersion";
