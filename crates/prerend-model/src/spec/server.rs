use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{CommandSpec, ModelError, TimeoutMs};

/// How to launch the application server and talk to it once it is up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ServerSpec {
    pub command: CommandSpec,
    /// Substring of a stdout line that signals the server accepts connections.
    pub ready_marker: String,
    pub ready_timeout_ms: TimeoutMs,
    /// Address routes are appended to (e.g. `http://localhost:8000`).
    pub base_url: String,
    /// Upper bound for a single route request, connect through last body byte.
    pub request_timeout_ms: TimeoutMs,
    /// Non-2xx statuses accepted for specific routes (e.g. `"/404": 404`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expect_status: BTreeMap<String, u16>,
}

impl ServerSpec {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.command
            .validate()
            .map_err(|e| ModelError::Invalid(format!("server: {e}")))?;
        if self.ready_marker.is_empty() {
            return Err(ModelError::Invalid("server.readyMarker is empty".into()));
        }
        if self.ready_timeout_ms == 0 {
            return Err(ModelError::Invalid(
                "server.readyTimeoutMs cannot be zero".into(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ModelError::Invalid(format!(
                "server.baseUrl must be an http(s) address: {}",
                self.base_url
            )));
        }
        for (route, status) in &self.expect_status {
            if !(100..=599).contains(status) {
                return Err(ModelError::Invalid(format!(
                    "server.expectStatus[{route}] is not an HTTP status: {status}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ServerSpec {
    fn default() -> Self {
        Self {
            command: CommandSpec::new("node", ["./src/server"]),
            ready_marker: "Server started".into(),
            ready_timeout_ms: 60_000,
            base_url: "http://localhost:8000".into(),
            request_timeout_ms: 30_000,
            expect_status: BTreeMap::from([("/404".to_string(), 404)]),
        }
    }
}
