use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Env, ModelError};

/// External program invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommandSpec {
    /// Program to execute (e.g. `"node"`, `"npm"`).
    pub command: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Variables added on top of the inherited environment.
    #[serde(default, skip_serializing_if = "Env::is_empty")]
    pub env: Env,

    /// Working directory. If `None`, inherits from the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Env::default(),
            cwd: None,
        }
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Rejects an empty or whitespace-only program name.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.command.trim().is_empty() {
            return Err(ModelError::Invalid("command is empty".into()));
        }
        Ok(())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
