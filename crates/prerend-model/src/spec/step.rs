use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{CommandSpec, ModelError};

/// Phase of the pre-server part of the pipeline a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Verify,
    Test,
    Clean,
    Build,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Verify => "verify",
            Stage::Test => "test",
            Stage::Clean => "clean",
            Stage::Build => "build",
        }
    }
}

impl FromStr for Stage {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verify" | "lint" => Ok(Self::Verify),
            "test" => Ok(Self::Test),
            "clean" => Ok(Self::Clean),
            "build" => Ok(Self::Build),
            _ => Err(ModelError::UnknownStage(s.to_string())),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step actually does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    /// Run an external tool; a non-zero exit fails the step.
    Exec(CommandSpec),
    /// Remove everything under the build root.
    Clean,
}

/// Named unit of pre-server work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StepSpec {
    pub name: String,
    pub stage: Stage,
    pub kind: StepKind,
}

impl StepSpec {
    pub fn exec(name: impl Into<String>, stage: Stage, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            stage,
            kind: StepKind::Exec(command),
        }
    }

    pub fn clean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: Stage::Clean,
            kind: StepKind::Clean,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.trim().is_empty() {
            return Err(ModelError::Invalid("step name is empty".into()));
        }
        match &self.kind {
            StepKind::Exec(cmd) => cmd
                .validate()
                .map_err(|e| ModelError::Invalid(format!("step '{}': {e}", self.name))),
            StepKind::Clean => Ok(()),
        }
    }
}
