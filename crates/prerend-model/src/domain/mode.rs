use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ENV_APP_VERSION, ENV_MODE, ENV_SERVERLESS, Env, ModelError};

/// Which flavour of the application is built and served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }
}

impl FromStr for BuildMode {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ModelError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit environment for one pipeline run.
///
/// Passed into every spawned step and into the server instead of mutating
/// the orchestrator's own process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderEnv {
    pub mode: BuildMode,
    pub version: Option<String>,
}

impl RenderEnv {
    pub fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Variables handed to build, lint and test steps.
    pub fn build_env(&self) -> Env {
        let mut env = Env::new().with(ENV_MODE, self.mode.as_str());
        if let Some(version) = &self.version {
            env.push(ENV_APP_VERSION, version.as_str());
        }
        env
    }

    /// Variables handed to the server launched for prerendering.
    pub fn server_env(&self) -> Env {
        self.build_env().with(ENV_SERVERLESS, "true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_names() {
        assert_eq!("prod".parse::<BuildMode>().unwrap(), BuildMode::Production);
        assert_eq!(
            " Development ".parse::<BuildMode>().unwrap(),
            BuildMode::Development
        );
        assert!("staging".parse::<BuildMode>().is_err());
    }

    #[test]
    fn build_env_carries_mode_and_version() {
        let env = RenderEnv::new(BuildMode::Production)
            .with_version("abc123")
            .build_env();

        assert_eq!(env.get(ENV_MODE), Some("production"));
        assert_eq!(env.get(ENV_APP_VERSION), Some("abc123"));
        assert!(env.get(ENV_SERVERLESS).is_none());
    }

    #[test]
    fn server_env_enables_serverless() {
        let env = RenderEnv::new(BuildMode::Development).server_env();

        assert_eq!(env.get(ENV_MODE), Some("development"));
        assert_eq!(env.get(ENV_SERVERLESS), Some("true"));
        assert!(env.get(ENV_APP_VERSION).is_none());
    }
}
