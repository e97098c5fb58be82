use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use prerend_model::PipelineSpec;
use prerend_observe::LoggerConfig;
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "prerend.json";

/// Keys accepted at the top level of the configuration file.
const CONFIG_KEYS: &[&str] = &[
    "buildRoot",
    "assetsDir",
    "steps",
    "server",
    "routes",
    "deploy",
    "logger",
];

/// Contents of the configuration file: the pipeline plus a `logger` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(flatten)]
    pub pipeline: PipelineSpec,
    pub logger: LoggerConfig,
}

impl AppConfig {
    /// Load `path`, or `./prerend.json` when it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };
        let cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.pipeline
            .validate()
            .context("invalid pipeline configuration")?;
        Ok(cfg)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        // Flattened fields cannot use `deny_unknown_fields`.
        if let Some(key) = value
            .as_object()
            .and_then(|obj| obj.keys().find(|k| !CONFIG_KEYS.contains(&k.as_str())))
        {
            bail!("unknown key '{key}' in config {}", path.display());
        }
        serde_json::from_value(value)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}
