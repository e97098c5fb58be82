use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::object::{LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Logger section of the prerender configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// Filter expression (e.g. `"info"`, `"prerend_exec=debug,info"`).
    pub level: LoggerLevel,
    /// Timezone for timestamps.
    pub tz: LoggerTimeZone,
    /// Include module targets in text and JSON output.
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: false,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Colour is used only when enabled and stderr is a terminal.
    ///
    /// Evaluated at initialisation time, not when the config is parsed.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stderr().is_terminal()
    }

    /// Replace the level and format with any command-line overrides.
    pub fn with_overrides(mut self, level: Option<LoggerLevel>, format: Option<LoggerFormat>) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        if let Some(format) = format {
            self.format = format;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = LoggerConfig::default();

        assert_eq!(config.format, LoggerFormat::Text);
        assert_eq!(config.tz, LoggerTimeZone::Utc);
        assert_eq!(config.level.as_str(), "info");
        assert!(!config.with_targets);
        assert!(config.use_color);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: LoggerConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.level.as_str(), "info");
        assert_eq!(config.format, LoggerFormat::Text);
        assert!(config.use_color);
    }

    #[test]
    fn camel_case_fields() {
        let json = r#"{"format": "json", "level": "debug", "withTargets": true, "useColor": false}"#;
        let config: LoggerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.format, LoggerFormat::Json);
        assert_eq!(config.level.as_str(), "debug");
        assert!(config.with_targets);
        assert!(!config.use_color);
        assert!(!config.should_use_color());
    }

    #[test]
    fn overrides_replace_only_what_is_given() {
        let config = LoggerConfig::default()
            .with_overrides(Some("warn".parse().unwrap()), None);
        assert_eq!(config.level.as_str(), "warn");
        assert_eq!(config.format, LoggerFormat::Text);

        let config = config.with_overrides(None, Some(LoggerFormat::Json));
        assert_eq!(config.level.as_str(), "warn");
        assert_eq!(config.format, LoggerFormat::Json);
    }
}
