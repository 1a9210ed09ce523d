use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::{error::LoggerError, format::LoggerFormat};

/// Overrides the log filter, e.g. `info,harvest_source=debug`.
pub const ENV_LOG_LEVEL: &str = "HARVEST_LOG";
/// Overrides the output format (`text`, `json`, `journald`).
pub const ENV_LOG_FORMAT: &str = "HARVEST_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive string.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color: std::io::stdout().is_terminal(),
        }
    }
}

impl LoggerConfig {
    /// Defaults with [`ENV_LOG_LEVEL`] and [`ENV_LOG_FORMAT`] applied.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::default().with_overrides(
            std::env::var(ENV_LOG_LEVEL).ok().as_deref(),
            std::env::var(ENV_LOG_FORMAT).ok().as_deref(),
        )
    }

    fn with_overrides(
        mut self,
        level: Option<&str>,
        format: Option<&str>,
    ) -> Result<Self, LoggerError> {
        if let Some(level) = level.map(str::trim).filter(|l| !l.is_empty()) {
            self.level = level.to_string();
        }
        if let Some(format) = format {
            self.format = format.parse()?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let cfg = LoggerConfig::default()
            .with_overrides(Some("debug,hyper=warn"), Some("json"))
            .unwrap();
        assert_eq!(cfg.level, "debug,hyper=warn");
        assert_eq!(cfg.format, LoggerFormat::Json);
    }

    #[test]
    fn blank_level_keeps_default() {
        let cfg = LoggerConfig::default()
            .with_overrides(Some("  "), None)
            .unwrap();
        assert_eq!(cfg.level, "info");
    }

    #[test]
    fn bad_format_is_reported() {
        let err = LoggerConfig::default()
            .with_overrides(None, Some("yaml"))
            .unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFormat(_)));
    }

    #[test]
    fn deserializes_partial_config() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{"format":"json","level":"warn"}"#).unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level, "warn");
        assert!(cfg.with_targets);
    }
}
