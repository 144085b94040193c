//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use switchyard_core::Mode;

use crate::schema::LogFormat;
use crate::{ConfigError, SwitchyardConfig};

/// Builds a [`SwitchyardConfig`] from layers, later layers winning:
///
/// 1. built-in defaults (or a preset)
/// 2. a TOML or JSON file, or an inline string
/// 3. `PREFIX__SECTION__KEY` environment variables
///
/// A file layer replaces the whole configuration; fields the file omits take
/// their defaults, not the values of an earlier layer.
///
/// ```no_run
/// use switchyard_config::ConfigLoader;
///
/// # fn main() -> Result<(), switchyard_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("switchyard.toml")?
///     .with_env_prefix("SWITCHYARD")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: SwitchyardConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Starts from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SwitchyardConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = SwitchyardConfig::default();
        self
    }

    /// Resets to [`SwitchyardConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = SwitchyardConfig::development();
        self
    }

    /// Resets to [`SwitchyardConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = SwitchyardConfig::production();
        self
    }

    /// Loads a file; the format follows the extension (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unknown extension, or fails to parse (unknown fields included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        self.config = parse(&content, format)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists and cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads inline content in `toml` or `json` format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown format or a parse failure.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Enables environment overrides such as `SWITCHYARD__ENGINE__MODE=release`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies environment overrides, then validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override fails to parse or the result
    /// fails [`SwitchyardConfig::validate`].
    pub fn load(mut self) -> Result<SwitchyardConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            apply_env_vars(&mut self.config, &prefix, env::vars())?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> SwitchyardConfig {
        self.config
    }
}

fn parse(content: &str, format: &str) -> Result<SwitchyardConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Applies every `PREFIX__...` pair from `vars`. Unknown keys are ignored.
fn apply_env_vars<I>(config: &mut SwitchyardConfig, prefix: &str, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(rest) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
        else {
            continue;
        };
        let parts: Vec<&str> = rest.split("__").collect();
        apply_env_var(config, &key, &parts, &value)?;
    }
    Ok(())
}

fn apply_env_var(
    config: &mut SwitchyardConfig,
    key: &str,
    parts: &[&str],
    value: &str,
) -> Result<(), ConfigError> {
    match parts {
        ["ENGINE", "MODE"] => {
            config.engine.mode = Mode::from_str(value)
                .map_err(|_| ConfigError::env_parse_error(key, "expected debug, release or test"))?;
        }
        ["ENGINE", "HANDLE_METHOD_NOT_ALLOWED"] => {
            config.engine.handle_method_not_allowed = boolean(key, value)?;
        }
        ["ENGINE", "MAX_IDLE_CONTEXTS"] => {
            config.engine.max_idle_contexts = number(key, value)?;
        }

        ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
        ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
            config.server.shutdown_timeout_secs = number(key, value)?;
        }
        ["SERVER", "MAX_BODY_BYTES"] => config.server.max_body_bytes = number(key, value)?,
        ["SERVER", "KEEP_ALIVE"] => config.server.keep_alive = boolean(key, value)?,

        ["TIMEOUT", "ENABLED"] => config.timeout.enabled = boolean(key, value)?,
        ["TIMEOUT", "DURATION_MS"] => config.timeout.duration_ms = number(key, value)?,
        ["TIMEOUT", "MESSAGE"] => config.timeout.message = value.to_string(),
        ["TIMEOUT", "STATUS"] => config.timeout.status = number(key, value)?,

        ["TELEMETRY", "LOGGING", "ENABLED"] => {
            config.telemetry.logging.enabled = boolean(key, value)?;
        }
        ["TELEMETRY", "LOGGING", "LEVEL"] => config.telemetry.logging.level = value.to_string(),
        ["TELEMETRY", "LOGGING", "FORMAT"] => {
            config.telemetry.logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => return Err(ConfigError::env_parse_error(key, "expected json or pretty")),
            };
        }
        ["TELEMETRY", "LOGGING", "SPAN_EVENTS"] => {
            config.telemetry.logging.span_events = boolean(key, value)?;
        }
        ["TELEMETRY", "LOGGING", "FILE_LINE_INFO"] => {
            config.telemetry.logging.file_line_info = boolean(key, value)?;
        }
        ["TELEMETRY", "METRICS", "ENABLED"] => {
            config.telemetry.metrics.enabled = boolean(key, value)?;
        }
        ["TELEMETRY", "METRICS", "ADDR"] => config.telemetry.metrics.addr = value.to_string(),

        _ => {}
    }
    Ok(())
}

fn number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn boolean(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
        assert_eq!(config.engine.mode, Mode::Debug);
    }

    #[test]
    fn test_with_string_toml() {
        let config = ConfigLoader::new()
            .with_string(
                r#"
                [engine]
                mode = "release"
                handle_method_not_allowed = true

                [timeout]
                enabled = true
                duration_ms = 1500
                "#,
                "toml",
            )
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.engine.mode, Mode::Release);
        assert!(config.engine.handle_method_not_allowed);
        assert_eq!(config.timeout.duration_ms, 1500);
        assert_eq!(config.timeout.status, 504);
    }

    #[test]
    fn test_with_string_json() {
        let config = ConfigLoader::new()
            .with_string(r#"{"server": {"http_addr": "127.0.0.1:9000"}}"#, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigLoader::new().with_string("", "yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(f) if f == "yaml"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ConfigLoader::new().with_string("[engine]\nmod = \"release\"", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_file_replaces_preset() {
        let config = ConfigLoader::new()
            .with_production()
            .with_string("[server]\nkeep_alive = false", "toml")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.engine.mode, Mode::Debug);
        assert!(!config.server.keep_alive);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SwitchyardConfig::default();
        apply_env_vars(
            &mut config,
            "SWITCHYARD",
            vars(&[
                ("SWITCHYARD__ENGINE__MODE", "release"),
                ("SWITCHYARD__SERVER__HTTP_ADDR", "127.0.0.1:7000"),
                ("SWITCHYARD__TIMEOUT__ENABLED", "yes"),
                ("SWITCHYARD__TIMEOUT__STATUS", "503"),
                ("SWITCHYARD__TELEMETRY__LOGGING__FORMAT", "PRETTY"),
                ("SWITCHYARD__TELEMETRY__METRICS__ENABLED", "on"),
                ("SWITCHYARD__UNKNOWN__KEY", "ignored"),
                ("OTHER__ENGINE__MODE", "test"),
            ]),
        )
        .unwrap();

        assert_eq!(config.engine.mode, Mode::Release);
        assert_eq!(config.server.http_addr, "127.0.0.1:7000");
        assert!(config.timeout.enabled);
        assert_eq!(config.timeout.status, 503);
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
        assert!(config.telemetry.metrics.enabled);
    }

    #[test]
    fn test_env_parse_errors() {
        let mut config = SwitchyardConfig::default();
        let err = apply_env_vars(
            &mut config,
            "SWITCHYARD",
            vars(&[("SWITCHYARD__SERVER__MAX_BODY_BYTES", "lots")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { ref var, .. } if var == "SWITCHYARD__SERVER__MAX_BODY_BYTES"));

        let err = apply_env_vars(
            &mut config,
            "SWITCHYARD",
            vars(&[("SWITCHYARD__SERVER__KEEP_ALIVE", "maybe")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected boolean"));
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .with_string("[timeout]\nstatus = 42", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
