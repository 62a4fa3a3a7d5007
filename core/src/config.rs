//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file (`wfexpr.toml` in the working directory, or an explicit path), then
//! `WFEXPR_*` environment variables with `__` as the section separator
//! (`WFEXPR_LOGGING__LEVEL=debug`). A `.env` file is loaded first when
//! present.
//!
//! The evaluator's resource caps are fixed and not configurable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::LoggingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "wfexpr.toml";
pub const ENV_PREFIX: &str = "WFEXPR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Output format of the command line tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub output: OutputFormat,

    /// Default context file for `eval` and `render`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PathBuf>,

    /// Default variable directory for `classify`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cli: CliConfig,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Defaults, `./wfexpr.toml` if present, then the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().load()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}, got \"{}\"",
                LEVELS.join(", "),
                self.logging.level
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    file: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Read this file instead of `./wfexpr.toml`. Unlike the default file it
    /// must exist.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Ignore `.env` and `WFEXPR_*` variables
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn load(self) -> Result<Config, ConfigError> {
        let defaults = Config::default();
        let mut builder = ::config::Config::builder()
            .set_default("logging.level", defaults.logging.level.clone())?
            .set_default("logging.format", defaults.logging.format.as_str())?
            .set_default("cli.output", "plain")?;

        builder = match &self.file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.clone()));
                }
                builder.add_source(::config::File::from(path.as_path()).format(::config::FileFormat::Toml))
            }
            None => builder.add_source(
                ::config::File::with_name(DEFAULT_CONFIG_FILE)
                    .format(::config::FileFormat::Toml)
                    .required(false),
            ),
        };

        if !self.skip_env {
            let _ = dotenvy::dotenv();
            builder = builder.add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.cli.output, OutputFormat::Plain);
        assert!(config.cli.context.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let file = toml_file(
            r#"
[logging]
level = "debug"
format = "json"

[cli]
output = "json"
variables = "vars.json"
"#,
        );
        let config = Config::builder().file(file.path()).without_env().load().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.cli.output, OutputFormat::Json);
        assert_eq!(config.cli.variables, Some(PathBuf::from("vars.json")));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = toml_file("[cli]\ncontext = \"ctx.json\"\n");
        let config = Config::builder().file(file.path()).without_env().load().unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cli.output, OutputFormat::Plain);
        assert_eq!(config.cli.context, Some(PathBuf::from("ctx.json")));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::builder().file(&missing).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(path) if path == missing));
    }

    #[test]
    fn test_invalid_values() {
        let file = toml_file("[logging]\nlevel = \"loud\"\n");
        let err = Config::builder().file(file.path()).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let file = toml_file("[cli]\noutput = \"yaml\"\n");
        let err = Config::builder().file(file.path()).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_serializes_back_to_toml() {
        let text = toml::to_string(&Config::default()).unwrap();
        assert!(text.contains("[logging]"));
        assert!(text.contains("level = \"info\""));
        assert!(text.contains("output = \"plain\""));
    }
}
