use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BACKEND: &str = "tactic-backend";
const DEFAULT_SETTLE_MS: u64 = 1000;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

/// Runtime settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub backend_program: PathBuf,
    pub backend_args: Vec<String>,
    /// How long `isUploading` stays set after the upload call returns.
    pub upload_settle_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_program: PathBuf::from(DEFAULT_BACKEND),
            backend_args: Vec::new(),
            upload_settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(program) = lookup("TACTIC_BACKEND").filter(|p| !p.trim().is_empty()) {
            config.backend_program = PathBuf::from(program.trim());
        }

        if let Some(args) = lookup("TACTIC_BACKEND_ARGS") {
            config.backend_args = args.split_whitespace().map(str::to_string).collect();
        }

        if let Some(ms) = lookup("TACTIC_UPLOAD_SETTLE_MS") {
            let ms = parse_number("TACTIC_UPLOAD_SETTLE_MS", &ms)?;
            config.upload_settle_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.upload_settle_delay, Duration::from_secs(1));
    }

    #[test]
    fn reads_backend_and_numbers() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TACTIC_BACKEND", "/opt/tactic/backend"),
            ("TACTIC_BACKEND_ARGS", "--stdio  --verbose"),
            ("TACTIC_UPLOAD_SETTLE_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.backend_program, PathBuf::from("/opt/tactic/backend"));
        assert_eq!(config.backend_args, vec!["--stdio", "--verbose"]);
        assert_eq!(config.upload_settle_delay, Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = AppConfig::from_lookup(lookup(&[("TACTIC_UPLOAD_SETTLE_MS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "TACTIC_UPLOAD_SETTLE_MS",
                value: "soon".to_string()
            }
        );
    }
}
