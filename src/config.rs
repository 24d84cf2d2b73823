use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AcademyError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "academy.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timings: TimingsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub quiz: QuizConfig,
}

/// Dwell delays in milliseconds. The three phase delays are measured from
/// the moment a pipeline run starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub extract_to_transform_ms: u64,
    pub transform_to_load_ms: u64,
    pub load_to_done_ms: u64,
    pub quiz_feedback_ms: u64,
    pub load_delay_ms: u64,
    pub extract_delay_ms: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            extract_to_transform_ms: 1500,
            transform_to_load_ms: 3500,
            load_to_done_ms: 5000,
            quiz_feedback_ms: 1500,
            load_delay_ms: 800,
            extract_delay_ms: 600,
        }
    }
}

impl TimingsConfig {
    pub fn quiz_feedback(&self) -> Duration {
        Duration::from_millis(self.quiz_feedback_ms)
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    pub fn extract_delay(&self) -> Duration {
        Duration::from_millis(self.extract_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            file_logging: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// JSON file holding a replacement question bank
    pub bank_path: Option<PathBuf>,
}

impl Config {
    /// Loads `academy.toml` from the working directory (defaults when absent),
    /// then applies `.env` and environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                AcademyError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            info!("Loaded configuration from {}", path.display());
            Self::from_toml_str(&content)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("ACADEMY_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| AcademyError::Config(format!("ACADEMY_PORT is not a valid port: '{}'", port)))?;
        }
        if let Ok(dir) = std::env::var("ACADEMY_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.logging.log_dir = dir;
            }
        }
        if let Ok(bank) = std::env::var("ACADEMY_QUIZ_BANK") {
            if !bank.trim().is_empty() {
                self.quiz.bank_path = Some(PathBuf::from(bank));
            }
        }
        Ok(())
    }

    /// Phase delays must keep their relative ordering.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timings;
        if !(t.extract_to_transform_ms < t.transform_to_load_ms && t.transform_to_load_ms < t.load_to_done_ms) {
            return Err(AcademyError::Config(format!(
                "phase delays must be strictly increasing, got {} / {} / {} ms",
                t.extract_to_transform_ms, t.transform_to_load_ms, t.load_to_done_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: [&str; 3] = ["ACADEMY_PORT", "ACADEMY_LOG_DIR", "ACADEMY_QUIZ_BANK"];

    /// Serializes tests that read or write the process environment.
    fn env_guard() -> MutexGuard<'static, ()> {
        let guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for var in OVERRIDE_VARS {
            std::env::remove_var(var);
        }
        guard
    }

    #[test]
    fn test_defaults_match_demo_timings() {
        let config = Config::default();
        assert_eq!(config.timings.extract_to_transform_ms, 1500);
        assert_eq!(config.timings.transform_to_load_ms, 3500);
        assert_eq!(config.timings.load_to_done_ms, 5000);
        assert_eq!(config.timings.quiz_feedback(), Duration::from_millis(1500));
        assert_eq!(config.server.port, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [timings]
            quiz_feedback_ms = 10

            [logging]
            file_logging = false
            "#,
        )
        .unwrap();
        assert_eq!(config.timings.quiz_feedback_ms, 10);
        assert_eq!(config.timings.load_delay_ms, 800);
        assert!(!config.logging.file_logging);
        assert_eq!(config.logging.log_dir, "logs");
    }

    #[test]
    fn test_unordered_phase_delays_rejected() {
        let config = Config::from_toml_str(
            r#"
            [timings]
            extract_to_transform_ms = 4000
            transform_to_load_ms = 3500
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(AcademyError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let _env = env_guard();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"0.0.0.0\"\nport = 8088").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let _env = env_guard();
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.timings.extract_delay_ms, 600);
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let _env = env_guard();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8088\n\n[logging]\nlog_dir = \"file-logs\"").unwrap();

        std::env::set_var("ACADEMY_PORT", "8089");
        std::env::set_var("ACADEMY_LOG_DIR", "env-logs");
        std::env::set_var("ACADEMY_QUIZ_BANK", "bank.json");
        let config = Config::load_from(file.path());
        for var in OVERRIDE_VARS {
            std::env::remove_var(var);
        }

        let config = config.unwrap();
        assert_eq!(config.server.port, 8089);
        assert_eq!(config.logging.log_dir, "env-logs");
        assert_eq!(config.quiz.bank_path, Some(PathBuf::from("bank.json")));
    }

    #[test]
    fn test_invalid_port_override_is_config_error() {
        let _env = env_guard();
        let dir = tempfile::tempdir().unwrap();

        std::env::set_var("ACADEMY_PORT", "abc");
        let result = Config::load_from(&dir.path().join("absent.toml"));
        std::env::remove_var("ACADEMY_PORT");

        assert!(matches!(result, Err(AcademyError::Config(msg)) if msg.contains("ACADEMY_PORT")));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(matches!(Config::from_toml_str("[timings"), Err(AcademyError::Toml(_))));
    }
}
