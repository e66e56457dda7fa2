//! Configuration management for SensorHub GW
//!
//! Handles loading and validating the YAML configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub watch: WatchConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Present = push mode enabled alongside polling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushConfig>,
}

/// Watched directory and ingestion tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Directory the firmware writes its state files into (flat, no recursion)
    pub dir: PathBuf,
    /// Seconds during which repeated events for the same file are ignored
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: f64,
    /// JSON parse attempts per change event
    #[serde(default = "default_max_decode_attempts")]
    pub max_decode_attempts: u32,
    /// Seconds between parse attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
}

impl WatchConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_secs)
    }
}

/// Polling endpoint and dashboard assets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Directory of pre-built dashboard files served on every non-/data path
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            static_dir: default_static_dir(),
        }
    }
}

/// WebSocket push listener
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PushConfig {
    #[serde(default = "default_push_port")]
    pub port: u16,
}

impl AppConfig {
    /// Load and validate a configuration file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.watch.debounce_secs.is_finite() || self.watch.debounce_secs < 0.0 {
            anyhow::bail!(
                "watch.debounce_secs must be a non-negative number, got {}",
                self.watch.debounce_secs
            );
        }
        if !self.watch.retry_delay_secs.is_finite() || self.watch.retry_delay_secs < 0.0 {
            anyhow::bail!(
                "watch.retry_delay_secs must be a non-negative number, got {}",
                self.watch.retry_delay_secs
            );
        }
        if self.watch.max_decode_attempts == 0 {
            anyhow::bail!("watch.max_decode_attempts must be at least 1");
        }
        if let Some(push) = &self.push {
            if push.port == self.http.port {
                anyhow::bail!(
                    "push.port and http.port must differ, both are {}",
                    push.port
                );
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_debounce_secs() -> f64 { 0.5 }
fn default_max_decode_attempts() -> u32 { 3 }
fn default_retry_delay_secs() -> f64 { 0.2 }
fn default_http_port() -> u16 { 8080 }
fn default_static_dir() -> PathBuf { PathBuf::from("static") }
fn default_push_port() -> u16 { 8081 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: AppConfig = serde_yaml::from_str("watch:\n  dir: /var/run/hub/tmp\n").unwrap();

        assert_eq!(config.watch.dir, PathBuf::from("/var/run/hub/tmp"));
        assert_eq!(config.watch.debounce_secs, 0.5);
        assert_eq!(config.watch.max_decode_attempts, 3);
        assert_eq!(config.watch.retry_delay_secs, 0.2);
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.static_dir, PathBuf::from("static"));
        assert!(config.push.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_full_config_round_trip() {
        let yaml = r#"
watch:
  dir: tmp
  debounce_secs: 1.0
  max_decode_attempts: 5
  retry_delay_secs: 0.1
http:
  port: 9000
  static_dir: page/dist
push:
  port: 9001
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.watch.debounce_window(), Duration::from_secs(1));
        assert_eq!(config.watch.retry_delay(), Duration::from_millis(100));
        assert_eq!(config.push.as_ref().unwrap().port, 9001);
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let yaml = "watch:\n  dir: tmp\n  max_decode_attempts: 0\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_clash_rejected() {
        let yaml = "watch:\n  dir: tmp\nhttp:\n  port: 8080\npush:\n  port: 8080\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_debounce_rejected() {
        let yaml = "watch:\n  dir: tmp\n  debounce_secs: -0.5\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
