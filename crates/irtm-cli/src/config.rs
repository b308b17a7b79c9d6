//! CLI settings.
//!
//! Settings are resolved in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (`--config` or `IRTM_CONFIG`)
//! 3. Environment variables (`IRTM_PORT`, `IRTM_BAUD`, `IRTM_TIMEOUT_MS`, `IRTM_REMOTES`)
//! 4. Command-line flags

use anyhow::{Context, Result};
use irtm_core::protocol::{
    SessionConfig, DEFAULT_ADDRESS, DEFAULT_BAUD_RATE, DEFAULT_POLL_ATTEMPTS, DEFAULT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default serial port when nothing else is configured
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Resolved CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Serial port of the module.
    pub port: String,
    /// Baud rate the module currently runs at.
    pub baud_rate: u32,
    /// Per-read timeout in milliseconds.
    pub timeout_ms: u64,
    /// Reads per confirmation window.
    pub poll_attempts: usize,
    /// Module address.
    pub address: u8,
    /// Directory holding remote key tables.
    pub remotes_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            address: DEFAULT_ADDRESS,
            remotes_dir: PathBuf::from("remotes"),
        }
    }
}

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub remotes_dir: Option<PathBuf>,
}

impl Settings {
    /// Resolves settings from an optional file, the process environment and flags.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok(), overrides)
    }

    /// Same as [`Settings::load`], reading environment variables through `var`.
    fn load_with(
        config_path: Option<&Path>,
        var: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let env_path = var("IRTM_CONFIG").map(PathBuf::from);
        let mut settings = match config_path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(var);
        settings.apply_overrides(overrides);
        Ok(settings)
    }

    /// Loads settings from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Applies environment overrides read through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("IRTM_PORT") {
            self.port = port;
        }
        if let Some(baud) = var("IRTM_BAUD") {
            match baud.parse() {
                Ok(v) => self.baud_rate = v,
                Err(_) => tracing::warn!("ignoring invalid IRTM_BAUD={}", baud),
            }
        }
        if let Some(timeout) = var("IRTM_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(v) => self.timeout_ms = v,
                Err(_) => tracing::warn!("ignoring invalid IRTM_TIMEOUT_MS={}", timeout),
            }
        }
        if let Some(dir) = var("IRTM_REMOTES") {
            self.remotes_dir = PathBuf::from(dir);
        }
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(port) = &overrides.port {
            self.port = port.clone();
        }
        if let Some(baud) = overrides.baud_rate {
            self.baud_rate = baud;
        }
        if let Some(timeout) = overrides.timeout_ms {
            self.timeout_ms = timeout;
        }
        if let Some(dir) = &overrides.remotes_dir {
            self.remotes_dir = dir.clone();
        }
    }

    /// Session parameters for the core library.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            port_name: self.port.clone(),
            baud_rate: self.baud_rate,
            read_timeout_ms: self.timeout_ms,
            poll_attempts: self.poll_attempts,
            address: self.address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.timeout_ms, 2000);
        assert_eq!(settings.poll_attempts, 2);
        assert_eq!(settings.address, 0xA1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("irtm.yaml");
        std::fs::write(&path, "port: /dev/ttyACM0\nbaud_rate: 57600\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.port, "/dev/ttyACM0");
        assert_eq!(settings.baud_rate, 57600);
        assert_eq!(settings.timeout_ms, 2000);
        assert_eq!(settings.remotes_dir, PathBuf::from("remotes"));
    }

    #[test]
    fn test_bad_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("irtm.yaml");
        std::fs::write(&path, "baud_rate: fast\n").unwrap();
        assert!(Settings::from_file(&path).is_err());
        assert!(Settings::from_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_env_then_flags() {
        let env: HashMap<&str, &str> = [
            ("IRTM_PORT", "/dev/ttyUSB3"),
            ("IRTM_BAUD", "19200"),
            ("IRTM_TIMEOUT_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(settings.port, "/dev/ttyUSB3");
        assert_eq!(settings.baud_rate, 19200);
        assert_eq!(settings.timeout_ms, 2000);

        settings.apply_overrides(&Overrides {
            baud_rate: Some(4800),
            ..Overrides::default()
        });
        assert_eq!(settings.baud_rate, 4800);
        assert_eq!(settings.port, "/dev/ttyUSB3");
    }

    #[test]
    fn test_load_file_then_env_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("irtm.yaml");
        std::fs::write(
            &path,
            "port: /dev/ttyS1\nbaud_rate: 4800\ntimeout_ms: 750\nremotes_dir: /etc/irtm\n",
        )
        .unwrap();

        let env: HashMap<String, String> = [
            ("IRTM_CONFIG", path.to_str().unwrap()),
            ("IRTM_PORT", "/dev/ttyUSB1"),
            ("IRTM_BAUD", "19200"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let var = |key: &str| env.get(key).cloned();

        // File from IRTM_CONFIG, env beats file
        let settings = Settings::load_with(None, var, &Overrides::default()).unwrap();
        assert_eq!(settings.port, "/dev/ttyUSB1");
        assert_eq!(settings.baud_rate, 19200);
        assert_eq!(settings.timeout_ms, 750);
        assert_eq!(settings.remotes_dir, PathBuf::from("/etc/irtm"));

        // Flags beat env
        let overrides = Overrides {
            baud_rate: Some(57600),
            ..Overrides::default()
        };
        let settings = Settings::load_with(None, var, &overrides).unwrap();
        assert_eq!(settings.baud_rate, 57600);
        assert_eq!(settings.port, "/dev/ttyUSB1");

        // An explicit path wins over IRTM_CONFIG
        let missing = dir.path().join("missing.yaml");
        assert!(Settings::load_with(Some(&missing), var, &overrides).is_err());
    }

    #[test]
    fn test_session_config() {
        let settings = Settings {
            port: "COM7".to_string(),
            timeout_ms: 500,
            ..Settings::default()
        };
        let config = settings.session_config();
        assert_eq!(config.port_name, "COM7");
        assert_eq!(config.read_timeout_ms, 500);
        assert_eq!(config.baud_rate, 9600);
    }
}
