use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal::dec;
use serde::Deserialize;
use thiserror::Error;

use crate::session::DEFAULT_LOCKOUT_WINDOW_SECS;
use crate::session::DEFAULT_MAX_FAILED_ATTEMPTS;
use crate::session::MAX_LOCKOUT_WINDOW_SECS;

pub const STORE_FILE: &str = "accounts.dat";
pub const TRANSACTION_LOG_FILE: &str = "transactions.log";
pub const SECURITY_LOG_FILE: &str = "security.log";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Interest rate must not be negative: {0}")]
    NegativeInterestRate(Decimal),
    #[error("max_failed_attempts must be at least 1")]
    NoFailedAttemptsAllowed,
    #[error("lockout_window_secs out of range: {0}")]
    LockoutWindowOutOfRange(i64),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store_path: PathBuf,
    pub transaction_log_path: PathBuf,
    pub security_log_path: PathBuf,
    pub max_failed_attempts: u32,
    pub lockout_window_secs: i64,
    pub interest_rate: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: PathBuf::from(STORE_FILE),
            transaction_log_path: PathBuf::from(TRANSACTION_LOG_FILE),
            security_log_path: PathBuf::from(SECURITY_LOG_FILE),
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_window_secs: DEFAULT_LOCKOUT_WINDOW_SECS,
            interest_rate: dec!(0.02),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let relocate = |path: &Path, fallback: &str| {
            dir.join(path.file_name().map(Path::new).unwrap_or(Path::new(fallback)))
        };
        self.store_path = relocate(&self.store_path, STORE_FILE);
        self.transaction_log_path = relocate(&self.transaction_log_path, TRANSACTION_LOG_FILE);
        self.security_log_path = relocate(&self.security_log_path, SECURITY_LOG_FILE);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interest_rate.is_sign_negative() {
            return Err(ConfigError::NegativeInterestRate(self.interest_rate));
        }
        if self.max_failed_attempts == 0 {
            return Err(ConfigError::NoFailedAttemptsAllowed);
        }
        if !(0..=MAX_LOCKOUT_WINDOW_SECS).contains(&self.lockout_window_secs) {
            return Err(ConfigError::LockoutWindowOutOfRange(self.lockout_window_secs));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store_path, PathBuf::from("accounts.dat"));
        assert_eq!(config.max_failed_attempts, 3);
        assert_eq!(config.lockout_window_secs, 1800);
        assert_eq!(config.interest_rate, dec!(0.02));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atm.json");
        fs::write(&path, r#"{ "lockout_window_secs": 60, "interest_rate": "0.05" }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.lockout_window_secs, 60);
        assert_eq!(config.interest_rate, dec!(0.05));
        assert_eq!(config.max_failed_attempts, 3);
    }

    #[test]
    fn test_load_rejects_unknown_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atm.json");

        fs::write(&path, r#"{ "lockout": 60 }"#).unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, r#"{ "interest_rate": "-0.01" }"#).unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::NegativeInterestRate(_))
        ));

        assert!(matches!(
            Config::load(dir.path().join("absent.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_load_rejects_out_of_range_lockout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atm.json");

        fs::write(&path, r#"{ "lockout_window_secs": 9223372036854775807 }"#).unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::LockoutWindowOutOfRange(i64::MAX))
        ));

        fs::write(&path, r#"{ "lockout_window_secs": -1 }"#).unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::LockoutWindowOutOfRange(-1))
        ));

        fs::write(&path, r#"{ "max_failed_attempts": 0 }"#).unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::NoFailedAttemptsAllowed)
        ));
    }

    #[test]
    fn test_in_dir() {
        let config = Config::default().in_dir("/var/lib/atm");
        assert_eq!(config.store_path, PathBuf::from("/var/lib/atm/accounts.dat"));
        assert_eq!(
            config.security_log_path,
            PathBuf::from("/var/lib/atm/security.log")
        );
    }
}
