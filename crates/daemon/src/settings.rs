//! Daemon settings
//!
//! Defaults overlaid by `QUEUEEASE_*` environment variables, e.g.
//!
//! ```text
//! QUEUEEASE_DB_PATH=/var/lib/queueease/queue.db \
//! QUEUEEASE_RPC_PORT=9700 \
//! QUEUEEASE_SERPAPI_KEY=... \
//!     ./queueease
//! ```

use anyhow::{Context, Result};
use queueease_api_rpc::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use queueease_core::application::constants::DEFAULT_GUARD_CALL_NEXT;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

const ENV_PREFIX: &str = "QUEUEEASE";
const DEFAULT_DB_PATH: &str = "~/.queueease/queue.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSettings {
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub guard_call_next: bool,
    #[serde(default)]
    pub serpapi_key: Option<String>,
    pub log_format: LogFormat,
    /// Daily rolling log files go here when set
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl DaemonSettings {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(None)
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_env(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("rpc_host", DEFAULT_RPC_HOST)?
            .set_default("rpc_port", i64::from(DEFAULT_RPC_PORT))?
            .set_default("guard_call_next", DEFAULT_GUARD_CALL_NEXT)?
            .set_default("log_format", "pretty")?
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("Failed to read settings")?;

        settings
            .try_deserialize()
            .context("Invalid QUEUEEASE_* setting")
    }

    /// Database path with `~` expanded
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| PathBuf::from(shellexpand::tilde(d).into_owned()))
    }

    /// SerpAPI key, ignoring blank values
    pub fn serpapi_key(&self) -> Option<&str> {
        self.serpapi_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let settings = DaemonSettings::from_env(vars(&[])).unwrap();
        assert_eq!(settings.rpc_host, "127.0.0.1");
        assert_eq!(settings.rpc_port, 9630);
        assert!(settings.guard_call_next);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert!(settings.serpapi_key().is_none());
        assert!(settings.log_dir().is_none());
        assert!(settings.db_path().ends_with(".queueease/queue.db"));
    }

    #[test]
    fn test_environment_overrides() {
        let settings = DaemonSettings::from_env(vars(&[
            ("QUEUEEASE_DB_PATH", "/tmp/q.db"),
            ("QUEUEEASE_RPC_PORT", "9700"),
            ("QUEUEEASE_GUARD_CALL_NEXT", "false"),
            ("QUEUEEASE_SERPAPI_KEY", "abc"),
            ("QUEUEEASE_LOG_FORMAT", "json"),
            ("QUEUEEASE_LOG_DIR", "/tmp/logs"),
        ]))
        .unwrap();

        assert_eq!(settings.db_path(), PathBuf::from("/tmp/q.db"));
        assert_eq!(settings.rpc_port, 9700);
        assert!(!settings.guard_call_next);
        assert_eq!(settings.serpapi_key(), Some("abc"));
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.log_dir(), Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_blank_key_disables_geocoding() {
        let settings = DaemonSettings::from_env(vars(&[("QUEUEEASE_SERPAPI_KEY", "  ")])).unwrap();
        assert!(settings.serpapi_key().is_none());
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(DaemonSettings::from_env(vars(&[("QUEUEEASE_RPC_PORT", "not-a-port")])).is_err());
    }
}
