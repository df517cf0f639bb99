//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//! Option names follow the plugin configs users already have (`host`,
//! `port`, `serverurl`, `pollInterval`, `debug`), so existing snippets can
//! be pasted in as they are.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lms_bridge_core::{interval_from_raw, resolve_server_url};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// LMS host name or address, with or without a scheme.
    /// Override: `LMS_BRIDGE_HOST`
    pub host: Option<String>,

    /// LMS port, used together with `host`. Defaults to 9000.
    /// Override: `LMS_BRIDGE_PORT`
    pub port: Option<u16>,

    /// Full LMS base URL. Takes precedence over `host`/`port`.
    /// Override: `LMS_BRIDGE_SERVER_URL`
    #[serde(alias = "serverurl", alias = "serverUrl")]
    pub server_url: Option<String>,

    /// Discovery interval. Values of 1000 and above are milliseconds,
    /// smaller values are seconds.
    /// Override: `LMS_BRIDGE_POLL_INTERVAL`
    #[serde(alias = "pollInterval", alias = "updateInterval")]
    pub poll_interval: Option<u64>,

    /// Per-device status poll interval, seconds or milliseconds as above.
    #[serde(alias = "statusInterval")]
    pub status_interval: Option<u64>,

    /// Timeout for each request to the server (milliseconds).
    #[serde(alias = "timeout")]
    pub rpc_timeout_ms: Option<u64>,

    /// Number of players requested per discovery cycle.
    #[serde(alias = "pageSize")]
    pub page_size: Option<u32>,

    /// Basic-auth credentials for password-protected servers.
    /// Override: `LMS_BRIDGE_USERNAME` / `LMS_BRIDGE_PASSWORD`
    pub username: Option<String>,
    pub password: Option<String>,

    /// Verbose logging.
    /// Override: `LMS_BRIDGE_DEBUG`
    pub debug: bool,

    /// Directory for persistent data (accessory cache).
    #[serde(alias = "dataDir")]
    pub data_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file deserializes to unit, not to a map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies `LMS_BRIDGE_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("LMS_BRIDGE_HOST") {
            self.host = Some(val);
        }

        if let Some(port) = lookup("LMS_BRIDGE_PORT").and_then(|v| v.parse().ok()) {
            self.port = Some(port);
        }

        if let Some(val) = lookup("LMS_BRIDGE_SERVER_URL") {
            self.server_url = Some(val);
        }

        if let Some(interval) = lookup("LMS_BRIDGE_POLL_INTERVAL").and_then(|v| v.parse().ok()) {
            self.poll_interval = Some(interval);
        }

        if let Some(val) = lookup("LMS_BRIDGE_USERNAME") {
            self.username = Some(val);
        }

        if let Some(val) = lookup("LMS_BRIDGE_PASSWORD") {
            self.password = Some(val);
        }

        if let Some(debug) = lookup("LMS_BRIDGE_DEBUG").and_then(|v| parse_flag(&v)) {
            self.debug = debug;
        }

        // Note: LMS_BRIDGE_DATA_DIR is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to lms-bridge-core's Config type.
    ///
    /// A missing server address is not fatal: it is logged and the local
    /// default is used.
    pub fn to_core_config(&self) -> lms_bridge_core::Config {
        let defaults = lms_bridge_core::Config::default();

        let server_url = match resolve_server_url(
            self.server_url.as_deref(),
            self.host.as_deref(),
            self.port,
        ) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("{}; falling back to {}", e, defaults.server_url);
                defaults.server_url.clone()
            }
        };

        let millis = |raw: Option<u64>, default: u64| {
            raw.map(|r| interval_from_raw(r).as_millis() as u64)
                .unwrap_or(default)
        };

        lms_bridge_core::Config {
            server_url,
            rpc_timeout_ms: self.rpc_timeout_ms.unwrap_or(defaults.rpc_timeout_ms),
            username: self.username.clone(),
            password: self.password.clone(),
            discovery_interval_ms: millis(self.poll_interval, defaults.discovery_interval_ms),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            poll_interval_ms: millis(self.status_interval, defaults.poll_interval_ms),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn plugin_style_options_are_accepted() {
        let config = ServerConfig::from_yaml(
            "host: 192.168.0.25\nport: 9002\npollInterval: 15000\ndebug: true\ndataDir: /var/lib/lms-bridge\n",
        )
        .unwrap();

        assert_eq!(config.host.as_deref(), Some("192.168.0.25"));
        assert!(config.debug);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/lms-bridge")));

        let core = config.to_core_config();
        assert_eq!(core.server_url, "http://192.168.0.25:9002");
        assert_eq!(core.discovery_interval_ms, 15_000);
        assert_eq!(core.poll_interval_ms, 5_000);
    }

    #[test]
    fn serverurl_and_second_intervals() {
        let config =
            ServerConfig::from_yaml("serverurl: http://nas:9000/\nupdateInterval: 10\n").unwrap();
        let core = config.to_core_config();

        assert_eq!(core.server_url, "http://nas:9000");
        assert_eq!(core.discovery_interval_ms, 10_000);
    }

    #[test]
    fn missing_host_falls_back_to_local_default() {
        let core = ServerConfig::default().to_core_config();
        assert_eq!(core, lms_bridge_core::Config::default());
        assert!(core.validate().is_ok());
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = ServerConfig::from_yaml("host: old\nport: 9000\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("LMS_BRIDGE_HOST", "new"),
            ("LMS_BRIDGE_PORT", "not-a-port"),
            ("LMS_BRIDGE_DEBUG", "yes"),
            ("LMS_BRIDGE_USERNAME", "admin"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.host.as_deref(), Some("new"));
        assert_eq!(config.port, Some(9000));
        assert!(config.debug);
        assert_eq!(config.to_core_config().credentials().unwrap().username, "admin");
    }

    #[test]
    fn load_reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "serverUrl: http://lms.local:9000").unwrap();
        writeln!(file, "pageSize: 100").unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        let core = config.to_core_config();

        assert_eq!(core.page_size, 100);
    }

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(ServerConfig::from_yaml("\n").unwrap(), ServerConfig::default());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(Some(&dir.path().join("missing.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
