mod defaults;


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::EdisonError;
use defaults::*;

/// Top-level Edison configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub edison: EdisonConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdisonConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EdisonConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// HTTP control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Include internal error detail in HTTP error bodies.
    #[serde(default)]
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev_mode: false,
        }
    }
}

/// WhatsApp session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the protocol library's credential files.
    #[serde(default = "default_auth_dir")]
    pub auth_dir: String,
    /// How long `POST /pair` waits for a pairing code.
    #[serde(default = "default_pair_timeout")]
    pub pair_timeout_secs: u64,
    /// Delay before re-running the connect sequence after a non-logout close.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_activity_capacity")]
    pub activity_capacity: usize,
    /// Name shown under Linked Devices on the phone.
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_dir: default_auth_dir(),
            pair_timeout_secs: default_pair_timeout(),
            reconnect_delay_secs: default_reconnect_delay(),
            activity_capacity: default_activity_capacity(),
            device_name: default_device_name(),
        }
    }
}

impl SessionConfig {
    pub fn auth_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.auth_dir))
    }

    pub fn pair_timeout(&self) -> Duration {
        Duration::from_secs(self.pair_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// External audit sink. Forwarding is enabled only when both fields are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub service_key: Option<String>,
    #[serde(default = "default_audit_timeout")]
    pub timeout_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            timeout_secs: default_audit_timeout(),
        }
    }
}

impl AuditConfig {
    /// `(url, key)` when both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.url.as_deref(), self.service_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }
}

impl Config {
    /// Apply environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), EdisonError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Recognized keys: `PORT`, `HOST`, `LOG_LEVEL`,
    /// `AUTH_DIR`, `SUPABASE_URL`, `SUPABASE_SERVICE_KEY`, `EDISON_ENV`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), EdisonError> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| EdisonError::Config(format!("invalid PORT '{port}': {e}")))?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.edison.log_level = level;
        }
        if let Some(dir) = lookup("AUTH_DIR") {
            self.session.auth_dir = dir;
        }
        if let Some(url) = lookup("SUPABASE_URL") {
            self.audit.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_SERVICE_KEY") {
            self.audit.service_key = Some(key);
        }
        if let Some(env) = lookup("EDISON_ENV") {
            self.server.dev_mode = env.eq_ignore_ascii_case("development");
        }
        Ok(())
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, EdisonError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| EdisonError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| EdisonError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
