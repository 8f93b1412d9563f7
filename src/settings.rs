use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

use crate::codec::{codec_by_name, JsonCodec, LoggingCodec, SessionCodec};
use crate::session::{
    SessionConfig, DEFAULT_AUTH_TIMEOUT_SECS, DEFAULT_SESSION_TIMEOUT_SECS, GRACE_PERIOD_SECS,
};
use crate::token::cookie::CookieOptions;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub cookies: CookieSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Lifetime of a saved session entry
    pub session_timeout_secs: u64,
    /// Interval after which the auth token rotates
    pub auth_timeout_secs: u64,
    /// Window after a rotation in which the previous auth token is honoured
    pub grace_period_secs: u64,
    /// Entry codec: "json" or "cbor"
    pub codec: String,
    /// Log every encoded record at debug level, secrets included
    pub log_records: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    /// Cookie name prefix; cookies are `<name>_session` and `<name>_auth`
    pub name: String,
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7879,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS.unsigned_abs(),
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS.unsigned_abs(),
            grace_period_secs: GRACE_PERIOD_SECS.unsigned_abs(),
            codec: "json".to_string(),
            log_records: false,
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "websess".to_string(),
            secure: true, // Default to secure cookies
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        env_logger::Builder::new()
            .parse_filters(&settings.logging.level)
            .try_init()?;

        Ok(settings)
    }

    /// Load base settings from `Settings.toml` in the current directory, or defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from_path(std::path::Path::new("Settings.toml"))
    }

    /// Load settings from a TOML file, falling back to defaults if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let toml_content = fs::read_to_string(path)?;
        let settings = basic_toml::from_str(&toml_content)?;
        println!("✓ Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        if let Ok(host) = std::env::var("HOST") {
            settings.application.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                settings.application.port = port;
            }
        }

        Self::apply_numeric_env_override(
            "SESSION_TIMEOUT_SECS",
            &mut settings.session.session_timeout_secs,
        );
        Self::apply_numeric_env_override(
            "AUTH_TIMEOUT_SECS",
            &mut settings.session.auth_timeout_secs,
        );
        if let Ok(codec) = std::env::var("SESSION_CODEC") {
            settings.session.codec = codec;
        }
        if let Ok(log_records) = std::env::var("SESSION_LOG_RECORDS") {
            if let Ok(log_records) = log_records.parse::<bool>() {
                settings.session.log_records = log_records;
            }
        }

        if let Ok(name) = std::env::var("COOKIE_NAME") {
            settings.cookies.name = name;
        }
        if let Ok(secure) = std::env::var("COOKIE_SECURE") {
            if let Ok(secure) = secure.parse::<bool>() {
                settings.cookies.secure = secure;
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            settings.logging.level = level;
        }
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Session timeouts as library configuration
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            session_timeout: seconds(self.session.session_timeout_secs),
            auth_timeout: seconds(self.session.auth_timeout_secs),
            grace_period: seconds(self.session.grace_period_secs),
        }
    }

    /// The configured codec, JSON if the name is unknown
    #[must_use]
    pub fn codec(&self) -> Arc<dyn SessionCodec> {
        let codec = codec_by_name(&self.session.codec).unwrap_or_else(|| {
            log::warn!(
                "Unknown session codec {:?}, using json",
                self.session.codec
            );
            Arc::new(JsonCodec)
        });
        if self.session.log_records {
            Arc::new(LoggingCodec::new(codec))
        } else {
            codec
        }
    }

    #[must_use]
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            secure: self.cookies.secure,
            ..CookieOptions::default()
        }
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(Duration::MAX)
}
