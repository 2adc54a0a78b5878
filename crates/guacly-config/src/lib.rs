//! Shared configuration for guacly consumers.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! translation to `guacly_api::SessionConfig` + `Credentials`, and tracing
//! subscriber setup.

pub mod logging;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use guacly_api::{Credentials, Protocol, SessionConfig, TlsMode};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "guacly";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GUACLY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' is not defined")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid log level '{level}' (expected trace, debug, info, warn or error)")]
    InvalidLogLevel { level: String },

    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub ssl_verify: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
            ssl_verify: false,
            timeout: default_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named Guacamole server profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Server hostname or IP.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// "http" or "https".
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// TCP port; defaults to the protocol's well-known port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Path the web app is served under (e.g. "/guacamole/").
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Datasource to use instead of the server's primary one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Base32 TOTP secret (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp_secret: Option<String>,

    /// Environment variable holding the TOTP secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp_secret_env: Option<String>,

    /// Override certificate verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_verify: Option<bool>,

    /// Path to a custom CA certificate (implies verification).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub use_cookies: bool,

    /// Override timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            protocol: default_protocol(),
            port: None,
            base_path: default_base_path(),
            datasource: None,
            username: None,
            password: None,
            password_env: None,
            totp_secret: None,
            totp_secret_env: None,
            ssl_verify: None,
            ca_cert: None,
            use_cookies: false,
            timeout: None,
        }
    }
}

fn default_hostname() -> String {
    "localhost".into()
}
fn default_protocol() -> String {
    "https".into()
}
fn default_base_path() -> String {
    "/".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "guacly", "guacly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("guacly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment. A missing file yields defaults.
///
/// Environment keys nest with `__`, e.g. `GUACLY_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Lookup function for one secret source (env var name or keyring user).
type Source<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_source(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn keyring_source(user: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, user)
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

/// Walk the secret chain: profile env var, global env var, keyring,
/// plaintext.
fn resolve_secret(
    profile_env: Option<&str>,
    global_env: &str,
    keyring_user: &str,
    plaintext: Option<&str>,
    env: Source<'_>,
    keyring: Source<'_>,
) -> Option<SecretString> {
    // 1. Profile's *_env → env var lookup
    if let Some(val) = profile_env.and_then(env) {
        return Some(SecretString::from(val));
    }

    // 2. Global env var
    if let Some(val) = env(global_env) {
        return Some(SecretString::from(val));
    }

    // 3. System keyring
    if let Some(val) = keyring(keyring_user) {
        return Some(SecretString::from(val));
    }

    // 4. Plaintext in config
    plaintext.map(|val| SecretString::from(val.to_owned()))
}

/// Resolve login credentials for a profile.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    resolve_credentials_with(profile, profile_name, &env_source, &keyring_source)
}

fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    env: Source<'_>,
    keyring: Source<'_>,
) -> Result<Credentials, ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = profile
        .username
        .clone()
        .or_else(|| env("GUACLY_USERNAME"))
        .ok_or_else(no_credentials)?;

    let password = resolve_secret(
        profile.password_env.as_deref(),
        "GUACLY_PASSWORD",
        &format!("{profile_name}/password"),
        profile.password.as_deref(),
        env,
        keyring,
    )
    .ok_or_else(no_credentials)?;

    let totp_secret = resolve_secret(
        profile.totp_secret_env.as_deref(),
        "GUACLY_TOTP_SECRET",
        &format!("{profile_name}/totp-secret"),
        profile.totp_secret.as_deref(),
        env,
        keyring,
    );

    Ok(Credentials {
        username,
        password,
        totp_secret,
    })
}

/// Build a `SessionConfig` from a profile. Touches no secrets.
///
/// `ssl_verify` and `timeout` fall back to the global `defaults` when the
/// profile leaves them unset.
pub fn profile_to_session_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let protocol: Protocol = profile
        .protocol
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "protocol".into(),
            reason: format!("expected 'http' or 'https', got '{}'", profile.protocol),
        })?;

    if profile.hostname.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "hostname".into(),
            reason: "must not be empty".into(),
        });
    }

    let tls = if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::from_verify(profile.ssl_verify.unwrap_or(defaults.ssl_verify))
    };

    Ok(SessionConfig {
        hostname: profile.hostname.clone(),
        protocol,
        port: profile.port.unwrap_or_else(|| protocol.default_port()),
        base_path: profile.base_path.clone(),
        tls,
        default_datasource: profile.datasource.clone(),
        use_cookies: profile.use_cookies,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

/// Translate a profile into everything needed for `Session::login`.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<(SessionConfig, Credentials), ConfigError> {
    let config = profile_to_session_config(profile, defaults)?;
    let credentials = resolve_credentials(profile, profile_name)?;
    Ok((config, credentials))
}
