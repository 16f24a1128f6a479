//! CLI-owned configuration: the TOML file, credential resolution, and
//! translation to the client's `TransportConfig`.
//!
//! The library never sees these types; it receives a base URL, a
//! transport config and credentials.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use fritzbox_api::{DEFAULT_BASE_URL, TlsMode, TransportConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config ──────────────────────────────────────────────────────

/// Contents of `config.toml`, merged with `FRITZBOX_*` environment variables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Gateway base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Login user name. Empty selects the password-only login.
    #[serde(default)]
    pub username: String,

    /// Login password (plaintext -- prefer the env var or the prompt).
    pub password: Option<String>,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a PEM CA certificate to trust.
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: String::new(),
            password: None,
            insecure: false,
            ca_cert: None,
            timeout: default_timeout(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    10
}

impl Config {
    /// A copy safe to print: the password is masked.
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "********".into()),
            ..self.clone()
        }
    }
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("de", "fritzbox", "fritzbox").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("fritzbox");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the config from defaults, the TOML file, and the environment.
///
/// A missing file is not an error.
pub fn load_config() -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("FRITZBOX_").only(&[
            "url", "username", "password", "insecure", "ca_cert", "timeout",
        ]));

    Ok(figment.extract()?)
}

// ── Connection resolution ────────────────────────────────────────────

/// Everything needed to build a client and log in.
pub struct Connection {
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub transport: TransportConfig,
}

/// Merge config and global flags into a [`Connection`]. Flags win.
pub fn resolve_connection(global: &GlobalOpts, config: &Config) -> Result<Connection, CliError> {
    let url_str = global.url.as_deref().unwrap_or(&config.url);
    let url = parse_base_url(url_str)?;

    let username = global
        .username
        .clone()
        .unwrap_or_else(|| config.username.clone());
    let password = resolve_password(global, config)?;

    let tls = if global.insecure || config.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = config.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };
    let timeout = Duration::from_secs(global.timeout.unwrap_or(config.timeout));

    Ok(Connection {
        url,
        username,
        password,
        transport: TransportConfig::default()
            .with_tls(tls)
            .with_timeout(timeout),
    })
}

/// Parse a gateway URL, making sure it ends in `/` so relative paths
/// resolve below it.
fn parse_base_url(raw: &str) -> Result<Url, CliError> {
    let mut url: Url = raw.parse().map_err(|e| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL {raw:?}: {e}"),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Flag/env first, then the config file, then an interactive prompt.
fn resolve_password(global: &GlobalOpts, config: &Config) -> Result<SecretString, CliError> {
    if let Some(ref pw) = global.password {
        return Ok(SecretString::from(pw.clone()));
    }
    if let Some(ref pw) = config.password {
        return Ok(SecretString::from(pw.clone()));
    }
    if std::io::stdin().is_terminal() {
        let pw = rpassword::prompt_password("FRITZ!Box password: ")?;
        return Ok(SecretString::from(pw));
    }
    Err(CliError::NoCredentials {
        path: config_path().display().to_string(),
    })
}
