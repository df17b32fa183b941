//! Client configuration
//!
//! Each client captures its configuration at construction and never
//! mutates it afterwards. All three configurations can be loaded from
//! environment variables (and a `.env` file if present).

use crate::error::{Error, ErrorKind, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn config_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Config, message)
}

fn required_var(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| config_error(format!("{name} not set")))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn flag_var(name: &str) -> bool {
    optional_var(name).is_some_and(|v| {
        matches!(
            v.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn timeout_from_env() -> Result<Duration> {
    optional_var("HTTP_TIMEOUT_SECS").map_or(Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)), |v| {
        v.parse()
            .map(Duration::from_secs)
            .map_err(|e| config_error(format!("Invalid HTTP_TIMEOUT_SECS: {e}")))
    })
}

/// Parse a textual port number; it must be a positive integer.
///
/// # Errors
///
/// Returns a `Config` error if `raw` is not in `1..=65535`.
pub fn parse_port(raw: &str) -> Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(config_error(format!("Invalid port provided: \"{raw}\""))),
    }
}

/// Credentials and endpoint for the admin service.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub server: String,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    pub port: Option<u16>,
    pub timeout: Duration,
}

impl Credentials {
    /// Validate and build admin credentials.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the server, username or password is
    /// empty, or if `port` is given but is not a positive integer.
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        use_tls: bool,
        port: Option<&str>,
    ) -> Result<Self> {
        let server = server.into();
        let username = username.into();
        let password = password.into();

        if server.is_empty() {
            return Err(config_error("No server hostname provided"));
        }
        if username.is_empty() {
            return Err(config_error("No username provided"));
        }
        if password.is_empty() {
            return Err(config_error("No password provided"));
        }

        let port = port.map(parse_port).transpose()?;

        Ok(Self {
            server,
            username,
            password,
            use_tls,
            port,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load admin credentials from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `ADMIN_HOST`
    /// - `ADMIN_USER`
    /// - `ADMIN_PASSWORD`
    ///
    /// Optional:
    /// - `ADMIN_PORT`
    /// - `ADMIN_USE_TLS` (default: false)
    /// - `HTTP_TIMEOUT_SECS` (default: 30)
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = optional_var("ADMIN_PORT");
        Ok(Self::new(
            required_var("ADMIN_HOST")?,
            required_var("ADMIN_USER")?,
            required_var("ADMIN_PASSWORD")?,
            flag_var("ADMIN_USE_TLS"),
            port.as_deref(),
        )?
        .with_timeout(timeout_from_env()?))
    }
}

/// Endpoints of the REST mail API.
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub api_base: String,
    pub token_url: String,
    pub auth_scheme: String,
    pub timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            api_base: "https://mail.zoho.com/api".to_string(),
            token_url: "https://accounts.zoho.com/apiauthtoken/nb/create".to_string(),
            auth_scheme: "Zoho-authtoken".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RestConfig {
    /// Load REST endpoints from environment variables, falling back to
    /// the defaults for anything unset.
    ///
    /// Optional variables: `REST_API_BASE`, `REST_TOKEN_URL`,
    /// `REST_AUTH_SCHEME`, `HTTP_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if `HTTP_TIMEOUT_SECS` does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Ok(Self {
            api_base: optional_var("REST_API_BASE").unwrap_or(defaults.api_base),
            token_url: optional_var("REST_TOKEN_URL").unwrap_or(defaults.token_url),
            auth_scheme: optional_var("REST_AUTH_SCHEME").unwrap_or(defaults.auth_scheme),
            timeout: timeout_from_env()?,
        })
    }
}

/// How the IMAP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImapSecurity {
    /// Plain TCP.
    Plain,
    /// Plain TCP upgraded with STARTTLS.
    #[default]
    StartTls,
    /// TLS from the first byte.
    Tls,
}

impl FromStr for ImapSecurity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "none" => Ok(Self::Plain),
            "starttls" => Ok(Self::StartTls),
            "tls" | "ssl" => Ok(Self::Tls),
            other => Err(config_error(format!(
                "Invalid IMAP security \"{other}\". Must be one of \"plain\", \"starttls\", \"tls\""
            ))),
        }
    }
}

/// IMAP connection configuration for the mailbox inventory
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: ImapSecurity,
    pub accept_invalid_certs: bool,
    /// Abort enumeration on the first per-message failure.
    pub strict: bool,
}

impl ImapConfig {
    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `IMAP_HOST`
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_PORT` (default: `143`, or `993` for `tls`)
    /// - `IMAP_SECURITY` (default: `starttls`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: false)
    /// - `IMAP_STRICT` (default: false)
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let security = optional_var("IMAP_SECURITY")
            .map_or(Ok(ImapSecurity::default()), |v| v.parse())?;
        let port = match optional_var("IMAP_PORT") {
            Some(raw) => parse_port(&raw)?,
            None if security == ImapSecurity::Tls => 993,
            None => 143,
        };

        Ok(Self {
            host: required_var("IMAP_HOST")?,
            port,
            username: required_var("IMAP_USERNAME")?,
            password: required_var("IMAP_PASSWORD")?,
            security,
            accept_invalid_certs: flag_var("IMAP_ACCEPT_INVALID_CERTS"),
            strict: flag_var("IMAP_STRICT"),
        })
    }
}
