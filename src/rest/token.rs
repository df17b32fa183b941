//! API token issuance
//!
//! The token endpoint answers either with a JSON object or, on older
//! deployments, with `KEY=VALUE` lines. Both are normalised into the
//! same field map before the `RESULT` and `AUTHTOKEN` fields are
//! checked.

use crate::config::RestConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::http::{HttpResponse, build_client};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Named scopes and what they resolve to.
pub const SCOPES: [(&str, &str); 2] = [("mail", "ZohoMail/ZohoMailAPI"), ("crm", "ZohoCRM/crmapi")];

static SCOPE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+/\w+$").expect("valid scope regex"));

static TOKEN_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]{32}$").expect("valid token regex"));

/// Resolve a scope name to the scope string sent to the token endpoint.
///
/// `None` means the `mail` scope. Strings already shaped like
/// `Product/apiname` pass through unchanged.
///
/// # Errors
///
/// Returns an `InvalidScope` error for an unknown short name.
pub fn resolve_scope(name: Option<&str>) -> Result<String> {
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return Ok(SCOPES[0].1.to_string());
    };

    if SCOPE_SHAPE.is_match(name) {
        return Ok(name.to_string());
    }

    let lower = name.to_lowercase();
    SCOPES
        .iter()
        .find(|(short, _)| *short == lower)
        .map(|(_, scope)| (*scope).to_string())
        .ok_or_else(|| {
            let valid: Vec<&str> = SCOPES.iter().map(|(short, _)| *short).collect();
            Error::new(
                ErrorKind::InvalidScope,
                format!(
                    "Invalid scope_name: \"{lower}\". Must be one of \"{}\"",
                    valid.join("\", \"")
                ),
            )
        })
}

/// An API token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Whether `value` looks like an issued token rather than a password.
    #[must_use]
    pub fn is_well_formed(value: &str) -> bool {
        TOKEN_SHAPE.is_match(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}…)", self.0.chars().take(4).collect::<String>())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field map produced by a decoding strategy.
pub type TokenFields = BTreeMap<String, String>;

/// Token response body formats, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBodyFormat {
    Json,
    KeyValue,
}

impl TokenBodyFormat {
    /// Decode `body` into fields, or `None` if it is not in this format.
    #[must_use]
    pub fn decode(self, body: &str) -> Option<TokenFields> {
        match self {
            Self::Json => decode_json(body).ok(),
            Self::KeyValue => Some(decode_key_value(body)).filter(|fields| !fields.is_empty()),
        }
    }
}

fn decode_json(body: &str) -> std::result::Result<TokenFields, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let Some(object) = value.as_object() else {
        return Err(serde::de::Error::custom("token response is not a JSON object"));
    };
    Ok(object
        .iter()
        .map(|(key, value)| {
            let text = value
                .as_str()
                .map_or_else(|| value.to_string(), ToString::to_string);
            (key.clone(), text)
        })
        .collect())
}

fn decode_key_value(body: &str) -> TokenFields {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Decode a token response body: JSON first, then `KEY=VALUE` lines.
///
/// # Errors
///
/// Returns the JSON decoding error if neither format accepts the body.
pub fn decode_token_body(
    body: &str,
) -> std::result::Result<(TokenBodyFormat, TokenFields), serde_json::Error> {
    match decode_json(body) {
        Ok(fields) => Ok((TokenBodyFormat::Json, fields)),
        Err(json_error) => TokenBodyFormat::KeyValue
            .decode(body)
            .map(|fields| (TokenBodyFormat::KeyValue, fields))
            .ok_or(json_error),
    }
}

/// Extract the token from decoded fields.
///
/// # Errors
///
/// Returns a `TokenIssuance` error if `RESULT` is not `TRUE` or
/// `AUTHTOKEN` is missing.
pub fn token_from_fields(fields: &TokenFields) -> Result<Token> {
    match fields.get("RESULT").map(String::as_str) {
        Some("TRUE") => {}
        _ => {
            return Err(Error::new(
                ErrorKind::TokenIssuance,
                format!("Invalid AUTHTOKEN response: {fields:?}"),
            ));
        }
    }

    fields
        .get("AUTHTOKEN")
        .filter(|t| !t.is_empty())
        .map(|t| Token::new(t.clone()))
        .ok_or_else(|| Error::new(ErrorKind::TokenIssuance, "No AUTHTOKEN was returned by API"))
}

/// Fetches API tokens. Holds no session state.
pub struct TokenClient {
    token_url: String,
    http: reqwest::Client,
}

impl TokenClient {
    /// # Errors
    ///
    /// Returns a `Config` error if the HTTP client cannot be built.
    pub fn new(config: &RestConfig) -> Result<Self> {
        Ok(Self {
            token_url: config.token_url.clone(),
            http: build_client(config.timeout)?,
        })
    }

    /// Exchange account credentials for an API token.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidScope` error before any request for an unknown
    /// scope, and a `TokenIssuance` error if the request fails, the
    /// status is not 2xx, or the body does not carry a token.
    pub async fn fetch_token(
        &self,
        account_id: &str,
        password: &str,
        scope: Option<&str>,
    ) -> Result<Token> {
        let scope = resolve_scope(scope)?;
        debug!("Requesting API token for {} ({})", account_id, scope);

        let response = self
            .http
            .get(&self.token_url)
            .query(&[("EMAIL_ID", account_id), ("PASSWORD", password), ("SCOPE", scope.as_str())])
            .send()
            .await
            .map_err(|e| {
                Error::new(ErrorKind::TokenIssuance, format!("HTTP Error: {e}")).with_source(e)
            })?;

        let snapshot = HttpResponse::read(response, ErrorKind::TokenIssuance).await?;
        if !snapshot.is_success() {
            return Err(Error::new(
                ErrorKind::TokenIssuance,
                format!("HTTP Error {}: {}", snapshot.status_line(), snapshot.body),
            )
            .with_http_response(snapshot));
        }

        let (format, fields) = match decode_token_body(&snapshot.body) {
            Ok(decoded) => decoded,
            Err(e) => {
                return Err(Error::new(
                    ErrorKind::TokenIssuance,
                    format!("Unable to fetch API token, invalid response: {:?}", snapshot.body),
                )
                .with_source(e)
                .with_http_response(snapshot));
            }
        };
        debug!("Token response decoded as {:?}", format);

        match token_from_fields(&fields) {
            Ok(token) => {
                info!("Issued API token for {}", account_id);
                Ok(token)
            }
            Err(e) => Err(e.with_http_response(snapshot)),
        }
    }
}
