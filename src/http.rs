//! Shared HTTP plumbing for the admin and REST clients

use crate::error::{Error, ErrorKind, Result};
use reqwest::StatusCode;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HTTP verbs accepted by the clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verb {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn method(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(Error::new(
                ErrorKind::InvalidVerb,
                format!(
                    "Invalid HTTP method: \"{s}\". \
                     Must be one of \"GET\", \"POST\", \"PUT\", \"DELETE\""
                ),
            )),
        }
    }
}

/// A fully read HTTP response, kept for decoding and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    /// Read the whole body of `response`.
    ///
    /// # Errors
    ///
    /// Returns an error of the given `kind` if the body cannot be read.
    pub async fn read(response: reqwest::Response, kind: ErrorKind) -> Result<Self> {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await.map_err(|e| {
            Error::new(kind, format!("Failed to read response body from {url}: {e}"))
                .with_source(e)
        })?;
        Ok(Self { status, url, body })
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status line fragment such as `500 Internal Server Error`.
    #[must_use]
    pub fn status_line(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {reason}", self.status.as_u16()),
            None => self.status.as_u16().to_string(),
        }
    }
}

impl fmt::Display for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Response [{}] {}> {:?}", self.status_line(), self.url, self.body)
    }
}

/// Build the `reqwest` client shared by a single API client instance.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            Error::new(ErrorKind::Config, format!("Failed to build HTTP client: {e}"))
                .with_source(e)
        })
}
