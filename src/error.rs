//! Error types for mailmigrate
//!
//! Every failure carries a human-readable message, the underlying
//! cause (if any), a list of named diagnostic objects, and for HTTP
//! failures a snapshot of the response that triggered it. Callers
//! decide how to report them; [`Error::dump`] renders the diagnostics
//! as text.

use crate::http::HttpResponse;
use std::fmt;
use thiserror::Error;
use tracing::error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Admin service name outside the whitelist.
    InvalidService,
    /// A response did not have the expected structure.
    ResponseShape,
    /// Transport or status failure calling the admin service.
    ServiceCall,
    /// Unknown REST token scope.
    InvalidScope,
    /// The token endpoint refused or returned garbage.
    TokenIssuance,
    /// A REST resource call failed without usable data.
    ResourceCall,
    /// HTTP verb outside GET/POST/PUT/DELETE.
    InvalidVerb,
    /// IMAP LOGIN was rejected.
    Login,
    /// IMAP SELECT was rejected.
    MailboxSelect,
    /// An operation needed a selected mailbox and none was.
    NoMailboxSelected,
    /// An operation needed an authenticated IMAP session.
    NotAuthenticated,
    /// Any other IMAP protocol failure.
    Imap,
    /// TLS setup or handshake failure.
    Tls,
    /// Socket level failure.
    Io,
    /// Invalid or missing configuration.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidService => "invalid service",
            Self::ResponseShape => "unexpected response shape",
            Self::ServiceCall => "service call failed",
            Self::InvalidScope => "invalid scope",
            Self::TokenIssuance => "token issuance failed",
            Self::ResourceCall => "resource call failed",
            Self::InvalidVerb => "invalid HTTP verb",
            Self::Login => "login failed",
            Self::MailboxSelect => "mailbox select failed",
            Self::NoMailboxSelected => "no mailbox selected",
            Self::NotAuthenticated => "not authenticated",
            Self::Imap => "IMAP error",
            Self::Tls => "TLS error",
            Self::Io => "IO error",
            Self::Config => "configuration error",
        };
        f.write_str(name)
    }
}

/// A named object attached to an error for later inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub name: String,
    pub value: String,
}

/// The single error type returned by every client in this crate.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
    diagnostics: Vec<Diagnostic>,
    http_response: Option<HttpResponse>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            diagnostics: Vec::new(),
            http_response: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a named diagnostic object, rendered with its `Debug` impl.
    #[must_use]
    pub fn with_diagnostic(mut self, name: impl Into<String>, value: &impl fmt::Debug) -> Self {
        self.diagnostics.push(Diagnostic {
            name: name.into(),
            value: format!("{value:?}"),
        });
        self
    }

    /// Attach a named diagnostic that is already text.
    #[must_use]
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.diagnostics.push(Diagnostic {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Attach the HTTP response that caused the failure.
    #[must_use]
    pub fn with_http_response(mut self, response: HttpResponse) -> Self {
        self.http_response = Some(response);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Look up a diagnostic by name.
    #[must_use]
    pub fn diagnostic(&self, name: &str) -> Option<&str> {
        self.diagnostics
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    #[must_use]
    pub const fn http_response(&self) -> Option<&HttpResponse> {
        self.http_response.as_ref()
    }

    /// Render the attached objects as text lines.
    ///
    /// Returns an empty vector when nothing is attached.
    #[must_use]
    pub fn dump(&self) -> Vec<String> {
        if self.diagnostics.is_empty() && self.http_response.is_none() {
            return Vec::new();
        }

        let mut lines = vec!["--- Begin Dumped Objects ---".to_string()];
        if let Some(response) = &self.http_response {
            lines.push(" -> Object: \"http_response\":".to_string());
            lines.push(format!("\t{response}"));
        }
        for diagnostic in &self.diagnostics {
            lines.push(format!(" -> Object: \"{}\":", diagnostic.name));
            for value_line in diagnostic.value.lines() {
                lines.push(format!("\t{value_line}"));
            }
        }
        lines.push("--- End Dumped Objects ---".to_string());
        lines
    }

    /// Log the message, cause chain and dumped objects at error level.
    pub fn log_dump(&self) {
        error!("{} ({})", self.message, self.kind);
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            error!("caused by: {err}");
            cause = err.source();
        }
        for line in self.dump() {
            error!("{line}");
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, format!("IO error: {err}")).with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
