//! Admin service names and request building

use crate::error::{Error, ErrorKind, Result};
use crate::http::Verb;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The admin web services that may be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    DomainAdmin,
    UserAdmin,
    ProductInfo,
    DomainAliasAdmin,
    MailListAdmin,
    AliasAdmin,
    GlobalUpdate,
}

impl Service {
    pub const ALL: [Self; 7] = [
        Self::DomainAdmin,
        Self::UserAdmin,
        Self::ProductInfo,
        Self::DomainAliasAdmin,
        Self::MailListAdmin,
        Self::AliasAdmin,
        Self::GlobalUpdate,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DomainAdmin => "DomainAdmin",
            Self::UserAdmin => "UserAdmin",
            Self::ProductInfo => "ProductInfo",
            Self::DomainAliasAdmin => "DomainAliasAdmin",
            Self::MailListAdmin => "MailListAdmin",
            Self::AliasAdmin => "AliasAdmin",
            Self::GlobalUpdate => "GlobalUpdate",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|svc| svc.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|svc| svc.as_str()).collect();
                Error::new(
                    ErrorKind::InvalidService,
                    format!(
                        "Invalid service requested: \"{s}\". Must be one of: \"{}\"",
                        valid.join("\", \"")
                    ),
                )
            })
    }
}

/// A request parameter value. Lists are sent as repeated parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

/// One call against the admin service.
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    service: Service,
    method: String,
    params: BTreeMap<String, ParamValue>,
    verb: Verb,
}

impl ServiceRequest {
    /// Start a request for `method` on the named service.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidService` error if `service` is not one of the
    /// whitelisted service names.
    pub fn new(service: &str, method: impl Into<String>) -> Result<Self> {
        Ok(Self::for_service(service.parse()?, method))
    }

    #[must_use]
    pub fn for_service(service: Service, method: impl Into<String>) -> Self {
        Self {
            service,
            method: method.into(),
            params: BTreeMap::new(),
            verb: Verb::Get,
        }
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), ParamValue::Single(value.into()));
        self
    }

    #[must_use]
    pub fn param_list<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.params.insert(name.into(), ParamValue::List(values));
        self
    }

    #[must_use]
    pub const fn verb(mut self, verb: Verb) -> Self {
        self.verb = verb;
        self
    }

    #[must_use]
    pub const fn service(&self) -> Service {
        self.service
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub const fn http_verb(&self) -> Verb {
        self.verb
    }

    /// Set the authentication parameters, replacing caller values.
    pub(crate) fn authenticate(&mut self, username: &str, password: &str) {
        self.params
            .insert("AuthUserName".to_string(), ParamValue::Single(username.to_string()));
        self.params
            .insert("AuthPassword".to_string(), ParamValue::Single(password.to_string()));
    }

    /// Flatten the parameters into name/value pairs.
    #[must_use]
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (name, value) in &self.params {
            match value {
                ParamValue::Single(v) => pairs.push((name.clone(), v.clone())),
                ParamValue::List(values) => {
                    pairs.extend(values.iter().map(|v| (name.clone(), v.clone())));
                }
            }
        }
        pairs
    }
}
