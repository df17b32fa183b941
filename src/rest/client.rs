//! Authenticated REST resource calls

use super::token::{Token, TokenClient, resolve_scope};
use crate::config::RestConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::http::{HttpResponse, Verb, build_client};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

/// A usable result of a REST call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx with data.
    Success(Value),
    /// Non-2xx that still carried data.
    Soft { data: Value, description: String },
}

impl Outcome {
    #[must_use]
    pub fn into_data(self) -> Value {
        match self {
            Self::Success(data) | Self::Soft { data, .. } => data,
        }
    }
}

/// Classify a REST response.
///
/// # Errors
///
/// Returns a `ResourceCall` error if the body is not a JSON envelope,
/// or if it carries no `data` (whatever the status).
pub fn interpret(response: &HttpResponse) -> Result<Outcome> {
    let envelope: Envelope = serde_json::from_str(&response.body).map_err(|e| {
        Error::new(ErrorKind::ResourceCall, format!("JSON Decoding Error: {e}"))
            .with_source(e)
            .with_http_response(response.clone())
    })?;

    let description = envelope
        .status
        .as_ref()
        .and_then(|s| s.get("description"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown Error")
        .to_string();

    match (response.is_success(), envelope.data.filter(|d| !d.is_null())) {
        (true, Some(data)) => Ok(Outcome::Success(data)),
        (false, Some(data)) => Ok(Outcome::Soft { data, description }),
        (true, None) => Err(Error::new(
            ErrorKind::ResourceCall,
            format!("No valid response from API (HTTP Code: {})", response.status_line()),
        )
        .with_http_response(response.clone())),
        (false, None) => Err(Error::new(
            ErrorKind::ResourceCall,
            format!("HTTP Error from API: {description} (HTTP Code: {})", response.status_line()),
        )
        .with_http_response(response.clone())),
    }
}

/// Builds a [`RestClient`], resolving its token once.
#[derive(Debug, Clone)]
pub struct RestClientBuilder {
    config: RestConfig,
    secret: String,
    account_id: Option<String>,
    scope: Option<String>,
    force_fetch: bool,
}

impl RestClientBuilder {
    /// `secret` is either an issued token or the account password.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            config: RestConfig::default(),
            secret: secret.into(),
            account_id: None,
            scope: None,
            force_fetch: false,
        }
    }

    #[must_use]
    pub fn config(mut self, config: RestConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Treat the secret as a password even if it looks like a token.
    #[must_use]
    pub const fn force_fetch(mut self, force: bool) -> Self {
        self.force_fetch = force;
        self
    }

    /// Resolve the token and build the client.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidScope` error for an unknown scope, a `Config`
    /// error if a token must be fetched but no account id was given, or
    /// the `TokenIssuance` error from fetching it.
    pub async fn connect(self) -> Result<RestClient> {
        let scope = resolve_scope(self.scope.as_deref())?;

        let token = if !self.force_fetch && Token::is_well_formed(&self.secret) {
            Token::new(self.secret)
        } else {
            let account_id = self.account_id.as_deref().ok_or_else(|| {
                Error::new(
                    ErrorKind::Config,
                    "Unable to fetch a token without specifying an account id",
                )
            })?;
            TokenClient::new(&self.config)?
                .fetch_token(account_id, &self.secret, Some(&scope))
                .await?
        };

        Ok(RestClient {
            http: build_client(self.config.timeout)?,
            config: self.config,
            token,
            account_id: self.account_id,
            scope,
        })
    }
}

/// Client for the REST mail API.
#[derive(Debug)]
pub struct RestClient {
    config: RestConfig,
    http: reqwest::Client,
    token: Token,
    account_id: Option<String>,
    scope: String,
}

impl RestClient {
    #[must_use]
    pub fn builder(secret: impl Into<String>) -> RestClientBuilder {
        RestClientBuilder::new(secret)
    }

    /// Fetch a token for `account_id` and build a client with it.
    ///
    /// # Errors
    ///
    /// See [`RestClientBuilder::connect`].
    pub async fn from_account(
        config: RestConfig,
        account_id: &str,
        password: &str,
        scope: Option<&str>,
    ) -> Result<Self> {
        let mut builder = RestClientBuilder::new(password)
            .config(config)
            .account_id(account_id)
            .force_fetch(true);
        if let Some(scope) = scope {
            builder = builder.scope(scope);
        }
        builder.connect().await
    }

    #[must_use]
    pub const fn token(&self) -> &Token {
        &self.token
    }

    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Call `{api_base}/{path}` and return the envelope's `data`.
    ///
    /// A non-2xx response that still carries data is logged as a
    /// warning and its data returned.
    ///
    /// # Errors
    ///
    /// Returns a `ResourceCall` error if the request fails, the body is
    /// not a JSON envelope, or it carries no data.
    pub async fn call(&self, path: &str, params: &[(&str, &str)], verb: Verb) -> Result<Value> {
        let url = format!(
            "{}/{}",
            self.config.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        debug!("{} {}", verb, url);

        let mut request = self.http.request(verb.method(), &url).header(
            reqwest::header::AUTHORIZATION,
            format!("{} {}", self.config.auth_scheme, self.token),
        );
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await.map_err(|e| {
            Error::new(ErrorKind::ResourceCall, format!("HTTP Error: {e}"))
                .with_source(e)
                .with_text("url", url.clone())
        })?;
        let snapshot = HttpResponse::read(response, ErrorKind::ResourceCall).await?;

        match interpret(&snapshot)? {
            Outcome::Success(data) => Ok(data),
            Outcome::Soft { data, description } => {
                warn!(
                    "Non-fatal HTTP warning: {} (HTTP Code: {})",
                    description,
                    snapshot.status_line()
                );
                Ok(data)
            }
        }
    }

    /// GET `path` without parameters.
    ///
    /// # Errors
    ///
    /// See [`Self::call`].
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.call(path, &[], Verb::Get).await
    }
}
