//! Mail-server administration service client
//!
//! Calls ASMX-style endpoints of the form
//! `scheme://host[:port]/Services/svc<Service>.asmx/<Method>` and
//! decodes the XML responses into typed records.

mod document;
mod records;
mod service;

pub use document::{Node, ParsedDocument};
pub use records::{
    DEFAULT_USER_SETTINGS, UserQuery, UserRecord, decode_domain_names, decode_user_settings,
    decode_users,
};
pub use service::{ParamValue, Service, ServiceRequest};

use crate::config::Credentials;
use crate::error::{Error, ErrorKind, Result};
use crate::http::{HttpResponse, Verb, build_client};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Client for the administration web services.
pub struct AdminClient {
    credentials: Credentials,
    http: reqwest::Client,
}

impl AdminClient {
    /// # Errors
    ///
    /// Returns a `Config` error if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = build_client(credentials.timeout)?;
        Ok(Self { credentials, http })
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The endpoint URL for `method` on `service`.
    #[must_use]
    pub fn service_url(&self, service: Service, method: &str) -> String {
        let scheme = if self.credentials.use_tls { "https" } else { "http" };
        let host = self.credentials.port.map_or_else(
            || self.credentials.server.clone(),
            |port| format!("{}:{port}", self.credentials.server),
        );
        format!("{scheme}://{host}/Services/svc{service}.asmx/{method}")
    }

    /// Issue one authenticated request and parse the response body.
    ///
    /// # Errors
    ///
    /// Returns a `ServiceCall` error on connection failure or a non-2xx
    /// status, and a `ResponseShape` error if the body cannot be parsed.
    pub async fn call(&self, mut request: ServiceRequest) -> Result<ParsedDocument> {
        let url = self.service_url(request.service(), request.method());
        request.authenticate(&self.credentials.username, &self.credentials.password);
        let pairs = request.pairs();

        debug!("{} {}", request.http_verb(), url);

        let builder = self.http.request(request.http_verb().method(), &url);
        let builder = if request.http_verb() == Verb::Get {
            builder.query(&pairs)
        } else {
            builder.form(&pairs)
        };

        let response = builder.send().await.map_err(|e| {
            Error::new(ErrorKind::ServiceCall, format!("Error calling service: \"{e}\""))
                .with_source(e)
                .with_text("url", url.clone())
        })?;

        let status_error = response.error_for_status_ref().err();
        if let Some(e) = status_error {
            let snapshot = HttpResponse::read(response, ErrorKind::ServiceCall).await?;
            return Err(Error::new(
                ErrorKind::ServiceCall,
                format!("Error calling service: \"{e}\""),
            )
            .with_source(e)
            .with_http_response(snapshot));
        }

        let snapshot = HttpResponse::read(response, ErrorKind::ServiceCall).await?;
        ParsedDocument::parse(&snapshot.body)
    }

    /// All domains hosted on the server, lower-cased, in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response has no
    /// `<domainnames>` element.
    pub async fn list_domains(&self) -> Result<Vec<String>> {
        let doc = self
            .call(ServiceRequest::for_service(Service::DomainAdmin, "GetAllDomains"))
            .await?;
        let domains = decode_domain_names(&doc)?;
        info!("Found {} domains", domains.len());
        Ok(domains)
    }

    /// Requested settings of one mailbox, keyed by lower-case name.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response is not a
    /// `<settingvalues>` list of `KEY=VALUE` leaves.
    pub async fn list_requested_user_settings<S: AsRef<str>>(
        &self,
        address: &str,
        settings: &[S],
    ) -> Result<BTreeMap<String, String>> {
        let request = ServiceRequest::for_service(Service::UserAdmin, "GetRequestedUserSettings")
            .param("EmailAddress", address)
            .param_list(
                "requestedSettings",
                settings.iter().map(|s| s.as_ref().to_lowercase()),
            );
        let doc = self.call(request).await?;
        decode_user_settings(&doc)
    }

    /// The default settings of one mailbox.
    ///
    /// # Errors
    ///
    /// See [`Self::list_requested_user_settings`].
    pub async fn get_user(&self, address: &str) -> Result<BTreeMap<String, String>> {
        self.list_requested_user_settings(address, DEFAULT_USER_SETTINGS.as_slice())
            .await
    }

    /// All users of `domain`, optionally enriched with extra settings.
    ///
    /// When `query.require_extra_info` is set, the first failed settings
    /// lookup aborts the listing; otherwise the user keeps its base
    /// record and the failure is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the base listing fails, or if a settings
    /// lookup fails while `require_extra_info` is set.
    pub async fn list_domain_users(
        &self,
        domain: &str,
        query: &UserQuery,
    ) -> Result<BTreeMap<String, UserRecord>> {
        let doc = self
            .call(
                ServiceRequest::for_service(Service::UserAdmin, "GetUsers")
                    .param("DomainName", domain),
            )
            .await?;
        let records = decode_users(&doc)?;
        drop(doc);

        info!("Found {} users in {}", records.len(), domain);

        let mut users = BTreeMap::new();
        for mut record in records {
            let address = qualify(record.username(), domain);
            let key = if query.qualify_addresses {
                address.clone()
            } else {
                record.username().to_string()
            };

            if !query.extra_settings.is_empty() {
                match self
                    .list_requested_user_settings(&address, query.extra_settings.as_slice())
                    .await
                {
                    Ok(settings) => record.merge(settings),
                    Err(e) if query.require_extra_info => {
                        let merged: Vec<&String> = users.keys().collect();
                        return Err(e
                            .with_text("user", address)
                            .with_diagnostic("merged_users", &merged));
                    }
                    Err(e) => {
                        warn!("Skipping extra settings for {}: {}", address, e);
                    }
                }
            }

            users.insert(key, record);
        }

        Ok(users)
    }
}

fn qualify(username: &str, domain: &str) -> String {
    if username.contains('@') {
        username.to_string()
    } else {
        format!("{username}@{domain}")
    }
}
