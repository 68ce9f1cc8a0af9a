//! DirectAdmin API client implementation.
//!
//! This module provides the low-level HTTP client for DirectAdmin's legacy
//! `CMD_API_*` commands: one authenticated request per call, response
//! classification through [`super::payload`], and the ordered candidate
//! fallback used by every high-level operation.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client as HttpClient, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use super::payload::{classify, RemoteError, ResponseShape};
use crate::HttpClientConfig;

/// Per-request timeout used unless `HttpClientConfig::timeout` overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with every request.
const USER_AGENT: &str = "DirectAdmin Email Forwarder";

/// Command endpoints consumed by this crate.
pub mod endpoints {
    pub const SHOW_DOMAINS: &str = "/CMD_API_SHOW_DOMAINS";
    pub const SHOW_USER_CONFIG: &str = "/CMD_API_SHOW_USER_CONFIG";
    pub const POP: &str = "/CMD_API_POP";
    pub const EMAIL_POP: &str = "/CMD_API_EMAIL_POP";
    pub const EMAIL_FORWARDERS: &str = "/CMD_API_EMAIL_FORWARDERS";
}

/// Errors that can occur when talking to DirectAdmin.
#[derive(Debug, Error)]
pub enum DirectAdminError {
    /// The request did not complete within the timeout.
    #[error("request timed out")]
    Timeout,

    /// The server could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS negotiation or certificate validation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// DirectAdmin rejected the credentials (HTTP 401).
    #[error("authentication failed")]
    AuthFailed,

    /// Any status other than 200 or 401, including redirects.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// Any other HTTP client failure.
    #[error("HTTP request error: {0}")]
    Request(#[source] reqwest::Error),

    /// An HTML page came back instead of API data.
    #[error("malformed response: HTML page instead of API data")]
    MalformedResponse,

    /// The body was empty or decoded to nothing.
    #[error("empty response")]
    EmptyResponse,

    /// The body matched no known shape where one was required.
    #[error("unparseable response: {0}")]
    UnparseableBody(String),

    /// DirectAdmin reported a non-zero `error` code.
    #[error("{0}")]
    Remote(RemoteError),

    /// Input rejected before anything was sent.
    #[error("{0}")]
    InvalidInput(String),
}

impl DirectAdminError {
    /// Returns a message safe to show to the account owner.
    ///
    /// Transport and format failures collapse into a handful of fixed
    /// messages. Only DirectAdmin's own `text`/`details` and validation
    /// reasons are passed through.
    pub fn user_message(&self) -> String {
        match self {
            DirectAdminError::Timeout => "Connection timed out. Please check your DirectAdmin \
                 server URL and network connection."
                .to_string(),
            DirectAdminError::ConnectionFailed(_) => "Unable to connect to DirectAdmin server. \
                 Please verify the server URL is correct."
                .to_string(),
            DirectAdminError::Tls(_) => "SSL certificate error. Try using HTTP instead of HTTPS, \
                 or check your certificate configuration."
                .to_string(),
            DirectAdminError::AuthFailed => "Authentication failed. Please check your \
                 DirectAdmin username and password."
                .to_string(),
            DirectAdminError::UnexpectedStatus(code) if (300..400).contains(code) => {
                "DirectAdmin redirected the request. Please verify the server URL.".to_string()
            }
            DirectAdminError::UnexpectedStatus(_)
            | DirectAdminError::Request(_)
            | DirectAdminError::MalformedResponse
            | DirectAdminError::EmptyResponse
            | DirectAdminError::UnparseableBody(_) => {
                "Could not reach the DirectAdmin API. Please try again later.".to_string()
            }
            DirectAdminError::Remote(err) => err
                .summary()
                .unwrap_or_else(|| "DirectAdmin reported an error.".to_string()),
            DirectAdminError::InvalidInput(reason) => reason.clone(),
        }
    }

    /// Returns `true` for failures that happened before a body was read.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DirectAdminError::Timeout
                | DirectAdminError::ConnectionFailed(_)
                | DirectAdminError::Tls(_)
                | DirectAdminError::AuthFailed
                | DirectAdminError::UnexpectedStatus(_)
                | DirectAdminError::Request(_)
        )
    }
}

impl From<reqwest::Error> for DirectAdminError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return DirectAdminError::Timeout;
        }

        // The URL is part of reqwest's message and may itself contain "ssl" or "tls".
        let err = err.without_url();
        let chain = error_chain(&err);
        let lower = chain.to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            return DirectAdminError::Tls(chain);
        }

        if err.is_connect() {
            return DirectAdminError::ConnectionFailed(chain);
        }

        DirectAdminError::Request(err)
    }
}

/// Joins an error and all of its sources into one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Connection parameters for one DirectAdmin account.
///
/// Owned by the caller and never modified by the client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Panel base URL with scheme and without trailing slash.
    pub server: String,
    /// DirectAdmin login name.
    pub username: String,
    /// DirectAdmin password or login key.
    pub secret: String,
    /// The domain operations apply to.
    pub domain: Option<String>,
    /// Every domain the account owner manages, in their configured order.
    pub account_domains: Vec<String>,
}

impl ClientConfig {
    /// Creates a new client configuration.
    ///
    /// # Arguments
    ///
    /// * `server` - Panel URL, e.g. `https://panel.example.com:2222`. A URL
    ///   without scheme is assumed to be HTTPS.
    /// * `username` - DirectAdmin login name
    /// * `secret` - Password or login key
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            server: normalize_server(&server.into()),
            username: username.into(),
            secret: secret.into(),
            domain: None,
            account_domains: Vec::new(),
        }
    }

    /// Sets the domain operations apply to.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        let domain = domain.trim();
        self.domain = (!domain.is_empty()).then(|| domain.to_string());
        self
    }

    /// Sets the account's managed domains, used when no domain is explicit.
    pub fn with_account_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.account_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `username@domain`, the mailbox hidden from listings.
    pub fn api_identity(&self, domain: &str) -> String {
        format!("{}@{}", self.username, domain)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("domain", &self.domain)
            .field("account_domains", &self.account_domains)
            .finish()
    }
}

fn normalize_server(server: &str) -> String {
    let server = server.trim();
    let server = if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    };
    server.trim_end_matches('/').to_string()
}

/// HTTP method of a command request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Parameters in the query string.
    Get,
    /// Parameters form-encoded in the body.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// How a response without an `error` key is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingErrorKey {
    /// The command omits `error` on success (listings, account queries).
    Success,
    /// Success only if nothing else in the body mentions an error (mutations).
    CheckIndicators,
}

/// One attempt in an operation's fallback sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Command path, e.g. `/CMD_API_POP`.
    pub endpoint: &'static str,
    /// Request parameters in sending order.
    pub params: Vec<(&'static str, String)>,
    /// Request method.
    pub method: Method,
    /// Judgement for responses without an `error` key.
    pub missing_error: MissingErrorKey,
}

impl Candidate {
    /// Creates a GET candidate.
    pub fn get(endpoint: &'static str) -> Self {
        Self::new(endpoint, Method::Get)
    }

    /// Creates a POST candidate.
    pub fn post(endpoint: &'static str) -> Self {
        Self::new(endpoint, Method::Post)
    }

    fn new(endpoint: &'static str, method: Method) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
            method,
            missing_error: MissingErrorKey::Success,
        }
    }

    /// Appends a parameter.
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Requires error indicators to be absent when `error` is missing.
    pub fn check_indicators(mut self) -> Self {
        self.missing_error = MissingErrorKey::CheckIndicators;
        self
    }

    /// Returns the value of a parameter.
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A 200 response before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// The `Content-Type` header, if present and readable.
    pub content_type: Option<String>,
    /// The body as text.
    pub body: String,
}

/// A response accepted by [`Client::first_usable`].
#[derive(Debug, Clone)]
pub struct Accepted {
    /// Endpoint of the candidate that answered.
    pub endpoint: &'static str,
    /// The classified body.
    pub shape: ResponseShape,
}

/// DirectAdmin API client.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: HttpClient,
    config: ClientConfig,
}

impl Client {
    /// Creates a new DirectAdmin API client.
    pub fn new(config: ClientConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        Self::with_config(config, HttpClientConfig::default())
    }

    /// Creates a new DirectAdmin API client with custom HTTP configuration.
    ///
    /// Certificate checks follow `HttpClientConfig::accept_invalid_certs`
    /// for this client only. Without a TLS feature only `http://` servers
    /// can be reached and the setting has no effect.
    pub fn with_config(
        config: ClientConfig,
        http_config: HttpClientConfig,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut builder = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(http_config.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .redirect(Policy::none());

        #[cfg(any(
            feature = "default-tls",
            feature = "rustls-tls",
            feature = "native-tls",
            feature = "native-tls-vendored"
        ))]
        {
            builder = builder.danger_accept_invalid_certs(http_config.accept_invalid_certs);
        }

        if let Some(addr) = http_config.local_address {
            builder = builder.local_address(addr);
        }

        #[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
        if let Some(ref iface) = http_config.interface {
            builder = builder.interface(iface);
        }

        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Returns the connection parameters.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends one authenticated request.
    ///
    /// Only a 200 response yields a [`RawResponse`]; 401 maps to
    /// [`DirectAdminError::AuthFailed`] and every other status to
    /// [`DirectAdminError::UnexpectedStatus`].
    pub async fn send(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        method: Method,
    ) -> Result<RawResponse, DirectAdminError> {
        let url = format!("{}{}", self.config.server, endpoint);
        debug!(
            %method,
            %url,
            params = ?params.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            "DirectAdmin request"
        );

        let request = match method {
            Method::Get => self.http_client.get(&url).query(params),
            Method::Post => self.http_client.post(&url).form(params),
        };

        let response = request
            .basic_auth(&self.config.username, Some(&self.config.secret))
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if status == StatusCode::UNAUTHORIZED {
            return Err(DirectAdminError::AuthFailed);
        }
        if status != StatusCode::OK {
            return Err(DirectAdminError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await?;
        debug!(%status, content_type = ?content_type, bytes = body.len(), "DirectAdmin response");

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    /// Sends a candidate and classifies the answer.
    ///
    /// HTML, empty bodies and non-zero `error` codes are failures. Opaque
    /// text is accepted unless the candidate checks indicators and the text
    /// mentions an error.
    pub async fn call(&self, candidate: &Candidate) -> Result<ResponseShape, DirectAdminError> {
        let params: Vec<(&str, &str)> = candidate
            .params
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();

        let raw = self.send(candidate.endpoint, &params, candidate.method).await?;
        let shape = classify(raw.content_type.as_deref(), &raw.body);
        debug!(endpoint = candidate.endpoint, shape = shape.kind(), "classified response");

        accept(shape, candidate.missing_error)
    }

    /// Tries candidates in order and returns the first usable answer.
    ///
    /// Every candidate is attempted at most once, sequentially. When all of
    /// them fail, the last error is returned.
    pub async fn first_usable(
        &self,
        candidates: &[Candidate],
    ) -> Result<Accepted, DirectAdminError> {
        let mut last_error = None;

        for candidate in candidates {
            match self.call(candidate).await {
                Ok(shape) => {
                    return Ok(Accepted {
                        endpoint: candidate.endpoint,
                        shape,
                    });
                }
                Err(err) => {
                    warn!(
                        endpoint = candidate.endpoint,
                        method = %candidate.method,
                        error = %err,
                        "DirectAdmin candidate failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| DirectAdminError::InvalidInput("No endpoint to try".to_string())))
    }
}

/// Applies the success rules to a classified body.
pub fn accept(
    shape: ResponseShape,
    missing_error: MissingErrorKey,
) -> Result<ResponseShape, DirectAdminError> {
    match &shape {
        ResponseShape::Html => Err(DirectAdminError::MalformedResponse),
        ResponseShape::Empty => Err(DirectAdminError::EmptyResponse),
        ResponseShape::Opaque(text) => {
            if missing_error == MissingErrorKey::CheckIndicators
                && text.to_ascii_lowercase().contains("error")
            {
                Err(DirectAdminError::UnparseableBody(text.clone()))
            } else {
                Ok(shape)
            }
        }
        ResponseShape::Json(payload)
        | ResponseShape::UrlEncoded(payload)
        | ResponseShape::LineKv(payload)
        | ResponseShape::LineList(payload) => {
            if payload.is_empty() {
                return Err(DirectAdminError::EmptyResponse);
            }
            if let Some(err) = payload.remote_error() {
                return Err(DirectAdminError::Remote(err));
            }
            if missing_error == MissingErrorKey::CheckIndicators
                && payload.error_code().is_none()
                && payload.has_error_indicators()
            {
                return Err(DirectAdminError::UnparseableBody(format!(
                    "{} body with error indicators",
                    shape.kind()
                )));
            }
            Ok(shape)
        }
    }
}
