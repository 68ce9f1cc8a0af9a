//! DirectAdmin provider implementation.
//!
//! This provider manages mailboxes and forwarders through DirectAdmin's
//! legacy `CMD_API_*` commands.
//!
//! # Important Notes
//!
//! - **No canonical format**: the same command answers URL-encoded, line
//!   based, JSON or HTML depending on panel version. See [`payload`].
//! - **`error=0` is success**: only a non-zero `error` code is a failure.
//! - **Fallbacks**: every operation tries a short, fixed list of endpoint
//!   variants in order and takes the first usable answer. Listings that get
//!   nothing usable succeed with an empty value; the cause is only logged.
//! - **Self-signed panels**: certificate checks are off by default for this
//!   client only; see `HttpClientConfig::accept_invalid_certs`.
//!
//! # Example
//!
//! ```no_run
//! use directadmin_mail::directadmin::{ClientConfig, DirectAdminProvider};
//! use directadmin_mail::{DeleteForwarder, ListMailboxes, Provider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = ClientConfig::new("https://panel.example.com:2222", "admin", "secret")
//!     .with_domain("example.com");
//! let provider = DirectAdminProvider::new(config)?;
//!
//! let check = provider.test_connection().await;
//! if !check.success {
//!     eprintln!("{}", check.message);
//! }
//!
//! for mailbox in provider.list_mailboxes().await.value {
//!     println!("{mailbox}");
//! }
//!
//! let deleted = provider.delete_forwarder("sales").await;
//! println!("{}", deleted.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Commands Used
//!
//! `CMD_API_SHOW_DOMAINS`, `CMD_API_SHOW_USER_CONFIG`, `CMD_API_POP`,
//! `CMD_API_EMAIL_POP`, `CMD_API_EMAIL_FORWARDERS`

pub mod api;
pub mod payload;

use std::collections::BTreeSet;
use std::error::Error as StdErr;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use api::{
    endpoints, Accepted, Candidate, Client, ClientConfig, DirectAdminError, Method,
    MissingErrorKey, RawResponse,
};
pub use payload::{classify, Payload, PayloadValue, RemoteError, ResponseShape};

use crate::types::{
    is_valid_mailbox_name, looks_like_html, qualify_address, qualify_destination,
    resolve_domain, split_address,
};
use crate::{
    CreateForwarder, DeleteForwarder, Destination, Forwarder, HttpClientConfig, ListForwarders,
    ListMailboxes, OperationResult, Provider,
};

/// Keys DirectAdmin uses for status reporting rather than data.
const RESERVED_KEYS: &[&str] = &["error", "text", "details", "domain"];

const NO_DOMAIN: &str = "No domain specified.";

/// DirectAdmin mail provider.
///
/// Holds immutable connection parameters; cheap to clone and safe to share.
#[derive(Debug, Clone)]
pub struct DirectAdminProvider {
    api_client: Arc<Client>,
}

impl DirectAdminProvider {
    /// Creates a new DirectAdmin provider with the given configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use directadmin_mail::directadmin::{ClientConfig, DirectAdminProvider};
    ///
    /// let config = ClientConfig::new("https://panel.example.com:2222", "admin", "secret")
    ///     .with_domain("example.com");
    /// let provider = DirectAdminProvider::new(config).unwrap();
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self, Box<dyn StdErr + Send + Sync>> {
        Ok(Self {
            api_client: Arc::new(Client::new(config)?),
        })
    }

    /// Creates a new DirectAdmin provider with custom HTTP client configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use directadmin_mail::directadmin::{ClientConfig, DirectAdminProvider};
    /// use directadmin_mail::HttpClientConfig;
    ///
    /// let config = ClientConfig::new("https://panel.example.com:2222", "admin", "secret");
    /// let http_config = HttpClientConfig::new().accept_invalid_certs(false);
    /// let provider = DirectAdminProvider::with_config(config, http_config).unwrap();
    /// ```
    pub fn with_config(
        config: ClientConfig,
        http_config: HttpClientConfig,
    ) -> Result<Self, Box<dyn StdErr + Send + Sync>> {
        Ok(Self {
            api_client: Arc::new(Client::with_config(config, http_config)?),
        })
    }

    /// Returns the low-level API client.
    pub fn client(&self) -> &Client {
        &self.api_client
    }

    /// Returns the domain operations apply to, if one can be resolved.
    pub fn domain(&self) -> Option<String> {
        self.resolve(None)
    }

    fn resolve(&self, address: Option<&str>) -> Option<String> {
        let config = self.api_client.config();
        resolve_domain(config.domain.as_deref(), address, &config.account_domains)
    }
}

impl Provider for DirectAdminProvider {
    async fn test_connection(&self) -> OperationResult<()> {
        let candidates = [
            Candidate::get(endpoints::SHOW_DOMAINS),
            Candidate::get(endpoints::SHOW_USER_CONFIG),
        ];

        let accepted = match self.api_client.first_usable(&candidates).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "DirectAdmin connection test failed");
                return OperationResult::failed(e.user_message());
            }
        };

        let message = match self.domain() {
            Some(domain) if accepted.endpoint == endpoints::SHOW_DOMAINS => {
                if contains_domain(&domains_from(&accepted.shape), &domain) {
                    format!("Successfully connected. Domain {} found.", domain)
                } else {
                    format!("Connected, but domain {} not found in account.", domain)
                }
            }
            _ => "Successfully connected to DirectAdmin.".to_string(),
        };

        info!(endpoint = accepted.endpoint, "DirectAdmin connection test passed");
        OperationResult::succeeded((), message)
    }

    async fn validate_domain_access(&self) -> OperationResult<()> {
        let Some(domain) = self.domain() else {
            return OperationResult::failed(NO_DOMAIN);
        };

        match self
            .api_client
            .call(&Candidate::get(endpoints::SHOW_DOMAINS))
            .await
        {
            Ok(shape) if contains_domain(&domains_from(&shape), &domain) => {
                OperationResult::succeeded((), format!("Domain {} is accessible.", domain))
            }
            Ok(_) => OperationResult::failed(format!(
                "Domain {} not found in DirectAdmin account.",
                domain
            )),
            Err(e) => {
                warn!(%domain, error = %e, "DirectAdmin domain check failed");
                OperationResult::failed(e.user_message())
            }
        }
    }
}

impl ListMailboxes for DirectAdminProvider {
    async fn list_mailboxes(&self) -> OperationResult<Vec<String>> {
        let Some(domain) = self.domain() else {
            warn!("no domain to list mailboxes for");
            return OperationResult::succeeded(Vec::new(), mailbox_count(0));
        };

        let candidates = [
            Candidate::get(endpoints::POP)
                .param("action", "list")
                .param("domain", &domain),
            Candidate::get(endpoints::POP).param("domain", &domain),
            Candidate::get(endpoints::EMAIL_POP).param("domain", &domain),
        ];

        match self.api_client.first_usable(&candidates).await {
            Ok(accepted) => {
                let identity = self.api_client.config().api_identity(&domain);
                let mailboxes = mailboxes_from(&accepted.shape, &domain, &identity);
                debug!(%domain, count = mailboxes.len(), "listed mailboxes");
                let message = mailbox_count(mailboxes.len());
                OperationResult::succeeded(mailboxes, message)
            }
            Err(e) => {
                warn!(%domain, error = %e, "no mailbox endpoint answered, listing nothing");
                OperationResult::succeeded(Vec::new(), mailbox_count(0))
            }
        }
    }
}

impl ListForwarders for DirectAdminProvider {
    async fn list_forwarders(&self) -> OperationResult<Vec<Forwarder>> {
        let Some(domain) = self.domain() else {
            warn!("no domain to list forwarders for");
            return OperationResult::succeeded(Vec::new(), forwarder_count(0));
        };

        let candidates = [
            Candidate::get(endpoints::EMAIL_FORWARDERS)
                .param("domain", &domain)
                .param("action", "list"),
            Candidate::post(endpoints::EMAIL_FORWARDERS)
                .param("domain", &domain)
                .param("action", "list"),
            Candidate::get(endpoints::EMAIL_FORWARDERS).param("domain", &domain),
            Candidate::post(endpoints::EMAIL_FORWARDERS).param("domain", &domain),
        ];

        match self.api_client.first_usable(&candidates).await {
            Ok(accepted) => {
                let forwarders = forwarders_from(&accepted.shape, &domain);
                debug!(%domain, count = forwarders.len(), "listed forwarders");
                let message = forwarder_count(forwarders.len());
                OperationResult::succeeded(forwarders, message)
            }
            Err(e) => {
                warn!(%domain, error = %e, "no forwarder endpoint answered, listing nothing");
                OperationResult::succeeded(Vec::new(), forwarder_count(0))
            }
        }
    }
}

impl CreateForwarder for DirectAdminProvider {
    async fn create_forwarder(&self, address: &str, destination: &str) -> OperationResult<()> {
        let (alias, _) = split_address(address);
        if let Err(e) = check_alias(alias) {
            return OperationResult::failed(e.user_message());
        }
        let Some(domain) = self.resolve(Some(address)) else {
            return OperationResult::failed(NO_DOMAIN);
        };

        let destination = qualify_destination(destination, &domain);
        if let Err(e) = check_destination(&destination) {
            return OperationResult::failed(e.user_message());
        }
        let candidate = Candidate::post(endpoints::EMAIL_FORWARDERS)
            .param("domain", &domain)
            .param("action", "create")
            .param("user", alias)
            .param("email", &destination)
            .check_indicators();

        match self.api_client.call(&candidate).await {
            Ok(_) => {
                info!(%alias, %domain, %destination, "created forwarder");
                OperationResult::succeeded(
                    (),
                    format!(
                        "Forwarder {}@{} → {} created successfully.",
                        alias, domain, destination
                    ),
                )
            }
            Err(e) => {
                warn!(%alias, %domain, error = %e, "forwarder creation failed");
                OperationResult::failed(mutation_failure(&e, "Failed to create forwarder."))
            }
        }
    }
}

impl DeleteForwarder for DirectAdminProvider {
    async fn delete_forwarder(&self, address: &str) -> OperationResult<()> {
        let Some(domain) = self.resolve(Some(address)) else {
            return OperationResult::failed(NO_DOMAIN);
        };

        let (alias, _) = split_address(address);
        if let Err(e) = check_alias(alias) {
            return OperationResult::failed(e.user_message());
        }
        let address = qualify_address(alias, &domain);

        // DirectAdmin deletes the aliases named in selectN, not `user`.
        let candidate = Candidate::post(endpoints::EMAIL_FORWARDERS)
            .param("domain", &domain)
            .param("action", "delete")
            .param("user", alias)
            .param("select0", alias)
            .check_indicators();

        match self.api_client.call(&candidate).await {
            Ok(_) => {
                info!(%address, "deleted forwarder");
                OperationResult::succeeded((), format!("Forwarder {} deleted successfully.", address))
            }
            Err(e) => {
                warn!(%address, error = %e, "forwarder deletion failed");
                OperationResult::failed(mutation_failure(&e, "Failed to delete forwarder."))
            }
        }
    }
}

/// Rejects aliases that are empty or could not have come from a user.
fn check_alias(alias: &str) -> Result<(), DirectAdminError> {
    let alias = alias.trim();
    if alias.is_empty() {
        return Err(DirectAdminError::InvalidInput(
            "Email address is required.".to_string(),
        ));
    }
    if !is_valid_mailbox_name(alias) {
        return Err(DirectAdminError::InvalidInput(format!(
            "Invalid forwarder name: {}",
            alias.escape_default()
        )));
    }
    Ok(())
}

/// Rejects a qualified destination list with a target DirectAdmin would not
/// accept. Sentinels and pipes pass unchecked.
fn check_destination(qualified: &str) -> Result<(), DirectAdminError> {
    if qualified.is_empty() {
        return Err(DirectAdminError::InvalidInput(
            "Destination is required.".to_string(),
        ));
    }
    if qualified.starts_with('|') {
        return Ok(());
    }

    match qualified
        .split(',')
        .find(|t| !Destination::classify(t).is_sentinel() && !is_valid_mailbox_name(t))
    {
        Some(bad) => Err(DirectAdminError::InvalidInput(format!(
            "Invalid destination: {}",
            bad.escape_default()
        ))),
        None => Ok(()),
    }
}

fn mailbox_count(n: usize) -> String {
    format!("Found {} email accounts.", n)
}

fn forwarder_count(n: usize) -> String {
    format!("Found {} forwarders.", n)
}

fn mutation_failure(err: &DirectAdminError, generic: &str) -> String {
    match err {
        DirectAdminError::Remote(remote) => remote.summary().unwrap_or_else(|| generic.to_string()),
        DirectAdminError::UnparseableBody(_) => generic.to_string(),
        other => other.user_message(),
    }
}

/// Extracts full mailbox addresses from any accepted response shape.
fn mailboxes_from(shape: &ResponseShape, domain: &str, api_identity: &str) -> Vec<String> {
    let names: Vec<String> = match shape {
        ResponseShape::Json(p)
        | ResponseShape::UrlEncoded(p)
        | ResponseShape::LineKv(p)
        | ResponseShape::LineList(p) => mailbox_names(p),
        ResponseShape::Opaque(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("error"))
            .map(str::to_string)
            .collect(),
        ResponseShape::Html | ResponseShape::Empty => Vec::new(),
    };

    let identity = api_identity.to_lowercase();
    let mut mailboxes = BTreeSet::new();
    for name in names {
        let address = qualify_address(&name, domain);
        if !is_valid_mailbox_name(&address) {
            debug!(candidate = %name.escape_default(), "skipping invalid mailbox name");
            continue;
        }
        if address.to_lowercase() == identity {
            continue;
        }
        mailboxes.insert(address);
    }
    mailboxes.into_iter().collect()
}

fn mailbox_names(payload: &Payload) -> Vec<String> {
    let owned = |v: &PayloadValue| -> Vec<String> {
        v.values().into_iter().map(str::to_string).collect()
    };

    if let Some(list) = payload.get("list").or_else(|| payload.get("list[]")) {
        return owned(list);
    }

    let mut numbered: Vec<(u64, &PayloadValue)> = payload
        .iter()
        .filter_map(|(k, v)| k.parse::<u64>().ok().map(|n| (n, v)))
        .collect();
    if !numbered.is_empty() {
        numbered.sort_by_key(|(n, _)| *n);
        return numbered
            .into_iter()
            .flat_map(|(_, v)| v.values())
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .collect();
    }

    let mut names = Vec::new();
    for (key, value) in payload.iter() {
        if RESERVED_KEYS.contains(&key) || key.starts_with("error") {
            continue;
        }
        if key.contains('@') {
            names.push(key.to_string());
        } else if !value.is_blank() {
            names.extend(
                value
                    .values()
                    .into_iter()
                    .filter(|v| !v.trim().is_empty())
                    .map(str::to_string),
            );
        }
    }
    names
}

/// Extracts forwarders from any accepted response shape.
fn forwarders_from(shape: &ResponseShape, domain: &str) -> Vec<Forwarder> {
    let pairs: Vec<(String, String)> = match shape {
        ResponseShape::Json(p)
        | ResponseShape::UrlEncoded(p)
        | ResponseShape::LineKv(p)
        | ResponseShape::LineList(p) => forwarder_pairs(p),
        ResponseShape::Opaque(text) => text
            .lines()
            .filter_map(|line| line.trim().split_once('='))
            .map(|(alias, dest)| (alias.to_string(), dest.to_string()))
            .collect(),
        ResponseShape::Html | ResponseShape::Empty => Vec::new(),
    };

    let forwarders: BTreeSet<Forwarder> = pairs
        .into_iter()
        .filter_map(|(alias, destination)| make_forwarder(&alias, &destination, domain))
        .collect();
    forwarders.into_iter().collect()
}

fn forwarder_pairs(payload: &Payload) -> Vec<(String, String)> {
    let mut selects: Vec<(u64, &str)> = payload
        .iter()
        .filter_map(|(k, v)| {
            let index = k.strip_prefix("select")?.parse::<u64>().ok()?;
            Some((index, v.first()?))
        })
        .collect();

    if !selects.is_empty() {
        selects.sort_by_key(|(n, _)| *n);
        return selects
            .into_iter()
            .filter_map(|(n, value)| match value.split_once('=') {
                Some((alias, dest)) => Some((alias.to_string(), dest.to_string())),
                None if !value.trim().is_empty() => payload
                    .get_str(&format!("destination{}", n))
                    .map(|dest| (value.to_string(), dest.to_string())),
                None => None,
            })
            .collect();
    }

    if let Some(list) = payload.get("list") {
        return list
            .values()
            .into_iter()
            .filter_map(|item| item.split_once('='))
            .map(|(alias, dest)| (alias.to_string(), dest.to_string()))
            .collect();
    }

    payload
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(key) && !key.starts_with("error"))
        .filter(|(_, value)| !value.is_blank())
        .map(|(key, value)| (key.to_string(), value.values().join(",")))
        .collect()
}

fn make_forwarder(alias: &str, destination: &str, domain: &str) -> Option<Forwarder> {
    let alias = alias.trim();
    if alias.is_empty() || looks_like_html(alias) || alias.contains(char::is_whitespace) {
        debug!(key = %alias.escape_default(), "skipping invalid forwarder key");
        return None;
    }

    let destination = qualify_destination(destination, domain);
    if destination.is_empty() {
        return None;
    }

    Some(Forwarder {
        address: qualify_address(alias, domain),
        destination,
    })
}

/// Collects the domain names a `CMD_API_SHOW_DOMAINS` answer mentions.
fn domains_from(shape: &ResponseShape) -> BTreeSet<String> {
    let mut domains = BTreeSet::new();
    match shape {
        ResponseShape::Json(p)
        | ResponseShape::UrlEncoded(p)
        | ResponseShape::LineKv(p)
        | ResponseShape::LineList(p) => {
            for (key, value) in p.iter() {
                let lower = key.to_ascii_lowercase();
                if lower.starts_with("list") || lower.contains("domain") {
                    domains.extend(value.values().into_iter().map(normalize_domain));
                } else if key.contains('.') {
                    domains.insert(normalize_domain(key));
                }
            }
        }
        ResponseShape::Opaque(text) => {
            domains.extend(text.lines().map(normalize_domain));
        }
        ResponseShape::Html | ResponseShape::Empty => {}
    }
    domains.remove("");
    domains
}

fn normalize_domain(s: &str) -> String {
    s.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn contains_domain(domains: &BTreeSet<String>, domain: &str) -> bool {
    domains.contains(&normalize_domain(domain))
}
