//! Mailbox and forwarder management for DirectAdmin accounts.
//!
//! This crate talks to DirectAdmin's legacy `CMD_API_*` command interface and
//! turns its many response formats into one stable model. Callers supply the
//! connection parameters of a single account and get back an
//! [`OperationResult`] for every operation; nothing is persisted and no error
//! escapes as a panic or as a raw transport message.
//!
//! # Capabilities
//!
//! The basic trait is [`Provider`], which can test the connection and check
//! access to the configured domain. The following capabilities are
//! implemented additionally:
//!
//! - [`ListMailboxes`]
//! - [`ListForwarders`]
//! - [`CreateForwarder`]
//! - [`DeleteForwarder`]
//!
//! # Example
//!
//! ```no_run
//! use directadmin_mail::directadmin::{ClientConfig, DirectAdminProvider};
//! use directadmin_mail::{CreateForwarder, ListForwarders};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = ClientConfig::new("https://panel.example.com:2222", "admin", "secret")
//!     .with_domain("example.com");
//! let provider = DirectAdminProvider::new(config)?;
//!
//! let created = provider.create_forwarder("sales", "support").await;
//! println!("{}", created.message);
//!
//! for forwarder in provider.list_forwarders().await.value {
//!     println!("{forwarder}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod directadmin;
pub mod types;

pub use types::{Destination, Forwarder};

/// Message used when a failure would otherwise carry no text.
const GENERIC_FAILURE: &str = "The operation could not be completed.";

/// Outcome of one operation, ready for presentation.
///
/// When `success` is `false`, `message` is non-empty and safe to show to the
/// account owner; diagnostic detail is only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OperationResult<T> {
    /// Whether the operation did what was asked.
    pub success: bool,
    /// The operation's value. Listings that could not be retrieved are empty.
    pub value: T,
    /// Human-readable description of the outcome.
    pub message: String,
}

impl<T> OperationResult<T> {
    /// Creates a successful result.
    pub fn succeeded(value: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            value,
            message: message.into(),
        }
    }

    /// Returns `true` if the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Converts into a [`Result`], keeping the message on failure.
    pub fn into_result(self) -> Result<T, String> {
        if self.success {
            Ok(self.value)
        } else {
            Err(self.message)
        }
    }
}

impl<T: Default> OperationResult<T> {
    /// Creates a failed result with an empty value.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            value: T::default(),
            message: if message.trim().is_empty() {
                GENERIC_FAILURE.to_string()
            } else {
                message
            },
        }
    }
}

/// Represents a mail hosting account reachable through an API.
///
/// By default only connectivity and domain checks are supported; the
/// following additional capabilities may be implemented:
///
/// - [`ListMailboxes`]
/// - [`ListForwarders`]
/// - [`CreateForwarder`]
/// - [`DeleteForwarder`]
pub trait Provider {
    /// Checks that the account is reachable with the configured credentials.
    ///
    /// When a domain is configured, the message also says whether the
    /// account lists it; a missing domain does not make the check fail.
    fn test_connection(&self) -> impl Future<Output = OperationResult<()>>;

    /// Checks that the configured domain belongs to the account.
    ///
    /// `success` is the answer; `message` explains it.
    fn validate_domain_access(&self) -> impl Future<Output = OperationResult<()>>;
}

/// Represents a [`Provider`] that can list mailboxes.
pub trait ListMailboxes: Provider {
    /// Lists full mailbox addresses of the configured domain, sorted and
    /// without duplicates. The API identity itself is never listed.
    ///
    /// When nothing could be retrieved the result is still successful and the
    /// value is empty; the cause is only logged.
    fn list_mailboxes(&self) -> impl Future<Output = OperationResult<Vec<String>>>;
}

/// Represents a [`Provider`] that can list forwarders.
pub trait ListForwarders: Provider {
    /// Lists the configured domain's forwarders, sorted by address.
    ///
    /// When nothing could be retrieved the result is still successful and the
    /// value is empty; the cause is only logged.
    fn list_forwarders(&self) -> impl Future<Output = OperationResult<Vec<Forwarder>>>;
}

/// Represents a [`Provider`] that supports forwarder creation.
pub trait CreateForwarder: ListForwarders {
    /// Creates a forwarder from `address` (its local part) to `destination`.
    ///
    /// `destination` may be a full address, a bare username of the
    /// configured domain, or a sentinel such as `:blackhole:`.
    fn create_forwarder(
        &self,
        address: &str,
        destination: &str,
    ) -> impl Future<Output = OperationResult<()>>;
}

/// Represents a [`Provider`] that supports forwarder deletion.
pub trait DeleteForwarder: ListForwarders {
    /// Deletes the forwarder for `address`, qualifying a bare name with the
    /// configured domain.
    fn delete_forwarder(&self, address: &str) -> impl Future<Output = OperationResult<()>>;
}

/// HTTP client configuration options.
///
/// # Example
///
/// ```
/// use directadmin_mail::HttpClientConfig;
/// use std::time::Duration;
///
/// let config = HttpClientConfig::new()
///     .timeout(Duration::from_secs(5))
///     .accept_invalid_certs(false);
/// assert!(!config.accept_invalid_certs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Local IP address to bind outgoing connections to.
    pub local_address: Option<IpAddr>,
    /// Network interface to bind to (Linux, Android and Fuchsia only).
    pub interface: Option<String>,
    /// Per-request timeout. Defaults to ten seconds.
    pub timeout: Option<Duration>,
    /// Skip certificate verification for this client.
    ///
    /// DirectAdmin panels commonly run on self-signed certificates, so this
    /// defaults to `true`. It only affects clients built from this config, and
    /// is ignored when the crate is built without a TLS feature.
    pub accept_invalid_certs: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            local_address: None,
            interface: None,
            timeout: None,
            accept_invalid_certs: true,
        }
    }
}

impl HttpClientConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds outgoing connections to a local address.
    pub fn local_address(mut self, addr: IpAddr) -> Self {
        self.local_address = Some(addr);
        self
    }

    /// Binds outgoing connections to a network interface.
    pub fn interface(mut self, iface: impl Into<String>) -> Self {
        self.interface = Some(iface.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enables or disables certificate verification for this client.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}
