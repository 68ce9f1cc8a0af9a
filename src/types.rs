//! Mail value types shared by every operation.
//!
//! DirectAdmin speaks in bare local parts ("sales") and full addresses
//! ("sales@example.com") interchangeably, and forwarder destinations can be
//! addresses, local usernames or special delivery actions. This module holds
//! the rules that turn those loose strings into values with one meaning:
//!
//! | Input | Meaning | Sent / listed as |
//! |-------|---------|------------------|
//! | `ops@other.org` | full address | unchanged |
//! | `support` | local user of the configured domain | `support@example.com` |
//! | `:blackhole:`, `:fail:` | sentinel action | unchanged |
//! | `\|/usr/bin/script` | pipe to program | unchanged |

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Characters accepted in a mailbox name or address.
///
/// Anything outside this class (angle brackets, quotes, whitespace) means the
/// value came from an HTML page rather than from the API.
static MAILBOX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+(@[A-Za-z0-9.\-]+\.[A-Za-z]{2,})?$")
        .unwrap_or_else(|e| unreachable!("mailbox pattern is a literal: {e}"))
});

/// A forwarder as listed by DirectAdmin.
///
/// `address` is always a full address. `destination` is already qualified:
/// bare usernames carry the domain, sentinels are untouched, and multiple
/// targets stay comma-separated in the order DirectAdmin reported them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Forwarder {
    /// The forwarding address (`alias@domain`).
    pub address: String,
    /// Where mail for `address` goes.
    pub destination: String,
}

impl Forwarder {
    /// Returns the local part of the forwarding address.
    pub fn alias(&self) -> &str {
        split_address(&self.address).0
    }
}

impl fmt::Display for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.address, self.destination)
    }
}

/// A single forwarder target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Destination {
    /// A full email address (contains `@`).
    Address(String),
    /// A special delivery action: `:blackhole:`, `:fail:` or a `|program` pipe.
    Sentinel(String),
    /// A bare username on the configured domain.
    Local(String),
}

impl Destination {
    /// Classifies a raw destination string.
    ///
    /// Sentinels are checked first so that a pipe command containing `@`
    /// is still passed through verbatim.
    pub fn classify(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with(':') || raw.starts_with('|') {
            Destination::Sentinel(raw.to_string())
        } else if raw.contains('@') {
            Destination::Address(raw.to_string())
        } else {
            Destination::Local(raw.to_string())
        }
    }

    /// Returns `true` for `:blackhole:`, `:fail:` and pipe destinations.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Destination::Sentinel(_))
    }

    /// Returns the value DirectAdmin expects for this destination.
    pub fn qualify(&self, domain: &str) -> String {
        match self {
            Destination::Address(addr) => addr.clone(),
            Destination::Sentinel(action) => action.clone(),
            Destination::Local(user) => format!("{}@{}", user, domain),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Address(s) | Destination::Sentinel(s) | Destination::Local(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

/// Qualifies every target of a (possibly comma-separated) destination list.
///
/// Empty targets are dropped. A lone sentinel containing commas, such as a
/// pipe command with arguments, is kept whole.
pub fn qualify_destination(raw: &str, domain: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with('|') {
        return raw.to_string();
    }

    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| Destination::classify(t).qualify(domain))
        .collect::<Vec<_>>()
        .join(",")
}

/// Splits an address into its local part and optional domain.
pub fn split_address(address: &str) -> (&str, Option<&str>) {
    match address.trim().split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (address.trim(), None),
    }
}

/// Returns `local@domain` for a bare name, or the address unchanged.
pub fn qualify_address(name: &str, domain: &str) -> String {
    let name = name.trim();
    if name.contains('@') {
        name.to_string()
    } else {
        format!("{}@{}", name, domain)
    }
}

/// Returns `true` if `candidate` is a plausible mailbox name or address.
pub fn is_valid_mailbox_name(candidate: &str) -> bool {
    MAILBOX_PATTERN.is_match(candidate)
}

/// Returns `true` if the string carries HTML markup or quoting characters.
pub fn looks_like_html(s: &str) -> bool {
    s.contains(['<', '>', '"', '\''])
}

/// Picks the domain an operation applies to.
///
/// The explicit domain wins. Otherwise the domain part of `address` is used,
/// and as a last resort the first of the account's configured domains.
pub fn resolve_domain(
    explicit: Option<&str>,
    address: Option<&str>,
    account_domains: &[String],
) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .or_else(|| {
            address
                .and_then(|a| split_address(a).1)
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
        })
        .or_else(|| account_domains.first().cloned())
}
