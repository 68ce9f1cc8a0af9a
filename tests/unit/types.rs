//! Unit tests for mail value types.
//!
//! Tests Forwarder, Destination and the address helpers used by every
//! operation.

use directadmin_mail::types::{
    is_valid_mailbox_name, looks_like_html, qualify_address, qualify_destination,
    resolve_domain, split_address,
};
use directadmin_mail::{Destination, Forwarder, OperationResult};

#[test]
fn test_forwarder_ordering_is_by_address() {
    let mut forwarders = vec![
        Forwarder {
            address: "zeta@example.com".to_string(),
            destination: "a@example.com".to_string(),
        },
        Forwarder {
            address: "alpha@example.com".to_string(),
            destination: "z@example.com".to_string(),
        },
    ];
    forwarders.sort();
    assert_eq!(forwarders[0].alias(), "alpha");
    assert_eq!(forwarders[1].alias(), "zeta");
}

#[test]
fn test_sentinels_are_not_qualified() {
    for sentinel in [":blackhole:", ":fail:", "|/usr/local/bin/autoresponder"] {
        let dest = Destination::classify(sentinel);
        assert!(dest.is_sentinel(), "{sentinel}");
        assert_eq!(dest.qualify("example.com"), sentinel);
    }
}

#[test]
fn test_pipe_with_at_sign_is_sentinel() {
    let dest = Destination::classify("|/bin/mail -s hi ops@other.org");
    assert!(dest.is_sentinel());
}

#[test]
fn test_destination_display() {
    assert_eq!(Destination::classify("support").to_string(), "support");
    assert_eq!(Destination::classify("ops@other.org").to_string(), "ops@other.org");
}

#[test]
fn test_qualify_destination_examples() {
    assert_eq!(qualify_destination("support", "example.com"), "support@example.com");
    assert_eq!(qualify_destination(":blackhole:", "example.com"), ":blackhole:");
    assert_eq!(qualify_destination("ops@other.org", "example.com"), "ops@other.org");
    assert_eq!(
        qualify_destination(" a , b@other.org ", "example.com"),
        "a@example.com,b@other.org"
    );
    assert_eq!(qualify_destination(" , ", "example.com"), "");
}

#[test]
fn test_address_helpers() {
    assert_eq!(split_address(" info@example.com "), ("info", Some("example.com")));
    assert_eq!(qualify_address(" info ", "example.com"), "info@example.com");
}

#[test]
fn test_mailbox_validation_rejects_markup() {
    assert!(is_valid_mailbox_name("alice@example.com"));
    assert!(is_valid_mailbox_name("a_b-c.d%e+f"));
    for bad in ["<td>", "\"quoted\"", "it's", "a b", "alice@", "@example.com"] {
        assert!(!is_valid_mailbox_name(bad), "{bad}");
    }
    assert!(looks_like_html("a'b"));
}

#[test]
fn test_resolve_domain_trims_explicit() {
    assert_eq!(
        resolve_domain(Some(" example.com "), None, &[]),
        Some("example.com".to_string())
    );
    assert_eq!(resolve_domain(None, Some("user@"), &[]), None);
}

#[test]
fn test_operation_result_failed_keeps_message() {
    let result: OperationResult<Vec<Forwarder>> = OperationResult::failed("Nope");
    assert!(!result.is_success());
    assert_eq!(result.message, "Nope");
    assert!(result.value.is_empty());
}
