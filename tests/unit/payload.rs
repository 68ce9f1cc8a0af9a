//! Unit tests for DirectAdmin response classification.

use directadmin_mail::directadmin::api::{accept, MissingErrorKey};
use directadmin_mail::directadmin::payload::percent_decode;
use directadmin_mail::directadmin::{classify, DirectAdminError, PayloadValue, ResponseShape};

fn payload_of(shape: &ResponseShape) -> &directadmin_mail::directadmin::Payload {
    shape
        .payload()
        .unwrap_or_else(|| panic!("expected a payload, got {:?}", shape))
}

#[test]
fn test_repeated_keys_become_ordered_list() {
    let shape = classify(None, "k=a&k=b&k=c");
    assert_eq!(
        payload_of(&shape).get("k").map(PayloadValue::values),
        Some(vec!["a", "b", "c"])
    );
}

#[test]
fn test_success_report_is_not_an_error() {
    let shape = classify(Some("text/plain"), "error=0&text=Forwarder%20created");
    let payload = payload_of(&shape);
    assert_eq!(payload.error_code(), Some("0"));
    assert_eq!(payload.get_str("text"), Some("Forwarder created"));
    assert!(accept(shape, MissingErrorKey::CheckIndicators).is_ok());
}

#[test]
fn test_error_code_is_failure() {
    match accept(
        classify(None, "error=2&text=Invalid%20domain"),
        MissingErrorKey::Success,
    ) {
        Err(DirectAdminError::Remote(err)) => {
            assert_eq!(err.code, "2");
            assert!(err.to_string().contains("Invalid domain"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[test]
fn test_doctype_is_malformed_even_on_200() {
    let shape = classify(Some("text/html"), "<!DOCTYPE html><html></html>");
    assert_eq!(shape, ResponseShape::Html);
    assert!(matches!(
        accept(shape, MissingErrorKey::Success),
        Err(DirectAdminError::MalformedResponse)
    ));
}

#[test]
fn test_shape_kinds() {
    assert_eq!(classify(None, "a=1&b=2").kind(), "url-encoded");
    assert_eq!(classify(None, "a=1\nb=2").kind(), "line key/value");
    assert_eq!(classify(None, "a@example.com\nb@example.com").kind(), "line list");
    assert_eq!(classify(None, "hello").kind(), "opaque");
    assert_eq!(classify(None, "").kind(), "empty");
    assert_eq!(classify(Some("application/json"), "{}").kind(), "json");
}

#[test]
fn test_json_scalars_are_stringified() {
    let shape = classify(
        Some("application/json"),
        r#"{"error":1,"text":"Bad","details":null,"quota":12.5}"#,
    );
    let payload = payload_of(&shape);
    assert_eq!(payload.error_code(), Some("1"));
    assert_eq!(payload.get_str("details"), Some(""));
    assert_eq!(payload.get_str("quota"), Some("12.5"));

    let err = payload.remote_error().expect("remote error");
    assert_eq!(err.summary().as_deref(), Some("Bad"));
}

#[test]
fn test_percent_decode_tolerates_bad_utf8() {
    assert_eq!(percent_decode("a%20b"), "a b");
    assert_eq!(percent_decode("%FFok"), "\u{FFFD}ok");
}

#[test]
fn test_missing_error_key_policy() {
    let body = "status=Error%20while%20saving";
    assert!(accept(classify(None, body), MissingErrorKey::Success).is_ok());
    assert!(matches!(
        accept(classify(None, body), MissingErrorKey::CheckIndicators),
        Err(DirectAdminError::UnparseableBody(_))
    ));
}
