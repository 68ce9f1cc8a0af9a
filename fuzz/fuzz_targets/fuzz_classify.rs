#![no_main]

use arbitrary::Arbitrary;
use directadmin_mail::directadmin::api::{accept, MissingErrorKey};
use directadmin_mail::directadmin::{classify, ResponseShape};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    json: bool,
    body: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let content_type = input.json.then_some("application/json");
    let shape = classify(content_type, input.body);

    // Classification depends only on its inputs
    assert_eq!(shape, classify(content_type, input.body));

    match &shape {
        ResponseShape::Html => assert!(input.body.trim().starts_with('<')),
        ResponseShape::Empty => assert!(input.body.trim().is_empty()),
        ResponseShape::Opaque(text) => assert_eq!(text.as_str(), text.trim()),
        _ => {}
    }

    if let Some(payload) = shape.payload() {
        if payload.error_code() == Some("0") {
            assert!(payload.remote_error().is_none());
        }
    }

    let _ = accept(shape.clone(), MissingErrorKey::Success);
    let _ = accept(shape, MissingErrorKey::CheckIndicators);
});
