#![no_main]

use directadmin_mail::directadmin::payload::percent_decode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Decoding never fails, whatever the escapes decode to
    let decoded = percent_decode(data);

    // Text without escapes is returned unchanged
    if !data.contains('%') {
        assert_eq!(decoded, data);
    }

    // Encoding then decoding restores the input
    let encoded = urlencoding::encode(data);
    assert_eq!(percent_decode(&encoded), data);
});
