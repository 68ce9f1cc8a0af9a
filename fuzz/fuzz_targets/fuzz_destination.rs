#![no_main]

use directadmin_mail::types::qualify_destination;
use directadmin_mail::Destination;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let domain = "example.com";

    match Destination::classify(data) {
        Destination::Sentinel(s) | Destination::Address(s) => {
            assert_eq!(Destination::classify(data).qualify(domain), s);
        }
        Destination::Local(user) => {
            assert_eq!(
                Destination::classify(data).qualify(domain),
                format!("{}@{}", user, domain)
            );
        }
    }

    // Qualifying an already qualified list changes nothing
    let once = qualify_destination(data, domain);
    assert_eq!(qualify_destination(&once, domain), once);
});
