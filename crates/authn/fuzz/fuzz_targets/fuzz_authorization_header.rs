//! Fuzz target for `Authorization` header parsing.
//!
//! Any header value must either yield an optional bearer token that is a
//! suffix of the input, or an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tokensmith_authn::validator::parse_authorization_header;

fuzz_target!(|data: &[u8]| {
    let Ok(header) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(Some(token)) = parse_authorization_header(header) {
        assert!(header.starts_with("Bearer "));
        assert!(header.ends_with(token));
        assert!(!token.is_empty());
    }
});
