//! Fuzz target for token header decoding and header validation.
//!
//! Feeds arbitrary byte strings as tokens to the header decoder and the
//! algorithm and key id checks. Every result must be either `Ok(...)` or
//! `Err(AuthError)`; no input may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tokensmith_authn::{
    jwt::{decode_token_header, username_from_subject},
    validation::{validate_algorithm, validate_kid},
};

fuzz_target!(|data: &[u8]| {
    // Tokens are always UTF-8 strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    let _ = username_from_subject(token);

    if let Ok(header) = decode_token_header(token) {
        let _ = validate_algorithm(&header.alg);
        let _ = validate_kid(header.kid.as_ref());
    }

    // Arbitrary JSON as a key id
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(token) {
        let _ = validate_kid(Some(&value));
    }
});
