// src/charset/decode.rs
// =============================================================================
// This module turns a whole response body into UTF-8 text.
//
// Decoding is a two-step result:
// 1. Look up the resolved label with encoding_rs and decode under it
// 2. If the label is unknown (or names the WHATWG "replacement" encoding),
//    decode as UTF-8 instead, replacing invalid bytes with U+FFFD
//
// Neither step can fail: malformed byte sequences become replacement
// characters, so the caller always gets a String back.
// =============================================================================

use encoding_rs::{Encoding, REPLACEMENT, UTF_8};

/// Body text together with the encoding information that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// The decoded body
    pub text: String,
    /// The label that was resolved for the body (kept even on fallback)
    pub charset: String,
    /// True when the label was unusable and UTF-8 was used instead
    pub used_fallback: bool,
}

// Decodes `body` under `label`
//
// A leading byte-order mark for the chosen encoding is stripped.
pub fn decode_body(body: &[u8], label: &str) -> DecodedText {
    let (encoding, used_fallback) = match Encoding::for_label(label.as_bytes()) {
        Some(encoding) if encoding != REPLACEMENT => (encoding, false),
        _ => (UTF_8, true),
    };

    let (text, _had_errors) = encoding.decode_with_bom_removal(body);

    DecodedText {
        text: text.into_owned(),
        charset: label.to_string(),
        used_fallback,
    }
}
