// src/charset/mod.rs
// =============================================================================
// Charset resolution and decoding for fetched HTML.
//
// Submodules:
// - detect: picks a charset label (header, <meta>, default)
// - decode: decodes the full body under that label, with UTF-8 fallback
// =============================================================================

mod decode;
mod detect;

pub use decode::{decode_body, DecodedText};
pub use detect::resolve_charset;

// Resolves the charset of a response body and decodes all of it
//
// Parameters:
//   content_type: the upstream Content-Type header, if any
//   body: the complete body bytes
pub fn decode_html(content_type: Option<&str>, body: &[u8]) -> DecodedText {
    let label = resolve_charset(content_type, body);
    decode_body(body, &label)
}
