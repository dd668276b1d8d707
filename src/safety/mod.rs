// src/safety/mod.rs
// =============================================================================
// URL safety checks shared by the relays.
//
// Submodules:
// - url_guard: SSRF guard deciding whether a URL may be fetched server-side
// =============================================================================

mod url_guard;

pub use url_guard::{check_parsed, check_url, with_default_scheme, BlockReason, Verdict};
