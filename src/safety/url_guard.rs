// src/safety/url_guard.rs
// =============================================================================
// This module decides whether a URL is safe for the server to fetch.
//
// The page relay fetches arbitrary URLs on behalf of a browser. Without a
// guard, a caller could point it at internal services (cloud metadata,
// databases on the private network, the relay host itself). This is the
// SSRF guard.
//
// A URL is blocked when:
// - it does not parse (fail-closed)
// - its scheme is not http or https
// - its host is localhost, 127.0.0.1, ::1 or 0.0.0.0
// - its host is a literal IPv4 address inside a private/link-local range
//
// Known gap: only literal IPv4 hosts are range-checked. A hostname that
// resolves to a private address (DNS rebinding) passes, and IPv6 ranges
// other than the loopback literal are not checked.
//
// Rust concepts:
// - Enums with data: Verdict carries the reason for blocking
// - Pattern matching on url::Host to tell domains from IP literals
// =============================================================================

use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use url::{Host, Url};

/// Hostnames that always point back at the relay machine.
const LOOPBACK_NAMES: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]", "0.0.0.0"];

// Private and special-purpose IPv4 networks, as (network, prefix length)
const BLOCKED_V4_RANGES: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
];

/// Why a URL was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The input is not a valid absolute URL
    Unparsable,
    /// Scheme other than http/https (ftp:, file:, data:, ...)
    Scheme,
    /// http(s) URL without a host
    MissingHost,
    /// localhost or a loopback/unspecified literal
    LoopbackHost,
    /// Literal IPv4 address in a private or link-local network
    PrivateRange,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BlockReason::Unparsable => "URL could not be parsed",
            BlockReason::Scheme => "only http and https URLs are allowed",
            BlockReason::MissingHost => "URL has no host",
            BlockReason::LoopbackHost => "loopback hosts are not allowed",
            BlockReason::PrivateRange => "private network addresses are not allowed",
        };
        f.write_str(text)
    }
}

/// The outcome of checking a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    Blocked(BlockReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }
}

// Checks a raw URL string
//
// Parsing failures never escape: an unparsable string is simply Blocked.
pub fn check_url(raw: &str) -> Verdict {
    match Url::parse(raw.trim()) {
        Ok(url) => check_parsed(&url),
        Err(_) => Verdict::Blocked(BlockReason::Unparsable),
    }
}

// Checks an already-parsed URL
//
// Also used by the page relay's redirect policy, which receives each
// redirect target as a Url.
pub fn check_parsed(url: &Url) -> Verdict {
    if !matches!(url.scheme(), "http" | "https") {
        return Verdict::Blocked(BlockReason::Scheme);
    }

    let host = match url.host() {
        Some(host) => host,
        None => return Verdict::Blocked(BlockReason::MissingHost),
    };

    // host_str() is already lowercased by the url crate
    if let Some(name) = url.host_str() {
        if LOOPBACK_NAMES.contains(&name) {
            return Verdict::Blocked(BlockReason::LoopbackHost);
        }
    }

    match host {
        Host::Ipv4(addr) if is_blocked_ipv4(addr) => Verdict::Blocked(BlockReason::PrivateRange),
        Host::Ipv6(addr) if addr.is_loopback() => Verdict::Blocked(BlockReason::LoopbackHost),
        _ => Verdict::Allowed,
    }
}

// Adds "http://" to inputs that carry no scheme at all
//
// "example.com/page" becomes "http://example.com/page", but
// "ftp://example.com" is left alone so the guard can reject it. Only the
// leading characters count: "example.com/?next=https://x" has no scheme.
pub fn with_default_scheme(raw: &str) -> String {
    let trimmed = raw.trim();
    if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

// True when `input` opens with `scheme://`, where scheme is
// ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn has_scheme(input: &str) -> bool {
    let scheme = match input.split_once("://") {
        Some((scheme, _)) => scheme,
        None => return false,
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn is_blocked_ipv4(addr: Ipv4Addr) -> bool {
    let value = u32::from(addr);
    BLOCKED_V4_RANGES.iter().any(|(network, prefix)| {
        let mask = u32::MAX << (32 - u32::from(*prefix));
        value & mask == u32::from(*network) & mask
    })
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why parse with the url crate instead of string matching?
//    - "http://0x7f.1/" and "http://127.1/" are both 127.0.0.1
//    - Url::parse normalizes these forms, so the check sees the real address
//    - host_str() is also lowercased, so "LOCALHOST" matches "localhost"
//
// 2. How does the range check work?
//    - An IPv4 address is just a u32
//    - A /12 prefix keeps the top 12 bits: mask = u32::MAX << (32 - 12)
//    - Two addresses are in the same network when (a & mask) == (b & mask)
//
// 3. What does "fail-closed" mean?
//    - When in doubt, refuse: a URL we cannot parse is never fetched
//
// 4. Why not just search for "://" anywhere?
//    - Query strings often carry full URLs: "site.com/login?next=https://..."
//    - split_once("://") takes the FIRST occurrence, so everything before it
//      must look like a scheme ("site.com/login?next=https" does not, the
//      '/' and '?' are not scheme characters)
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn is_fetchable(raw: &str) -> bool {
        check_url(raw).is_allowed()
    }

    #[test]
    fn test_blocks_private_ranges() {
        for url in [
            "http://10.1.2.3",
            "http://172.16.0.5",
            "http://172.31.255.255",
            "http://192.168.1.1",
            "http://169.254.1.1",
            "http://0.1.2.3/",
        ] {
            assert_eq!(
                check_url(url),
                Verdict::Blocked(BlockReason::PrivateRange),
                "{} should be blocked",
                url
            );
        }
    }

    #[test]
    fn test_range_edges_are_public() {
        assert!(is_fetchable("http://172.15.255.255"));
        assert!(is_fetchable("http://172.32.0.1"));
        assert!(is_fetchable("http://192.169.0.1"));
        assert!(is_fetchable("http://11.0.0.1"));
    }

    #[test]
    fn test_blocks_loopback_names() {
        assert_eq!(check_url("http://localhost"), Verdict::Blocked(BlockReason::LoopbackHost));
        assert_eq!(check_url("http://LOCALHOST:8080/x"), Verdict::Blocked(BlockReason::LoopbackHost));
        assert_eq!(check_url("http://127.0.0.1"), Verdict::Blocked(BlockReason::LoopbackHost));
        assert_eq!(check_url("http://[::1]/"), Verdict::Blocked(BlockReason::LoopbackHost));
        assert!(!is_fetchable("http://0.0.0.0"));
    }

    #[test]
    fn test_blocks_other_schemes() {
        assert_eq!(check_url("ftp://example.com"), Verdict::Blocked(BlockReason::Scheme));
        assert_eq!(check_url("file:///etc/passwd"), Verdict::Blocked(BlockReason::Scheme));
        assert!(!is_fetchable("javascript:alert(1)"));
    }

    #[test]
    fn test_malformed_is_blocked() {
        assert_eq!(check_url("not a url"), Verdict::Blocked(BlockReason::Unparsable));
        assert_eq!(check_url(""), Verdict::Blocked(BlockReason::Unparsable));
        assert_eq!(check_url("http://"), Verdict::Blocked(BlockReason::Unparsable));
        assert!(!is_fetchable("http://[zz::1]/"));
    }

    #[test]
    fn test_allows_public_targets() {
        assert!(is_fetchable("http://8.8.8.8"));
        assert!(is_fetchable("https://example.com"));
        assert!(is_fetchable("https://example.com:8443/path?q=1"));
    }

    #[test]
    fn test_default_scheme() {
        assert_eq!(with_default_scheme("example.com/a"), "http://example.com/a");
        assert_eq!(with_default_scheme(" https://example.com "), "https://example.com");
        assert_eq!(with_default_scheme("ftp://example.com"), "ftp://example.com");
        assert!(!is_fetchable(&with_default_scheme("localhost:3000")));
    }

    #[test]
    fn test_default_scheme_ignores_urls_in_query() {
        let target = with_default_scheme("example.com/login?next=https://example.com/home");
        assert_eq!(target, "http://example.com/login?next=https://example.com/home");
        assert!(is_fetchable(&target));

        assert_eq!(
            with_default_scheme("example.com/r/https://other.org"),
            "http://example.com/r/https://other.org"
        );
        assert_eq!(with_default_scheme("svn+ssh://host/repo"), "svn+ssh://host/repo");
        assert_eq!(with_default_scheme("1abc://host"), "http://1abc://host");
    }
}
