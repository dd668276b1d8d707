// src/charset/detect.rs
// =============================================================================
// This module works out which character encoding a fetched page uses.
//
// Precedence (first match wins):
// 1. charset= parameter of the Content-Type response header
// 2. <meta charset="..."> in the first 2048 bytes of the body
// 3. <meta http-equiv="content-type" content="...; charset=..."> in the same window
// 4. utf-8
//
// The <meta> scan is a best-effort heuristic. The window is decoded byte for
// byte (every byte becomes one char, nothing is lost) and handed to `scraper`,
// which tolerates truncated markup. Obfuscated or unusual HTML can make it
// miss the declaration; we then fall through to the default.
//
// Rust concepts:
// - Option chaining with and_then / find_map
// - lazy_static: build the CSS selectors once instead of per call
// =============================================================================

use scraper::{Html, Selector};

/// Number of body bytes scanned for <meta> declarations.
pub const HEAD_WINDOW: usize = 2048;

/// Label used when nothing else declares an encoding.
pub const DEFAULT_CHARSET: &str = "utf-8";

lazy_static::lazy_static! {
    static ref META_CHARSET: Selector =
        Selector::parse("meta[charset]").expect("meta[charset] is a valid selector");
    static ref META_HTTP_EQUIV: Selector =
        Selector::parse("meta[http-equiv][content]").expect("meta[http-equiv] is a valid selector");
}

// Resolves the charset label for a response
//
// Parameters:
//   content_type: the Content-Type header value, if the upstream sent one
//   head: the start of the body (anything past HEAD_WINDOW is ignored)
//
// Returns: a lowercase label; never fails
pub fn resolve_charset(content_type: Option<&str>, head: &[u8]) -> String {
    if let Some(label) = content_type.and_then(charset_from_content_type) {
        return label;
    }

    let window = &head[..head.len().min(HEAD_WINDOW)];
    let text: String = window.iter().map(|&b| char::from(b)).collect();
    let document = Html::parse_document(&text);

    meta_charset(&document)
        .or_else(|| meta_http_equiv(&document))
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

// Pulls the charset parameter out of a Content-Type style value
//
// Example:
//   "text/html; Charset=\"GB2312\"" -> Some("gb2312")
//   "text/html" -> None
pub fn charset_from_content_type(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (name, label) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            normalize_label(label)
        } else {
            None
        }
    })
}

fn meta_charset(document: &Html) -> Option<String> {
    document
        .select(&META_CHARSET)
        .find_map(|el| el.value().attr("charset").and_then(normalize_label))
}

fn meta_http_equiv(document: &Html) -> Option<String> {
    document.select(&META_HTTP_EQUIV).find_map(|el| {
        let equiv = el.value().attr("http-equiv")?;
        if !equiv.trim().eq_ignore_ascii_case("content-type") {
            return None;
        }
        el.value().attr("content").and_then(charset_from_content_type)
    })
}

fn normalize_label(raw: &str) -> Option<String> {
    let label = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_ascii_lowercase();
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_wins_over_meta() {
        let body = br#"<html><head><meta charset="utf-8"></head></html>"#;
        let label = resolve_charset(Some("text/html; charset=gb2312"), body);
        assert_eq!(label, "gb2312");
    }

    #[test]
    fn test_meta_charset_without_header() {
        let body = br#"<!doctype html><html><head><meta charset="big5"><title>x</title></head>"#;
        assert_eq!(resolve_charset(None, body), "big5");
        assert_eq!(resolve_charset(Some("text/html"), body), "big5");
    }

    #[test]
    fn test_meta_http_equiv() {
        let body = br#"<head><META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=Shift_JIS"></head>"#;
        assert_eq!(resolve_charset(None, body), "shift_jis");
    }

    #[test]
    fn test_meta_charset_beats_http_equiv() {
        let body = br#"<head>
            <meta http-equiv="content-type" content="text/html; charset=euc-kr">
            <meta charset="windows-1251">
        </head>"#;
        assert_eq!(resolve_charset(None, body), "windows-1251");
    }

    #[test]
    fn test_defaults_to_utf8() {
        assert_eq!(resolve_charset(None, b"<html><body>hi</body></html>"), "utf-8");
        assert_eq!(resolve_charset(None, b""), "utf-8");
    }

    #[test]
    fn test_meta_outside_window_is_ignored() {
        let mut body = vec![b' '; HEAD_WINDOW];
        body.extend_from_slice(br#"<meta charset="big5">"#);
        assert_eq!(resolve_charset(None, &body), "utf-8");
    }

    #[test]
    fn test_content_type_parameter_parsing() {
        assert_eq!(
            charset_from_content_type("text/html; Charset=\"ISO-8859-1\"").as_deref(),
            Some("iso-8859-1")
        );
        assert_eq!(charset_from_content_type("text/html; charset="), None);
        assert_eq!(charset_from_content_type("charset=utf-8"), None);
    }
}
