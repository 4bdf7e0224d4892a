//! Text signals shared by feature extraction and the heuristic rules.
//!
//! Everything here is pure and allocation-light; regexes are compiled once.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Fixed suspicious-token vocabulary (matched case-insensitively as substrings).
pub const SUSPICIOUS_TOKENS: &[&str] = &[
    "login", "secure", "update", "verify", "account", "bank", "confirm", "reset", "billing",
    "signin", "password", "urgent", "ebay", "paypal", "free", "prize", "winner",
];

pub const ZERO_WIDTH_CHARS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{1,3}\.){3}\d{1,3}$").expect("ipv4 regex"));

// Dotted quad with letters glued onto the last octet, e.g. `1.2.3.4verify`.
static IPV4_LED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{1,3}\.){3}\d{1,3}[a-z_-]").expect("ipv4-led regex"));

/// Distinct vocabulary tokens present in `text`, in vocabulary order.
pub fn suspicious_tokens(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    SUSPICIOUS_TOKENS
        .iter()
        .copied()
        .filter(|tok| lower.contains(tok))
        .collect()
}

/// True if the host is an IPv4 literal or a bracketed IPv6 literal.
pub fn is_ip_literal(host: &str) -> bool {
    if host.starts_with('[') || host.parse::<std::net::Ipv6Addr>().is_ok() {
        return true;
    }
    IPV4_RE.is_match(host)
}

/// True for IP literals and for hosts that are a dotted quad with text glued
/// onto the last octet.
pub fn is_ip_led(host: &str) -> bool {
    is_ip_literal(host) || IPV4_LED_RE.is_match(&host.to_ascii_lowercase())
}

/// Splits the authority of `text` (scheme optional) into userinfo and
/// host-with-port. The authority ends at the first `/`, `?` or `#`; userinfo
/// is everything before the last `@`. Zero-width characters are dropped.
pub fn split_authority(text: &str) -> (Option<String>, String) {
    let rest = text.split_once("://").map_or(text, |(_, rest)| rest);
    let authority: String = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !ZERO_WIDTH_CHARS.contains(c))
        .collect();
    match authority.rsplit_once('@') {
        Some((userinfo, host)) => (Some(userinfo.to_string()), host.to_string()),
        None => (None, authority),
    }
}

pub fn count_non_ascii(text: &str) -> usize {
    text.chars().filter(|c| !c.is_ascii()).count()
}

pub fn count_zero_width(text: &str) -> usize {
    text.chars().filter(|c| ZERO_WIDTH_CHARS.contains(c)).count()
}

pub fn has_punycode(text: &str) -> bool {
    text.to_ascii_lowercase().contains("xn--")
}

/// Fraction of chars matching a predicate; 0.0 for empty input.
pub fn char_ratio(count: usize, text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Shannon entropy in bits per character.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut freq: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for ch in text.chars() {
        *freq.entry(ch).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    freq.values()
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_split_on_last_at() {
        assert_eq!(
            split_authority("http://a@b@10.0.0.1:8080/x?y"),
            (Some("a@b".to_string()), "10.0.0.1:8080".to_string())
        );
        assert_eq!(
            split_authority("http://10.0.0.1@\u{200B}"),
            (Some("10.0.0.1".to_string()), String::new())
        );
        assert_eq!(split_authority("example.com/path"), (None, "example.com".to_string()));
    }

    #[test]
    fn tokens_are_case_insensitive_and_distinct() {
        let hits = suspicious_tokens("LOGIN here, login there, Verify now");
        assert_eq!(hits, vec!["login", "verify"]);
    }

    #[test]
    fn ip_literals() {
        assert!(is_ip_literal("192.168.0.1"));
        assert!(is_ip_literal("[::1]"));
        assert!(!is_ip_literal("example.com"));
        assert!(!is_ip_literal("1.2.3.4.example.com"));
        assert!(is_ip_led("1.2.3.4verify"));
        assert!(!is_ip_led("1.2.3.4.example.com"));
    }

    #[test]
    fn entropy_bounds() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
        assert!((shannon_entropy("ab") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn obfuscation_counters() {
        let t = "pay\u{200B}pal\u{00E9}";
        assert_eq!(count_zero_width(t), 1);
        assert_eq!(count_non_ascii(t), 2);
        assert!(has_punycode("http://XN--pypal-4ve.com"));
    }
}
