//! Heuristic risk rules over the raw input text and its hostname.
//!
//! Rules run in a fixed order. Each triggered rule appends one reason and may
//! only *raise* the running score to its floor (ceiling accumulation, not a
//! sum), so adding signals to an input never lowers its score. Trust is
//! recorded here but dampening happens later in the combiner.
//!
//! Floors:
//! - suspicious tokens: `min(0.9, 0.2 + 0.15 * ln(1 + hits))`
//! - non-ASCII 0.45, zero-width 0.6, punycode 0.95
//! - IP-literal host 0.8, deep subdomains 0.45
//! - high entropy 0.5, `@` 0.7, many hyphens/underscores 0.4, long input 0.35
//! - lookalike of a trusted domain 0.6, recently registered domain 0.5

use std::collections::BTreeSet;

use serde::Serialize;

use super::signals::{
    count_non_ascii, count_zero_width, has_punycode, is_ip_led, shannon_entropy, split_authority,
    suspicious_tokens,
};
use crate::features::domain_age::registrable_domain;
use crate::settings::{find_trusted, normalize_domain};

pub const TOKEN_BASE: f64 = 0.2;
pub const TOKEN_LOG_SLOPE: f64 = 0.15;
pub const TOKEN_CAP: f64 = 0.9;
pub const NON_ASCII_FLOOR: f64 = 0.45;
pub const ZERO_WIDTH_FLOOR: f64 = 0.6;
pub const PUNYCODE_FLOOR: f64 = 0.95;
pub const IP_HOST_FLOOR: f64 = 0.8;
pub const MAX_SUBDOMAIN_DEPTH: usize = 3;
pub const SUBDOMAIN_FLOOR: f64 = 0.45;
pub const ENTROPY_THRESHOLD: f64 = 4.6;
pub const ENTROPY_MIN_LEN: usize = 20;
pub const ENTROPY_FLOOR: f64 = 0.5;
pub const AT_SIGN_FLOOR: f64 = 0.7;
pub const MAX_SEPARATORS: usize = 4;
pub const SEPARATOR_FLOOR: f64 = 0.4;
pub const LONG_INPUT_CHARS: usize = 75;
pub const LONG_INPUT_FLOOR: f64 = 0.35;
pub const LOOKALIKE_SIMILARITY: f64 = 0.8;
pub const LOOKALIKE_FLOOR: f64 = 0.6;
pub const YOUNG_DOMAIN_DAYS: f64 = 30.0;
pub const YOUNG_DOMAIN_FLOOR: f64 = 0.5;

/// Outcome of the heuristic pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heuristic {
    /// Risk in [0,1].
    pub score: f64,
    /// Human-readable reasons in rule order.
    pub reasons: Vec<String>,
    pub trusted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trusted_domain: Option<String>,
}

/// Running-maximum accumulator.
struct Acc {
    score: f64,
    reasons: Vec<String>,
}

impl Acc {
    fn raise(&mut self, floor: f64, reason: String) {
        self.score = self.score.max(floor);
        self.reasons.push(reason);
    }
}

/// Score `text` (with hostname `host`) against the rule set. Unknown domain age.
pub fn score(text: &str, host: &str, trusted_domains: &BTreeSet<String>) -> Heuristic {
    score_with_age(text, host, trusted_domains, 0.0)
}

/// Same as [`score`], with a known domain age in days (`0.0` = unknown).
pub fn score_with_age(
    text: &str,
    host: &str,
    trusted_domains: &BTreeSet<String>,
    domain_age_days: f64,
) -> Heuristic {
    let host = normalize_domain(host);
    let mut acc = Acc {
        score: 0.0,
        reasons: Vec::new(),
    };

    // 1) Trust (recorded only)
    let trusted_domain = find_trusted(&host, trusted_domains).map(str::to_string);
    if let Some(td) = &trusted_domain {
        acc.reasons
            .push(format!("Domain is in trusted whitelist ({td})"));
    }

    // 2) Suspicious vocabulary
    let mut hits = suspicious_tokens(text);
    if !hits.is_empty() {
        hits.sort_unstable();
        acc.raise(
            token_floor(hits.len()),
            format!("Suspicious terms: {}", hits.join(", ")),
        );
    }

    // 3) Unicode / obfuscation
    if count_non_ascii(text) > 0 {
        acc.raise(NON_ASCII_FLOOR, "Non-ASCII characters present".into());
    }
    if count_zero_width(text) > 0 {
        acc.raise(ZERO_WIDTH_FLOOR, "Zero-width characters detected".into());
    }
    if has_punycode(text) {
        acc.raise(PUNYCODE_FLOOR, "Punycode (xn--) domain marker".into());
    }

    // 4) Host structure
    let ip_host = !host.is_empty()
        && (is_ip_led(&host) || userinfo_is_ip(text));
    if ip_host {
        acc.raise(IP_HOST_FLOOR, "Hostname is an IP address".into());
    } else {
        let depth = host.matches('.').count().saturating_sub(1);
        if depth > MAX_SUBDOMAIN_DEPTH {
            acc.raise(
                SUBDOMAIN_FLOOR,
                format!("Deep subdomain nesting ({depth} levels)"),
            );
        }
    }

    // 5) Randomness
    let len = text.chars().count();
    if len >= ENTROPY_MIN_LEN {
        let h = shannon_entropy(text);
        if h > ENTROPY_THRESHOLD {
            acc.raise(
                ENTROPY_FLOOR,
                format!("High character entropy ({h:.2} bits)"),
            );
        }
    }

    // 6) Syntax tricks
    if text.contains('@') {
        acc.raise(AT_SIGN_FLOOR, "Contains '@' symbol".into());
    }
    let separators = text.matches(['-', '_']).count();
    if separators > MAX_SEPARATORS {
        acc.raise(
            SEPARATOR_FLOOR,
            format!("Many hyphens/underscores ({separators})"),
        );
    }
    if len > LONG_INPUT_CHARS {
        acc.raise(LONG_INPUT_FLOOR, format!("Unusually long input ({len} chars)"));
    }

    // 7) Domain reputation
    if trusted_domain.is_none() && !ip_host {
        if let Some(td) = lookalike_of(&host, trusted_domains) {
            acc.raise(LOOKALIKE_FLOOR, format!("Domain resembles trusted domain {td}"));
        }
    }
    if domain_age_days > 0.0 && domain_age_days <= YOUNG_DOMAIN_DAYS {
        acc.raise(
            YOUNG_DOMAIN_FLOOR,
            format!("Recently registered domain ({domain_age_days:.0} days)"),
        );
    }

    Heuristic {
        score: acc.score.clamp(0.0, 1.0),
        reasons: acc.reasons,
        trusted: trusted_domain.is_some(),
        trusted_domain,
    }
}

/// True when a userinfo segment is an IP (`http://10.0.0.1@evil.example`).
fn userinfo_is_ip(text: &str) -> bool {
    let (userinfo, _) = split_authority(text.trim());
    userinfo.map_or(false, |u| {
        u.split('@')
            .filter_map(|seg| seg.split(':').next())
            .any(|h| !h.is_empty() && is_ip_led(h))
    })
}

/// Logarithmic floor for `hits` distinct suspicious tokens.
pub fn token_floor(hits: usize) -> f64 {
    if hits == 0 {
        return 0.0;
    }
    (TOKEN_BASE + TOKEN_LOG_SLOPE * (1.0 + hits as f64).ln()).min(TOKEN_CAP)
}

/// Trusted entry that `host`'s registrable domain nearly (but not exactly) equals.
fn lookalike_of<'a>(host: &str, trusted_domains: &'a BTreeSet<String>) -> Option<&'a str> {
    let candidate = registrable_domain(host)?;
    trusted_domains
        .iter()
        .map(String::as_str)
        .find(|td| {
            let td_norm = normalize_domain(td);
            td_norm != candidate
                && strsim::normalized_levenshtein(&candidate, &td_norm) >= LOOKALIKE_SIMILARITY
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn trusted() -> BTreeSet<String> {
        Settings::default().trusted_domains
    }

    #[test]
    fn clean_url_scores_zero() {
        let h = score("https://example.org/docs", "example.org", &trusted());
        assert_eq!(h.score, 0.0);
        assert!(h.reasons.is_empty());
        assert!(!h.trusted);
    }

    #[test]
    fn trust_is_recorded_without_lowering() {
        let h = score("https://openai.com/login", "openai.com", &trusted());
        assert!(h.trusted);
        assert_eq!(h.trusted_domain.as_deref(), Some("openai.com"));
        assert!(h.reasons[0].contains("trusted whitelist"));
        assert!((h.score - token_floor(1)).abs() < 1e-12);
    }

    #[test]
    fn token_floor_has_diminishing_returns() {
        let d1 = token_floor(2) - token_floor(1);
        let d2 = token_floor(3) - token_floor(2);
        assert!(d1 > d2 && d2 > 0.0);
        assert!(token_floor(1000) <= TOKEN_CAP);
        assert!(TOKEN_CAP < 1.0);
    }

    #[test]
    fn obfuscation_floors_are_ordered() {
        let t = trusted();
        let non_ascii = score("caf\u{00E9}", "", &t).score;
        let zero_width = score("pay\u{200B}pal", "", &t).score;
        let puny = score("http://xn--pypal-4ve.com", "xn--pypal-4ve.com", &t).score;
        assert!(non_ascii < zero_width && zero_width < puny);
        assert!(puny >= PUNYCODE_FLOOR);
    }

    #[test]
    fn ip_and_subdomains() {
        let t = trusted();
        assert_eq!(score("http://10.0.0.1/", "10.0.0.1", &t).score, IP_HOST_FLOOR);
        let deep = score("http://a.b.c.d.example.com", "a.b.c.d.example.com", &t);
        assert_eq!(deep.score, SUBDOMAIN_FLOOR);
        assert!(deep.reasons[0].contains("4 levels"));
    }

    #[test]
    fn at_sign_and_separators_and_length() {
        let t = trusted();
        assert_eq!(score("http://a.com@b.com", "b.com", &t).score, AT_SIGN_FLOOR);
        assert_eq!(score("a-b-c-d_e_f", "", &t).score, SEPARATOR_FLOOR);
        let long = "a".repeat(LONG_INPUT_CHARS + 1);
        assert_eq!(score(&long, "", &t).score, LONG_INPUT_FLOOR);
    }

    #[test]
    fn high_entropy_text() {
        let t = trusted();
        let h = score("Zq8Xv3Lp0Wk7Ry2Tn5Ms9Hb4Jd6Fg1Cx", "", &t);
        assert_eq!(h.score, ENTROPY_FLOOR);
        assert!(h.reasons[0].starts_with("High character entropy"));
    }

    #[test]
    fn lookalike_domain() {
        let t = trusted();
        let h = score("https://githuub.com/", "githuub.com", &t);
        assert_eq!(h.score, LOOKALIKE_FLOOR);
        assert!(h.reasons.iter().any(|r| r.contains("github.com")));
    }

    #[test]
    fn young_domain() {
        let t = trusted();
        let h = score_with_age("https://example.org/", "example.org", &t, 3.0);
        assert_eq!(h.score, YOUNG_DOMAIN_FLOOR);
        let old = score_with_age("https://example.org/", "example.org", &t, 4000.0);
        assert_eq!(old.score, 0.0);
    }

    #[test]
    fn reasons_follow_rule_order() {
        let t = trusted();
        let h = score("http://verify\u{200B}@1.2.3.4/", "1.2.3.4", &t);
        let idx = |needle: &str| h.reasons.iter().position(|r| r.contains(needle)).unwrap();
        assert!(idx("Suspicious terms") < idx("Zero-width"));
        assert!(idx("Zero-width") < idx("IP address"));
        assert!(idx("IP address") < idx("'@'"));
    }
}
