//! # Feature Extractor
//! Pure, deterministic mapping `text → FeatureVector` with a fixed schema.
//!
//! Extraction never fails: input that does not parse as a URL yields an empty
//! hostname/path/query and the positional features degrade to zero. Only the
//! optional domain age comes from outside (see [`domain_age`]); it is passed in
//! explicitly and defaults to [`domain_age::NEUTRAL_AGE_DAYS`].

pub mod domain_age;
pub mod tld;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::analyze::signals::{
    char_ratio, count_non_ascii, count_zero_width, has_punycode, is_ip_literal, shannon_entropy,
    split_authority, suspicious_tokens,
};
use crate::error::{EngineError, EngineResult};

pub use domain_age::NEUTRAL_AGE_DAYS;

/// Number of fields in the schema.
pub const FEATURE_COUNT: usize = 22;

/// Ordered feature schema shared by extraction, training and inference.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "url_length",
    "hostname_length",
    "path_length",
    "query_length",
    "count_at",
    "count_dash",
    "count_underscore",
    "count_dot",
    "count_digits",
    "count_slash",
    "count_special",
    "subdomain_depth",
    "has_ip_address",
    "is_https",
    "suspicious_token",
    "num_suspicious_tokens",
    "domain_entropy",
    "tld_risk_score",
    "non_ascii_ratio",
    "zero_width_ratio",
    "has_punycode",
    "domain_age_days",
];

/// Placeholder host used to build the ML vector for plain-text input.
pub const TEXT_PLACEHOLDER_HOST: &str = "textinput.local";

/// Fixed-length numeric vector in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn zeros() -> Self {
        Self {
            values: [0.0; FEATURE_COUNT],
        }
    }

    /// Build from a slice; any length other than [`FEATURE_COUNT`] is a schema error.
    pub fn from_slice(values: &[f64]) -> EngineResult<Self> {
        let values: [f64; FEATURE_COUNT] =
            values
                .try_into()
                .map_err(|_| EngineError::SchemaMismatch {
                    expected: schema_names(),
                    found: (0..values.len()).map(|i| format!("#{i}")).collect(),
                })?;
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// `(name, value)` pairs in schema order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    fn set(&mut self, name: &str, v: f64) {
        if let Some(i) = FEATURE_NAMES.iter().position(|n| *n == name) {
            self.values[i] = v;
        }
    }
}

pub fn schema_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

/// URL components recovered from free-form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: String,
}

/// Parse `text` as a URL, prepending `http://` when no scheme is present.
/// Unparseable input yields empty parts.
pub fn parse_url(text: &str) -> UrlParts {
    let text = text.trim();
    if text.is_empty() {
        return UrlParts::default();
    }
    let candidate = if has_scheme(text) {
        text.to_string()
    } else {
        format!("http://{text}")
    };
    match Url::parse(&candidate) {
        Ok(u) => UrlParts {
            scheme: u.scheme().to_string(),
            host: u
                .host_str()
                .map(|h| h.trim_end_matches('.').to_lowercase())
                .unwrap_or_default(),
            path: u.path().to_string(),
            query: u.query().unwrap_or_default().to_string(),
        },
        Err(_) => UrlParts {
            host: lenient_host(&candidate).unwrap_or_default(),
            ..UrlParts::default()
        },
    }
}

/// Host recovered from an authority the `url` crate rejects because of its
/// userinfo, e.g. a dangling `@` (`http://10.0.0.1@`). Prefers the part after
/// the last `@` and falls back to the userinfo side when that is empty.
fn lenient_host(candidate: &str) -> Option<String> {
    let (userinfo, host_port) = split_authority(candidate);
    let userinfo = userinfo?;
    let host = match strip_port(&host_port) {
        "" => userinfo
            .rsplit('@')
            .next()
            .and_then(|u| u.split(':').next())
            .unwrap_or_default(),
        h => h,
    };
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some(host.trim_end_matches('.').to_lowercase())
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split_inclusive(']').next().unwrap_or(host);
    }
    host.rsplit_once(':').map_or(host, |(h, _)| h)
}

fn has_scheme(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// True if the input should be treated as a URL rather than document text.
pub fn looks_like_url(text: &str) -> bool {
    let t = text.trim();
    let lower = t.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("www.")
        || (!t.is_empty() && !t.chars().any(char::is_whitespace) && t.contains('.'))
}

/// Extract features with an unknown domain age.
pub fn extract(text: &str) -> FeatureVector {
    extract_with_age(text, NEUTRAL_AGE_DAYS)
}

/// Extract features using a domain age obtained by the caller.
pub fn extract_with_age(text: &str, domain_age_days: f64) -> FeatureVector {
    let parts = parse_url(text);
    let host = parts.host.as_str();

    let count = |c: char| text.chars().filter(|&x| x == c).count() as f64;
    let digits = text.chars().filter(char::is_ascii_digit).count();
    let special = text
        .chars()
        .filter(|c| matches!(c, '?' | '=' | '&' | '%' | '~' | '+' | '!' | '*' | ',' | ';' | '$'))
        .count();
    let dots_in_host = host.matches('.').count();
    let tokens = suspicious_tokens(text);
    let ip = !host.is_empty() && is_ip_literal(host);

    let mut v = FeatureVector::zeros();
    v.set("url_length", text.chars().count() as f64);
    v.set("hostname_length", host.chars().count() as f64);
    v.set("path_length", parts.path.trim_start_matches('/').chars().count() as f64);
    v.set("query_length", parts.query.chars().count() as f64);
    v.set("count_at", count('@'));
    v.set("count_dash", count('-'));
    v.set("count_underscore", count('_'));
    v.set("count_dot", count('.'));
    v.set("count_digits", digits as f64);
    v.set("count_slash", count('/'));
    v.set("count_special", special as f64);
    v.set(
        "subdomain_depth",
        if ip { 0.0 } else { dots_in_host.saturating_sub(1) as f64 },
    );
    v.set("has_ip_address", bool_f(ip));
    v.set("is_https", bool_f(parts.scheme == "https"));
    v.set("suspicious_token", bool_f(!tokens.is_empty()));
    v.set("num_suspicious_tokens", tokens.len() as f64);
    v.set("domain_entropy", shannon_entropy(host));
    v.set(
        "tld_risk_score",
        if host.is_empty() || ip {
            0.0
        } else {
            tld::tld_risk(host)
        },
    );
    v.set("non_ascii_ratio", char_ratio(count_non_ascii(text), text));
    v.set("zero_width_ratio", char_ratio(count_zero_width(text), text));
    v.set("has_punycode", bool_f(has_punycode(text)));
    v.set(
        "domain_age_days",
        if domain_age_days.is_finite() && domain_age_days > 0.0 {
            domain_age_days
        } else {
            NEUTRAL_AGE_DAYS
        },
    );
    v
}

fn bool_f(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
