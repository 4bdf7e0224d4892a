//! Static TLD risk table.

/// Risk assigned to TLDs missing from the table.
pub const UNKNOWN_TLD_RISK: f64 = 0.5;

const TLD_RISK: &[(&str, f64)] = &[
    ("com", 0.1),
    ("org", 0.1),
    ("net", 0.15),
    ("edu", 0.05),
    ("gov", 0.05),
    ("mil", 0.05),
    ("io", 0.2),
    ("dev", 0.2),
    ("app", 0.25),
    ("co", 0.3),
    ("uk", 0.15),
    ("de", 0.15),
    ("cz", 0.15),
    ("fr", 0.15),
    ("eu", 0.2),
    ("local", 0.3),
    ("info", 0.6),
    ("biz", 0.6),
    ("online", 0.7),
    ("site", 0.7),
    ("club", 0.7),
    ("live", 0.7),
    ("ru", 0.7),
    ("cn", 0.7),
    ("top", 0.85),
    ("xyz", 0.85),
    ("icu", 0.85),
    ("buzz", 0.85),
    ("zip", 0.9),
    ("mov", 0.9),
    ("tk", 0.95),
    ("ml", 0.95),
    ("ga", 0.95),
    ("cf", 0.95),
    ("gq", 0.95),
];

/// Risk in [0,1] for the last label of `host`.
pub fn tld_risk(host: &str) -> f64 {
    let tld = match host.trim_end_matches('.').rsplit('.').next() {
        Some(t) if !t.is_empty() && host.contains('.') => t.to_ascii_lowercase(),
        _ => return UNKNOWN_TLD_RISK,
    };
    TLD_RISK
        .iter()
        .find(|(t, _)| *t == tld)
        .map(|(_, r)| *r)
        .unwrap_or(UNKNOWN_TLD_RISK)
}
