// tests/heuristic_properties.rs
//
// Pure-function properties of the feature extractor and the heuristic scorer.

use std::collections::BTreeSet;

use phishguard_engine::analyze::{score, token_floor};
use phishguard_engine::features::{extract, looks_like_url, parse_url, FEATURE_COUNT};
use phishguard_engine::settings::Settings;

fn trusted() -> BTreeSet<String> {
    Settings::default().trusted_domains
}

fn heur(text: &str) -> f64 {
    let host = if looks_like_url(text) {
        parse_url(text).host
    } else {
        String::new()
    };
    score(text, &host, &trusted()).score
}

#[test]
fn extraction_is_deterministic_and_fixed_length() {
    for input in [
        "https://openai.com/",
        "http://192.168.0.1/login",
        "plain words with no url",
        "",
        "http://xn--pple-43d.com/",
    ] {
        let a = extract(input);
        assert_eq!(a.as_slice().len(), FEATURE_COUNT);
        assert_eq!(a, extract(input));
        assert!(a.as_slice().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn appending_risk_signals_never_lowers_the_score() {
    let base = "http://example.com/home";
    let steps = [
        "http://example.com/home?next=login",
        "http://example.com/home?next=login&verify=1",
        "http://example.com/home?next=login&verify=1&u=me@x",
        "http://example.com/home?next=login&verify=1&u=me@x&a-b-c-d-e-f",
    ];
    let mut last = heur(base);
    for s in steps {
        let now = heur(s);
        assert!(now >= last, "{s}: {now} < {last}");
        last = now;
    }
}

#[test]
fn at_sign_then_zero_width_then_token_never_lowers() {
    let mut text = String::from("http://shop.example.net/cart");
    let mut last = heur(&text);
    for extra in ["@", "\u{200B}", "verify"] {
        text.push_str(extra);
        let now = heur(&text);
        assert!(now >= last, "after {extra:?}: {now} < {last}");
        last = now;
    }
}

#[test]
fn ip_host_keeps_its_floor_when_text_is_appended() {
    let base = heur("http://192.168.1.1");
    assert!(base >= 0.8);
    for longer in [
        "http://192.168.1.1@",
        "http://192.168.1.1@\u{200B}",
        "http://192.168.1.1@verify",
        "http://1.2.3.4verify",
    ] {
        let now = heur(longer);
        assert!(now >= base, "{longer:?}: {now} < {base}");
    }
}

#[test]
fn dangling_at_sign_keeps_the_host() {
    assert_eq!(parse_url("http://192.168.1.1@").host, "192.168.1.1");
    assert_eq!(parse_url("http://paypal.com@").host, "paypal.com");
    assert_eq!(parse_url("http://user@").host, "user");
}

#[test]
fn token_floor_is_monotonic_and_capped() {
    let mut last = 0.0;
    for n in 0..40 {
        let f = token_floor(n);
        assert!(f >= last);
        assert!(f <= 0.9);
        last = f;
    }
}

#[test]
fn individual_rules_fire() {
    assert!(heur("http://192.168.10.5/secure") >= 0.8);
    assert!(heur("http://paypal.com@evil.example/") >= 0.7);
    assert!(heur("http://xn--pypal-4ve.com/") >= 0.95);
    assert!(heur("http://a.b.c.d.e.example.com/") >= 0.45);
    assert!(heur("http://githuh.com/") >= 0.6, "lookalike of github.com");
    assert_eq!(heur("https://docs.python.org/3/"), 0.0);
}

#[test]
fn trust_is_recorded_on_label_boundaries() {
    let t = trusted();
    assert!(score("https://platform.openai.com/x", "platform.openai.com", &t).trusted);
    assert!(!score("https://evilopenai.com/x", "evilopenai.com", &t).trusted);
}
