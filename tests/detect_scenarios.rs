// tests/detect_scenarios.rs
//
// End-to-end detection through the public façade: trusted domain, obvious
// phishing, document text, threshold override and multi-link scans.
// The detector is trained once per test binary on a small synthetic set.

use once_cell::sync::OnceCell;
use tempfile::TempDir;

use phishguard_engine::engine::TRUST_DAMPENING;
use phishguard_engine::{
    Detector, InputKind, ModelLifecycle, ModelStore, Settings, TrainingParams, Verdict,
};

static DETECTOR: OnceCell<(TempDir, Detector)> = OnceCell::new();

fn small_params() -> TrainingParams {
    TrainingParams {
        synthetic_samples: 400,
        forest_trees: 10,
        forest_max_depth: 8,
        linear_epochs: 200,
        ..TrainingParams::default()
    }
}

fn detector() -> &'static Detector {
    &DETECTOR
        .get_or_init(|| {
            let dir = tempfile::tempdir().expect("tempdir");
            let store = ModelStore::new(dir.path().join("ensemble_model.json"));
            let lifecycle = ModelLifecycle::open(store, small_params()).expect("lifecycle");
            (dir, Detector::with_lifecycle(lifecycle))
        })
        .1
}

#[tokio::test]
async fn trusted_domain_is_legitimate_and_dampened() {
    let r = detector()
        .detect("https://openai.com/", &Settings::default(), None)
        .await;
    assert!(r.trusted);
    assert_eq!(r.kind, InputKind::Url);
    assert_eq!(r.domain, "openai.com");
    assert_eq!(r.verdict, Verdict::Legitimate);
    assert!(r.final_score <= TRUST_DAMPENING + 1e-9);
    assert!(r.reasons.iter().any(|x| x.contains("openai.com")));
}

#[tokio::test]
async fn trusted_docs_page_is_never_phishing() {
    let r = detector()
        .detect("https://openai.com/docs", &Settings::default(), None)
        .await;
    assert!(r.trusted);
    assert_ne!(r.verdict, Verdict::Phishing);
}

#[tokio::test]
async fn synthetic_template_phishing_url() {
    let r = detector()
        .detect("http://secure-login347.com/ax7f9k2m", &Settings::default(), None)
        .await;
    assert_eq!(r.verdict, Verdict::Phishing, "{r:#?}");
    assert_eq!(r.threshold_used, 0.6);
}

#[tokio::test]
async fn obvious_phishing_url() {
    let r = detector()
        .detect(
            "http://secure-login-paypal.verify-account.xyz/update?user=1",
            &Settings::default(),
            None,
        )
        .await;
    assert!(!r.trusted);
    assert_eq!(r.verdict, Verdict::Phishing, "{r:#?}");
    assert!(r.final_score >= 0.6);
    assert!(r.reasons.iter().any(|x| x.starts_with("Suspicious terms:")));
    assert_eq!(r.per_model.len(), 3);
    assert!(["lr", "rf", "nb"].iter().all(|m| r.per_model.contains_key(*m)));
}

#[tokio::test]
async fn document_text_is_file_kind() {
    let r = detector()
        .detect(
            "Dear customer, please verify your account password urgently",
            &Settings::default(),
            None,
        )
        .await;
    assert_eq!(r.kind, InputKind::File);
    assert_eq!(r.domain, "(file content)");
    assert!(!r.trusted);
    assert!(r.heuristic_score > 0.0);
    assert!((0.0..=1.0).contains(&r.final_score));
}

#[test]
fn threshold_override_takes_precedence() {
    let settings = Settings::default();
    let input = "http://secure-login-paypal.verify-account.xyz/update?user=1";
    let r = detector().score(input, &settings, Some(1.0));
    assert_eq!(r.threshold_used, 1.0);
    if r.final_score < 1.0 {
        assert_ne!(r.verdict, Verdict::Phishing);
    }

    let lax = detector().score(input, &settings, Some(0.0));
    assert_eq!(lax.verdict, Verdict::Phishing);
}

#[test]
fn raising_threshold_never_promotes_to_phishing() {
    let input = "http://free-gift.example.top/winner";
    let mut last = Verdict::Phishing;
    for step in 0..=10 {
        let t = f64::from(step) / 10.0;
        let v = detector().score(input, &Settings::default(), Some(t)).verdict;
        if last != Verdict::Phishing {
            assert_ne!(v, Verdict::Phishing, "threshold {t}");
        }
        last = v;
    }
}

#[test]
fn reported_input_is_trimmed() {
    let r = detector().score("  \thttps://github.com/docs \n", &Settings::default(), None);
    assert_eq!(r.input, "https://github.com/docs");
    assert_eq!(r.domain, "github.com");
}

#[test]
fn same_input_same_scores() {
    let s = Settings::default();
    let a = detector().score("http://bank-update77.com/a1b2c3d4", &s, None);
    let b = detector().score("http://bank-update77.com/a1b2c3d4", &s, None);
    assert_eq!(a.final_score, b.final_score);
    assert_eq!(a.per_model, b.per_model);
    assert_eq!(a.reasons, b.reasons);
}

#[test]
fn trusting_a_domain_never_raises_its_score() {
    let input = "http://login.mybank-secure.com/verify";
    let plain = detector().score(input, &Settings::default(), None);
    let trusted = detector().score(
        input,
        &Settings::default().with_trusted("mybank-secure.com"),
        None,
    );
    assert!(trusted.trusted);
    assert!(trusted.final_score <= plain.final_score * TRUST_DAMPENING + 1e-3);
}

#[test]
fn serialized_result_shape() {
    let r = detector().score("https://github.com/docs", &Settings::default(), None);
    let v = serde_json::to_value(&r).unwrap();
    for key in [
        "input",
        "domain",
        "type",
        "ml_probability",
        "heuristic_score",
        "final_score",
        "verdict",
        "threshold",
        "trusted",
        "reasons",
        "per_model",
        "timestamp",
    ] {
        assert!(v.get(key).is_some(), "missing {key}");
    }
    assert_eq!(v["type"], "url");
    assert_eq!(r.timestamp.len(), "2025-01-01 00:00:00".len());
}

#[tokio::test]
async fn scan_text_detects_each_distinct_link() {
    let text = "Hi,\nreset here: http://login-verify.tk/reset and docs at https://github.com/docs.\n\
                Again: http://login-verify.tk/reset";
    let report = detector().scan_text(text, &Settings::default(), None).await;
    assert_eq!(report.url_count, 2);
    assert_eq!(report.total_scanned, 2);
    assert_eq!(report.results[0].input, "http://login-verify.tk/reset");
    assert_eq!(report.results[1].input, "https://github.com/docs");
    let phishing = report
        .results
        .iter()
        .filter(|r| r.verdict == Verdict::Phishing)
        .count();
    assert_eq!(report.phishing_detected, phishing);
    let expected = if phishing > 0 {
        Verdict::Phishing
    } else {
        Verdict::Legitimate
    };
    assert_eq!(report.verdict, expected);
}

#[tokio::test]
async fn scan_text_without_links_scores_the_text() {
    let report = detector()
        .scan_text("Quarterly report attached. Nothing else.", &Settings::default(), None)
        .await;
    assert_eq!(report.url_count, 0);
    assert_eq!(report.total_scanned, 1);
    assert_eq!(report.results[0].kind, InputKind::File);

    let empty = detector().scan_text("   ", &Settings::default(), None).await;
    assert_eq!(empty.total_scanned, 0);
    assert_eq!(empty.verdict, Verdict::Legitimate);
}
