// tests/concurrent_retrain.rs
//
// Scoring keeps working while a retrain runs, and every result is computed
// entirely from either the old or the new bundle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use phishguard_engine::{Detector, ModelLifecycle, ModelStore, Settings, TrainingParams};

const INPUT: &str = "http://verify-account42.com/q1w2e3r4";

fn small_params() -> TrainingParams {
    TrainingParams {
        synthetic_samples: 200,
        forest_trees: 8,
        forest_max_depth: 6,
        linear_epochs: 100,
        ..TrainingParams::default()
    }
}

#[test]
fn detections_during_retrain_use_exactly_one_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let lifecycle =
        ModelLifecycle::open(ModelStore::new(dir.path().join("model.json")), small_params()).unwrap();
    let detector = Arc::new(Detector::with_lifecycle(lifecycle));
    let settings = Settings::default();

    let before: BTreeMap<String, f64> = detector.score(INPUT, &settings, None).per_model;

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let detector = Arc::clone(&detector);
            let done = Arc::clone(&done);
            let settings = settings.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                loop {
                    let finished = done.load(Ordering::Acquire);
                    seen.push(detector.score(INPUT, &settings, None).per_model);
                    if finished {
                        break;
                    }
                }
                seen
            })
        })
        .collect();

    let trainer = {
        let detector = Arc::clone(&detector);
        thread::spawn(move || detector.retrain(Some(300)))
    };
    assert!(trainer.join().unwrap().unwrap());
    done.store(true, Ordering::Release);

    let after: BTreeMap<String, f64> = detector.score(INPUT, &settings, None).per_model;
    assert_eq!(detector.model_info().sample_count, 300);

    for r in readers {
        let seen = r.join().unwrap();
        assert!(!seen.is_empty());
        for per_model in seen {
            assert_eq!(per_model.len(), 3);
            assert!(
                per_model == before || per_model == after,
                "mixed bundle output: {per_model:?}"
            );
        }
    }
}

#[test]
fn snapshot_survives_swap() {
    let dir = tempfile::tempdir().unwrap();
    let lifecycle =
        ModelLifecycle::open(ModelStore::new(dir.path().join("model.json")), small_params()).unwrap();
    let held = lifecycle.current();
    lifecycle.retrain_synthetic(Some(100), Some(9)).unwrap();

    assert_eq!(held.provenance.sample_count, 200);
    assert_eq!(lifecycle.current().provenance.sample_count, 100);
    assert_eq!(lifecycle.current().provenance.seed, 9);
    held.validate().unwrap();
}
