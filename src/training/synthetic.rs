//! Seeded synthetic URL dataset used for bootstrap and fallback training.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Dataset;
use crate::features::extract;

const BENIGN_HOSTS: [&str; 5] = [
    "openai.com",
    "github.com",
    "python.org",
    "wikipedia.org",
    "example.com",
];
const BENIGN_PATHS: [&str; 3] = ["", "blog", "docs"];
const PHISH_STEMS: [&str; 5] = [
    "secure-login",
    "verify-account",
    "free-gift",
    "bank-update",
    "login",
];
const ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

pub fn benign_url(rng: &mut StdRng) -> String {
    format!("https://{}/{}", pick(rng, &BENIGN_HOSTS), pick(rng, &BENIGN_PATHS))
}

pub fn phishing_url(rng: &mut StdRng) -> String {
    let stem = pick(rng, &PHISH_STEMS);
    let n: u32 = rng.random_range(1..1000);
    let len = rng.random_range(4..=20);
    let path: String = (0..len)
        .map(|_| char::from(ALNUM[rng.random_range(0..ALNUM.len())]))
        .collect();
    format!("http://{stem}{n}.com/{path}")
}

/// `samples` rows, half benign (label 0) and half phishing (label 1),
/// interleaved. Same `(samples, seed)` always yields the same dataset.
pub fn generate(samples: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let half = samples / 2;
    let mut data = Dataset::default();
    for i in 0..half * 2 {
        if i % 2 == 0 {
            data.push(extract(&benign_url(&mut rng)), 0);
        } else {
            data.push(extract(&phishing_url(&mut rng)), 1);
        }
    }
    data
}
