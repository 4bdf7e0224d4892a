//! phishguard — command-line caller of the detection engine.
//!
//! ```text
//! phishguard scan <input>...
//! phishguard scan-file <path>
//! phishguard retrain [samples]
//! phishguard train-csv <path> [url_col] [label_col]
//! phishguard info
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr.

use std::path::Path;

use anyhow::{bail, Context};
use phishguard_engine::training::table::{DEFAULT_LABEL_COLUMN, DEFAULT_URL_COLUMN};
use phishguard_engine::{Detector, EngineConfig};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "usage: phishguard <scan <input>... | scan-file <path> | retrain [samples] | train-csv <path> [url_col] [label_col] | info>";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phishguard=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; enables PHISHGUARD_* overrides from a file.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((cmd, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let config = EngineConfig::load()?;
    let settings = config.defaults.clone();
    let detector = Detector::open(&config).context("initializing detector")?;

    match cmd.as_str() {
        "scan" => {
            if rest.is_empty() {
                bail!(USAGE);
            }
            let mut results = Vec::with_capacity(rest.len());
            for input in rest {
                results.push(detector.detect(input, &settings, None).await);
            }
            print_json(&results)?;
        }
        "scan-file" => {
            let [path] = rest else {
                bail!(USAGE);
            };
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {path}"))?;
            print_json(&detector.scan_text(&text, &settings, None).await)?;
        }
        "retrain" => {
            let samples = match rest.first() {
                Some(s) => Some(s.parse::<usize>().with_context(|| format!("invalid sample count '{s}'"))?),
                None => None,
            };
            let detector = std::sync::Arc::new(detector);
            let worker = std::sync::Arc::clone(&detector);
            tokio::task::spawn_blocking(move || worker.retrain(samples)).await??;
            print_json(&detector.model_info())?;
        }
        "train-csv" => {
            let Some(path) = rest.first() else {
                bail!(USAGE);
            };
            let url_col = rest.get(1).map_or(DEFAULT_URL_COLUMN, String::as_str).to_string();
            let label_col = rest.get(2).map_or(DEFAULT_LABEL_COLUMN, String::as_str).to_string();
            let path = Path::new(path).to_path_buf();
            let detector = std::sync::Arc::new(detector);
            let worker = std::sync::Arc::clone(&detector);
            tokio::task::spawn_blocking(move || worker.train_from_labeled_table(&path, &url_col, &label_col))
                .await??;
            print_json(&detector.model_info())?;
        }
        "info" => print_json(&detector.model_info())?,
        other => bail!("unknown command '{other}'\n{USAGE}"),
    }
    Ok(())
}
