//! Labeled-table (CSV with header) datasets.
//!
//! When every schema column is present the rows are used as precomputed
//! feature vectors. Otherwise features are re-extracted from `url_column`
//! with an unknown domain age.

use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::features::{extract, FeatureVector, FEATURE_NAMES};

use super::Dataset;

pub const DEFAULT_URL_COLUMN: &str = "url";
pub const DEFAULT_LABEL_COLUMN: &str = "label";

enum Layout {
    Features(Vec<usize>),
    Url(usize),
}

/// Map a label cell to 0 (legitimate) / 1 (phishing).
pub fn parse_label(raw: &str) -> Option<u8> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "phishing" => Some(1),
        "0" | "0.0" | "false" | "legitimate" => Some(0),
        _ => None,
    }
}

pub fn load_labeled_table(path: &Path, url_column: &str, label_column: &str) -> EngineResult<Dataset> {
    if !path.is_file() {
        return Err(EngineError::SourceNotFound(path.to_path_buf()));
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let label_idx = position(label_column).ok_or_else(|| EngineError::MissingColumn {
        column: label_column.to_string(),
        available: headers.clone(),
    })?;

    let feature_idx: Option<Vec<usize>> = FEATURE_NAMES.iter().map(|n| position(n)).collect();
    let layout = match (feature_idx, position(url_column)) {
        (Some(idx), _) => Layout::Features(idx),
        (None, Some(u)) => Layout::Url(u),
        (None, None) => {
            return Err(EngineError::MissingColumn {
                column: url_column.to_string(),
                available: headers.clone(),
            })
        }
    };

    let mut data = Dataset::default();
    let mut skipped = 0usize;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let raw_label = record.get(label_idx).unwrap_or_default();
        let label = parse_label(raw_label).ok_or_else(|| EngineError::InvalidLabel {
            row,
            value: raw_label.to_string(),
        })?;

        let features = match &layout {
            Layout::Features(idx) => {
                let mut values = Vec::with_capacity(idx.len());
                for (&j, name) in idx.iter().zip(FEATURE_NAMES.iter()) {
                    let cell = record.get(j).unwrap_or_default();
                    let v: f64 = cell.parse().map_err(|_| {
                        EngineError::Validation(format!("row {row}: column '{name}' is not numeric ('{cell}')"))
                    })?;
                    if !v.is_finite() {
                        return Err(EngineError::Validation(format!(
                            "row {row}: column '{name}' is not finite"
                        )));
                    }
                    values.push(v);
                }
                FeatureVector::from_slice(&values)?
            }
            Layout::Url(u) => {
                let url = record.get(*u).unwrap_or_default();
                if url.is_empty() {
                    skipped += 1;
                    continue;
                }
                extract(url)
            }
        };
        data.push(features, label);
    }

    if skipped > 0 {
        tracing::warn!(target: "phishguard::training", skipped, "rows with an empty url were skipped");
    }
    tracing::info!(
        target: "phishguard::training",
        rows = data.len(),
        precomputed = matches!(layout, Layout::Features(_)),
        "labeled table loaded"
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn url_column_is_re_extracted() {
        let f = write_csv("url,label\nhttps://github.com/,0\nhttp://login-bank.tk/x,phishing\n");
        let d = load_labeled_table(f.path(), "url", "label").unwrap();
        assert_eq!(d.labels, vec![0, 1]);
        assert_eq!(d.rows[0], extract("https://github.com/"));
    }

    #[test]
    fn precomputed_feature_columns_are_used() {
        let header = FEATURE_NAMES.join(",");
        let ones = vec!["1"; FEATURE_NAMES.len()].join(",");
        let f = write_csv(&format!("{header},label\n{ones},true\n"));
        let d = load_labeled_table(f.path(), "url", "label").unwrap();
        assert!(d.rows[0].as_slice().iter().all(|&v| v == 1.0));
        assert_eq!(d.labels, vec![1]);
    }

    #[test]
    fn missing_label_column() {
        let f = write_csv("url,target\nhttps://a.com,0\n");
        let err = load_labeled_table(f.path(), "url", "label").unwrap_err();
        match err {
            EngineError::MissingColumn { column, available } => {
                assert_eq!(column, "label");
                assert_eq!(available, vec!["url", "target"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_label_reports_row() {
        let f = write_csv("url,label\nhttps://a.com,0\nhttps://b.com,maybe\n");
        let err = load_labeled_table(f.path(), "url", "label").unwrap_err();
        assert!(matches!(err, EngineError::InvalidLabel { row: 2, ref value } if value == "maybe"));
    }

    #[test]
    fn missing_file() {
        let err = load_labeled_table(Path::new("/nonexistent/x.csv"), "url", "label").unwrap_err();
        assert!(matches!(err, EngineError::SourceNotFound(_)));
    }

    #[test]
    fn labels() {
        assert_eq!(parse_label(" TRUE "), Some(1));
        assert_eq!(parse_label("legitimate"), Some(0));
        assert_eq!(parse_label("2"), None);
    }
}
