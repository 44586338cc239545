//! Collaborators that supply raw data to the dashboard.
//!
//! Transport to a live gateway is out of scope; the bundled implementations
//! read responses captured from the gateway's activity and cache-ping
//! endpoints.

use crate::error::{CachelyticsError, Result};
use crate::filters::DateRange;
use crate::health::HealthCheckOutcome;
use crate::models::RawUsageRecord;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Supplies the cache activity rows for a date window
pub trait ActivitySource {
    fn fetch_cache_activity(&self, range: &DateRange) -> Result<Vec<RawUsageRecord>>;
}

/// Invokes the cache backend health check
pub trait HealthProbe {
    fn run_health_check(&self) -> HealthCheckOutcome;
}

/// Activity rows read from a captured export.
///
/// A file is taken as the response for any window. A directory holds one
/// capture per day named `YYYY-MM-DD.json` (or `.jsonl`), and only the days
/// inside the requested window are read.
pub struct ExportFileSource {
    path: PathBuf,
}

impl ExportFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn find_daily_captures(&self, range: &DateRange) -> Vec<(NaiveDate, PathBuf)> {
        let mut files: Vec<(NaiveDate, PathBuf)> = WalkDir::new(&self.path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_capture_file(entry.path()))
            .filter_map(|entry| {
                let date = capture_date(entry.path())?;
                Some((date, entry.path().to_path_buf()))
            })
            .filter(|(date, _)| range.contains_date(*date))
            .collect();

        files.sort();
        files
    }
}

impl ActivitySource for ExportFileSource {
    fn fetch_cache_activity(&self, range: &DateRange) -> Result<Vec<RawUsageRecord>> {
        let (from, to) = range.query_bounds();
        debug!(path = %self.path.display(), %from, %to, "fetching cache activity");

        if !self.path.exists() {
            return Err(CachelyticsError::data_not_found(
                &self.path.display().to_string(),
            ));
        }

        if self.path.is_file() {
            return read_capture(&self.path);
        }

        let files = self.find_daily_captures(range);
        if files.is_empty() {
            warn!(path = %self.path.display(), %from, %to, "no daily captures in range");
            return Ok(Vec::new());
        }

        let per_file: Vec<Vec<RawUsageRecord>> = files
            .par_iter()
            .map(|(_, path)| read_capture(path))
            .collect::<Result<_>>()?;

        let rows: Vec<RawUsageRecord> = per_file.into_iter().flatten().collect();
        debug!(files = files.len(), rows = rows.len(), "loaded daily captures");
        Ok(rows)
    }
}

fn is_capture_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "json" || ext == "jsonl")
        .unwrap_or(false)
}

fn capture_date(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

/// Read one capture file, `.jsonl` line by line or `.json` as a whole
pub fn read_capture(path: &Path) -> Result<Vec<RawUsageRecord>> {
    let is_jsonl = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "jsonl")
        .unwrap_or(false);

    if is_jsonl {
        read_jsonl(path)
    } else {
        read_json(path)
    }
}

fn read_jsonl(path: &Path) -> Result<Vec<RawUsageRecord>> {
    let file = File::open(path).map_err(CachelyticsError::Io)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(&line) {
            Ok(value) => match RawUsageRecord::from_value(value) {
                Some(record) => records.push(record),
                None => warn!(
                    path = %path.display(),
                    line = line_number + 1,
                    "skipping non-object activity row"
                ),
            },
            Err(err) => warn!(
                path = %path.display(),
                line = line_number + 1,
                error = %err,
                "skipping unparsable activity row"
            ),
        }
    }

    Ok(records)
}

fn read_json(path: &Path) -> Result<Vec<RawUsageRecord>> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|err| {
        let line = err.line();
        CachelyticsError::json_parse_error(&path.display().to_string(), line, err)
    })?;

    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut body) => match body.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(CachelyticsError::validation_error(
                    "data",
                    &format!("{} is not an activity export", path.display()),
                ));
            }
        },
        _ => {
            return Err(CachelyticsError::validation_error(
                "data",
                &format!("{} is not an activity export", path.display()),
            ));
        }
    };

    let total = rows.len();
    let records: Vec<RawUsageRecord> = rows
        .into_iter()
        .filter_map(RawUsageRecord::from_value)
        .collect();

    if records.len() < total {
        warn!(
            path = %path.display(),
            skipped = total - records.len(),
            "skipping non-object activity rows"
        );
    }

    Ok(records)
}

/// Health check answered by a captured cache-ping response
pub struct CapturedHealthProbe {
    path: PathBuf,
}

impl CapturedHealthProbe {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HealthProbe for CapturedHealthProbe {
    fn run_health_check(&self) -> HealthCheckOutcome {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(value) => HealthCheckOutcome::Response(value),
                Err(_) => HealthCheckOutcome::Thrown {
                    message: content.trim().to_string(),
                },
            },
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "health capture unreadable");
                HealthCheckOutcome::Thrown {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Health check whose invocation already failed with the given text
pub struct FailedHealthProbe {
    message: String,
}

impl FailedHealthProbe {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

impl HealthProbe for FailedHealthProbe {
    fn run_health_check(&self) -> HealthCheckOutcome {
        HealthCheckOutcome::Thrown {
            message: self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_read_json_array_skips_non_objects() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("activity.json");
        fs::write(
            &path,
            json!([
                {"api_key": "k1", "model": "m1", "call_type": "chat", "total_rows": 3},
                "garbage",
                {"api_key": "k2"}
            ])
            .to_string(),
        )
        .unwrap();

        let source = ExportFileSource::new(path);
        let range = DateRange::new(day(1), day(2)).unwrap();
        let rows = source.fetch_cache_activity(&range).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_rows, 3);
        assert_eq!(rows[1].api_key, "k2");
    }

    #[test]
    fn test_read_json_data_envelope() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("activity.json");
        fs::write(&path, json!({"data": [{"api_key": "k1"}]}).to_string()).unwrap();

        let rows = read_capture(&path).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_read_json_rejects_other_shapes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("activity.json");
        fs::write(&path, "42").unwrap();
        assert!(matches!(
            read_capture(&path),
            Err(CachelyticsError::Validation { .. })
        ));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_capture(&path),
            Err(CachelyticsError::JsonParse { .. })
        ));
    }

    #[test]
    fn test_read_jsonl_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        fs::write(
            &path,
            "{\"api_key\":\"k1\",\"total_rows\":1}\n\nnot json\n[1]\n{\"api_key\":\"k2\"}\n",
        )
        .unwrap();

        let rows = read_capture(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].api_key, "k2");
    }

    #[test]
    fn test_directory_reads_only_days_in_range() {
        let dir = tempdir().unwrap();
        for (name, key) in [
            ("2024-05-01.json", "day1"),
            ("2024-05-02.json", "day2"),
            ("2024-05-03.json", "day3"),
            ("notes.json", "ignored"),
        ] {
            fs::write(
                dir.path().join(name),
                json!([{"api_key": key}]).to_string(),
            )
            .unwrap();
        }

        let source = ExportFileSource::new(dir.path().to_path_buf());
        let range = DateRange::new(day(2), day(3)).unwrap();
        let rows = source.fetch_cache_activity(&range).unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.api_key.as_str()).collect();
        assert_eq!(keys, vec!["day2", "day3"]);
    }

    #[test]
    fn test_missing_path_is_data_not_found() {
        let dir = tempdir().unwrap();
        let source = ExportFileSource::new(dir.path().join("missing"));
        let range = DateRange::new(day(1), day(1)).unwrap();
        assert!(matches!(
            source.fetch_cache_activity(&range),
            Err(CachelyticsError::DataNotFound { .. })
        ));
    }

    #[test]
    fn test_captured_health_probe() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ping.json");

        fs::write(&path, r#"{"status":"healthy"}"#).unwrap();
        let probe = CapturedHealthProbe::new(path.clone());
        assert_eq!(
            probe.run_health_check(),
            HealthCheckOutcome::Response(json!({"status": "healthy"}))
        );

        fs::write(&path, "Internal Server Error\n").unwrap();
        assert_eq!(
            probe.run_health_check(),
            HealthCheckOutcome::Thrown {
                message: "Internal Server Error".to_string()
            }
        );

        let missing = CapturedHealthProbe::new(dir.path().join("nope.json"));
        assert!(matches!(
            missing.run_health_check(),
            HealthCheckOutcome::Thrown { .. }
        ));
    }
}
