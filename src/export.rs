use anyhow::Result;
use cachelytics::models::CacheActivityReport;
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub fn export_series_to_csv(report: &CacheActivityReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    wtr.write_record([
        "Call Type",
        "LLM API requests",
        "Cache hit",
        "Cached Completion Tokens",
        "Generated Completion Tokens",
    ])?;

    for point in &report.series {
        wtr.write_record(&[
            point.name.clone(),
            point.llm_api_requests.to_string(),
            point.cache_hits.to_string(),
            point.cached_completion_tokens.to_string(),
            point.generated_completion_tokens.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn export_summary_to_csv(report: &CacheActivityReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    wtr.write_record(["Metric", "Value"])?;
    wtr.write_record(["Cache Hits", &report.summary.cache_hits])?;
    wtr.write_record(["Cached Tokens", &report.summary.cached_tokens])?;
    wtr.write_record(["Cache Hit Ratio (%)", &report.summary.cache_hit_ratio])?;
    wtr.write_record([
        "LLM API Requests",
        &report.totals.llm_api_requests.to_string(),
    ])?;
    wtr.write_record(["Call Types", &report.series.len().to_string()])?;

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachelytics::aggregation::aggregate;
    use cachelytics::filters::FilterSelection;
    use cachelytics::models::RawUsageRecord;
    use std::fs;
    use tempfile::tempdir;

    fn report() -> CacheActivityReport {
        let rows = vec![RawUsageRecord {
            api_key: "k1".to_string(),
            model: "m1".to_string(),
            call_type: Some("chat".to_string()),
            total_rows: 10,
            cache_hit_true_rows: 3,
            cached_completion_tokens: 30,
            generated_completion_tokens: 70,
        }];
        aggregate(&rows, &FilterSelection::default())
    }

    #[test]
    fn test_export_series() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.series.csv");
        export_series_to_csv(&report(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "Call Type,LLM API requests,Cache hit,Cached Completion Tokens,Generated Completion Tokens"
        );
        assert_eq!(lines[1], "chat,7,3,30,70");
    }

    #[test]
    fn test_export_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.summary.csv");
        export_summary_to_csv(&report(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Cache Hits,3"));
        assert!(content.contains("Cache Hit Ratio (%),30.00"));
        assert!(content.contains("Call Types,1"));
    }
}
