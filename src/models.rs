use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Label used for rows whose call type is missing or empty
pub const UNKNOWN_CALL_TYPE: &str = "Unknown";

/// One row of the gateway's cache activity query, per (api key, model, call type).
///
/// Rows come from an external collaborator and may be missing fields or carry
/// the wrong JSON type. Deserialization never fails for an object row: every
/// field is defaulted, so nothing "undefined-shaped" gets past this boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawUsageRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub api_key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: String,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub call_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_rows: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub cache_hit_true_rows: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub cached_completion_tokens: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub generated_completion_tokens: i64,
}

impl RawUsageRecord {
    /// Build a record from an arbitrary JSON value. Returns `None` for non-object values.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Call type after substituting the `"Unknown"` label for empty values
    pub fn call_type_label(&self) -> &str {
        match self.call_type.as_deref() {
            Some(call_type) if !call_type.is_empty() => call_type,
            _ => UNKNOWN_CALL_TYPE,
        }
    }

    /// Requests that went to the model instead of being served from cache.
    /// Not clamped: malformed rows with more hits than rows go negative.
    pub fn llm_api_requests(&self) -> i64 {
        self.total_rows.saturating_sub(self.cache_hit_true_rows)
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Null => None,
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_count(&value))
}

fn coerce_count(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// One bar group in the cache activity chart, keyed by call type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub name: String,
    #[serde(rename = "LLM API requests")]
    pub llm_api_requests: i64,
    #[serde(rename = "Cache hit")]
    pub cache_hits: i64,
    #[serde(rename = "Cached Completion Tokens")]
    pub cached_completion_tokens: i64,
    #[serde(rename = "Generated Completion Tokens")]
    pub generated_completion_tokens: i64,
}

impl SeriesPoint {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Counts saturate at the `i64` bounds instead of overflowing
    pub fn add(&mut self, record: &RawUsageRecord) {
        self.llm_api_requests = self
            .llm_api_requests
            .saturating_add(record.llm_api_requests());
        self.cache_hits = self.cache_hits.saturating_add(record.cache_hit_true_rows);
        self.cached_completion_tokens = self
            .cached_completion_tokens
            .saturating_add(record.cached_completion_tokens);
        self.generated_completion_tokens = self
            .generated_completion_tokens
            .saturating_add(record.generated_completion_tokens);
    }

    pub fn total_requests(&self) -> i64 {
        self.llm_api_requests.saturating_add(self.cache_hits)
    }
}

/// Raw numeric totals across the whole filtered row set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheTotals {
    #[serde(rename = "cacheHits")]
    pub cache_hits: i64,
    #[serde(rename = "cachedTokens")]
    pub cached_tokens: i64,
    #[serde(rename = "llmApiRequests")]
    pub llm_api_requests: i64,
}

impl CacheTotals {
    pub fn add(&mut self, record: &RawUsageRecord) {
        self.cache_hits = self.cache_hits.saturating_add(record.cache_hit_true_rows);
        self.cached_tokens = self
            .cached_tokens
            .saturating_add(record.cached_completion_tokens);
        self.llm_api_requests = self
            .llm_api_requests
            .saturating_add(record.llm_api_requests());
    }

    /// Hit ratio in percent, or `None` when there is nothing to divide by
    pub fn cache_hit_ratio(&self) -> Option<f64> {
        let denominator = self.cache_hits as f64 + self.llm_api_requests as f64;
        if denominator == 0.0 {
            None
        } else {
            Some(self.cache_hits as f64 / denominator * 100.0)
        }
    }
}

/// The three display metrics shown above the chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryMetrics {
    #[serde(rename = "cacheHits")]
    pub cache_hits: String,
    #[serde(rename = "cachedTokens")]
    pub cached_tokens: String,
    #[serde(rename = "cacheHitRatio")]
    pub cache_hit_ratio: String,
}

impl From<&CacheTotals> for SummaryMetrics {
    fn from(totals: &CacheTotals) -> Self {
        SummaryMetrics {
            cache_hits: totals.cache_hits.to_string(),
            cached_tokens: totals.cached_tokens.to_string(),
            cache_hit_ratio: totals
                .cache_hit_ratio()
                .map(|ratio| format!("{:.2}", ratio))
                .unwrap_or_else(|| "0".to_string()),
        }
    }
}

impl Default for SummaryMetrics {
    fn default() -> Self {
        SummaryMetrics::from(&CacheTotals::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheActivityReport {
    pub series: Vec<SeriesPoint>,
    pub summary: SummaryMetrics,
    pub totals: CacheTotals,
}

/// Distinct values offered by the filter controls, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    #[serde(rename = "apiKeys")]
    pub api_keys: Vec<String>,
    pub models: Vec<String>,
    #[serde(rename = "callTypes")]
    pub call_types: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_defaults_every_field() {
        let record: RawUsageRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, RawUsageRecord::default());
        assert_eq!(record.call_type_label(), UNKNOWN_CALL_TYPE);
    }

    #[test]
    fn test_record_tolerates_wrong_types() {
        let record = RawUsageRecord::from_value(json!({
            "api_key": null,
            "model": 42,
            "call_type": "",
            "total_rows": "12",
            "cache_hit_true_rows": 4.9,
            "cached_completion_tokens": "lots",
            "generated_completion_tokens": {"nested": true}
        }))
        .unwrap();

        assert_eq!(record.api_key, "");
        assert_eq!(record.model, "42");
        assert_eq!(record.call_type.as_deref(), Some(""));
        assert_eq!(record.call_type_label(), "Unknown");
        assert_eq!(record.total_rows, 12);
        assert_eq!(record.cache_hit_true_rows, 4);
        assert_eq!(record.cached_completion_tokens, 0);
        assert_eq!(record.generated_completion_tokens, 0);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(RawUsageRecord::from_value(json!([1, 2])).is_none());
        assert!(RawUsageRecord::from_value(json!("row")).is_none());
    }

    #[test]
    fn test_llm_api_requests_is_not_clamped() {
        let record = RawUsageRecord {
            total_rows: 2,
            cache_hit_true_rows: 5,
            ..Default::default()
        };
        assert_eq!(record.llm_api_requests(), -3);
    }

    #[test]
    fn test_summary_metrics_formatting() {
        let totals = CacheTotals {
            cache_hits: 1,
            cached_tokens: 10,
            llm_api_requests: 2,
        };
        let summary = SummaryMetrics::from(&totals);
        assert_eq!(summary.cache_hits, "1");
        assert_eq!(summary.cached_tokens, "10");
        assert_eq!(summary.cache_hit_ratio, "33.33");

        let empty = SummaryMetrics::default();
        assert_eq!(empty.cache_hit_ratio, "0");
        assert_eq!(empty.cache_hits, "0");
    }

    #[test]
    fn test_series_point_serializes_chart_keys() {
        let point = SeriesPoint {
            name: "chat".to_string(),
            llm_api_requests: 7,
            cache_hits: 3,
            cached_completion_tokens: 30,
            generated_completion_tokens: 70,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["LLM API requests"], 7);
        assert_eq!(json["Cache hit"], 3);
        assert_eq!(json["Cached Completion Tokens"], 30);
        assert_eq!(json["Generated Completion Tokens"], 70);
    }
}
