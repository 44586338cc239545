use crate::models::{Facets, RawUsageRecord};
use indexmap::IndexSet;

/// Distinct api keys, models and call types in first-seen order.
///
/// Missing call types are reported as `""` here; only the chart series
/// relabels them as "Unknown".
pub fn extract_facets(rows: &[RawUsageRecord]) -> Facets {
    let mut api_keys = IndexSet::new();
    let mut models = IndexSet::new();
    let mut call_types = IndexSet::new();

    for row in rows {
        api_keys.insert(row.api_key.as_str());
        models.insert(row.model.as_str());
        call_types.insert(row.call_type.as_deref().unwrap_or(""));
    }

    Facets {
        api_keys: api_keys.into_iter().map(str::to_string).collect(),
        models: models.into_iter().map(str::to_string).collect(),
        call_types: call_types.into_iter().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(api_key: &str, model: &str, call_type: Option<&str>) -> RawUsageRecord {
        RawUsageRecord {
            api_key: api_key.to_string(),
            model: model.to_string(),
            call_type: call_type.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_facets_are_distinct_in_first_seen_order() {
        let rows = vec![
            row("k2", "gpt-4o", Some("acompletion")),
            row("k1", "gpt-4o", Some("aembedding")),
            row("k2", "claude-3", Some("acompletion")),
            row("k3", "gpt-4o", None),
        ];

        let facets = extract_facets(&rows);
        assert_eq!(facets.api_keys, vec!["k2", "k1", "k3"]);
        assert_eq!(facets.models, vec!["gpt-4o", "claude-3"]);
        assert_eq!(facets.call_types, vec!["acompletion", "aembedding", ""]);
    }

    #[test]
    fn test_missing_values_collapse_to_empty() {
        let rows = vec![row("", "", None), row("", "", Some(""))];
        let facets = extract_facets(&rows);
        assert_eq!(facets.api_keys, vec![""]);
        assert_eq!(facets.models, vec![""]);
        assert_eq!(facets.call_types, vec![""]);
    }

    #[test]
    fn test_empty_rows() {
        assert_eq!(extract_facets(&[]), Facets::default());
    }
}
