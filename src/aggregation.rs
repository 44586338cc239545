use crate::filters::FilterSelection;
use crate::models::{CacheActivityReport, CacheTotals, RawUsageRecord, SeriesPoint, SummaryMetrics};
use indexmap::IndexMap;

/// A filtered row with its call type already relabeled
struct NormalizedRow<'a> {
    call_type: &'a str,
    record: &'a RawUsageRecord,
}

/// Reduce raw activity rows to per-call-type chart series and summary metrics.
///
/// Only the api key and model facets are applied here: rows were already
/// fetched for the selected date window. Series come out in first-seen order.
pub fn aggregate(rows: &[RawUsageRecord], filter: &FilterSelection) -> CacheActivityReport {
    let normalized = rows
        .iter()
        .filter(|record| filter.matches(record))
        .map(|record| NormalizedRow {
            call_type: record.call_type_label(),
            record,
        });

    let mut series: IndexMap<&str, SeriesPoint> = IndexMap::new();
    let mut totals = CacheTotals::default();

    for row in normalized {
        series
            .entry(row.call_type)
            .or_insert_with(|| SeriesPoint::new(row.call_type))
            .add(row.record);
        totals.add(row.record);
    }

    CacheActivityReport {
        series: series.into_values().collect(),
        summary: SummaryMetrics::from(&totals),
        totals,
    }
}
