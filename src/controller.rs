use crate::aggregation::aggregate;
use crate::error::Result;
use crate::facets::extract_facets;
use crate::filters::{DateRange, FilterSelection};
use crate::health::{HealthCheckResult, normalize};
use crate::models::{CacheActivityReport, Facets, RawUsageRecord};
use crate::source::{ActivitySource, HealthProbe};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Sequence number handed out for each fetch of a date window.
/// Only the newest ticket may replace the displayed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefetchTicket(u64);

/// Everything the view renders for the current rows and selection
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    #[serde(flatten)]
    pub report: CacheActivityReport,
    pub facets: Facets,
}

pub struct DashboardController<S: ActivitySource> {
    source: S,
    rows: Vec<RawUsageRecord>,
    filter: FilterSelection,
    latest_ticket: RefetchTicket,
}

impl<S: ActivitySource> DashboardController<S> {
    pub fn new(source: S, filter: FilterSelection) -> Self {
        Self {
            source,
            rows: Vec::new(),
            filter,
            latest_ticket: RefetchTicket(0),
        }
    }

    pub fn filter(&self) -> &FilterSelection {
        &self.filter
    }

    pub fn rows(&self) -> &[RawUsageRecord] {
        &self.rows
    }

    /// Change the date window. Rows for the new window must be fetched with the returned ticket.
    pub fn set_date_range(&mut self, range: DateRange) -> RefetchTicket {
        self.filter.date_range = range;
        self.next_ticket()
    }

    fn next_ticket(&mut self) -> RefetchTicket {
        self.latest_ticket = RefetchTicket(self.latest_ticket.0 + 1);
        self.latest_ticket
    }

    /// Install fetched rows unless a newer fetch has been issued since.
    /// Returns whether the rows were applied.
    pub fn apply_fetch(&mut self, ticket: RefetchTicket, rows: Vec<RawUsageRecord>) -> bool {
        if ticket < self.latest_ticket {
            warn!(
                ticket = ticket.0,
                latest = self.latest_ticket.0,
                "discarding stale cache activity response"
            );
            return false;
        }

        debug!(ticket = ticket.0, rows = rows.len(), "applying cache activity rows");
        self.rows = rows;
        true
    }

    /// Fetch rows for the current window and apply them
    pub fn refresh(&mut self) -> Result<bool> {
        let ticket = self.next_ticket();
        let rows = self.source.fetch_cache_activity(&self.filter.date_range)?;
        let (from, to) = self.filter.date_range.query_bounds();
        info!(%from, %to, rows = rows.len(), "fetched cache activity");
        Ok(self.apply_fetch(ticket, rows))
    }

    /// Facet changes only recompute; they never refetch
    pub fn select_api_keys<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.filter.api_keys = keys.into_iter().map(Into::into).collect();
    }

    pub fn select_models<I, M>(&mut self, models: I)
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.filter.models = models.into_iter().map(Into::into).collect();
    }

    pub fn toggle_api_key(&mut self, key: &str) {
        if !self.filter.api_keys.remove(key) {
            self.filter.api_keys.insert(key.to_string());
        }
    }

    pub fn toggle_model(&mut self, model: &str) {
        if !self.filter.models.remove(model) {
            self.filter.models.insert(model.to_string());
        }
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            report: aggregate(&self.rows, &self.filter),
            facets: extract_facets(&self.rows),
        }
    }
}

/// Run the cache health check and normalize whatever it produced
pub fn check_health<P: HealthProbe>(probe: &P) -> HealthCheckResult {
    let result = normalize(probe.run_health_check());
    if !result.is_success() {
        warn!("cache health check failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthCheckOutcome;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    /// Serves canned rows and records the windows it was asked for
    struct StubSource {
        rows: Vec<RawUsageRecord>,
        requested: RefCell<Vec<(String, String)>>,
    }

    impl StubSource {
        fn new(rows: Vec<RawUsageRecord>) -> Self {
            Self {
                rows,
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl ActivitySource for StubSource {
        fn fetch_cache_activity(&self, range: &DateRange) -> Result<Vec<RawUsageRecord>> {
            self.requested.borrow_mut().push(range.query_bounds());
            Ok(self.rows.clone())
        }
    }

    struct StubProbe(HealthCheckOutcome);

    impl HealthProbe for StubProbe {
        fn run_health_check(&self) -> HealthCheckOutcome {
            self.0.clone()
        }
    }

    fn record(api_key: &str, model: &str, call_type: &str, total: i64, hits: i64) -> RawUsageRecord {
        RawUsageRecord {
            api_key: api_key.to_string(),
            model: model.to_string(),
            call_type: Some(call_type.to_string()),
            total_rows: total,
            cache_hit_true_rows: hits,
            ..Default::default()
        }
    }

    fn range(from: u32, to: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 6, from).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, to).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_refresh_fetches_current_window() {
        let source = StubSource::new(vec![record("k1", "m1", "chat", 4, 1)]);
        let mut controller = DashboardController::new(source, FilterSelection::new(range(1, 7)));

        assert!(controller.refresh().unwrap());
        assert_eq!(controller.rows().len(), 1);
        assert_eq!(
            controller.source.requested.borrow().as_slice(),
            &[("2024-06-01".to_string(), "2024-06-07".to_string())]
        );
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut controller =
            DashboardController::new(StubSource::new(Vec::new()), FilterSelection::new(range(1, 7)));

        let first = controller.set_date_range(range(1, 3));
        let second = controller.set_date_range(range(4, 6));

        assert!(controller.apply_fetch(second, vec![record("new", "m", "chat", 1, 0)]));
        assert!(!controller.apply_fetch(first, vec![record("old", "m", "chat", 1, 0)]));
        assert_eq!(controller.rows()[0].api_key, "new");
        assert_eq!(controller.filter().date_range, range(4, 6));
    }

    #[test]
    fn test_facet_selection_does_not_refetch() {
        let source = StubSource::new(vec![
            record("k1", "m1", "chat", 4, 1),
            record("k2", "m2", "embedding", 2, 2),
        ]);
        let mut controller = DashboardController::new(source, FilterSelection::new(range(1, 7)));
        controller.refresh().unwrap();

        controller.select_api_keys(["k2"]);
        let view = controller.view();
        assert_eq!(view.report.series.len(), 1);
        assert_eq!(view.report.series[0].name, "embedding");
        assert_eq!(view.facets.api_keys, vec!["k1", "k2"]);

        controller.toggle_api_key("k2");
        controller.toggle_model("m1");
        let view = controller.view();
        assert_eq!(view.report.series[0].name, "chat");
        assert_eq!(view.report.summary.cache_hits, "1");

        controller.select_api_keys(Vec::<String>::new());
        controller.select_models(["m2"]);
        let view = controller.view();
        assert_eq!(view.report.series.len(), 1);
        assert_eq!(view.report.series[0].name, "embedding");
        assert_eq!(view.report.summary.cache_hits, "2");

        assert_eq!(controller.source.requested.borrow().len(), 1);
    }

    #[test]
    fn test_check_health_normalizes() {
        let probe = StubProbe(HealthCheckOutcome::Thrown {
            message: r#"{"error":{"message":"bad key"}}"#.to_string(),
        });
        match check_health(&probe) {
            HealthCheckResult::Failure(failure) => assert_eq!(failure.message, "bad key"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_view_serializes_series_and_summary() {
        let mut controller = DashboardController::new(
            StubSource::new(vec![record("k1", "m1", "chat", 10, 3)]),
            FilterSelection::default(),
        );
        controller.refresh().unwrap();

        let json = serde_json::to_value(controller.view()).unwrap();
        assert_eq!(json["summary"]["cacheHitRatio"], "30.00");
        assert_eq!(json["series"][0]["name"], "chat");
        assert_eq!(json["facets"]["apiKeys"][0], "k1");
    }
}
