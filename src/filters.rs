use crate::error::{CachelyticsError, Result};
use crate::models::RawUsageRecord;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashSet;

/// Inclusive date window, normalized to whole days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDateTime,
    to: NaiveDateTime,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(CachelyticsError::validation_error(
                "date_range",
                "From date must be before or equal to to date",
            ));
        }

        Ok(Self {
            from: from.and_time(NaiveTime::MIN),
            to: to.and_time(end_of_day()),
        })
    }

    /// The `days` most recent days, today included
    pub fn last_days(days: i64) -> Self {
        let today = Local::now().date_naive();
        let from = today - Duration::days(days.max(1) - 1);
        Self {
            from: from.and_time(NaiveTime::MIN),
            to: today.and_time(end_of_day()),
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.from
    }

    pub fn end(&self) -> NaiveDateTime {
        self.to
    }

    pub fn start_date(&self) -> NaiveDate {
        self.from.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.to.date()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start_date() <= date && date <= self.end_date()
    }

    /// `(from, to)` as the `YYYY-MM-DD` strings the activity query takes
    pub fn query_bounds(&self) -> (String, String) {
        (
            self.start_date().format("%Y-%m-%d").to_string(),
            self.end_date().format("%Y-%m-%d").to_string(),
        )
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

/// Accepts `YYYYMMDD` or `YYYY-MM-DD`
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    let trimmed = date_str.trim();
    let format = if trimmed.contains('-') {
        "%Y-%m-%d"
    } else {
        "%Y%m%d"
    };

    if format == "%Y%m%d" && trimmed.len() != 8 {
        return Err(CachelyticsError::date_parse_error(date_str, "YYYYMMDD"));
    }

    NaiveDate::parse_from_str(trimmed, format)
        .map_err(|_| CachelyticsError::date_parse_error(date_str, "YYYYMMDD or YYYY-MM-DD"))
}

/// Current selection in the filter controls. Empty sets mean "no filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    pub api_keys: HashSet<String>,
    pub models: HashSet<String>,
    pub date_range: DateRange,
}

impl FilterSelection {
    pub fn new(date_range: DateRange) -> Self {
        Self {
            api_keys: HashSet::new(),
            models: HashSet::new(),
            date_range,
        }
    }

    pub fn with_api_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Facet match only. The date window is applied when rows are fetched.
    pub fn matches(&self, record: &RawUsageRecord) -> bool {
        (self.api_keys.is_empty() || self.api_keys.contains(&record.api_key))
            && (self.models.is_empty() || self.models.contains(&record.model))
    }
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self::new(DateRange::last_days(7))
    }
}
