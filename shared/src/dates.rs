//! Date-filter math for the order list
//!
//! Filters select a named window and translate it into absolute local-day
//! boundaries: 00:00:00.000 at the start, 23:59:59.999 at the end.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Named date window for the order list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DateFilter {
    #[default]
    Today,
    Yesterday,
    Last7,
    Last30,
    ThisMonth,
}

impl DateFilter {
    pub const ALL: [DateFilter; 5] = [
        DateFilter::Today,
        DateFilter::Yesterday,
        DateFilter::Last7,
        DateFilter::Last30,
        DateFilter::ThisMonth,
    ];

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            DateFilter::Today => "Today",
            DateFilter::Yesterday => "Yesterday",
            DateFilter::Last7 => "Last 7 Days",
            DateFilter::Last30 => "Last 30 Days",
            DateFilter::ThisMonth => "This Month",
        }
    }

    /// Resolve the window against the local calendar day
    pub fn range(&self) -> FilterRange {
        self.range_from(Local::now().date_naive())
    }

    /// Resolve the window against an explicit "today"
    ///
    /// `Last7`/`Last30` span exactly 7/30 calendar days inclusive of today.
    pub fn range_from(&self, today: NaiveDate) -> FilterRange {
        let (first, last) = match self {
            DateFilter::Today => (today, today),
            DateFilter::Yesterday => {
                let y = today - Duration::days(1);
                (y, y)
            }
            DateFilter::Last7 => (today - Duration::days(6), today),
            DateFilter::Last30 => (today - Duration::days(29), today),
            DateFilter::ThisMonth => (today.with_day(1).unwrap_or(today), today),
        };
        FilterRange::over_days(first, last)
    }
}

/// Absolute start/end of a resolved filter window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl FilterRange {
    fn over_days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first.and_hms_opt(0, 0, 0).unwrap_or_default(),
            end: last.and_hms_milli_opt(23, 59, 59, 999).unwrap_or_default(),
        }
    }

    /// Query-parameter form, `YYYY-MM-DDTHH:MM:SS`
    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}
