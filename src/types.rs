//! Core value types shared by filters, builders and executors
//!
//! # Key Types
//!
//! - **`SortSpec`**: ordered `field -> direction` mapping; only the first entry matters
//! - **`TimeRange`**: optional lower/upper bound in epoch seconds
//! - **`AggInterval`**: calendar interval used by time dimensions
//! - **`PageWindow`**: zero-based page and page size
//!
//! # Example
//!
//! ```rust
//! use scm_facets::types::{AggInterval, SortDirection, SortSpec, TimeRange};
//!
//! let sort = SortSpec::single("author", SortDirection::Asc);
//! assert_eq!(sort.first().unwrap().field, "author");
//!
//! let range = TimeRange::between(1_700_000_000, 1_700_086_400);
//! assert!(!range.is_unbounded());
//!
//! // 2024-01-01T00:00:00Z plus one month
//! assert_eq!(AggInterval::Month.advance(1_704_067_200), Some(1_706_745_600));
//! ```

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    #[default]
    Desc,
}

impl SortDirection {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `field -> direction` entry of a sort spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    /// Field, dimension or calculation name
    pub field: String,
    /// Requested direction
    #[serde(default)]
    pub order: SortDirection,
}

/// Ordered sort mapping. Only the first entry is ever consulted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Vec<SortEntry>);

impl SortSpec {
    /// Empty sort spec (natural order)
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Sort spec with exactly one entry
    pub fn single(field: impl Into<String>, order: SortDirection) -> Self {
        Self(vec![SortEntry {
            field: field.into(),
            order,
        }])
    }

    /// Append an entry
    pub fn then(mut self, field: impl Into<String>, order: SortDirection) -> Self {
        self.0.push(SortEntry {
            field: field.into(),
            order,
        });
        self
    }

    /// First entry, if any
    pub fn first(&self) -> Option<&SortEntry> {
        self.0.first()
    }

    /// True when no entry is present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same direction as the first entry but with the field renamed
    pub fn renamed_first(&self, field: &str) -> Self {
        match self.first() {
            Some(entry) => Self::single(field, entry.order),
            None => Self::new(),
        }
    }
}

/// Time range in epoch seconds; either bound may be absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    /// Exclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl TimeRange {
    /// Range with both bounds
    pub fn between(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Range with only a lower bound
    pub fn since(start: i64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Range with only an upper bound
    pub fn until(end: i64) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// No bound present; such a range produces no condition at all
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Bounds converted to epoch milliseconds
    pub fn to_millis(&self) -> (Option<i64>, Option<i64>) {
        (
            self.start.map(|s| s.saturating_mul(1000)),
            self.end.map(|e| e.saturating_mul(1000)),
        )
    }

    /// Length in whole days when both bounds are set
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if end >= start => Some((end - start) / 86_400),
            _ => None,
        }
    }
}

/// Numeric range with exclusive bounds (lines of code, sizes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValueRange {
    /// Exclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<i64>,
    /// Exclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<i64>,
}

impl ValueRange {
    /// No bound present
    pub fn is_unbounded(&self) -> bool {
        self.gt.is_none() && self.lt.is_none()
    }
}

/// Calendar interval for time dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggInterval {
    /// Calendar year
    Year,
    /// Calendar quarter
    Quarter,
    /// Calendar month
    #[default]
    Month,
    /// ISO week
    Week,
    /// Day
    Day,
}

impl AggInterval {
    /// Parse the wire name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "year" => Some(AggInterval::Year),
            "quarter" => Some(AggInterval::Quarter),
            "month" => Some(AggInterval::Month),
            "week" => Some(AggInterval::Week),
            "day" | "day_of_week" => Some(AggInterval::Day),
            _ => None,
        }
    }

    /// Name used by `date_histogram.calendar_interval`
    pub fn calendar_interval(&self) -> &'static str {
        match self {
            AggInterval::Year => "year",
            AggInterval::Quarter => "quarter",
            AggInterval::Month => "month",
            AggInterval::Week => "week",
            AggInterval::Day => "day",
        }
    }

    /// Approximate length in days, used for per-interval averages
    pub fn approx_days(&self) -> f64 {
        match self {
            AggInterval::Day => 1.0,
            AggInterval::Month => 30.0,
            AggInterval::Week | AggInterval::Quarter | AggInterval::Year => 7.0,
        }
    }

    /// Start of the next bucket for a bucket starting at `start_secs`
    pub fn advance(&self, start_secs: i64) -> Option<i64> {
        let start = DateTime::<Utc>::from_timestamp(start_secs, 0)?;
        let next = match self {
            AggInterval::Year => start.checked_add_months(Months::new(12))?,
            AggInterval::Quarter => start.checked_add_months(Months::new(3))?,
            AggInterval::Month => start.checked_add_months(Months::new(1))?,
            AggInterval::Week => start.checked_add_signed(Duration::days(7))?,
            AggInterval::Day => start.checked_add_signed(Duration::days(1))?,
        };
        Some(next.timestamp())
    }

    /// Human label for a bucket starting at `epoch_millis`
    ///
    /// year `2024`, quarter `Q1-2024`, month `03-2024`, week `11-2024`, day `15-03-2024`
    pub fn label(&self, epoch_millis: i64) -> Option<String> {
        let at = DateTime::<Utc>::from_timestamp_millis(epoch_millis)?;
        Some(match self {
            AggInterval::Year => format!("{}", at.year()),
            AggInterval::Quarter => format!("Q{}-{}", at.month0() / 3 + 1, at.year()),
            AggInterval::Month => format!("{:02}-{}", at.month(), at.year()),
            AggInterval::Week => format!("{}-{}", at.iso_week().week(), at.iso_week().year()),
            AggInterval::Day => format!("{:02}-{:02}-{}", at.day(), at.month(), at.year()),
        })
    }
}

/// Zero-based page and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based page index
    pub page: usize,
    /// Page size
    pub page_size: usize,
}

impl PageWindow {
    /// Create a window; a zero page size is bumped to one
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size: page_size.max(1),
        }
    }

    /// Offset of the first element
    pub fn from(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// Buckets needed to cover this page when the backend cannot offset-page buckets
    pub fn bucket_count(&self) -> usize {
        self.from().saturating_add(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_spec_first_entry_wins() {
        let sort = SortSpec::single("author", SortDirection::Asc).then("count", SortDirection::Desc);
        let first = sort.first().unwrap();
        assert_eq!(first.field, "author");
        assert_eq!(first.order, SortDirection::Asc);
    }

    #[test]
    fn test_sort_spec_json_is_ordered_list() {
        let sort: SortSpec =
            serde_json::from_str(r#"[{"field":"repo_id","order":"asc"},{"field":"count"}]"#).unwrap();
        assert_eq!(sort.first().unwrap().field, "repo_id");
        assert_eq!(sort.renamed_first("source_branch").first().unwrap().order, SortDirection::Asc);
    }

    #[test]
    fn test_time_range_millis() {
        let range = TimeRange::since(1_600_000_000);
        assert_eq!(range.to_millis(), (Some(1_600_000_000_000), None));
        assert!(TimeRange::default().is_unbounded());
        assert_eq!(TimeRange::between(0, 86_400 * 3).duration_days(), Some(3));
    }

    #[test]
    fn test_interval_advance_calendar() {
        // 2024-01-31 + 1 month clamps to 2024-02-29
        let jan_31 = 1_706_659_200;
        let feb_29 = 1_709_164_800;
        assert_eq!(AggInterval::Month.advance(jan_31), Some(feb_29));
        assert_eq!(AggInterval::Day.advance(0), Some(86_400));
        assert_eq!(AggInterval::Week.advance(0), Some(7 * 86_400));
    }

    #[test]
    fn test_interval_labels() {
        // 2024-03-15T00:00:00Z
        let ms = 1_710_460_800_000;
        assert_eq!(AggInterval::Year.label(ms).unwrap(), "2024");
        assert_eq!(AggInterval::Quarter.label(ms).unwrap(), "Q1-2024");
        assert_eq!(AggInterval::Month.label(ms).unwrap(), "03-2024");
        assert_eq!(AggInterval::Day.label(ms).unwrap(), "15-03-2024");
        assert_eq!(AggInterval::Week.label(ms).unwrap(), "11-2024");
    }

    #[test]
    fn test_page_window() {
        let window = PageWindow::new(2, 25);
        assert_eq!(window.from(), 50);
        assert_eq!(window.bucket_count(), 75);
        assert_eq!(PageWindow::new(0, 0).page_size, 1);
    }
}
