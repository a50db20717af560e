//! Filter model
//!
//! One filter type per document kind. Every filter carries the same
//! [`Grouping`] envelope (across, stacks, calculation, sort, paging) plus
//! kind-specific include / exclude criteria and time ranges.
//!
//! Filters are plain values: transformations such as OU merging or
//! narrowing to a bucket return a new filter and leave the receiver as is.
//!
//! # Example
//!
//! ```rust
//! use scm_facets::filter::{CommitDimension, CommitFilter, FilterModel};
//! use scm_facets::types::AggInterval;
//!
//! let filter = CommitFilter::default().with_across(CommitDimension::Author);
//! let narrowed = filter
//!     .narrowed(CommitDimension::Author, "u-1", AggInterval::Month)
//!     .unwrap();
//!
//! assert!(filter.include.authors.is_empty());
//! assert_eq!(narrowed.include.authors, vec!["u-1".to_string()]);
//! ```

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::dsl::query::Query;
use crate::ou::OuRole;
use crate::types::{AggInterval, PageWindow, SortSpec, TimeRange};

pub use commit::{ActivityAcross, CommitCalculation, CommitCriteria, CommitDimension, CommitFilter, ContributorRole};
pub use issue::{IssueCalculation, IssueCriteria, IssueDimension, IssueFilter};
pub use pull_request::{PrCalculation, PrCriteria, PrDimension, PrFilter};

/// Defines a fieldless enum with a fixed wire name per variant
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// Every variant in declaration order
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Wire name
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }

            /// Parse a wire name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $wire => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod commit;
pub mod issue;
pub mod pull_request;

/// A grouping dimension of one document kind
pub trait Dimension: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Wire name, also the sort key that selects this dimension
    fn name(&self) -> &'static str;

    /// Parse a wire name
    fn parse(name: &str) -> Option<Self>;

    /// Bucketed by a date histogram
    fn is_time(&self) -> bool;

    /// OU role whose ids this dimension groups by, if it is an identity dimension
    fn identity_role(&self) -> Option<OuRole>;
}

/// A per-bucket calculation of one document kind
pub trait Calculation: Copy + Eq + Debug + Default + Send + Sync + 'static {
    /// Wire name, also the sort key that selects this calculation
    fn name(&self) -> &'static str;
}

/// Common envelope of every filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>, C: Deserialize<'de>"))]
pub struct Grouping<D, C> {
    /// Primary grouping dimension
    #[serde(default)]
    pub across: Option<D>,

    /// Drill-down dimensions; only the first is honored
    #[serde(default)]
    pub stacks: Vec<D>,

    /// Metric computed per bucket
    #[serde(default)]
    pub calculation: Option<C>,

    /// Requested order
    #[serde(default)]
    pub sort: SortSpec,

    /// Interval for time dimensions
    #[serde(default)]
    pub interval: AggInterval,

    /// Zero-based page index
    #[serde(default)]
    pub page: Option<usize>,

    /// Page size
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl<D, C> Default for Grouping<D, C> {
    fn default() -> Self {
        Self {
            across: None,
            stacks: Vec::new(),
            calculation: None,
            sort: SortSpec::default(),
            interval: AggInterval::default(),
            page: None,
            page_size: None,
        }
    }
}

impl<D: Copy, C: Copy + Default> Grouping<D, C> {
    /// Selected calculation, `count`-like default when absent
    pub fn calculation_or_default(&self) -> C {
        self.calculation.unwrap_or_default()
    }

    /// First drill-down dimension
    pub fn first_stack(&self) -> Option<D> {
        self.stacks.first().copied()
    }

    /// Page window from the filter's paging fields
    pub fn page_window(&self, default_page_size: usize) -> PageWindow {
        PageWindow::new(self.page.unwrap_or(0), self.page_size.unwrap_or(default_page_size))
    }
}

/// Behavior shared by every document-kind filter
pub trait FilterModel: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Grouping dimension type
    type Dimension: Dimension;
    /// Calculation type
    type Calculation: Calculation;

    /// Grouping envelope
    fn grouping(&self) -> &Grouping<Self::Dimension, Self::Calculation>;

    /// Mutable grouping envelope, for building derived filters
    fn grouping_mut(&mut self) -> &mut Grouping<Self::Dimension, Self::Calculation>;

    /// Include-list bound to an OU role; `None` when the kind has no such role
    fn role_ids(&self, role: OuRole) -> Option<&[String]>;

    /// Copy with the include-list for `role` replaced
    fn with_role_ids(&self, role: OuRole, ids: Vec<String>) -> Self;

    /// Copy restricted to the bucket `key` of `dim`.
    ///
    /// `None` when `dim` cannot be narrowed for this kind, or when a time
    /// bucket key does not parse.
    fn narrowed(&self, dim: Self::Dimension, key: &str, interval: AggInterval) -> Option<Self>;

    /// Copy with a new primary dimension
    fn with_across(&self, across: Self::Dimension) -> Self {
        let mut next = self.clone();
        next.grouping_mut().across = Some(across);
        next
    }
}

/// Partial string match on one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialMatch {
    /// `$begins`
    #[serde(default, rename = "$begins", skip_serializing_if = "Option::is_none")]
    pub begins: Option<String>,
    /// `$ends`
    #[serde(default, rename = "$ends", skip_serializing_if = "Option::is_none")]
    pub ends: Option<String>,
    /// `$contains`
    #[serde(default, rename = "$contains", skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
}

impl PartialMatch {
    /// Wildcard queries against `field`, one per populated operator
    pub fn wildcards(&self, field: &str) -> Vec<Query> {
        let mut out = Vec::new();
        if let Some(prefix) = &self.begins {
            out.push(Query::wildcard(field, format!("{}*", prefix)));
        }
        if let Some(suffix) = &self.ends {
            out.push(Query::wildcard(field, format!("*{}", suffix)));
        }
        if let Some(infix) = &self.contains {
            out.push(Query::wildcard(field, format!("*{}*", infix)));
        }
        out
    }
}

/// Partial matches keyed by the filter-facing field name
pub type PartialMatches = BTreeMap<String, PartialMatch>;

/// Upper bounds of the lower two bands of a three-band size classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeThresholds {
    /// Upper bound (inclusive) of the first band
    pub low: i64,
    /// Upper bound (inclusive) of the second band
    pub high: i64,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self { low: 100, high: 1000 }
    }
}

impl SizeThresholds {
    /// `(gt, lte]` bounds for band 0, 1 or 2
    pub fn band(&self, index: usize) -> (Option<i64>, Option<i64>) {
        match index {
            0 => (None, Some(self.low)),
            1 => (Some(self.low), Some(self.high)),
            _ => (Some(self.high), None),
        }
    }
}

/// Replace a time range with the bucket `[start, start + interval)` parsed from `key`
pub(crate) fn narrowed_range(key: &str, interval: AggInterval) -> Option<TimeRange> {
    let start: i64 = key.parse().ok()?;
    let end = interval.advance(start)?;
    Some(TimeRange::between(start, end))
}

/// `terms` for an include / exclude list; `None` when the list is empty
pub(crate) fn terms_if_any(field: &str, values: &[String]) -> Option<Query> {
    if values.is_empty() {
        None
    } else {
        Some(Query::terms(field, values))
    }
}
