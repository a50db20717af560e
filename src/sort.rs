//! Sort resolution
//!
//! Group-by sorts are strict: the requested field must be either the
//! dimension being grouped on or the selected calculation. Anything else
//! cannot be expressed against the aggregation that was just built and is
//! rejected with an invalid-parameter error.
//!
//! ```text
//!   sort spec ──► empty?            ──► natural order, desc
//!             └─► first entry
//!                   ├─ dimension == across   ──► bucket key order, direction kept
//!                   ├─ dimension != across   ──► error
//!                   ├─ == calculation name   ──► doc count or metric order
//!                   └─ anything else         ──► error
//! ```
//!
//! List sorts resolve against an allow-list of sortable columns and add the
//! schema's field prefix where needed.

use crate::dsl::aggregation::Aggregation;
use crate::dsl::request::SortField;
use crate::error::{Error, Result};
use crate::filter::{Calculation, Dimension};
use crate::types::{SortDirection, SortSpec};

/// Natural index order
pub const NATURAL_ORDER: &str = "_doc";

/// Names that never receive a field prefix
pub const UNPREFIXED: &[&str] = &["num_commits", "num_prs", "median", NATURAL_ORDER];

/// What a resolved group-by sort orders by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortTarget {
    /// No explicit sort; backend order
    Natural,
    /// Bucket document count
    Count,
    /// Bucket key of the across dimension
    Dimension(String),
    /// Metric sub-aggregation, as a buckets path
    Metric(String),
}

/// Outcome of resolving a sort spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSort {
    /// Sort target
    pub target: SortTarget,
    /// Direction
    pub order: SortDirection,
}

impl ResolvedSort {
    /// Natural order, descending
    pub fn natural() -> Self {
        Self {
            target: SortTarget::Natural,
            order: SortDirection::Desc,
        }
    }

    /// Hit sort of the request. Group-bys never sort hits by anything but
    /// natural order.
    pub fn request_sort(&self) -> SortField {
        SortField::new(NATURAL_ORDER, self.order)
    }

    /// Apply the ordering to the primary bucket aggregation.
    ///
    /// `bucket_count` bounds the `bucket_sort` pipeline of metric sorts.
    pub fn apply(&self, agg: Aggregation, bucket_count: usize) -> Aggregation {
        match &self.target {
            SortTarget::Natural => agg,
            SortTarget::Count => agg.with_order("_count", self.order),
            SortTarget::Dimension(_) => agg.with_order("_key", self.order),
            SortTarget::Metric(path) => {
                let metric = path.split(['[', '.']).next().unwrap_or(path);
                if !agg.aggs.contains_key(metric) {
                    return agg;
                }
                agg.with_sub(
                    "bucket_sort",
                    Aggregation::bucket_sort(0, bucket_count, vec![SortField::new(path.clone(), self.order)]),
                )
            }
        }
    }
}

/// Resolve a group-by sort.
///
/// `metric` maps the calculation to its metric buckets path; `None` means the
/// calculation is ordered by document count.
pub fn resolve<D, C>(
    sort: &SortSpec,
    across: D,
    calculation: C,
    metric: impl Fn(C) -> Option<&'static str>,
) -> Result<ResolvedSort>
where
    D: Dimension,
    C: Calculation,
{
    let Some(entry) = sort.first() else {
        return Ok(ResolvedSort::natural());
    };

    if let Some(dimension) = D::parse(&entry.field) {
        if dimension != across {
            return Err(Error::invalid(
                "sort",
                format!(
                    "Sort field '{}' must match across '{}'",
                    entry.field,
                    across.name()
                ),
            ));
        }
        return Ok(ResolvedSort {
            target: SortTarget::Dimension(entry.field.clone()),
            order: entry.order,
        });
    }

    if entry.field == calculation.name() {
        let target = match metric(calculation) {
            Some(path) => SortTarget::Metric(path.to_string()),
            None => SortTarget::Count,
        };
        return Ok(ResolvedSort {
            target,
            order: entry.order,
        });
    }

    Err(Error::invalid(
        "sort",
        format!(
            "Sort field '{}' is neither across '{}' nor calculation '{}'",
            entry.field,
            across.name(),
            calculation.name()
        ),
    ))
}

/// Prefix `field` when it is a sortable column outside the unprefixed set
pub fn prefixed(field: &str, sortable: &[&str], prefix: &str) -> String {
    if sortable.contains(&field) && !UNPREFIXED.contains(&field) {
        format!("{}{}", prefix, field)
    } else {
        field.to_string()
    }
}

/// Sort rules of a list endpoint
#[derive(Debug, Clone, Copy)]
pub struct ListSortConfig {
    /// Column used when no sort is requested
    pub default_field: &'static str,
    /// Columns callers may sort by
    pub sortable: &'static [&'static str],
    /// Schema prefix added to sortable columns
    pub prefix: &'static str,
}

impl ListSortConfig {
    /// Resolve a list sort into a hit sort clause
    pub fn resolve(&self, sort: &SortSpec) -> Result<SortField> {
        let Some(entry) = sort.first() else {
            return Ok(SortField::new(
                prefixed(self.default_field, self.sortable, self.prefix),
                SortDirection::Desc,
            ));
        };

        if !self.sortable.contains(&entry.field.as_str()) && !UNPREFIXED.contains(&entry.field.as_str()) {
            return Err(Error::invalid(
                "sort",
                format!("Field '{}' is not sortable", entry.field),
            ));
        }

        Ok(SortField::new(
            prefixed(&entry.field, self.sortable, self.prefix),
            entry.order,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CommitCalculation, CommitDimension};

    fn commit_metric(calc: CommitCalculation) -> Option<&'static str> {
        match calc {
            CommitCalculation::Count => None,
            _ => Some("median[50.0]"),
        }
    }

    #[test]
    fn test_empty_sort_is_natural_desc() {
        let resolved = resolve(
            &SortSpec::new(),
            CommitDimension::Author,
            CommitCalculation::Count,
            commit_metric,
        )
        .unwrap();
        assert_eq!(resolved, ResolvedSort::natural());
        assert_eq!(resolved.request_sort(), SortField::new("_doc", SortDirection::Desc));
    }

    #[test]
    fn test_sort_by_across_keeps_direction() {
        for order in [SortDirection::Asc, SortDirection::Desc] {
            let resolved = resolve(
                &SortSpec::single("repo_id", order),
                CommitDimension::RepoId,
                CommitCalculation::Count,
                commit_metric,
            )
            .unwrap();
            assert_eq!(resolved.target, SortTarget::Dimension("repo_id".to_string()));
            assert_eq!(resolved.order, order);
        }
    }

    #[test]
    fn test_sort_by_other_dimension_fails() {
        let err = resolve(
            &SortSpec::single("project", SortDirection::Asc),
            CommitDimension::Author,
            CommitCalculation::Count,
            commit_metric,
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("sort"));
    }

    #[test]
    fn test_sort_by_calculation() {
        let resolved = resolve(
            &SortSpec::single("commit_days", SortDirection::Asc),
            CommitDimension::Author,
            CommitCalculation::CommitDays,
            commit_metric,
        )
        .unwrap();
        assert_eq!(resolved.target, SortTarget::Metric("median[50.0]".to_string()));

        let resolved = resolve(
            &SortSpec::single("count", SortDirection::Asc),
            CommitDimension::Author,
            CommitCalculation::Count,
            commit_metric,
        )
        .unwrap();
        assert_eq!(resolved.target, SortTarget::Count);
    }

    #[test]
    fn test_sort_by_unrelated_calculation_fails() {
        assert!(resolve(
            &SortSpec::single("count", SortDirection::Asc),
            CommitDimension::Author,
            CommitCalculation::CommitDays,
            commit_metric,
        )
        .is_err());
        assert!(resolve(
            &SortSpec::single("whatever", SortDirection::Asc),
            CommitDimension::Author,
            CommitCalculation::Count,
            commit_metric,
        )
        .is_err());
    }

    #[test]
    fn test_metric_sort_adds_bucket_sort_only_when_metric_exists() {
        let resolved = ResolvedSort {
            target: SortTarget::Metric("median[50.0]".to_string()),
            order: SortDirection::Asc,
        };
        let with_metric = resolved.apply(
            Aggregation::terms("c_author_id", 10).with_sub("median", Aggregation::median("c_tot_lines_changed")),
            10,
        );
        assert!(with_metric.aggs.contains_key("bucket_sort"));

        let without = resolved.apply(Aggregation::terms("c_author_id", 10), 10);
        assert!(!without.aggs.contains_key("bucket_sort"));
    }

    #[test]
    fn test_list_sort_prefixing() {
        let config = ListSortConfig {
            default_field: "committed_at",
            sortable: &["committed_at", "created_at"],
            prefix: "c_",
        };
        assert_eq!(config.resolve(&SortSpec::new()).unwrap().field, "c_committed_at");
        let field = config
            .resolve(&SortSpec::single("created_at", SortDirection::Asc))
            .unwrap();
        assert_eq!(field, SortField::new("c_created_at", SortDirection::Asc));
        assert_eq!(config.resolve(&SortSpec::single("_doc", SortDirection::Asc)).unwrap().field, "_doc");
        assert!(config.resolve(&SortSpec::single("author", SortDirection::Asc)).is_err());
    }
}
