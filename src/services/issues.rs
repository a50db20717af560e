//! Issue facets

use crate::builder::{issue as builder, BuildParams, Unnest};
use crate::convert::{decode_hits, issue as convert};
use crate::dsl::aggregation::{Aggregation, AggregationMap};
use crate::dsl::query::BoolQuery;
use crate::dsl::response::{AggregateView, SearchResponse};
use crate::engine::FacetKind;
use crate::error::Result;
use crate::filter::{Dimension, IssueCalculation, IssueDimension, IssueFilter};
use crate::ou::{OuConfig, OuRole, OuScope, ISSUE_INTEGRATION_TYPES};
use crate::result::{AggregationResult, IssueRecord};
use crate::sort::ListSortConfig;

const SORTABLE: &[&str] = &["created_at", "updated_at", "resolved_at", "story_points", "age"];

/// Work item documents
#[derive(Debug, Clone, Copy)]
pub struct IssueKind;

impl OuScope for IssueKind {
    const INTEGRATION_TYPES: &'static [&'static str] = ISSUE_INTEGRATION_TYPES;

    fn ou_roles(ou: &OuConfig) -> Vec<OuRole> {
        [OuRole::Assignee, OuRole::Reporter]
            .into_iter()
            .filter(|role| ou.has(*role))
            .collect()
    }
}

impl FacetKind for IssueKind {
    type Filter = IssueFilter;
    type Record = IssueRecord;

    const NAME: &'static str = "issues";
    const INDEX_PREFIX: &'static str = builder::INDEX_PREFIX;

    fn build_query(filter: &IssueFilter) -> BoolQuery {
        builder::build_query(filter)
    }

    fn bucket_agg(filter: &IssueFilter, across: IssueDimension, size: usize) -> Aggregation {
        builder::bucket_agg(filter, across, size)
    }

    fn unnest(across: IssueDimension) -> Option<Unnest> {
        builder::unnest(across)
    }

    fn metric_aggs(_filter: &IssueFilter, calculation: IssueCalculation, _params: &BuildParams) -> AggregationMap {
        builder::metric_aggs(calculation)
    }

    fn sort_metric(calculation: IssueCalculation) -> Option<&'static str> {
        builder::sort_metric(calculation)
    }

    fn fill_metrics(
        row: &mut AggregationResult,
        bucket: AggregateView<'_>,
        calculation: IssueCalculation,
        _filter: &IssueFilter,
    ) {
        convert::fill_metrics(row, bucket, calculation)
    }

    fn stack_supported(dim: IssueDimension) -> bool {
        !dim.is_time()
    }

    fn list_sort() -> ListSortConfig {
        ListSortConfig {
            default_field: "created_at",
            sortable: SORTABLE,
            prefix: builder::FIELD_PREFIX,
        }
    }

    fn to_records(response: &SearchResponse, _filter: &IssueFilter, _params: &BuildParams) -> Result<Vec<IssueRecord>> {
        Ok(decode_hits::<convert::IssueDocument>(response)?
            .into_iter()
            .map(|(id, doc)| convert::to_record(id, doc))
            .collect())
    }
}
