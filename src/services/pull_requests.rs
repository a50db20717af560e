//! Pull request facets

use super::Facets;
use crate::builder::{pull_request as builder, BuildParams, Unnest};
use crate::convert::{decode_hits, pull_request as convert};
use crate::dsl::aggregation::{Aggregation, AggregationMap};
use crate::dsl::query::BoolQuery;
use crate::dsl::response::{AggregateView, SearchResponse};
use crate::engine::{CollabReport, FacetKind};
use crate::error::Result;
use crate::filter::{Dimension, PrCalculation, PrDimension, PrFilter};
use crate::ou::{OuConfig, OuRole, OuScope, SCM_INTEGRATION_TYPES};
use crate::result::{AggregationResult, ListResponse, PrRecord};
use crate::sort::ListSortConfig;
use crate::types::PageWindow;

const SORTABLE: &[&str] = &[
    "updated_at",
    "created_at",
    "merged_at",
    "closed_at",
    "additions",
    "deletions",
    "changes",
    "cycle_time",
];

const ROLES: [OuRole; 4] = [OuRole::Creator, OuRole::Assignee, OuRole::Reviewer, OuRole::Approver];

/// Pull request documents
#[derive(Debug, Clone, Copy)]
pub struct PullRequestKind;

impl OuScope for PullRequestKind {
    const INTEGRATION_TYPES: &'static [&'static str] = SCM_INTEGRATION_TYPES;

    fn ou_roles(ou: &OuConfig) -> Vec<OuRole> {
        ROLES.into_iter().filter(|role| ou.has(*role)).collect()
    }
}

impl FacetKind for PullRequestKind {
    type Filter = PrFilter;
    type Record = PrRecord;

    const NAME: &'static str = "prs";
    const INDEX_PREFIX: &'static str = builder::INDEX_PREFIX;

    fn normalize(filter: &PrFilter) -> PrFilter {
        builder::normalize(filter)
    }

    fn build_query(filter: &PrFilter) -> BoolQuery {
        builder::build_query(filter)
    }

    fn bucket_agg(filter: &PrFilter, across: PrDimension, size: usize) -> Aggregation {
        builder::bucket_agg(filter, across, size)
    }

    fn unnest(across: PrDimension) -> Option<Unnest> {
        builder::unnest(across)
    }

    fn metric_aggs(_filter: &PrFilter, calculation: PrCalculation, _params: &BuildParams) -> AggregationMap {
        builder::metric_aggs(calculation)
    }

    fn sort_metric(calculation: PrCalculation) -> Option<&'static str> {
        builder::sort_metric(calculation)
    }

    fn fill_metrics(row: &mut AggregationResult, bucket: AggregateView<'_>, calculation: PrCalculation, _filter: &PrFilter) {
        convert::fill_metrics(row, bucket, calculation)
    }

    fn stack_supported(dim: PrDimension) -> bool {
        !dim.is_time()
    }

    fn list_sort() -> ListSortConfig {
        ListSortConfig {
            default_field: "updated_at",
            sortable: SORTABLE,
            prefix: builder::FIELD_PREFIX,
        }
    }

    fn to_records(response: &SearchResponse, _filter: &PrFilter, _params: &BuildParams) -> Result<Vec<PrRecord>> {
        Ok(decode_hits::<convert::PrDocument>(response)?
            .into_iter()
            .map(|(id, doc)| convert::to_record(id, doc))
            .collect())
    }
}

impl Facets<PullRequestKind> {
    /// Creator x collaboration-state report.
    ///
    /// With `with_approvers`, each row is drilled down by approver; a failing
    /// drill-down leaves that row's stack empty instead of failing the report.
    pub fn collab(
        &self,
        tenant: &str,
        filter: &PrFilter,
        ou: Option<&OuConfig>,
        window: PageWindow,
        with_approvers: bool,
    ) -> Result<ListResponse<AggregationResult>> {
        CollabReport::new(self.context()).run(tenant, filter, ou, window, with_approvers)
    }
}
