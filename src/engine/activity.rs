//! Commit activity listings
//!
//! Contributors, file types / repositories and files. Each is one terms
//! aggregation over the commit index, paged like a group-by, with the
//! number of distinct keys as the total. Orders come from a fixed set of
//! sortable columns named after the bucket metrics.

use tracing::{debug, info};

use super::{index_name, EngineContext};
use crate::builder::commit::{self as builder, activity, ACTIVITY_SORTABLE, CONTRIBUTOR_SORTABLE};
use crate::convert::commit as convert;
use crate::dsl::aggregation::AggregationMap;
use crate::dsl::request::{SearchRequest, SortField};
use crate::dsl::response::{AggregateView, Bucket, SearchResponse};
use crate::error::{BackendError, Error, Result};
use crate::filter::{ActivityAcross, CommitFilter, ContributorRole};
use crate::ou::OuConfig;
use crate::result::{ActivityRecord, ContributorRecord, FileRecord, ListResponse};
use crate::services::commits::CommitKind;
use crate::sort::ListSortConfig;
use crate::types::{PageWindow, SortSpec};

const CONTRIBUTOR_SORT: ListSortConfig = ListSortConfig {
    default_field: activity::NUM_COMMITS,
    sortable: CONTRIBUTOR_SORTABLE,
    prefix: "",
};

const ACTIVITY_SORT: ListSortConfig = ListSortConfig {
    default_field: activity::NUM_COMMITS,
    sortable: ACTIVITY_SORTABLE,
    prefix: "",
};

/// Aggregated commit activity listings
pub struct ActivityReport<'a> {
    ctx: &'a EngineContext,
}

impl<'a> ActivityReport<'a> {
    /// Report over `ctx`
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// One row per author or committer
    pub fn contributors(
        &self,
        tenant: &str,
        filter: &CommitFilter,
        role: ContributorRole,
        sort: &SortSpec,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<ContributorRecord>> {
        let order = bucket_order(&CONTRIBUTOR_SORT, sort)?;
        let window = self.ctx.clamp(window);
        let aggs = builder::contributor_aggs(role, &order, window.bucket_count());
        let response = self.search(tenant, filter, ou, aggs)?;

        let name = format!("across_{}", role.as_str());
        let buckets = required(&response, &name)?;
        let rows = page(buckets, window, convert::to_contributor);
        let total = distinct_total(response.aggregation(activity::TOTAL));
        info!(tenant, role = role.as_str(), rows = rows.len(), total, "Contributor listing complete");
        Ok(ListResponse::new(rows, total))
    }

    /// One row per file type or repository
    pub fn activity(
        &self,
        tenant: &str,
        filter: &CommitFilter,
        across: ActivityAcross,
        sort: &SortSpec,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<ActivityRecord>> {
        let order = bucket_order(&ACTIVITY_SORT, sort)?;
        let window = self.ctx.clamp(window);
        let aggs = builder::activity_aggs(across, &order, window.bucket_count());
        let response = self.search(tenant, filter, ou, aggs)?;

        let name = format!("across_{}", across.as_str());
        let buckets = required(&response, &name)?;
        let rows = page(buckets, window, convert::to_activity);
        let total = distinct_total(response.aggregation(activity::TOTAL));
        info!(tenant, across = across.as_str(), rows = rows.len(), total, "Activity listing complete");
        Ok(ListResponse::new(rows, total))
    }

    /// One row per changed file path
    pub fn files(
        &self,
        tenant: &str,
        filter: &CommitFilter,
        sort: &SortSpec,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<FileRecord>> {
        let order = bucket_order(&ACTIVITY_SORT, sort)?;
        let window = self.ctx.clamp(window);
        let aggs = builder::file_aggs(&order, window.bucket_count());
        let response = self.search(tenant, filter, ou, aggs)?;

        let nested = required(&response, activity::ACROSS_FILES)?;
        let buckets = nested.sub(activity::FILE_LIST).ok_or_else(|| {
            BackendError::MissingAggregation(format!("{}.{}", activity::ACROSS_FILES, activity::FILE_LIST))
        })?;
        let rows = page(buckets, window, convert::to_file);
        let total = distinct_total(nested.sub(activity::TOTAL));
        info!(tenant, rows = rows.len(), total, "File listing complete");
        Ok(ListResponse::new(rows, total))
    }

    fn search(
        &self,
        tenant: &str,
        filter: &CommitFilter,
        ou: Option<&OuConfig>,
        aggs: AggregationMap,
    ) -> Result<SearchResponse> {
        let filter = match ou {
            Some(ou) => self.ctx.ou.merge::<_, CommitKind>(tenant, filter, ou)?,
            None => filter.clone(),
        };
        let request = SearchRequest::new(index_name::<CommitKind>(tenant))
            .with_query(builder::build_query(&filter))
            .with_aggs(aggs)
            .with_window(0, 0);
        debug!(tenant, body = %request.body(), "Activity request");
        Ok(self.ctx.backend.search(&request)?)
    }
}

/// Resolved order; only bucket metrics qualify
fn bucket_order(config: &ListSortConfig, sort: &SortSpec) -> Result<SortField> {
    let order = config.resolve(sort)?;
    if !config.sortable.contains(&order.field.as_str()) {
        return Err(Error::invalid("sort", format!("Field '{}' is not sortable", order.field)));
    }
    Ok(order)
}

fn required<'r>(response: &'r SearchResponse, name: &str) -> Result<AggregateView<'r>> {
    Ok(response
        .aggregation(name)
        .ok_or_else(|| BackendError::MissingAggregation(name.to_string()))?)
}

fn page<T>(agg: AggregateView<'_>, window: PageWindow, row: impl Fn(&Bucket<'_>) -> Option<T>) -> Vec<T> {
    agg.buckets()
        .iter()
        .skip(window.from())
        .take(window.page_size)
        .filter_map(row)
        .collect()
}

fn distinct_total(agg: Option<AggregateView<'_>>) -> u64 {
    agg.and_then(|a| a.value()).map(|v| v.round() as u64).unwrap_or(0)
}
