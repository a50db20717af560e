//! Collaboration report
//!
//! Pull requests grouped by creator and collaboration state, optionally
//! drilled down by approver. Unlike regular stacking, the drill-down is
//! tolerant: a failing branch yields an empty stack for its row and the
//! report still succeeds.

use tracing::{debug, info, warn};

use super::pool::StackPool;
use super::EngineContext;
use crate::builder::pull_request::{
    self as prb, collab_primary_agg, collab_stack_agg, collab_stack_sort, COLLAB_ACROSS, COLLAB_STACK,
};
use crate::convert::pull_request::CollabKey;
use crate::dsl::aggregation::AggregationMap;
use crate::dsl::request::SearchRequest;
use crate::dsl::response::SearchResponse;
use crate::error::{BackendError, Result};
use crate::filter::{PrCalculation, PrDimension, PrFilter};
use crate::identity::IdentityMap;
use crate::ou::{OuConfig, OuRole};
use crate::result::{AggregationResult, ListResponse, NONE_KEY};
use crate::services::pull_requests::PullRequestKind;
use crate::sort;
use crate::types::PageWindow;

/// Creator x collaboration-state report over pull requests
pub struct CollabReport<'a> {
    ctx: &'a EngineContext,
}

impl<'a> CollabReport<'a> {
    /// Report over `ctx`
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Run the report; `with_approvers` adds the approver drill-down
    pub fn run(
        &self,
        tenant: &str,
        filter: &PrFilter,
        ou: Option<&OuConfig>,
        window: PageWindow,
        with_approvers: bool,
    ) -> Result<ListResponse<AggregationResult>> {
        let normalized = prb::normalize(filter);
        let filter = match ou {
            Some(ou) => self.ctx.ou.merge::<_, PullRequestKind>(tenant, &normalized, ou)?,
            None => normalized.clone(),
        };
        let window = self.ctx.clamp(window);

        let mut aggs = AggregationMap::new();
        aggs.insert(COLLAB_ACROSS.to_string(), collab_primary_agg(window.bucket_count()));
        let request = self.request(tenant, &filter, aggs);
        debug!(tenant, body = %request.body(), "Collaboration request");

        let response = self.ctx.backend.search(&request)?;
        let parents = primary_rows(&response, window)?;
        if !with_approvers {
            return Ok(parents);
        }

        // Branches pin creator and state; creator and approver OU roles do not apply
        let branch_base = match ou {
            Some(ou) => {
                let ou = ou.without(OuRole::Creator).without(OuRole::Approver);
                self.ctx.ou.merge::<_, PullRequestKind>(tenant, &normalized, &ou)?
            }
            None => normalized,
        };
        let identities = self.ctx.identity.map_for(tenant);
        let total = parents.count;
        let rows = if parents.records.is_empty() {
            Vec::new()
        } else {
            let threads = self.ctx.config.stack.parallelism.min(parents.records.len());
            let pool = StackPool::new("collab", threads)?;
            let stacks = pool.map(&parents.records, |row| self.approvers(tenant, &branch_base, row, &identities));
            parents
                .records
                .into_iter()
                .zip(stacks)
                .map(|(mut row, stack)| {
                    row.stacks = stack;
                    row
                })
                .collect()
        };
        info!(tenant, rows = rows.len(), "Collaboration report complete");
        Ok(ListResponse::new(rows, total))
    }

    fn request(&self, tenant: &str, filter: &PrFilter, aggs: AggregationMap) -> SearchRequest {
        SearchRequest::new(format!("{}{}", prb::INDEX_PREFIX, tenant))
            .with_query(prb::build_query(filter))
            .with_aggs(aggs)
            .with_window(0, 0)
    }

    /// Approver drill-down of one creator row; never fails
    fn approvers(
        &self,
        tenant: &str,
        filter: &PrFilter,
        parent: &AggregationResult,
        identities: &IdentityMap,
    ) -> Vec<AggregationResult> {
        if parent.key.is_empty() {
            return Vec::new();
        }
        match self.try_approvers(tenant, filter, parent, identities) {
            Ok(rows) if rows.is_empty() => vec![AggregationResult::new(NONE_KEY, parent.count).with_additional_key(NONE_KEY)],
            Ok(rows) => rows,
            Err(e) => {
                warn!(tenant, creator = %parent.key, error = %e, "Approver drill-down failed, leaving stack empty");
                Vec::new()
            }
        }
    }

    fn try_approvers(
        &self,
        tenant: &str,
        filter: &PrFilter,
        parent: &AggregationResult,
        identities: &IdentityMap,
    ) -> Result<Vec<AggregationResult>> {
        let mut branch = filter.clone();
        branch.include.creators = vec![parent.key.clone()];
        if let Some(state) = &parent.collab_state {
            branch.include.collab_states = vec![state.clone()];
        }
        branch.grouping.across = Some(PrDimension::Approver);
        branch.grouping.stacks.clear();
        branch.grouping.sort = collab_stack_sort();

        let order = sort::resolve(
            &branch.grouping.sort,
            PrDimension::Approver,
            PrCalculation::Count,
            prb::sort_metric,
        )?;
        let size = self.ctx.config.paging.max_page_size;
        let mut aggs = AggregationMap::new();
        aggs.insert(COLLAB_STACK.to_string(), order.apply(collab_stack_agg(size), size));

        let response = self.ctx.backend.search(&self.request(tenant, &branch, aggs))?;
        let agg = response
            .aggregation(COLLAB_STACK)
            .ok_or_else(|| BackendError::MissingAggregation(COLLAB_STACK.to_string()))?;
        Ok(agg
            .buckets()
            .iter()
            .filter_map(|bucket| {
                let key = bucket.key_string()?;
                let display = identities.get(&key).cloned().unwrap_or_else(|| NONE_KEY.to_string());
                Some(AggregationResult::new(key, bucket.doc_count()).with_additional_key(display))
            })
            .collect())
    }
}

fn primary_rows(response: &SearchResponse, window: PageWindow) -> Result<ListResponse<AggregationResult>> {
    let agg = response
        .aggregation(COLLAB_ACROSS)
        .ok_or_else(|| BackendError::MissingAggregation(COLLAB_ACROSS.to_string()))?;
    let buckets = agg.buckets();

    let mut total: u64 = buckets.iter().map(|b| b.doc_count()).sum();
    if buckets.len() >= window.bucket_count() {
        total += agg.sum_other_doc_count();
    }

    let rows = buckets
        .iter()
        .skip(window.from())
        .take(window.page_size)
        .filter_map(|bucket| {
            let raw = bucket.key_string()?;
            let row = match CollabKey::parse(&raw) {
                Some(key) => {
                    let mut row = AggregationResult::new(key.creator_id, bucket.doc_count())
                        .with_additional_key(key.creator);
                    row.collab_state = Some(key.collab_state);
                    row
                }
                None => AggregationResult::new(raw, bucket.doc_count()),
            };
            Some(row)
        })
        .collect();
    Ok(ListResponse::new(rows, total))
}
