//! Group-by executor
//!
//! One backend round-trip per call:
//!
//! 1. `across` must be set; nothing is sent otherwise
//! 2. aliases are normalized and the sort is resolved against the aggregation
//! 3. the OU config, when given, is merged into the filter
//! 4. query, primary bucket aggregation and metrics are built and sent
//! 5. buckets become rows; identity dimensions get display ids
//!
//! The primary aggregation only materializes the buckets up to the end of the
//! requested page. When the backend had more, its "other buckets" document
//! count is added to the total.

use std::marker::PhantomData;

use tracing::{debug, info};

use super::{index_name, CalculationOf, DimensionOf, EngineContext, FacetKind};
use crate::builder::UNNEST_DOCS;
use crate::dsl::aggregation::{Aggregation, AggregationMap};
use crate::dsl::request::SearchRequest;
use crate::dsl::response::{AggregateView, SearchResponse};
use crate::error::{BackendError, Error, Result};
use crate::filter::{Dimension, FilterModel};
use crate::ou::OuConfig;
use crate::result::{AggregationResult, ListResponse, NONE_KEY};
use crate::sort::{self, ResolvedSort};
use crate::types::PageWindow;

/// Name of the primary bucket aggregation of `across`
pub fn across_name<D: Dimension>(across: D) -> String {
    format!("across_{}", across.name())
}

/// Runs single-level group-bys for kind `K`
pub struct GroupByExecutor<'a, K> {
    ctx: &'a EngineContext,
    _kind: PhantomData<fn() -> K>,
}

impl<'a, K: FacetKind> GroupByExecutor<'a, K> {
    /// Executor over `ctx`
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self {
            ctx,
            _kind: PhantomData,
        }
    }

    /// Group `filter` by its `across` dimension.
    ///
    /// `values_only` skips metric aggregations (distinct-value listing).
    pub fn run(
        &self,
        tenant: &str,
        filter: &K::Filter,
        values_only: bool,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<AggregationResult>> {
        let filter = K::normalize(filter);
        let across = filter
            .grouping()
            .across
            .ok_or_else(|| Error::invalid("across", "Across cant be missing for groupby query."))?;
        let sort = sort::resolve(
            &filter.grouping().sort,
            across,
            filter.grouping().calculation_or_default(),
            K::sort_metric,
        )?;

        let filter = match ou {
            Some(ou) => self.ctx.ou.merge::<_, K>(tenant, &filter, ou)?,
            None => filter,
        };

        let window = self.ctx.clamp(window);
        let request = self.request(tenant, &filter, across, &sort, values_only, window);
        debug!(tenant, kind = K::NAME, body = %request.body(), "Group-by request");

        let response = self.ctx.backend.search(&request)?;
        let rows = self.rows(tenant, &filter, across, values_only, &response, window)?;
        info!(
            tenant,
            kind = K::NAME,
            across = across.name(),
            rows = rows.records.len(),
            total = rows.count,
            "Group-by complete"
        );
        Ok(rows)
    }

    /// Request for an already normalized filter
    pub fn request(
        &self,
        tenant: &str,
        filter: &K::Filter,
        across: DimensionOf<K>,
        sort: &ResolvedSort,
        values_only: bool,
        window: PageWindow,
    ) -> SearchRequest {
        let bucket_count = window.bucket_count();
        let calculation: CalculationOf<K> = filter.grouping().calculation_or_default();
        let metrics = if values_only {
            AggregationMap::new()
        } else {
            K::metric_aggs(filter, calculation, &self.ctx.build_params())
        };

        let primary = match K::unnest(across) {
            Some(nested) => {
                let buckets = K::bucket_agg(filter, across, bucket_count)
                    .with_sub(UNNEST_DOCS, Aggregation::reverse_nested().with_subs(metrics));
                Aggregation::nested(nested.path).with_sub(across.name(), sort.apply(buckets, bucket_count))
            }
            None => sort.apply(K::bucket_agg(filter, across, bucket_count).with_subs(metrics), bucket_count),
        };

        let mut aggs = AggregationMap::new();
        aggs.insert(across_name(across), primary);

        SearchRequest::new(index_name::<K>(tenant))
            .with_query(K::build_query(filter))
            .with_aggs(aggs)
            .with_window(0, 0)
            .with_sort(sort.request_sort())
    }

    fn rows(
        &self,
        tenant: &str,
        filter: &K::Filter,
        across: DimensionOf<K>,
        values_only: bool,
        response: &SearchResponse,
        window: PageWindow,
    ) -> Result<ListResponse<AggregationResult>> {
        let name = across_name(across);
        let mut agg = response
            .aggregation(&name)
            .ok_or_else(|| BackendError::MissingAggregation(name.clone()))?;
        let unnested = K::unnest(across).is_some();
        if unnested {
            agg = agg
                .sub(across.name())
                .ok_or_else(|| BackendError::MissingAggregation(format!("{}.{}", name, across.name())))?;
        }

        let identities = across.identity_role().map(|_| self.ctx.identity.map_for(tenant));
        let calculation = filter.grouping().calculation_or_default();
        let interval = filter.grouping().interval;

        let buckets = agg.buckets();
        let body = |view: AggregateView<'_>| -> u64 {
            if unnested {
                view.sub(UNNEST_DOCS).map(|d| d.doc_count()).unwrap_or_else(|| view.doc_count())
            } else {
                view.doc_count()
            }
        };

        let mut total: u64 = buckets.iter().map(|b| body(b.view())).sum();
        if buckets.len() >= window.bucket_count() {
            total += agg.sum_other_doc_count();
        }

        let rows = buckets
            .iter()
            .skip(window.from())
            .take(window.page_size)
            .filter_map(|bucket| {
                let key = if across.is_time() {
                    bucket.key_i64().map(|ms| ms.div_euclid(1000).to_string())
                } else {
                    bucket.key_string()
                }?;
                let view = if unnested {
                    bucket.sub(UNNEST_DOCS).unwrap_or_else(|| bucket.view())
                } else {
                    bucket.view()
                };

                let mut row = AggregationResult::new(key, view.doc_count());
                if across.is_time() {
                    row.additional_key = bucket.key_i64().and_then(|ms| interval.label(ms));
                } else if let Some(map) = &identities {
                    row.additional_key = Some(map.get(&row.key).cloned().unwrap_or_else(|| NONE_KEY.to_string()));
                }
                if !values_only {
                    K::fill_metrics(&mut row, view, calculation, filter);
                }
                Some(row)
            })
            .collect();

        Ok(ListResponse::new(rows, total))
    }
}
