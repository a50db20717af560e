//! Faceted aggregation engine
//!
//! The engine is generic over a [`FacetKind`]: a marker type that ties a
//! filter model to its index, its query / aggregation builders and its
//! response converters. Executors are written once against the trait.
//!
//! ```text
//!   GroupByExecutor ── one round-trip, rows + total
//!   StackExecutor   ── primary group-by, Top-N cap, parallel drill-down
//!   ListExecutor    ── one page of documents, derived record fields
//!   CollabReport    ── creator x state primary, tolerant approver drill-down
//!   ActivityReport  ── contributor, file-type / repo and file activity
//! ```

pub mod activity;
pub mod collab;
pub mod group_by;
pub mod list;
pub mod pool;
pub mod stack;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::Serialize;

use crate::backend::SearchBackend;
use crate::builder::{BuildParams, Unnest};
use crate::config::EngineConfig;
use crate::dsl::aggregation::{Aggregation, AggregationMap};
use crate::dsl::query::BoolQuery;
use crate::dsl::response::{AggregateView, SearchResponse};
use crate::error::Result;
use crate::filter::FilterModel;
use crate::identity::IdentityCache;
use crate::ou::{OuResolver, OuScope};
use crate::result::AggregationResult;
use crate::sort::ListSortConfig;
use crate::store::RelationalStore;
use crate::types::PageWindow;

pub use activity::ActivityReport;
pub use collab::CollabReport;
pub use group_by::GroupByExecutor;
pub use list::ListExecutor;
pub use pool::StackPool;
pub use stack::{cap_parents, StackExecutor};

/// Grouping dimension of a kind
pub type DimensionOf<K> = <<K as FacetKind>::Filter as FilterModel>::Dimension;

/// Calculation of a kind
pub type CalculationOf<K> = <<K as FacetKind>::Filter as FilterModel>::Calculation;

/// A document kind the engine can aggregate
pub trait FacetKind: OuScope + Send + Sync + 'static {
    /// Filter model of the kind
    type Filter: FilterModel;

    /// Record type of the list endpoint
    type Record: Serialize + Send;

    /// Kind name used in logs
    const NAME: &'static str;

    /// Index prefix; the tenant is appended
    const INDEX_PREFIX: &'static str;

    /// Rewrite aliases before anything else looks at the filter
    fn normalize(filter: &Self::Filter) -> Self::Filter {
        filter.clone()
    }

    /// Boolean query of the filter
    fn build_query(filter: &Self::Filter) -> BoolQuery;

    /// Bucket aggregation of `across`
    fn bucket_agg(filter: &Self::Filter, across: DimensionOf<Self>, size: usize) -> Aggregation;

    /// Nested source when `across` buckets array-of-object values
    fn unnest(across: DimensionOf<Self>) -> Option<Unnest>;

    /// Metric sub-aggregations of `calculation`
    fn metric_aggs(filter: &Self::Filter, calculation: CalculationOf<Self>, params: &BuildParams) -> AggregationMap;

    /// Metric path `calculation` sorts by; `None` for document count
    fn sort_metric(calculation: CalculationOf<Self>) -> Option<&'static str>;

    /// Fill the metric fields of one row
    fn fill_metrics(
        row: &mut AggregationResult,
        bucket: AggregateView<'_>,
        calculation: CalculationOf<Self>,
        filter: &Self::Filter,
    );

    /// `dim` may be used as a drill-down
    fn stack_supported(dim: DimensionOf<Self>) -> bool;

    /// Sort rules of the list endpoint
    fn list_sort() -> ListSortConfig;

    /// Convert list hits into records
    fn to_records(response: &SearchResponse, filter: &Self::Filter, params: &BuildParams) -> Result<Vec<Self::Record>>;
}

/// Shared collaborators of every executor
pub struct EngineContext {
    /// Search backend
    pub backend: Arc<dyn SearchBackend>,
    /// Relational metadata store
    pub store: Arc<dyn RelationalStore>,
    /// Per-tenant identity translation
    pub identity: Arc<IdentityCache>,
    /// OU resolution
    pub ou: OuResolver,
    /// Engine settings
    pub config: EngineConfig,
}

impl EngineContext {
    /// Context over `backend` and `store`, with an identity cache sized from `config`
    pub fn new(backend: Arc<dyn SearchBackend>, store: Arc<dyn RelationalStore>, config: EngineConfig) -> Self {
        let identity = Arc::new(IdentityCache::new(Arc::clone(&store), config.identity.cache_capacity));
        Self {
            backend,
            ou: OuResolver::new(Arc::clone(&store)),
            store,
            identity,
            config,
        }
    }

    /// Build parameters anchored at the current time
    pub fn build_params(&self) -> BuildParams {
        BuildParams::now(self.config.list.legacy_window_days)
    }

    /// `window` with its page size clamped to the configured maximum
    pub fn clamp(&self, window: PageWindow) -> PageWindow {
        PageWindow::new(window.page, window.page_size.min(self.config.paging.max_page_size))
    }
}

/// Index of `K` for `tenant`
pub fn index_name<K: FacetKind>(tenant: &str) -> String {
    format!("{}{}", K::INDEX_PREFIX, tenant)
}
