//! Caller-facing facet services
//!
//! One facade per document kind, all sharing a single [`EngineContext`]:
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌─────────────┐
//! │ CommitFacets │   │ PullRequestFacets │   │ IssueFacets │
//! └──────┬───────┘   └─────────┬─────────┘   └──────┬──────┘
//!        └─────────────────────┼────────────────────┘
//!                              ▼
//!                     ┌─────────────────┐
//!                     │  EngineContext  │ backend, store, identity, OU
//!                     └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use scm_facets::backend::HttpSearchBackend;
//! use scm_facets::config::EngineConfig;
//! use scm_facets::engine::EngineContext;
//! use scm_facets::services::CommitFacets;
//! use scm_facets::store::InMemoryStore;
//!
//! let config = EngineConfig::default();
//! let backend = HttpSearchBackend::new(&config.backend).unwrap();
//! let ctx = Arc::new(EngineContext::new(Arc::new(backend), Arc::new(InMemoryStore::new()), config));
//! let commits = CommitFacets::new(ctx);
//! assert_eq!(commits.default_page_size(), 100);
//! ```

pub mod commits;
pub mod issues;
pub mod pull_requests;

use std::marker::PhantomData;
use std::sync::Arc;

use crate::engine::{DimensionOf, EngineContext, FacetKind, GroupByExecutor, ListExecutor, StackExecutor};
use crate::error::Result;
use crate::filter::FilterModel;
use crate::ou::OuConfig;
use crate::result::{AggregationResult, ListResponse};
use crate::types::{PageWindow, SortSpec};

pub use commits::CommitKind;
pub use issues::IssueKind;
pub use pull_requests::PullRequestKind;

/// Facet operations over commits
pub type CommitFacets = Facets<CommitKind>;

/// Facet operations over pull requests
pub type PullRequestFacets = Facets<PullRequestKind>;

/// Facet operations over issues
pub type IssueFacets = Facets<IssueKind>;

/// Group-by, stacked group-by and list operations for kind `K`
pub struct Facets<K> {
    ctx: Arc<EngineContext>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for Facets<K> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            _kind: PhantomData,
        }
    }
}

impl<K: FacetKind> Facets<K> {
    /// Facade over a shared context
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self {
            ctx,
            _kind: PhantomData,
        }
    }

    /// Shared context
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Configured default page size
    pub fn default_page_size(&self) -> usize {
        self.ctx.config.paging.default_page_size
    }

    /// Page window from the filter's own paging fields
    pub fn window_of(&self, filter: &K::Filter) -> PageWindow {
        filter.grouping().page_window(self.default_page_size())
    }

    /// Rows grouped by `filter.across`, with the total across all pages
    pub fn group_by(
        &self,
        tenant: &str,
        filter: &K::Filter,
        values_only: bool,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<AggregationResult>> {
        GroupByExecutor::<K>::new(&self.ctx).run(tenant, filter, values_only, ou, window)
    }

    /// Rows grouped by `filter.across`, each drilled down by the first of
    /// `stacks`. An empty `stacks` keeps the filter's own.
    pub fn stacked_group_by(
        &self,
        tenant: &str,
        filter: &K::Filter,
        stacks: &[DimensionOf<K>],
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<AggregationResult>> {
        let executor = StackExecutor::<K>::new(&self.ctx);
        if stacks.is_empty() {
            return executor.run(tenant, filter, ou, window);
        }
        let mut stacked = filter.clone();
        stacked.grouping_mut().stacks = stacks.to_vec();
        executor.run(tenant, &stacked, ou, window)
    }

    /// One page of documents
    pub fn list(
        &self,
        tenant: &str,
        filter: &K::Filter,
        sort: &SortSpec,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<K::Record>> {
        ListExecutor::<K>::new(&self.ctx).run(tenant, filter, sort, ou, window)
    }
}
