//! Per-document listing

use std::marker::PhantomData;

use tracing::{debug, info};

use super::{index_name, EngineContext, FacetKind};
use crate::dsl::request::SearchRequest;
use crate::error::Result;
use crate::ou::OuConfig;
use crate::result::ListResponse;
use crate::types::{PageWindow, SortSpec};

/// Lists raw documents of kind `K`; no `across` required
pub struct ListExecutor<'a, K> {
    ctx: &'a EngineContext,
    _kind: PhantomData<fn() -> K>,
}

impl<'a, K: FacetKind> ListExecutor<'a, K> {
    /// Executor over `ctx`
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self {
            ctx,
            _kind: PhantomData,
        }
    }

    /// One page of records matching `filter`, ordered by `sort`
    pub fn run(
        &self,
        tenant: &str,
        filter: &K::Filter,
        sort: &SortSpec,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<K::Record>> {
        let order = K::list_sort().resolve(sort)?;
        let filter = K::normalize(filter);
        let filter = match ou {
            Some(ou) => self.ctx.ou.merge::<_, K>(tenant, &filter, ou)?,
            None => filter,
        };

        let window = self.ctx.clamp(window);
        let request = SearchRequest::new(index_name::<K>(tenant))
            .with_query(K::build_query(&filter))
            .with_window(window.from(), window.page_size)
            .with_sort(order);
        debug!(tenant, kind = K::NAME, body = %request.body(), "List request");

        let response = self.ctx.backend.search(&request)?;
        let records = K::to_records(&response, &filter, &self.ctx.build_params())?;
        info!(tenant, kind = K::NAME, records = records.len(), "List complete");
        Ok(ListResponse::new(records, response.total_hits()))
    }
}
