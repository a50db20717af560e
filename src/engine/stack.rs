//! Stack (drill-down) executor
//!
//! ```text
//!   PRIMARY_QUERY ─► CAP_IF_NEEDED ─► FAN_OUT (pool) ─► MERGE ─► DONE
//!                                        │
//!                                        └─ any branch fails ─► FAILED
//! ```
//!
//! Branches are independent: each narrows the caller's filter to one parent
//! key, runs its own group-by on the drill-down dimension and writes only
//! into its own parent row. The caller's filter is never modified.

use std::collections::{BTreeSet, HashSet};
use std::marker::PhantomData;

use tracing::{error, info};

use super::group_by::GroupByExecutor;
use super::pool::StackPool;
use super::{DimensionOf, EngineContext, FacetKind};
use crate::error::{Error, Result};
use crate::filter::{Dimension, FilterModel};
use crate::ou::OuConfig;
use crate::result::{AggregationResult, ListResponse};
use crate::types::{PageWindow, SortDirection, SortSpec};

/// Bound the parents eligible for drill-down.
///
/// At or below `count_threshold` rows the input is returned as is. Above
/// it, rows are ranked by churn and the `top_n / 2` lowest plus the
/// `top_n / 2` highest are kept, deduplicated by key, in primary order.
pub fn cap_parents(rows: Vec<AggregationResult>, count_threshold: usize, top_n: usize) -> Vec<AggregationResult> {
    if rows.len() <= count_threshold {
        return rows;
    }

    let mut ranked: Vec<usize> = (0..rows.len()).collect();
    ranked.sort_by_key(|&i| rows[i].churn());
    let half = top_n / 2;
    let keep: BTreeSet<usize> = ranked
        .iter()
        .take(half)
        .chain(ranked.iter().rev().take(half))
        .copied()
        .collect();

    let mut seen = HashSet::new();
    rows.into_iter()
        .enumerate()
        .filter(|(i, row)| keep.contains(i) && seen.insert(row.key.clone()))
        .map(|(_, row)| row)
        .collect()
}

/// OU of the drill-down branches.
///
/// Only the roles the primary query applied carry over, minus the role
/// `across` already narrows to a single key.
fn branch_ou<K: FacetKind>(ou: &OuConfig, across: DimensionOf<K>) -> OuConfig {
    let across_role = across.identity_role();
    ou.with_roles(K::ou_roles(ou).into_iter().filter(|role| Some(*role) != across_role))
}

/// Runs group-bys with one level of drill-down for kind `K`
pub struct StackExecutor<'a, K> {
    ctx: &'a EngineContext,
    _kind: PhantomData<fn() -> K>,
}

impl<'a, K: FacetKind> StackExecutor<'a, K> {
    /// Executor over `ctx`
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self {
            ctx,
            _kind: PhantomData,
        }
    }

    /// Group by `across`, then drill each parent row down by the first stack.
    ///
    /// Without a supported stack the primary rows come back unchanged.
    pub fn run(
        &self,
        tenant: &str,
        filter: &K::Filter,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<AggregationResult>> {
        let group_by = GroupByExecutor::<K>::new(self.ctx);
        let primary = group_by.run(tenant, filter, false, ou, window)?;

        let normalized = K::normalize(filter);
        let grouping = normalized.grouping();
        let (Some(across), Some(stack)) = (grouping.across, grouping.first_stack()) else {
            return Ok(primary);
        };
        if !K::stack_supported(stack) {
            info!(kind = K::NAME, stack = stack.name(), "Stack not supported, returning primary rows");
            return Ok(primary);
        }

        let settings = &self.ctx.config.stack;
        let total = primary.count;
        let parent_count = primary.records.len();
        let parents = cap_parents(primary.records, settings.count_threshold, settings.top_n);
        if parents.len() < parent_count {
            info!(
                tenant,
                kind = K::NAME,
                parents = parent_count,
                kept = parents.len(),
                "Top-N capping applied before drill-down"
            );
        }

        let branches = parents
            .iter()
            .map(|row| self.branch_filter(&normalized, across, stack, &row.key))
            .collect::<Result<Vec<_>>>()?;
        let branch_ou = ou.map(|ou| branch_ou::<K>(ou, across));
        let branch_window = PageWindow::new(0, window.page_size);

        if stack.identity_role().is_some() {
            self.ctx.identity.map_for(tenant);
        }

        info!(tenant, kind = K::NAME, stack = stack.name(), branches = branches.len(), "Stacking started");
        let outcomes = if branches.is_empty() {
            Vec::new()
        } else {
            let pool = StackPool::new(K::NAME, self.ctx.config.stack.parallelism.min(branches.len()))?;
            pool.map(&branches, |branch| {
                group_by.run(tenant, branch, false, branch_ou.as_ref(), branch_window)
            })
        };

        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        let mut rows = Vec::with_capacity(parents.len());
        let mut first_error = None;
        for (mut parent, outcome) in parents.into_iter().zip(outcomes) {
            match outcome {
                Ok(drill) => {
                    parent.stacks = drill.records;
                    rows.push(parent);
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(source) = first_error {
            error!(tenant, kind = K::NAME, stack = stack.name(), failed, error = %source, "Stacking failed");
            return Err(Error::StackFanOut {
                stack: stack.name().to_string(),
                failed,
                source: Box::new(source),
            });
        }

        info!(tenant, kind = K::NAME, stack = stack.name(), rows = rows.len(), "Stacking finished");
        Ok(ListResponse::new(rows, total))
    }

    fn branch_filter(
        &self,
        filter: &K::Filter,
        across: DimensionOf<K>,
        stack: DimensionOf<K>,
        key: &str,
    ) -> Result<K::Filter> {
        let mut branch = filter
            .narrowed(across, key, filter.grouping().interval)
            .ok_or_else(|| {
                Error::invalid(
                    "across",
                    format!("Across '{}' cannot be narrowed for stacking", across.name()),
                )
            })?;
        let grouping = branch.grouping_mut();
        grouping.across = Some(stack);
        grouping.stacks.clear();
        grouping.sort = SortSpec::single(stack.name(), SortDirection::Asc);
        Ok(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CommitDimension, PrDimension};
    use crate::ou::OuRole;
    use crate::services::commits::CommitKind;
    use crate::services::pull_requests::PullRequestKind;

    fn row(key: &str, churn: i64) -> AggregationResult {
        let mut row = AggregationResult::new(key, 1);
        row.lines_changed_count = Some(churn);
        row
    }

    #[test]
    fn test_cap_is_noop_at_threshold() {
        let rows: Vec<_> = (0..50).map(|i| row(&format!("k{}", i), 50 - i)).collect();
        let capped = cap_parents(rows.clone(), 50, 30);
        assert_eq!(capped, rows);
    }

    #[test]
    fn test_cap_keeps_extremes_in_primary_order() {
        let churn = |i: i64| (i * 37) % 80;
        let rows: Vec<_> = (0..80).map(|i| row(&format!("k{}", i), churn(i))).collect();
        let capped = cap_parents(rows.clone(), 50, 30);

        assert_eq!(capped.len(), 30);
        let max = rows.iter().max_by_key(|r| r.churn()).unwrap();
        let min = rows.iter().min_by_key(|r| r.churn()).unwrap();
        assert!(capped.iter().any(|r| r.key == max.key));
        assert!(capped.iter().any(|r| r.key == min.key));

        let positions: Vec<usize> = capped
            .iter()
            .map(|c| rows.iter().position(|r| r.key == c.key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_cap_dedups_keys() {
        let mut rows: Vec<_> = (0..60).map(|i| row(&format!("k{}", i), i)).collect();
        rows[59].key = "k0".to_string();
        let capped = cap_parents(rows, 50, 30);
        assert_eq!(capped.iter().filter(|r| r.key == "k0").count(), 1);
        assert_eq!(capped.len(), 29);
    }

    #[test]
    fn test_branch_ou_never_promotes_unapplied_role() {
        let ou = OuConfig::new(["ou-1"], [OuRole::Author, OuRole::Committer]);

        let by_committer = branch_ou::<CommitKind>(&ou, CommitDimension::Committer);
        assert!(by_committer.roles.is_empty());

        let by_repo = branch_ou::<CommitKind>(&ou, CommitDimension::RepoId);
        assert_eq!(by_repo.roles.into_iter().collect::<Vec<_>>(), vec![OuRole::Committer]);
    }

    #[test]
    fn test_branch_ou_drops_across_role_only() {
        let ou = OuConfig::new(["ou-1"], [OuRole::Creator, OuRole::Reviewer]);
        let branch = branch_ou::<PullRequestKind>(&ou, PrDimension::Creator);
        assert_eq!(branch.roles.into_iter().collect::<Vec<_>>(), vec![OuRole::Reviewer]);
    }
}
