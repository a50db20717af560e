//! Commit facets

use super::Facets;
use crate::builder::{commit as builder, BuildParams, Unnest};
use crate::convert::{commit as convert, decode_hits};
use crate::dsl::aggregation::{Aggregation, AggregationMap};
use crate::dsl::query::BoolQuery;
use crate::dsl::response::{AggregateView, SearchResponse};
use crate::engine::{ActivityReport, FacetKind};
use crate::error::Result;
use crate::filter::{ActivityAcross, CommitCalculation, CommitDimension, CommitFilter, ContributorRole};
use crate::ou::{OuConfig, OuRole, OuScope, SCM_INTEGRATION_TYPES};
use crate::result::{ActivityRecord, AggregationResult, CommitRecord, ContributorRecord, FileRecord, ListResponse};
use crate::sort::ListSortConfig;
use crate::types::{PageWindow, SortSpec};

const SORTABLE: &[&str] = &["committed_at", "created_at", "files_ct", "additions", "deletions", "changes"];

/// Commit documents
#[derive(Debug, Clone, Copy)]
pub struct CommitKind;

impl OuScope for CommitKind {
    const INTEGRATION_TYPES: &'static [&'static str] = SCM_INTEGRATION_TYPES;

    /// Committer scoping wins over author scoping
    fn ou_roles(ou: &OuConfig) -> Vec<OuRole> {
        if ou.has(OuRole::Committer) {
            vec![OuRole::Committer]
        } else if ou.has(OuRole::Author) {
            vec![OuRole::Author]
        } else {
            Vec::new()
        }
    }
}

impl FacetKind for CommitKind {
    type Filter = CommitFilter;
    type Record = CommitRecord;

    const NAME: &'static str = "commits";
    const INDEX_PREFIX: &'static str = builder::INDEX_PREFIX;

    fn build_query(filter: &CommitFilter) -> BoolQuery {
        builder::build_query(filter)
    }

    fn bucket_agg(filter: &CommitFilter, across: CommitDimension, size: usize) -> Aggregation {
        builder::bucket_agg(filter, across, size)
    }

    fn unnest(across: CommitDimension) -> Option<Unnest> {
        builder::unnest(across)
    }

    fn metric_aggs(filter: &CommitFilter, calculation: CommitCalculation, params: &BuildParams) -> AggregationMap {
        builder::metric_aggs(filter, calculation, params)
    }

    fn sort_metric(calculation: CommitCalculation) -> Option<&'static str> {
        builder::sort_metric(calculation)
    }

    fn fill_metrics(
        row: &mut AggregationResult,
        bucket: AggregateView<'_>,
        calculation: CommitCalculation,
        filter: &CommitFilter,
    ) {
        convert::fill_metrics(row, bucket, calculation, filter)
    }

    fn stack_supported(dim: CommitDimension) -> bool {
        matches!(
            dim,
            CommitDimension::Author
                | CommitDimension::Committer
                | CommitDimension::RepoId
                | CommitDimension::Project
                | CommitDimension::FileType
                | CommitDimension::CommitBranch
                | CommitDimension::VcsType
                | CommitDimension::CodeChange
        )
    }

    fn list_sort() -> ListSortConfig {
        ListSortConfig {
            default_field: "committed_at",
            sortable: SORTABLE,
            prefix: builder::FIELD_PREFIX,
        }
    }

    fn to_records(response: &SearchResponse, filter: &CommitFilter, params: &BuildParams) -> Result<Vec<CommitRecord>> {
        let cutoff = params.legacy_cutoff(filter.legacy_cutoff);
        Ok(decode_hits::<convert::CommitDocument>(response)?
            .into_iter()
            .map(|(id, doc)| convert::to_record(id, doc, cutoff))
            .collect())
    }
}

impl Facets<CommitKind> {
    /// Commit activity per author or committer.
    ///
    /// Sortable by `num_commits` (default), `num_repos`, `num_additions`,
    /// `num_deletions` and `num_changes`. The total counts distinct contributors.
    pub fn contributors(
        &self,
        tenant: &str,
        filter: &CommitFilter,
        role: ContributorRole,
        sort: &SortSpec,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<ContributorRecord>> {
        ActivityReport::new(self.context()).contributors(tenant, filter, role, sort, ou, window)
    }

    /// Commit activity per file type or repository
    pub fn activity(
        &self,
        tenant: &str,
        filter: &CommitFilter,
        across: ActivityAcross,
        sort: &SortSpec,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<ActivityRecord>> {
        ActivityReport::new(self.context()).activity(tenant, filter, across, sort, ou, window)
    }

    /// Change activity per file path
    pub fn files(
        &self,
        tenant: &str,
        filter: &CommitFilter,
        sort: &SortSpec,
        ou: Option<&OuConfig>,
        window: PageWindow,
    ) -> Result<ListResponse<FileRecord>> {
        ActivityReport::new(self.context()).files(tenant, filter, sort, ou, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortDirection;

    #[test]
    fn test_committer_role_preferred() {
        let ou = OuConfig::new(["ou-1"], [OuRole::Author, OuRole::Committer]);
        assert_eq!(CommitKind::ou_roles(&ou), vec![OuRole::Committer]);
        let ou = OuConfig::new(["ou-1"], [OuRole::Reviewer]);
        assert!(CommitKind::ou_roles(&ou).is_empty());
    }

    #[test]
    fn test_list_sort_prefixes_columns() {
        let sort = CommitKind::list_sort();
        let default = sort.resolve(&SortSpec::default()).unwrap();
        assert_eq!(default.field, "c_committed_at");
        assert_eq!(default.order, SortDirection::Desc);

        let asc = sort.resolve(&SortSpec::single("additions", SortDirection::Asc)).unwrap();
        assert_eq!(asc.field, "c_additions");
        assert!(sort.resolve(&SortSpec::single("message", SortDirection::Asc)).is_err());
    }

    #[test]
    fn test_technology_and_trend_not_stackable() {
        assert!(!CommitKind::stack_supported(CommitDimension::Technology));
        assert!(!CommitKind::stack_supported(CommitDimension::Trend));
        assert!(CommitKind::stack_supported(CommitDimension::RepoId));
    }
}
