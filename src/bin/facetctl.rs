//! facetctl - run facet queries from the command line
//!
//! Reads a JSON filter, runs it against the configured search backend and
//! SQLite store, and prints the result as JSON.
//!
//! # Configuration
//!
//! 1. `--config <path>` (TOML), or the `FACETS_CONFIG` environment variable
//! 2. `FACETS_*` environment overrides
//! 3. Defaults
//!
//! # Example Usage
//!
//! ```bash
//! # Commits per author, second page of 25
//! facetctl --tenant acme group-by --kind commits --filter by_author.json --page 1 --page-size 25
//!
//! # Pull requests per repo, drilled down by the filter's first stack
//! facetctl --tenant acme stack --kind prs --filter repos_by_creator.json --ou ou.json
//!
//! # Collaboration report with approver drill-down
//! facetctl --tenant acme collab --filter prs.json --approvers
//!
//! # Committers of an OU by commit count, and the busiest files
//! facetctl --tenant acme contributors --role committer --filter commits.json --ou ou.json
//! facetctl --tenant acme files --filter commits.json --page-size 50
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use scm_facets::backend::HttpSearchBackend;
use scm_facets::config::EngineConfig;
use scm_facets::engine::{EngineContext, FacetKind};
use scm_facets::filter::{ActivityAcross, CommitFilter, ContributorRole, FilterModel, PrFilter};
use scm_facets::services::{CommitFacets, CommitKind, Facets, IssueKind, PullRequestFacets, PullRequestKind};
use scm_facets::store::sqlite::SqliteStore;
use scm_facets::{Error, OuConfig, PageWindow, Result};

#[derive(Debug, Parser)]
#[command(name = "facetctl", version, about = "Run faceted aggregations over commits, pull requests and issues")]
struct Cli {
    #[arg(long, help = "Path to a TOML config file (defaults to FACETS_CONFIG)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Tenant whose indexes are queried")]
    tenant: String,

    #[arg(long, help = "Pretty-print the JSON output")]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Group by the filter's across dimension
    GroupBy {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(long, help = "Return distinct values without metrics")]
        values_only: bool,
    },
    /// Group by across and drill down by the filter's first stack
    Stack {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// List documents ordered by the filter's sort
    List {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Pull request collaboration report
    Collab {
        #[arg(long, help = "JSON filter file")]
        filter: PathBuf,

        #[arg(long, help = "JSON OU config file")]
        ou: Option<PathBuf>,

        #[command(flatten)]
        paging: PagingArgs,

        #[arg(long, help = "Drill each creator row down by approver")]
        approvers: bool,
    },
    /// Commit activity per author or committer
    Contributors {
        #[command(flatten)]
        scope: CommitScopeArgs,

        #[arg(long, value_enum, default_value = "author", help = "Identity to group by")]
        role: Role,
    },
    /// Commit activity per file type or repository
    Activity {
        #[command(flatten)]
        scope: CommitScopeArgs,

        #[arg(long, value_enum, help = "Grouping")]
        across: Across,
    },
    /// Change activity per file path
    Files {
        #[command(flatten)]
        scope: CommitScopeArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    Author,
    Committer,
}

impl From<Role> for ContributorRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Author => ContributorRole::Author,
            Role::Committer => ContributorRole::Committer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Across {
    FileType,
    Repo,
}

impl From<Across> for ActivityAcross {
    fn from(across: Across) -> Self {
        match across {
            Across::FileType => ActivityAcross::FileType,
            Across::Repo => ActivityAcross::RepoId,
        }
    }
}

#[derive(Debug, Args)]
struct CommitScopeArgs {
    #[arg(long, help = "JSON commit filter file; its sort orders the rows")]
    filter: PathBuf,

    #[arg(long, help = "JSON OU config file")]
    ou: Option<PathBuf>,

    #[command(flatten)]
    paging: PagingArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Commits,
    Prs,
    Issues,
}

#[derive(Debug, Args)]
struct QueryArgs {
    #[arg(long, value_enum, help = "Document kind")]
    kind: Kind,

    #[arg(long, help = "JSON filter file")]
    filter: PathBuf,

    #[arg(long, help = "JSON OU config file")]
    ou: Option<PathBuf>,

    #[command(flatten)]
    paging: PagingArgs,
}

#[derive(Debug, Args)]
struct PagingArgs {
    #[arg(long, help = "Zero-based page (overrides the filter)")]
    page: Option<usize>,

    #[arg(long, help = "Page size (overrides the filter)")]
    page_size: Option<usize>,
}

impl PagingArgs {
    fn window(&self, fallback: PageWindow) -> PageWindow {
        PageWindow::new(
            self.page.unwrap_or(fallback.page),
            self.page_size.unwrap_or(fallback.page_size),
        )
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file_with_env(&path.to_string_lossy()),
        None => EngineConfig::from_env(),
    }
    .map_err(Error::Configuration)?;
    config.validate().map_err(Error::Configuration)?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Configuration(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&raw)?)
}

fn read_ou(path: Option<&PathBuf>) -> Result<Option<OuConfig>> {
    path.map(|p| read_json(p)).transpose()
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn run_kind<K>(ctx: &Arc<EngineContext>, tenant: &str, command: &Command, query: &QueryArgs) -> Result<Value>
where
    K: FacetKind,
    K::Filter: DeserializeOwned,
{
    let facets = Facets::<K>::new(Arc::clone(ctx));
    let filter: K::Filter = read_json(&query.filter)?;
    let ou = read_ou(query.ou.as_ref())?;
    let window = query.paging.window(facets.window_of(&filter));

    match command {
        Command::GroupBy { values_only, .. } => {
            to_json(&facets.group_by(tenant, &filter, *values_only, ou.as_ref(), window)?)
        }
        Command::Stack { .. } => to_json(&facets.stacked_group_by(tenant, &filter, &[], ou.as_ref(), window)?),
        Command::List { .. } => {
            let sort = filter.grouping().sort.clone();
            to_json(&facets.list(tenant, &filter, &sort, ou.as_ref(), window)?)
        }
        _ => Err(Error::invalid("command", "not a per-kind query")),
    }
}

fn run(cli: &Cli) -> Result<Value> {
    let config = load_config(cli.config.as_deref())?;
    scm_facets::logging::init(&config.logging);

    let backend = HttpSearchBackend::new(&config.backend)?;
    let store = SqliteStore::open(&config.store.sqlite_path)?;
    info!(backend = %config.backend.url, store = %config.store.sqlite_path.display(), "facetctl starting");
    let ctx = Arc::new(EngineContext::new(Arc::new(backend), Arc::new(store), config));

    match &cli.command {
        Command::GroupBy { query, .. } | Command::Stack { query } | Command::List { query } => match query.kind {
            Kind::Commits => run_kind::<CommitKind>(&ctx, &cli.tenant, &cli.command, query),
            Kind::Prs => run_kind::<PullRequestKind>(&ctx, &cli.tenant, &cli.command, query),
            Kind::Issues => run_kind::<IssueKind>(&ctx, &cli.tenant, &cli.command, query),
        },
        Command::Collab {
            filter,
            ou,
            paging,
            approvers,
        } => {
            let facets = PullRequestFacets::new(ctx);
            let filter: PrFilter = read_json(filter)?;
            let ou = read_ou(ou.as_ref())?;
            let window = paging.window(facets.window_of(&filter));
            to_json(&facets.collab(&cli.tenant, &filter, ou.as_ref(), window, *approvers)?)
        }
        Command::Contributors { scope, .. } | Command::Activity { scope, .. } | Command::Files { scope } => {
            let facets = CommitFacets::new(ctx);
            let filter: CommitFilter = read_json(&scope.filter)?;
            let ou = read_ou(scope.ou.as_ref())?;
            let window = scope.paging.window(facets.window_of(&filter));
            let sort = &filter.grouping.sort;
            match &cli.command {
                Command::Contributors { role, .. } => to_json(&facets.contributors(
                    &cli.tenant,
                    &filter,
                    (*role).into(),
                    sort,
                    ou.as_ref(),
                    window,
                )?),
                Command::Activity { across, .. } => to_json(&facets.activity(
                    &cli.tenant,
                    &filter,
                    (*across).into(),
                    sort,
                    ou.as_ref(),
                    window,
                )?),
                _ => to_json(&facets.files(&cli.tenant, &filter, sort, ou.as_ref(), window)?),
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            let text = if cli.pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            };
            match text {
                Ok(text) => {
                    println!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            error!(error = %e, "facetctl failed");
            eprintln!("error: {}", e.public_message());
            ExitCode::from(match e.class() {
                scm_facets::ErrorClass::Client => 2,
                scm_facets::ErrorClass::Server => 1,
            })
        }
    }
}
