//! MCP Tool Handlers
//!
//! A `tools/call` is parsed into a [`ToolRequest`] (one typed argument struct per
//! tool) before anything touches the network, then routed by an exhaustive match
//! to the handler for that tool. Handlers build [`ApiRequest`]s and hand them to
//! the shared [`Executor`]; they only shape the response.
//!
//! [`ApiRequest`]: ado_core::ApiRequest

mod generic;
mod pipelines;
mod present;
mod pull_requests;
mod repos;
mod wiki;
mod work_items;

use std::borrow::Cow;
use std::fmt;
use std::time::Instant;

use ado_core::{Error, ErrorKind, Executor, Result, TelemetryEvent, TelemetrySink};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use generic::AdoApiCallArgs;
pub use pipelines::{
    GetBuildArgs, GetPipelineRunArgs, GetReleaseArgs, GetTestPlanArgs, ListBuildsArgs,
    ListReleasesArgs, ListTopArgs,
};
pub use pull_requests::{GetPrCommentsArgs, GetPullRequestArgs, ListPullRequestsArgs};
pub use repos::{GetRepoArgs, GetRepoFileArgs, ListRepoBranchesArgs, ListReposArgs, SearchCodeArgs};
pub use wiki::{GetWikiPageArgs, ListWikiPagesArgs, SearchWikiPagesArgs};
pub use work_items::{
    CreateWorkItemArgs, GetWorkItemArgs, GetWorkItemsArgs, QueryWorkItemsArgs, UpdateWorkItemArgs,
};

/// Every tool the server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    // Wiki
    GetWikiPage,
    ListWikiPages,
    SearchWikiPages,

    // Repositories
    ListRepos,
    GetRepo,
    GetRepoFile,
    ListRepoBranches,
    SearchCode,

    // Work Items
    GetWorkItem,
    GetWorkItems,
    QueryWorkItems,
    CreateWorkItem,
    UpdateWorkItem,

    // Pull Requests
    ListPullRequests,
    GetPullRequest,
    GetPrComments,

    // Builds / Pipelines / Releases / Test Plans
    ListBuilds,
    GetBuild,
    ListPipelines,
    GetPipelineRun,
    ListReleases,
    GetRelease,
    ListTestPlans,
    GetTestPlan,

    // Generic
    AdoApiCall,
}

impl ToolName {
    pub const ALL: [ToolName; 25] = [
        ToolName::GetWikiPage,
        ToolName::ListWikiPages,
        ToolName::SearchWikiPages,
        ToolName::ListRepos,
        ToolName::GetRepo,
        ToolName::GetRepoFile,
        ToolName::ListRepoBranches,
        ToolName::SearchCode,
        ToolName::GetWorkItem,
        ToolName::GetWorkItems,
        ToolName::QueryWorkItems,
        ToolName::CreateWorkItem,
        ToolName::UpdateWorkItem,
        ToolName::ListPullRequests,
        ToolName::GetPullRequest,
        ToolName::GetPrComments,
        ToolName::ListBuilds,
        ToolName::GetBuild,
        ToolName::ListPipelines,
        ToolName::GetPipelineRun,
        ToolName::ListReleases,
        ToolName::GetRelease,
        ToolName::ListTestPlans,
        ToolName::GetTestPlan,
        ToolName::AdoApiCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetWikiPage => "get_wiki_page",
            ToolName::ListWikiPages => "list_wiki_pages",
            ToolName::SearchWikiPages => "search_wiki_pages",
            ToolName::ListRepos => "list_repos",
            ToolName::GetRepo => "get_repo",
            ToolName::GetRepoFile => "get_repo_file",
            ToolName::ListRepoBranches => "list_repo_branches",
            ToolName::SearchCode => "search_code",
            ToolName::GetWorkItem => "get_work_item",
            ToolName::GetWorkItems => "get_work_items",
            ToolName::QueryWorkItems => "query_work_items",
            ToolName::CreateWorkItem => "create_work_item",
            ToolName::UpdateWorkItem => "update_work_item",
            ToolName::ListPullRequests => "list_pull_requests",
            ToolName::GetPullRequest => "get_pull_request",
            ToolName::GetPrComments => "get_pr_comments",
            ToolName::ListBuilds => "list_builds",
            ToolName::GetBuild => "get_build",
            ToolName::ListPipelines => "list_pipelines",
            ToolName::GetPipelineRun => "get_pipeline_run",
            ToolName::ListReleases => "list_releases",
            ToolName::GetRelease => "get_release",
            ToolName::ListTestPlans => "list_test_plans",
            ToolName::GetTestPlan => "get_test_plan",
            ToolName::AdoApiCall => "ado_api_call",
        }
    }

    /// Exact, case-sensitive match against the published names.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated invocation: the tool plus its typed arguments
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    GetWikiPage(GetWikiPageArgs),
    ListWikiPages(ListWikiPagesArgs),
    SearchWikiPages(SearchWikiPagesArgs),
    ListRepos(ListReposArgs),
    GetRepo(GetRepoArgs),
    GetRepoFile(GetRepoFileArgs),
    ListRepoBranches(ListRepoBranchesArgs),
    SearchCode(SearchCodeArgs),
    GetWorkItem(GetWorkItemArgs),
    GetWorkItems(GetWorkItemsArgs),
    QueryWorkItems(QueryWorkItemsArgs),
    CreateWorkItem(CreateWorkItemArgs),
    UpdateWorkItem(UpdateWorkItemArgs),
    ListPullRequests(ListPullRequestsArgs),
    GetPullRequest(GetPullRequestArgs),
    GetPrComments(GetPrCommentsArgs),
    ListBuilds(ListBuildsArgs),
    GetBuild(GetBuildArgs),
    ListPipelines(ListTopArgs),
    GetPipelineRun(GetPipelineRunArgs),
    ListReleases(ListReleasesArgs),
    GetRelease(GetReleaseArgs),
    ListTestPlans(ListTopArgs),
    GetTestPlan(GetTestPlanArgs),
    AdoApiCall(AdoApiCallArgs),
}

impl ToolRequest {
    /// Validate `arguments` for `name`. Fails with `UnknownTool` or `InvalidParams`;
    /// never performs I/O.
    pub fn parse(name: &str, arguments: Value) -> Result<Self> {
        let tool = ToolName::parse(name).ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let request = match tool {
            ToolName::GetWikiPage => Self::GetWikiPage(args::<GetWikiPageArgs>(arguments)?.validated()?),
            ToolName::ListWikiPages => Self::ListWikiPages(args(arguments)?),
            ToolName::SearchWikiPages => Self::SearchWikiPages(args(arguments)?),
            ToolName::ListRepos => Self::ListRepos(args(arguments)?),
            ToolName::GetRepo => Self::GetRepo(args(arguments)?),
            ToolName::GetRepoFile => Self::GetRepoFile(args(arguments)?),
            ToolName::ListRepoBranches => Self::ListRepoBranches(args(arguments)?),
            ToolName::SearchCode => Self::SearchCode(args(arguments)?),
            ToolName::GetWorkItem => Self::GetWorkItem(args(arguments)?),
            ToolName::GetWorkItems => Self::GetWorkItems(args::<GetWorkItemsArgs>(arguments)?.validated()?),
            ToolName::QueryWorkItems => Self::QueryWorkItems(args(arguments)?),
            ToolName::CreateWorkItem => Self::CreateWorkItem(args(arguments)?),
            ToolName::UpdateWorkItem => {
                Self::UpdateWorkItem(args::<UpdateWorkItemArgs>(arguments)?.validated()?)
            }
            ToolName::ListPullRequests => Self::ListPullRequests(args(arguments)?),
            ToolName::GetPullRequest => Self::GetPullRequest(args(arguments)?),
            ToolName::GetPrComments => Self::GetPrComments(args(arguments)?),
            ToolName::ListBuilds => Self::ListBuilds(args(arguments)?),
            ToolName::GetBuild => Self::GetBuild(args(arguments)?),
            ToolName::ListPipelines => Self::ListPipelines(args(arguments)?),
            ToolName::GetPipelineRun => Self::GetPipelineRun(args(arguments)?),
            ToolName::ListReleases => Self::ListReleases(args(arguments)?),
            ToolName::GetRelease => Self::GetRelease(args(arguments)?),
            ToolName::ListTestPlans => Self::ListTestPlans(args(arguments)?),
            ToolName::GetTestPlan => Self::GetTestPlan(args(arguments)?),
            ToolName::AdoApiCall => Self::AdoApiCall(args(arguments)?),
        };
        Ok(request)
    }
}

fn args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| Error::invalid_params(e.to_string()))
}

/// Percent-encode a caller-supplied name so it stays one URL path segment.
fn segment(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Deserialization helpers for loosely typed host arguments
pub(crate) mod de {
    use serde::{Deserialize, Deserializer, de::Error as _};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Unsigned(u64),
        Float(f64),
        Text(String),
    }

    impl Loose {
        fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
            match self {
                Loose::Unsigned(n) => Ok(n),
                Loose::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
                Loose::Float(f) => Err(E::custom(format!("expected a non-negative integer, got {f}"))),
                Loose::Text(s) => s
                    .trim()
                    .parse()
                    .map_err(|_| E::custom(format!("expected a non-negative integer, got {s:?}"))),
            }
        }
    }

    pub fn yes() -> bool {
        true
    }

    /// Identifier that may arrive as a number or a numeric string.
    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Loose::deserialize(deserializer)?.into_u64()
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Option::<Loose>::deserialize(deserializer)?
            .map(Loose::into_u64)
            .transpose()
    }

    /// A list of ids, or a single comma-separated string of ids.
    pub fn ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Ids {
            List(Vec<Loose>),
            Joined(String),
        }

        match Ids::deserialize(deserializer)? {
            Ids::List(items) => items.into_iter().map(Loose::into_u64).collect(),
            Ids::Joined(joined) => joined
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(|part| Loose::Text(part.to_string()).into_u64())
                .collect(),
        }
    }

    /// Result limit; zero or absent means "use the tool default".
    pub fn opt_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        match opt_id(deserializer)? {
            None | Some(0) => Ok(None),
            Some(n) => u32::try_from(n)
                .map(Some)
                .map_err(|_| D::Error::custom(format!("result limit {n} is too large"))),
        }
    }

    /// Free text that hosts sometimes send as a number (wiki page ids).
    pub fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Loose>::deserialize(deserializer)?.map(|v| match v {
            Loose::Unsigned(n) => n.to_string(),
            Loose::Float(f) => f.to_string(),
            Loose::Text(s) => s,
        }))
    }
}

/// Reports `ToolCompleted` exactly once, including when the invocation future
/// is dropped before finishing.
struct CompletionGuard<'a> {
    sink: &'a dyn TelemetrySink,
    tool: String,
    project: String,
    started: Instant,
    outcome: Option<std::result::Result<(), ErrorKind>>,
}

impl CompletionGuard<'_> {
    fn finish<T>(&mut self, result: &Result<T>) {
        self.outcome = Some(result.as_ref().map(|_| ()).map_err(Error::kind));
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        let (success, error_kind) = match self.outcome {
            Some(Ok(())) => (true, None),
            Some(Err(kind)) => (false, Some(kind)),
            None => (false, Some(ErrorKind::InternalError)),
        };
        self.sink.record(TelemetryEvent::ToolCompleted {
            tool: std::mem::take(&mut self.tool),
            project: std::mem::take(&mut self.project),
            duration: self.started.elapsed(),
            success,
            error_kind,
        });
    }
}

/// Routes validated invocations to handlers
#[derive(Clone)]
pub struct Dispatcher {
    executor: Executor,
}

impl Dispatcher {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Handle a tool call: validate, route, report.
    ///
    /// Exactly one `ToolInvoked` and one `ToolCompleted` event are recorded per
    /// call, whatever the outcome.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value> {
        let context = self.executor.context();
        let project = arguments
            .get("project")
            .and_then(Value::as_str)
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);
        let resolved = context.resolve_project(project.as_deref()).to_string();

        context.telemetry().record(TelemetryEvent::ToolInvoked {
            tool: name.to_string(),
            project: resolved.clone(),
        });
        let mut guard = CompletionGuard {
            sink: context.telemetry(),
            tool: name.to_string(),
            project: resolved.clone(),
            started: Instant::now(),
            outcome: None,
        };

        tracing::debug!(tool = name, project = %resolved, "tool call");

        let result = match ToolRequest::parse(name, arguments) {
            Ok(request) => self.route(request, project).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => tracing::info!(tool = name, project = %resolved, "tool call succeeded"),
            Err(e) => tracing::warn!(tool = name, project = %resolved, kind = %e.kind(), "tool call failed"),
        }
        guard.finish(&result);
        result
    }

    async fn route(&self, request: ToolRequest, project: Option<String>) -> Result<Value> {
        let executor = &self.executor;
        match request {
            // Wiki
            ToolRequest::GetWikiPage(args) => wiki::get_page(executor, project, args).await,
            ToolRequest::ListWikiPages(args) => wiki::list_pages(executor, project, args).await,
            ToolRequest::SearchWikiPages(args) => wiki::search_pages(executor, project, args).await,

            // Repositories
            ToolRequest::ListRepos(args) => repos::list_repos(executor, project, args).await,
            ToolRequest::GetRepo(args) => repos::get_repo(executor, project, args).await,
            ToolRequest::GetRepoFile(args) => repos::get_file(executor, project, args).await,
            ToolRequest::ListRepoBranches(args) => repos::list_branches(executor, project, args).await,
            ToolRequest::SearchCode(args) => repos::search_code(executor, project, args).await,

            // Work Items
            ToolRequest::GetWorkItem(args) => work_items::get_one(executor, project, args).await,
            ToolRequest::GetWorkItems(args) => work_items::get_many(executor, project, args).await,
            ToolRequest::QueryWorkItems(args) => work_items::query(executor, project, args).await,
            ToolRequest::CreateWorkItem(args) => work_items::create(executor, project, args).await,
            ToolRequest::UpdateWorkItem(args) => work_items::update(executor, project, args).await,

            // Pull Requests
            ToolRequest::ListPullRequests(args) => pull_requests::list(executor, project, args).await,
            ToolRequest::GetPullRequest(args) => pull_requests::get(executor, project, args).await,
            ToolRequest::GetPrComments(args) => pull_requests::comments(executor, project, args).await,

            // Builds / Pipelines / Releases / Test Plans
            ToolRequest::ListBuilds(args) => pipelines::list_builds(executor, project, args).await,
            ToolRequest::GetBuild(args) => pipelines::get_build(executor, project, args).await,
            ToolRequest::ListPipelines(args) => pipelines::list_pipelines(executor, project, args).await,
            ToolRequest::GetPipelineRun(args) => pipelines::get_pipeline_run(executor, project, args).await,
            ToolRequest::ListReleases(args) => pipelines::list_releases(executor, project, args).await,
            ToolRequest::GetRelease(args) => pipelines::get_release(executor, project, args).await,
            ToolRequest::ListTestPlans(args) => pipelines::list_test_plans(executor, project, args).await,
            ToolRequest::GetTestPlan(args) => pipelines::get_test_plan(executor, project, args).await,

            // Generic
            ToolRequest::AdoApiCall(args) => generic::call(executor, project, args).await,
        }
    }
}
