//! MCP tool catalogue
//!
//! Static metadata only: names, descriptions and input schemas returned by
//! `tools/list`. Behaviour lives in [`crate::handlers`].
//!
//! # Tool Categories
//!
//! ## Wiki
//! - `get_wiki_page`, `list_wiki_pages`, `search_wiki_pages`
//!
//! ## Repositories
//! - `list_repos`, `get_repo`, `get_repo_file`, `list_repo_branches`, `search_code`
//!
//! ## Work Items
//! - `get_work_item`, `get_work_items`, `query_work_items`, `create_work_item`,
//!   `update_work_item`
//!
//! ## Pull Requests
//! - `list_pull_requests`, `get_pull_request`, `get_pr_comments`
//!
//! ## Builds, Pipelines, Releases, Test Plans
//! - `list_builds`, `get_build`, `list_pipelines`, `get_pipeline_run`,
//!   `list_releases`, `get_release`, `list_test_plans`, `get_test_plan`
//!
//! ## Generic
//! - `ado_api_call` - raw passthrough to any REST endpoint

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::handlers::ToolName;

/// Tool definition for MCP protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result from a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Content types for tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }
}

fn project_property() -> Value {
    json!({
        "type": "string",
        "description": "Project name (defaults to the configured project). Any project in the organization may be named"
    })
}

fn top_property(default: u32) -> Value {
    json!({ "type": "number", "description": "Max results", "default": default })
}

/// Build a definition; every tool accepts the optional `project` argument.
fn define(tool: ToolName, description: &str, properties: Value, required: &[&str]) -> ToolDefinition {
    let mut props = match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    props.insert("project".to_string(), project_property());

    let mut schema = json!({ "type": "object", "properties": props });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }

    ToolDefinition {
        name: tool.as_str().to_string(),
        description: description.to_string(),
        input_schema: schema,
    }
}

/// Get all available tool definitions
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        // Wiki
        define(
            ToolName::GetWikiPage,
            "Retrieve a specific Azure DevOps wiki page by ID or path",
            json!({
                "wiki": { "type": "string", "description": "Wiki name (default: project wiki)" },
                "pageId": { "type": "string", "description": "Wiki page ID" },
                "path": { "type": "string", "description": "Wiki page path" },
                "includeContent": { "type": "boolean", "description": "Include page content", "default": true }
            }),
            &[],
        ),
        define(
            ToolName::ListWikiPages,
            "List all pages in a wiki",
            json!({
                "wiki": { "type": "string", "description": "Wiki name" },
                "recursive": { "type": "boolean", "description": "Include sub-pages", "default": false }
            }),
            &[],
        ),
        define(
            ToolName::SearchWikiPages,
            "Search wiki pages by path",
            json!({
                "query": { "type": "string", "description": "Search query" },
                "wiki": { "type": "string", "description": "Wiki name" }
            }),
            &["query"],
        ),
        // Repositories
        define(
            ToolName::ListRepos,
            "List all repositories in the project",
            json!({
                "includeLinks": { "type": "boolean", "description": "Include links", "default": false }
            }),
            &[],
        ),
        define(
            ToolName::GetRepo,
            "Get repository details by name",
            json!({
                "repo": { "type": "string", "description": "Repository name" }
            }),
            &["repo"],
        ),
        define(
            ToolName::GetRepoFile,
            "Get file content from a repository",
            json!({
                "repo": { "type": "string", "description": "Repository name" },
                "path": { "type": "string", "description": "File path in repository" },
                "branch": { "type": "string", "description": "Branch name (default: main)" },
                "download": { "type": "boolean", "description": "Download as text", "default": true }
            }),
            &["repo", "path"],
        ),
        define(
            ToolName::ListRepoBranches,
            "List branches in a repository",
            json!({
                "repo": { "type": "string", "description": "Repository name" }
            }),
            &["repo"],
        ),
        define(
            ToolName::SearchCode,
            "Search code across repositories",
            json!({
                "searchText": { "type": "string", "description": "Search query" },
                "repo": { "type": "string", "description": "Repository name (optional)" },
                "$top": top_property(10)
            }),
            &["searchText"],
        ),
        // Work Items
        define(
            ToolName::GetWorkItem,
            "Get work item details by ID",
            json!({
                "workItemId": { "type": "number", "description": "Work item ID" },
                "fields": { "type": "string", "description": "Comma-separated field names" },
                "expand": { "type": "string", "description": "Expand options: all, relations, fields", "default": "all" }
            }),
            &["workItemId"],
        ),
        define(
            ToolName::GetWorkItems,
            "Get multiple work items by IDs",
            json!({
                "workItemIds": { "type": "array", "items": { "type": "number" }, "description": "Array of work item IDs" },
                "fields": { "type": "string", "description": "Comma-separated field names" },
                "expand": { "type": "string", "description": "Expand options", "default": "all" }
            }),
            &["workItemIds"],
        ),
        define(
            ToolName::QueryWorkItems,
            "Query work items using WIQL (Work Item Query Language)",
            json!({
                "wiql": { "type": "string", "description": "WIQL query string" },
                "$top": top_property(100)
            }),
            &["wiql"],
        ),
        define(
            ToolName::CreateWorkItem,
            "Create a new work item",
            json!({
                "type": { "type": "string", "description": "Work item type (e.g., Task, Bug, User Story)" },
                "title": { "type": "string", "description": "Work item title" },
                "description": { "type": "string", "description": "Work item description" },
                "fields": { "type": "object", "description": "Additional fields as key-value pairs, including Custom.* fields" }
            }),
            &["type", "title"],
        ),
        define(
            ToolName::UpdateWorkItem,
            "Update an existing work item",
            json!({
                "workItemId": { "type": "number", "description": "Work item ID" },
                "fields": { "type": "object", "description": "Fields to update as key-value pairs" },
                "links": {
                    "type": "array",
                    "description": "Links to add. Each link has rel and url properties",
                    "items": {
                        "type": "object",
                        "properties": { "rel": { "type": "string" }, "url": { "type": "string" } },
                        "required": ["rel", "url"]
                    }
                },
                "removeLinks": { "type": "array", "description": "Link URLs to remove", "items": { "type": "string" } }
            }),
            &["workItemId"],
        ),
        // Pull Requests
        define(
            ToolName::ListPullRequests,
            "List pull requests in a repository",
            json!({
                "repo": { "type": "string", "description": "Repository name" },
                "status": { "type": "string", "description": "PR status: active, completed, abandoned, all", "default": "active" },
                "$top": top_property(10)
            }),
            &["repo"],
        ),
        define(
            ToolName::GetPullRequest,
            "Get pull request details",
            json!({
                "repo": { "type": "string", "description": "Repository name" },
                "pullRequestId": { "type": "number", "description": "Pull request ID" },
                "includeCommits": { "type": "boolean", "description": "Include commits", "default": false },
                "includeWorkItems": { "type": "boolean", "description": "Include linked work items", "default": false }
            }),
            &["repo", "pullRequestId"],
        ),
        define(
            ToolName::GetPrComments,
            "Get pull request review comments",
            json!({
                "repo": { "type": "string", "description": "Repository name" },
                "pullRequestId": { "type": "number", "description": "Pull request ID" },
                "$top": top_property(100)
            }),
            &["repo", "pullRequestId"],
        ),
        // Builds / Pipelines
        define(
            ToolName::ListBuilds,
            "List recent builds",
            json!({
                "definitionId": { "type": "number", "description": "Build definition ID (optional)" },
                "status": { "type": "string", "description": "Build status filter" },
                "result": { "type": "string", "description": "Build result filter" },
                "$top": top_property(10)
            }),
            &[],
        ),
        define(
            ToolName::GetBuild,
            "Get build details by ID",
            json!({
                "buildId": { "type": "number", "description": "Build ID" }
            }),
            &["buildId"],
        ),
        define(
            ToolName::ListPipelines,
            "List pipelines in the project",
            json!({ "$top": top_property(10) }),
            &[],
        ),
        define(
            ToolName::GetPipelineRun,
            "Get pipeline run details",
            json!({
                "pipelineId": { "type": "number", "description": "Pipeline ID" },
                "runId": { "type": "number", "description": "Run ID" }
            }),
            &["pipelineId", "runId"],
        ),
        // Releases
        define(
            ToolName::ListReleases,
            "List releases",
            json!({
                "definitionId": { "type": "number", "description": "Release definition ID (optional)" },
                "status": { "type": "string", "description": "Release status filter" },
                "$top": top_property(10)
            }),
            &[],
        ),
        define(
            ToolName::GetRelease,
            "Get release details",
            json!({
                "releaseId": { "type": "number", "description": "Release ID" }
            }),
            &["releaseId"],
        ),
        // Test Plans
        define(
            ToolName::ListTestPlans,
            "List test plans",
            json!({ "$top": top_property(10) }),
            &[],
        ),
        define(
            ToolName::GetTestPlan,
            "Get test plan details",
            json!({
                "planId": { "type": "number", "description": "Test plan ID" }
            }),
            &["planId"],
        ),
        // Generic
        define(
            ToolName::AdoApiCall,
            "Make a generic Azure DevOps REST API call",
            json!({
                "endpoint": { "type": "string", "description": "API endpoint (e.g., /git/repositories)" },
                "method": { "type": "string", "description": "HTTP method (GET, POST, PATCH, PUT, DELETE)", "default": "GET" },
                "params": { "type": "object", "description": "Query parameters" },
                "body": { "type": "object", "description": "Request body (for POST/PATCH/PUT)" }
            }),
            &["endpoint"],
        ),
    ]
}
