//! Pull request tools

use ado_core::{ApiRequest, Executor, Result};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{de, segment};
use super::present::{count, map_list, nested, pick};

pub const DEFAULT_STATUS: &str = "active";
const DEFAULT_LIST_TOP: u32 = 10;
const DEFAULT_THREAD_TOP: u32 = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListPullRequestsArgs {
    pub repo: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "$top", default, deserialize_with = "de::opt_count")]
    pub top: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPullRequestArgs {
    pub repo: String,
    #[serde(deserialize_with = "de::id")]
    pub pull_request_id: u64,
    #[serde(default)]
    pub include_commits: bool,
    #[serde(default)]
    pub include_work_items: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPrCommentsArgs {
    pub repo: String,
    #[serde(deserialize_with = "de::id")]
    pub pull_request_id: u64,
    #[serde(rename = "$top", default, deserialize_with = "de::opt_count")]
    pub top: Option<u32>,
}

pub(super) async fn list(executor: &Executor, project: Option<String>, args: ListPullRequestsArgs) -> Result<Value> {
    let status = args
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_STATUS);

    let request = ApiRequest::get(format!("/git/repositories/{}/pullrequests", segment(&args.repo)))
        .param("searchCriteria.status", status)
        .param("$top", args.top.unwrap_or(DEFAULT_LIST_TOP))
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "pullRequests": map_list(&data, "value", |pr| json!({
            "pullRequestId": pr.get("pullRequestId"),
            "title": pr.get("title"),
            "status": pr.get("status"),
            "createdBy": nested(pr, "createdBy", "displayName"),
            "creationDate": pr.get("creationDate"),
            "url": pr.get("url"),
        })),
    }))
}

pub(super) async fn get(executor: &Executor, project: Option<String>, args: GetPullRequestArgs) -> Result<Value> {
    let mut request = ApiRequest::get(format!(
        "/git/repositories/{}/pullrequests/{}",
        segment(&args.repo), args.pull_request_id
    ));
    if args.include_commits {
        request = request.param("includeCommits", "true");
    }
    if args.include_work_items {
        request = request.param("includeWorkItemsRefs", "true");
    }
    let data = executor.call(request.project(project)).await?;

    Ok(pick(
        &data,
        &[
            "pullRequestId",
            "title",
            "description",
            "status",
            "createdBy",
            "reviewers",
            "commits",
            "workItemRefs",
            "url",
        ],
    ))
}

pub(super) async fn comments(executor: &Executor, project: Option<String>, args: GetPrCommentsArgs) -> Result<Value> {
    let request = ApiRequest::get(format!(
        "/git/repositories/{}/pullrequests/{}/threads",
        segment(&args.repo), args.pull_request_id
    ))
    .param("$top", args.top.unwrap_or(DEFAULT_THREAD_TOP))
    .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "threads": map_list(&data, "value", |thread| json!({
            "id": thread.get("id"),
            "comments": map_list(thread, "comments", |c| json!({
                "id": c.get("id"),
                "content": c.get("content"),
                "author": nested(c, "author", "displayName"),
                "publishedDate": c.get("publishedDate"),
            })),
        })),
    }))
}
