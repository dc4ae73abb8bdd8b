//! Repository and code search tools

use ado_core::{ApiRequest, Executor, Result};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{de, segment};
use super::present::{count, map_list, nested, pick};

pub const DEFAULT_BRANCH: &str = "main";
const DEFAULT_SEARCH_TOP: u32 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReposArgs {
    #[serde(default)]
    pub include_links: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetRepoArgs {
    pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetRepoFileArgs {
    pub repo: String,
    pub path: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "de::yes")]
    pub download: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListRepoBranchesArgs {
    pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCodeArgs {
    pub search_text: String,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(rename = "$top", default, deserialize_with = "de::opt_count")]
    pub top: Option<u32>,
}

pub(super) async fn list_repos(executor: &Executor, project: Option<String>, args: ListReposArgs) -> Result<Value> {
    let request = ApiRequest::get("/git/repositories")
        .param("includeLinks", args.include_links)
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "repositories": map_list(&data, "value", |r| {
            pick(r, &["id", "name", "url", "defaultBranch", "size"])
        }),
    }))
}

pub(super) async fn get_repo(executor: &Executor, project: Option<String>, args: GetRepoArgs) -> Result<Value> {
    let request = ApiRequest::get(format!("/git/repositories/{}", segment(&args.repo))).project(project);
    let data = executor.call(request).await?;

    Ok(pick(&data, &["id", "name", "url", "defaultBranch", "size", "remoteUrl"]))
}

pub(super) async fn get_file(executor: &Executor, project: Option<String>, args: GetRepoFileArgs) -> Result<Value> {
    let branch = args
        .branch
        .as_deref()
        .filter(|b| !b.trim().is_empty())
        .unwrap_or(DEFAULT_BRANCH);
    let path = format!("/{}", args.path.trim_start_matches('/'));

    let request = ApiRequest::get(format!("/git/repositories/{}/items", segment(&args.repo)))
        .param("path", &path)
        .param("versionDescriptor.version", branch)
        .param("versionDescriptor.versionType", "branch")
        .param("download", args.download)
        .project(project);
    let data = executor.call(request).await?;

    // With download=true the service answers with the raw file text
    if let Value::String(text) = &data {
        return Ok(json!({
            "path": path,
            "content": text,
        }));
    }

    Ok(pick(&data, &["path", "content", "size", "url", "isFolder"]))
}

pub(super) async fn list_branches(executor: &Executor, project: Option<String>, args: ListRepoBranchesArgs) -> Result<Value> {
    let request = ApiRequest::get(format!("/git/repositories/{}/refs", segment(&args.repo)))
        .param("filter", "heads/")
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "branches": map_list(&data, "value", |b| {
            let name = b
                .get("name")
                .and_then(Value::as_str)
                .map(|n| n.replacen("refs/heads/", "", 1));
            json!({
                "name": name,
                "objectId": b.get("objectId"),
                "url": b.get("url"),
            })
        }),
    }))
}

pub(super) async fn search_code(executor: &Executor, project: Option<String>, args: SearchCodeArgs) -> Result<Value> {
    let mut body = json!({
        "searchText": args.search_text,
        "$top": args.top.unwrap_or(DEFAULT_SEARCH_TOP),
    });
    if let Some(repo) = args.repo.filter(|r| !r.trim().is_empty()) {
        body["repositories"] = json!([repo]);
    }

    let request = ApiRequest::post("/search/codesearchresults", body).project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "results": map_list(&data, "results", |r| {
            json!({
                "fileName": r.get("fileName"),
                "path": r.get("path"),
                "repository": nested(r, "repository", "name"),
                "matches": r.get("matches"),
            })
        }),
    }))
}
