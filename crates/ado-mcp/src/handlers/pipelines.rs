//! Build, pipeline, release and test plan tools
//!
//! All read-only. Releases and test plans live under their own API areas but
//! share the list/get shape with builds.

use ado_core::{ApiRequest, Executor, Result};
use serde::Deserialize;
use serde_json::{Value, json};

use super::de;
use super::present::{count, map_list, nested, pick};

const DEFAULT_TOP: u32 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBuildsArgs {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub definition_id: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(rename = "$top", default, deserialize_with = "de::opt_count")]
    pub top: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBuildArgs {
    #[serde(deserialize_with = "de::id")]
    pub build_id: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListTopArgs {
    #[serde(rename = "$top", default, deserialize_with = "de::opt_count")]
    pub top: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPipelineRunArgs {
    #[serde(deserialize_with = "de::id")]
    pub pipeline_id: u64,
    #[serde(deserialize_with = "de::id")]
    pub run_id: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReleasesArgs {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub definition_id: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "$top", default, deserialize_with = "de::opt_count")]
    pub top: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetReleaseArgs {
    #[serde(deserialize_with = "de::id")]
    pub release_id: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTestPlanArgs {
    #[serde(deserialize_with = "de::id")]
    pub plan_id: u64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(super) async fn list_builds(executor: &Executor, project: Option<String>, args: ListBuildsArgs) -> Result<Value> {
    let request = ApiRequest::get("/build/builds")
        .param("$top", args.top.unwrap_or(DEFAULT_TOP))
        .param_opt("definitions", args.definition_id)
        .param_opt("statusFilter", non_blank(args.status))
        .param_opt("resultFilter", non_blank(args.result))
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "builds": map_list(&data, "value", |b| json!({
            "id": b.get("id"),
            "buildNumber": b.get("buildNumber"),
            "status": b.get("status"),
            "result": b.get("result"),
            "definition": nested(b, "definition", "name"),
            "requestedBy": nested(b, "requestedBy", "displayName"),
            "startTime": b.get("startTime"),
            "finishTime": b.get("finishTime"),
            "url": b.get("url"),
        })),
    }))
}

pub(super) async fn get_build(executor: &Executor, project: Option<String>, args: GetBuildArgs) -> Result<Value> {
    let request = ApiRequest::get(format!("/build/builds/{}", args.build_id)).project(project);
    let data = executor.call(request).await?;

    Ok(pick(
        &data,
        &["id", "buildNumber", "status", "result", "definition", "logs", "timeline", "url"],
    ))
}

pub(super) async fn list_pipelines(executor: &Executor, project: Option<String>, args: ListTopArgs) -> Result<Value> {
    let request = ApiRequest::get("/pipelines")
        .param("$top", args.top.unwrap_or(DEFAULT_TOP))
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "pipelines": map_list(&data, "value", |p| pick(p, &["id", "name", "folder", "url"])),
    }))
}

pub(super) async fn get_pipeline_run(executor: &Executor, project: Option<String>, args: GetPipelineRunArgs) -> Result<Value> {
    let request = ApiRequest::get(format!("/pipelines/{}/runs/{}", args.pipeline_id, args.run_id)).project(project);
    let data = executor.call(request).await?;

    Ok(pick(
        &data,
        &["id", "name", "state", "result", "createdDate", "finishedDate", "url"],
    ))
}

pub(super) async fn list_releases(executor: &Executor, project: Option<String>, args: ListReleasesArgs) -> Result<Value> {
    let request = ApiRequest::get("/release/releases")
        .param("$top", args.top.unwrap_or(DEFAULT_TOP))
        .param_opt("definitionId", args.definition_id)
        .param_opt("statusFilter", non_blank(args.status))
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "releases": map_list(&data, "value", |r| pick(r, &["id", "name", "status", "createdOn", "url"])),
    }))
}

pub(super) async fn get_release(executor: &Executor, project: Option<String>, args: GetReleaseArgs) -> Result<Value> {
    let request = ApiRequest::get(format!("/release/releases/{}", args.release_id)).project(project);
    let data = executor.call(request).await?;

    Ok(pick(&data, &["id", "name", "status", "environments", "url"]))
}

pub(super) async fn list_test_plans(executor: &Executor, project: Option<String>, args: ListTopArgs) -> Result<Value> {
    let request = ApiRequest::get("/test/plans")
        .param("$top", args.top.unwrap_or(DEFAULT_TOP))
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "testPlans": map_list(&data, "value", |tp| pick(tp, &["id", "name", "areaPath", "url"])),
    }))
}

pub(super) async fn get_test_plan(executor: &Executor, project: Option<String>, args: GetTestPlanArgs) -> Result<Value> {
    let request = ApiRequest::get(format!("/test/plans/{}", args.plan_id)).project(project);
    let data = executor.call(request).await?;

    Ok(pick(&data, &["id", "name", "areaPath", "testSuites", "url"]))
}
