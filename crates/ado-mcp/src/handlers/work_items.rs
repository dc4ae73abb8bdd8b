//! Work item tools
//!
//! Creation and update go through the patch document builder in `ado-core`;
//! updates that remove links read the current relation list first.

use ado_core::patch::creation_document;
use ado_core::{ApiRequest, Error, Executor, Relation, Result, WorkItemUpdate, build_update_document};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{de, segment};
use super::present::{count, map_list, pick};

pub const DEFAULT_EXPAND: &str = "all";
const DEFAULT_QUERY_TOP: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWorkItemArgs {
    #[serde(deserialize_with = "de::id")]
    pub work_item_id: u64,
    #[serde(default)]
    pub fields: Option<String>,
    #[serde(default)]
    pub expand: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWorkItemsArgs {
    #[serde(deserialize_with = "de::ids")]
    pub work_item_ids: Vec<u64>,
    #[serde(default)]
    pub fields: Option<String>,
    #[serde(default)]
    pub expand: Option<String>,
}

impl GetWorkItemsArgs {
    pub(super) fn validated(self) -> Result<Self> {
        if self.work_item_ids.is_empty() {
            return Err(Error::invalid_params("workItemIds must not be empty"));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryWorkItemsArgs {
    pub wiql: String,
    #[serde(rename = "$top", default, deserialize_with = "de::opt_count")]
    pub top: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateWorkItemArgs {
    #[serde(rename = "type")]
    pub work_item_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkItemArgs {
    #[serde(deserialize_with = "de::id")]
    pub work_item_id: u64,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Relation>,
    #[serde(default)]
    pub remove_links: Vec<String>,
}

impl UpdateWorkItemArgs {
    pub(super) fn validated(self) -> Result<Self> {
        if let Some(link) = self.links.iter().find(|l| l.url.trim().is_empty() || l.rel.trim().is_empty()) {
            return Err(Error::invalid_params(format!(
                "Each link needs rel and url (got rel={:?}, url={:?})",
                link.rel, link.url
            )));
        }
        Ok(self)
    }

    pub fn into_update(self, project: Option<String>) -> WorkItemUpdate {
        WorkItemUpdate {
            work_item_id: self.work_item_id,
            project,
            fields: self.fields.into_iter().collect(),
            add_links: self.links,
            remove_links: self.remove_links,
        }
    }
}

fn expand_or_default(expand: &Option<String>) -> &str {
    expand
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(DEFAULT_EXPAND)
}

pub(super) async fn get_one(executor: &Executor, project: Option<String>, args: GetWorkItemArgs) -> Result<Value> {
    let request = ApiRequest::get(format!("/wit/workitems/{}", args.work_item_id))
        .param("$expand", expand_or_default(&args.expand))
        .param_opt("fields", args.fields.clone())
        .project(project);
    let data = executor.call(request).await?;

    Ok(pick(&data, &["id", "rev", "fields", "relations", "url"]))
}

pub(super) async fn get_many(executor: &Executor, project: Option<String>, args: GetWorkItemsArgs) -> Result<Value> {
    let request = ApiRequest::get("/wit/workitems")
        .param("ids", join_ids(&args.work_item_ids))
        .param("$expand", expand_or_default(&args.expand))
        .param_opt("fields", args.fields.clone())
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "workItems": map_list(&data, "value", |wi| pick(wi, &["id", "rev", "fields", "url"])),
    }))
}

pub(super) async fn query(executor: &Executor, project: Option<String>, args: QueryWorkItemsArgs) -> Result<Value> {
    let top = args.top.map_or(DEFAULT_QUERY_TOP, |t| t as usize);

    let wiql = ApiRequest::post("/wit/wiql", json!({ "query": args.wiql })).project(project.clone());
    let result = executor.call(wiql).await?;

    let ids: Vec<u64> = result
        .get("workItems")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|wi| wi.get("id").and_then(Value::as_u64)).collect())
        .unwrap_or_default();

    if ids.is_empty() {
        return Ok(json!({ "count": 0, "workItems": [] }));
    }

    let ids = &ids[..ids.len().min(top)];
    let request = ApiRequest::get("/wit/workitems")
        .param("ids", join_ids(ids))
        .param("$expand", DEFAULT_EXPAND)
        .project(project);
    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "workItems": map_list(&data, "value", |wi| pick(wi, &["id", "fields", "url"])),
    }))
}

pub(super) async fn create(executor: &Executor, project: Option<String>, args: CreateWorkItemArgs) -> Result<Value> {
    let fields: Vec<(String, Value)> = args.fields.into_iter().collect();
    let document = creation_document(&args.title, args.description.as_deref(), &fields);

    tracing::debug!(operations = document.len(), work_item_type = %args.work_item_type, "creating work item");

    let request = ApiRequest::patch_document(
        format!("/wit/workitems/${}", segment(&args.work_item_type)),
        document.to_value()?,
    )
    .project(project);
    let data = executor.call(request).await?;

    Ok(pick(&data, &["id", "rev", "fields", "url"]))
}

pub(super) async fn update(executor: &Executor, project: Option<String>, args: UpdateWorkItemArgs) -> Result<Value> {
    let update = args.into_update(project);
    let document = build_update_document(&update, executor).await?;

    tracing::debug!(
        work_item_id = update.work_item_id,
        operations = document.len(),
        "updating work item"
    );

    let request = ApiRequest::patch_document(
        format!("/wit/workitems/{}", update.work_item_id),
        document.to_value()?,
    )
    .project(update.project.clone());
    let data = executor.call(request).await?;

    Ok(pick(&data, &["id", "rev", "fields", "relations", "url"]))
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}
