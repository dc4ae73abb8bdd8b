//! Wiki tools

use ado_core::{ApiRequest, Error, Executor, Result};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{de, segment};
use super::present::{count, map_list, pick};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWikiPageArgs {
    #[serde(default)]
    pub wiki: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub page_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "de::yes")]
    pub include_content: bool,
}

impl GetWikiPageArgs {
    pub(super) fn validated(self) -> Result<Self> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        if blank(&self.page_id) && blank(&self.path) {
            return Err(Error::invalid_params("Either pageId or path must be provided"));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWikiPagesArgs {
    #[serde(default)]
    pub wiki: Option<String>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchWikiPagesArgs {
    pub query: String,
    #[serde(default)]
    pub wiki: Option<String>,
}

/// Requested wiki or the configured default, encoded as a path segment
fn wiki_name(executor: &Executor, requested: &Option<String>) -> String {
    let wiki = match requested.as_deref() {
        Some(w) if !w.trim().is_empty() => w,
        _ => executor.context().config().wiki(),
    };
    segment(wiki).into_owned()
}

/// OData string literal body; a single quote is escaped by doubling it.
fn odata_literal(text: &str) -> String {
    text.replace('\'', "''")
}

fn page_summary(page: &Value) -> Value {
    pick(page, &["id", "path", "url"])
}

pub(super) async fn get_page(executor: &Executor, project: Option<String>, args: GetWikiPageArgs) -> Result<Value> {
    let wiki = wiki_name(executor, &args.wiki);

    let mut request = match args.page_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(page_id) => ApiRequest::get(format!("/wiki/wikis/{wiki}/pages/{}", segment(page_id))),
        None => ApiRequest::get(format!("/wiki/wikis/{wiki}/pages")).param_opt("path", args.path.clone()),
    };
    if args.include_content {
        request = request.param("includeContent", "true");
    }

    let data = executor.call(request.project(project)).await?;

    Ok(json!({
        "pageId": data.get("id"),
        "path": data.get("path"),
        "content": data.get("content"),
        "url": data.get("url"),
        "gitItemPath": data.get("gitItemPath"),
    }))
}

pub(super) async fn list_pages(executor: &Executor, project: Option<String>, args: ListWikiPagesArgs) -> Result<Value> {
    let wiki = wiki_name(executor, &args.wiki);
    let request = ApiRequest::get(format!("/wiki/wikis/{wiki}/pages"))
        .param("recursive", args.recursive)
        .project(project);

    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "pages": map_list(&data, "value", page_summary),
    }))
}

pub(super) async fn search_pages(executor: &Executor, project: Option<String>, args: SearchWikiPagesArgs) -> Result<Value> {
    let wiki = wiki_name(executor, &args.wiki);
    let request = ApiRequest::get(format!("/wiki/wikis/{wiki}/pages"))
        .param("$filter", format!("contains(path, '{}')", odata_literal(&args.query)))
        .project(project);

    let data = executor.call(request).await?;

    Ok(json!({
        "count": count(&data),
        "pages": map_list(&data, "value", page_summary),
    }))
}
