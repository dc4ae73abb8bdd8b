//! Relation removal by URL
//!
//! The service only removes relations by position. Removal therefore runs in two
//! phases: read the current relation list, then translate each requested URL
//! into the position of the first relation with the same normalized URL.

use async_trait::async_trait;
use serde_json::Value;

use super::Relation;
use crate::executor::Executor;
use crate::request::ApiRequest;
use crate::Result;

/// Source of a work item's current relation list
#[async_trait]
pub trait RelationSource: Send + Sync {
    async fn current_relations(&self, work_item_id: u64, project: Option<&str>) -> Result<Vec<Relation>>;
}

#[async_trait]
impl RelationSource for Executor {
    async fn current_relations(&self, work_item_id: u64, project: Option<&str>) -> Result<Vec<Relation>> {
        let request = ApiRequest::get(format!("/wit/workitems/{work_item_id}"))
            .param("$expand", "relations")
            .project(project.map(str::to_string));
        let work_item = self.call(request).await?;
        Ok(relations_from_work_item(&work_item))
    }
}

/// Relations of a work item document, one entry per list position.
///
/// Malformed entries are kept with an empty URL so positions stay aligned.
pub fn relations_from_work_item(work_item: &Value) -> Vec<Relation> {
    let Some(relations) = work_item.get("relations").and_then(Value::as_array) else {
        return Vec::new();
    };
    relations
        .iter()
        .map(|entry| {
            let field = |name: &str| {
                entry
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Relation::new(field("rel"), field("url"))
        })
        .collect()
}

/// Case-folded, with a single trailing slash stripped
pub fn normalize_url(url: &str) -> String {
    let lowered = url.to_lowercase();
    match lowered.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Positions to remove, sorted descending and free of duplicates.
///
/// Each requested URL matches the first relation whose normalized URL is equal.
/// Unmatched URLs are dropped. Descending order keeps every index valid while the
/// removals are applied one after another.
pub fn removal_indices(current: &[Relation], remove_urls: &[String]) -> Vec<usize> {
    let normalized: Vec<String> = current.iter().map(|r| normalize_url(&r.url)).collect();

    let mut indices: Vec<usize> = remove_urls
        .iter()
        .filter_map(|url| {
            let wanted = normalize_url(url);
            normalized.iter().position(|candidate| *candidate == wanted)
        })
        .collect();

    indices.sort_unstable_by(|a, b| b.cmp(a));
    indices.dedup();
    indices
}
