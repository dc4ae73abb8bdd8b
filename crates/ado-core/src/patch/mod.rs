//! Patch documents for work item mutation
//!
//! Work items are created and updated by sending an ordered list of JSON-patch
//! style operations. Order is significant and preserved exactly as built.
//!
//! - [`creation_document`] - `add` title, optional description, then fields
//! - [`build_update_document`] - `replace` fields, `remove` relations by
//!   position (descending), `add` relations
//!
//! Relations can only be addressed by list position, so removing a relation by
//! URL needs the current relation list first (see [`relations`]).

mod document;
pub mod relations;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

pub use document::{WorkItemUpdate, build_update_document, creation_document, update_document};
pub use relations::{RelationSource, normalize_url, removal_indices};

/// Path prefix for work item fields
pub const FIELDS_PATH: &str = "/fields";

/// Append position in the relation list
pub const RELATIONS_APPEND_PATH: &str = "/relations/-";

pub const TITLE_FIELD: &str = "System.Title";
pub const DESCRIPTION_FIELD: &str = "System.Description";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

/// One mutation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }

    pub fn field_path(field: &str) -> String {
        format!("{FIELDS_PATH}/{field}")
    }

    pub fn relation_path(index: usize) -> String {
        format!("/relations/{index}")
    }
}

/// A typed link from a work item to another artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub url: String,
}

impl Relation {
    pub fn new(rel: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            url: url.into(),
        }
    }
}

/// Ordered, non-empty sequence of patch operations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PatchDocument(Vec<PatchOperation>);

impl PatchDocument {
    /// Reject empty documents; an empty patch is never sent.
    pub fn new(operations: Vec<PatchOperation>) -> Result<Self> {
        if operations.is_empty() {
            return Err(Error::invalid_params(
                "At least one field update or link operation is required",
            ));
        }
        Ok(Self(operations))
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Request body for the JSON-patch mutation
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
