use serde_json::{Value, json};

use super::relations::{RelationSource, removal_indices};
use super::{DESCRIPTION_FIELD, PatchDocument, PatchOperation, RELATIONS_APPEND_PATH, Relation, TITLE_FIELD};
use crate::{Error, Result};

/// Requested changes to an existing work item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkItemUpdate {
    pub work_item_id: u64,
    pub project: Option<String>,
    /// Field replacements, in caller order
    pub fields: Vec<(String, Value)>,
    pub add_links: Vec<Relation>,
    /// Relation URLs to remove
    pub remove_links: Vec<String>,
}

impl WorkItemUpdate {
    /// Nothing to replace, add or remove
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.add_links.is_empty() && self.remove_links.is_empty()
    }
}

/// `add` title, `add` description when present, then one `add` per field.
pub fn creation_document(title: &str, description: Option<&str>, fields: &[(String, Value)]) -> PatchDocument {
    let mut operations = Vec::with_capacity(2 + fields.len());
    operations.push(PatchOperation::add(
        PatchOperation::field_path(TITLE_FIELD),
        Value::String(title.to_string()),
    ));
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        operations.push(PatchOperation::add(
            PatchOperation::field_path(DESCRIPTION_FIELD),
            Value::String(description.to_string()),
        ));
    }
    operations.extend(
        fields
            .iter()
            .map(|(key, value)| PatchOperation::add(PatchOperation::field_path(key), value.clone())),
    );
    PatchDocument(operations)
}

/// Assemble an update document: replacements, removals, additions.
///
/// `removals` must already be sorted descending; they are emitted as given.
pub fn update_document(
    fields: &[(String, Value)],
    removals: &[usize],
    additions: &[Relation],
) -> Result<PatchDocument> {
    let mut operations = Vec::with_capacity(fields.len() + removals.len() + additions.len());

    operations.extend(
        fields
            .iter()
            .map(|(key, value)| PatchOperation::replace(PatchOperation::field_path(key), value.clone())),
    );
    operations.extend(
        removals
            .iter()
            .map(|index| PatchOperation::remove(PatchOperation::relation_path(*index))),
    );
    operations.extend(additions.iter().map(|link| {
        PatchOperation::add(
            RELATIONS_APPEND_PATH,
            json!({ "rel": link.rel, "url": link.url }),
        )
    }));

    PatchDocument::new(operations)
}

/// Build the update document, reading current relations only when a removal is requested.
///
/// A failed read is not fatal: removals are skipped and the remaining
/// operations still go out. An update with nothing to do is rejected before
/// any read.
pub async fn build_update_document(
    update: &WorkItemUpdate,
    source: &dyn RelationSource,
) -> Result<PatchDocument> {
    if update.is_empty() {
        return Err(Error::invalid_params(
            "At least one field update or link operation is required",
        ));
    }

    let removals = if update.remove_links.is_empty() {
        Vec::new()
    } else {
        match source
            .current_relations(update.work_item_id, update.project.as_deref())
            .await
        {
            Ok(current) => removal_indices(&current, &update.remove_links),
            Err(e) => {
                tracing::warn!(
                    work_item_id = update.work_item_id,
                    error = %e,
                    "could not fetch current relations, skipping removal"
                );
                Vec::new()
            }
        }
    };

    update_document(&update.fields, &removals, &update.add_links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorDiagnosis;
    use crate::ErrorKind;
    use crate::patch::PatchOp;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Option<Vec<Relation>>, AtomicUsize);

    impl Fixed {
        fn ok(urls: &[&str]) -> Self {
            Self(
                Some(urls.iter().map(|u| Relation::new("Related", *u)).collect()),
                AtomicUsize::new(0),
            )
        }

        fn failing() -> Self {
            Self(None, AtomicUsize::new(0))
        }

        fn reads(&self) -> usize {
            self.1.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RelationSource for Fixed {
        async fn current_relations(&self, _id: u64, _project: Option<&str>) -> Result<Vec<Relation>> {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0.clone().ok_or_else(|| {
                ErrorDiagnosis::new(ErrorKind::UpstreamError, "read failed")
                    .with_status(500)
                    .into()
            })
        }
    }

    #[test]
    fn creation_without_description_has_no_description_op() {
        let fields = vec![("Custom.Severity".to_string(), json!("High"))];
        let doc = creation_document("Fix crash", None, &fields);
        assert_eq!(
            doc.to_value().unwrap(),
            json!([
                {"op": "add", "path": "/fields/System.Title", "value": "Fix crash"},
                {"op": "add", "path": "/fields/Custom.Severity", "value": "High"}
            ])
        );
    }

    #[test]
    fn creation_with_description_puts_it_second() {
        let fields = vec![
            ("System.Tags".to_string(), json!("a; b")),
            ("Microsoft.VSTS.Common.Priority".to_string(), json!(2)),
        ];
        let doc = creation_document("T", Some("D"), &fields);
        let paths: Vec<&str> = doc.operations().iter().map(|o| o.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/fields/System.Title",
                "/fields/System.Description",
                "/fields/System.Tags",
                "/fields/Microsoft.VSTS.Common.Priority"
            ]
        );
        assert!(doc.operations().iter().all(|o| o.op == PatchOp::Add));
    }

    #[tokio::test]
    async fn removal_matches_after_trailing_slash_normalization() {
        let source = Fixed::ok(&["a", "https://dev.azure.com/org/_git/1/", "b"]);
        let update = WorkItemUpdate {
            work_item_id: 7,
            remove_links: vec!["https://dev.azure.com/org/_git/1".to_string()],
            ..Default::default()
        };
        let doc = build_update_document(&update, &source).await.unwrap();
        assert_eq!(doc.to_value().unwrap(), json!([{"op": "remove", "path": "/relations/1"}]));
    }

    #[tokio::test]
    async fn failed_read_skips_removal_but_keeps_fields() {
        let source = Fixed::failing();
        let update = WorkItemUpdate {
            work_item_id: 7,
            fields: vec![("System.State".to_string(), json!("Closed"))],
            remove_links: vec!["a".to_string()],
            ..Default::default()
        };
        let doc = build_update_document(&update, &source).await.unwrap();
        assert_eq!(source.reads(), 1);
        assert_eq!(
            doc.to_value().unwrap(),
            json!([{"op": "replace", "path": "/fields/System.State", "value": "Closed"}])
        );
    }

    #[tokio::test]
    async fn empty_update_is_rejected_without_reading() {
        let source = Fixed::ok(&[]);
        let update = WorkItemUpdate {
            work_item_id: 7,
            ..Default::default()
        };
        let err = build_update_document(&update, &source).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
        assert_eq!(source.reads(), 0);
    }

    #[tokio::test]
    async fn only_unmatched_removals_is_rejected() {
        let source = Fixed::ok(&["a"]);
        let update = WorkItemUpdate {
            work_item_id: 7,
            remove_links: vec!["nope".to_string()],
            ..Default::default()
        };
        let err = build_update_document(&update, &source).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn no_read_when_no_removal_requested() {
        let source = Fixed::ok(&["a"]);
        let update = WorkItemUpdate {
            work_item_id: 7,
            add_links: vec![Relation::new("Hyperlink", "https://example.com")],
            ..Default::default()
        };
        let doc = build_update_document(&update, &source).await.unwrap();
        assert_eq!(source.reads(), 0);
        assert_eq!(
            doc.to_value().unwrap(),
            json!([{
                "op": "add",
                "path": "/relations/-",
                "value": {"rel": "Hyperlink", "url": "https://example.com"}
            }])
        );
    }
}
