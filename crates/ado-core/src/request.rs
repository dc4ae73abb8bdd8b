//! Outbound request description
//!
//! An [`ApiRequest`] is built once per upstream call by a handler and consumed by
//! the [`Executor`](crate::Executor). It carries only what varies per call; the
//! protocol version, credential and target organization are added at the
//! executor boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// `Content-Type` for reads and generic calls
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// `Content-Type` for work item mutations
pub const CONTENT_TYPE_JSON_PATCH: &str = "application/json-patch+json";

/// HTTP verbs the adapter is allowed to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a body is sent with this verb
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Patch | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    /// Case-insensitive parse; anything outside the five verbs is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PATCH" => Ok(HttpMethod::Patch),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(Error::invalid_params(format!(
                "Unsupported HTTP method: {other}"
            ))),
        }
    }
}

/// One outbound call against the upstream service
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Path below `/_apis`, e.g. `/git/repositories`
    pub endpoint: String,
    pub method: HttpMethod,
    /// Caller query parameters, in insertion order
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub content_type: &'static str,
    /// Target project; `None` means the configured default
    pub project: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            query: Vec::new(),
            body: None,
            content_type: CONTENT_TYPE_JSON,
            project: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, endpoint).body(body)
    }

    /// JSON-patch mutation of a single record
    pub fn patch_document(endpoint: impl Into<String>, document: Value) -> Self {
        Self::new(HttpMethod::Patch, endpoint)
            .body(document)
            .content_type(CONTENT_TYPE_JSON_PATCH)
    }

    /// Append a query parameter. A later value for the same key replaces the earlier one.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.query.push((key, value)),
        }
        self
    }

    pub fn param_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn project(mut self, project: Option<String>) -> Self {
        self.project = project.filter(|p| !p.trim().is_empty());
        self
    }

    /// Short human-readable target used for logs and telemetry
    pub fn describe(&self) -> String {
        format!("ADO API {} {}", self.method, self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!("Delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
    }

    #[test]
    fn unsupported_method_is_invalid_params() {
        let err = "TRACE".parse::<HttpMethod>().unwrap_err();
        assert!(matches!(err, Error::InvalidParams(msg) if msg.contains("TRACE")));
    }

    #[test]
    fn param_replaces_existing_key() {
        let request = ApiRequest::get("/x").param("a", 1).param("b", "two").param("a", 3);
        assert_eq!(
            request.query,
            vec![("a".to_string(), "3".to_string()), ("b".to_string(), "two".to_string())]
        );
    }

    #[test]
    fn patch_document_uses_json_patch_content_type() {
        let request = ApiRequest::patch_document("/wit/workitems/1", json!([]));
        assert_eq!(request.method, HttpMethod::Patch);
        assert_eq!(request.content_type, CONTENT_TYPE_JSON_PATCH);
    }

    #[test]
    fn blank_project_falls_back_to_default() {
        let request = ApiRequest::get("/x").project(Some("  ".to_string()));
        assert!(request.project.is_none());
    }
}
