//! Raw REST passthrough

use ado_core::{ApiRequest, Executor, HttpMethod, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdoApiCallArgs {
    pub endpoint: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl AdoApiCallArgs {
    /// Parse the verb and flatten `params` into query pairs.
    pub(super) fn into_request(self) -> Result<ApiRequest> {
        let method = match self.method.as_deref().map(str::trim) {
            None | Some("") => HttpMethod::Get,
            Some(m) => m.parse()?,
        };

        let mut request = ApiRequest::new(method, self.endpoint);
        for (key, value) in self.params {
            request = match value {
                Value::Null => request,
                Value::String(s) => request.param(key, s),
                other => request.param(key, other),
            };
        }
        if let Some(body) = self.body.filter(|b| !b.is_null()) {
            request = request.body(body);
        }
        Ok(request)
    }
}

pub(super) async fn call(executor: &Executor, project: Option<String>, args: AdoApiCallArgs) -> Result<Value> {
    let request = args.into_request()?.project(project);
    executor.call(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> AdoApiCallArgs {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn method_defaults_to_get() {
        let request = args(json!({"endpoint": "/projects"})).into_request().unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.body.is_none());
    }

    #[test]
    fn params_are_stringified_in_order() {
        let request = args(json!({
            "endpoint": "/build/builds",
            "method": "get",
            "params": {"$top": 5, "queryOrder": "finishTimeDescending", "deleted": false, "skip": null}
        }))
        .into_request()
        .unwrap();

        assert_eq!(
            request.query,
            vec![
                ("$top".to_string(), "5".to_string()),
                ("queryOrder".to_string(), "finishTimeDescending".to_string()),
                ("deleted".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn unsupported_method_is_rejected() {
        let err = args(json!({"endpoint": "/x", "method": "OPTIONS"}))
            .into_request()
            .unwrap_err();
        assert_eq!(err.kind(), ado_core::ErrorKind::InvalidParams);
    }

    #[test]
    fn body_is_kept_for_post() {
        let request = args(json!({"endpoint": "/wit/wiql", "method": "POST", "body": {"query": "x"}}))
            .into_request()
            .unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.body, Some(json!({"query": "x"})));
    }
}
