//! API Call Executor
//!
//! Resolves the target project, composes the final URL, attaches the
//! credential, performs exactly one exchange and reports it to telemetry. On
//! failure the raw outcome goes to the classifier; there is no retry.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Url;
use serde_json::Value;

use crate::classify::{Failure, classify};
use crate::config::AdoConfig;
use crate::request::ApiRequest;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::transport::{HttpExchange, HttpResponse, Transport, TransportError};
use crate::{Error, Result};

const API_VERSION_PARAM: &str = "api-version";

/// Immutable per-process context shared by the dispatcher and executor
#[derive(Clone)]
pub struct AdoContext {
    config: Arc<AdoConfig>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl AdoContext {
    pub fn new(config: AdoConfig, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            config: Arc::new(config),
            telemetry,
        }
    }

    pub fn config(&self) -> &AdoConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &dyn TelemetrySink {
        self.telemetry.as_ref()
    }

    /// Explicit project if given and non-blank, otherwise the configured default.
    pub fn resolve_project<'a>(&'a self, project: Option<&'a str>) -> &'a str {
        match project {
            Some(p) if !p.trim().is_empty() => p,
            _ => self.config.project(),
        }
    }
}

/// Performs upstream calls on behalf of handlers
#[derive(Clone)]
pub struct Executor {
    context: AdoContext,
    transport: Arc<dyn Transport>,
}

impl Executor {
    pub fn new(context: AdoContext, transport: Arc<dyn Transport>) -> Self {
        Self { context, transport }
    }

    pub fn context(&self) -> &AdoContext {
        &self.context
    }

    /// Execute one request and return the decoded response body verbatim.
    pub async fn call(&self, request: ApiRequest) -> Result<Value> {
        let project = self
            .context
            .resolve_project(request.project.as_deref())
            .to_string();
        let name = request.describe();
        let started = Instant::now();

        let (target, outcome) = match self.compose_url(&request, &project) {
            Ok(url) => {
                let target = url.to_string();
                let exchange = self.exchange(&request, target.clone());
                tracing::debug!(method = %request.method, url = %target, "sending request");
                (target, self.transport.send(exchange).await)
            }
            Err(e) => (request.endpoint.clone(), Err(e)),
        };

        let duration = started.elapsed();
        let (success, status) = match &outcome {
            Ok(response) => (response.is_success(), response.status),
            Err(_) => (false, 0),
        };

        self.context.telemetry().record(TelemetryEvent::Dependency {
            name,
            target,
            project,
            duration,
            success,
            status,
        });

        let response = match outcome {
            Ok(response) if response.is_success() => response,
            Ok(response) => return Err(self.fail(Failure::Response(&response))),
            Err(error) => return Err(self.fail(Failure::Transport(&error))),
        };

        Ok(decode_body(response))
    }

    /// `<api root>/<endpoint>?api-version=..&<endpoint query>&<caller params>`
    ///
    /// An `api-version` carried by the endpoint's own query string or by the
    /// caller parameters is dropped; the protocol version is never overridable.
    pub fn compose_url(&self, request: &ApiRequest, project: &str) -> std::result::Result<Url, TransportError> {
        let endpoint = if request.endpoint.starts_with('/') {
            request.endpoint.clone()
        } else {
            format!("/{}", request.endpoint)
        };
        let raw = format!("{}{}", self.context.config().api_root(project), endpoint);

        let mut url = Url::parse(&raw)
            .map_err(|e| TransportError::new(format!("invalid request URL {raw}: {e}")))?;
        let embedded: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        url.set_query(None);
        url.set_fragment(None);

        let caller = embedded.iter().chain(request.query.iter());
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(API_VERSION_PARAM, self.context.config().api_version());
            for (key, value) in caller.filter(|(key, _)| !key.eq_ignore_ascii_case(API_VERSION_PARAM)) {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn exchange(&self, request: &ApiRequest, url: String) -> HttpExchange {
        let headers = vec![
            (
                "Authorization".to_string(),
                self.context.config().auth_header().to_string(),
            ),
            ("Content-Type".to_string(), request.content_type.to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        let body = if request.method.carries_body() {
            request.body.clone()
        } else {
            None
        };

        HttpExchange {
            method: request.method,
            url,
            headers,
            body,
        }
    }

    fn fail(&self, failure: Failure<'_>) -> Error {
        let diagnosis = classify(failure, self.context.config());
        tracing::warn!(
            kind = %diagnosis.kind,
            status = diagnosis.http_status.unwrap_or(0),
            "upstream call failed"
        );
        Error::Api(diagnosis)
    }
}

/// JSON when the body parses, the raw text otherwise, `null` when empty.
fn decode_body(response: HttpResponse) -> Value {
    if response.body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&response.body).unwrap_or(Value::String(response.body))
}
