//! [`MockTransport`] answers exchanges from a script and logs every request.

use std::sync::Mutex;

use ado_core::{HttpExchange, HttpMethod, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

/// A scripted answer for exchanges matching `method` and a path suffix.
#[derive(Debug, Clone)]
pub struct Rule {
    pub method: HttpMethod,
    /// Matched against the URL path (query excluded) with `ends_with`
    pub path_suffix: String,
    pub outcome: Result<HttpResponse, TransportError>,
}

/// Scripted transport.
///
/// Rules are checked in insertion order; the first match answers. Unmatched
/// exchanges get a 404 so a missing script line shows up as an upstream error.
#[derive(Default)]
pub struct MockTransport {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<HttpExchange>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with `status` and a JSON body.
    pub fn respond(self, method: HttpMethod, path_suffix: &str, status: u16, body: Value) -> Self {
        self.push(Rule {
            method,
            path_suffix: path_suffix.to_string(),
            outcome: Ok(HttpResponse::new(status, body.to_string())),
        })
    }

    /// Answer with `status` and a raw text body.
    pub fn respond_text(self, method: HttpMethod, path_suffix: &str, status: u16, body: &str) -> Self {
        self.push(Rule {
            method,
            path_suffix: path_suffix.to_string(),
            outcome: Ok(HttpResponse::new(status, body)),
        })
    }

    /// Fail without a response.
    pub fn fail(self, method: HttpMethod, path_suffix: &str, message: &str) -> Self {
        self.push(Rule {
            method,
            path_suffix: path_suffix.to_string(),
            outcome: Err(TransportError::new(message)),
        })
    }

    fn push(self, rule: Rule) -> Self {
        self.rules.lock().unwrap().push(rule);
        self
    }

    /// Every exchange sent so far.
    pub fn requests(&self) -> Vec<HttpExchange> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The most recent exchange, if any.
    pub fn last_request(&self) -> Option<HttpExchange> {
        self.requests.lock().unwrap().last().cloned()
    }
}

fn url_path(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, exchange: HttpExchange) -> Result<HttpResponse, TransportError> {
        let outcome = {
            let rules = self.rules.lock().unwrap();
            rules
                .iter()
                .find(|rule| {
                    rule.method == exchange.method && url_path(&exchange.url).ends_with(&rule.path_suffix)
                })
                .map(|rule| rule.outcome.clone())
        };
        self.requests.lock().unwrap().push(exchange);
        outcome.unwrap_or_else(|| Ok(HttpResponse::new(404, r#"{"message":"no scripted response"}"#)))
    }
}

/// Query parameters of a recorded exchange, decoded.
pub fn query_pairs(exchange: &HttpExchange) -> Vec<(String, String)> {
    Url::parse(&exchange.url)
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

/// Value of one query parameter of a recorded exchange.
pub fn query_param(exchange: &HttpExchange, key: &str) -> Option<String> {
    query_pairs(exchange)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}
