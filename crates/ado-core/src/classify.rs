//! Failure classification
//!
//! Turns a failed exchange into exactly one [`ErrorDiagnosis`]. Classification is
//! a pure function of the failure; it never retries or touches the request.

use serde_json::Value;

use crate::config::{AdoConfig, ENV_CREDENTIAL};
use crate::error::{ErrorDiagnosis, ErrorKind};
use crate::transport::{HttpResponse, TransportError};

/// Substrings in a 401 message that mean the token is expired or denied
pub const EXPIRY_MARKERS: [&str; 3] = ["expired", "Access Denied", "Personal Access Token"];

/// What went wrong with an exchange
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// The service answered with a non-2xx status
    Response(&'a HttpResponse),
    /// No response was received
    Transport(&'a TransportError),
}

/// Classify a failed exchange.
pub fn classify(failure: Failure<'_>, config: &AdoConfig) -> ErrorDiagnosis {
    match failure {
        Failure::Transport(error) => {
            ErrorDiagnosis::new(ErrorKind::InternalError, format!("Error: {}", error.message))
        }
        Failure::Response(response) => {
            let message = response_message(response);
            if response.status == 401 && is_expired_credential(&message) {
                return ErrorDiagnosis::new(
                    ErrorKind::ExpiredCredential,
                    format!("Original error: {message}"),
                )
                .with_status(response.status)
                .with_remediation(remediation(config));
            }

            ErrorDiagnosis::new(
                ErrorKind::UpstreamError,
                format!(
                    "Azure DevOps API error: {} - {}\n{}",
                    response.status, response.reason, response.body
                ),
            )
            .with_status(response.status)
        }
    }
}

/// Heuristic: does this upstream message indicate token expiry or denial?
pub fn is_expired_credential(message: &str) -> bool {
    EXPIRY_MARKERS.iter().any(|marker| message.contains(marker))
}

/// The `message` member of a JSON error body, or the raw body text.
pub fn response_message(response: &HttpResponse) -> String {
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| response.body.clone())
}

fn remediation(config: &AdoConfig) -> String {
    format!(
        "Azure DevOps PAT token has expired. Please update your PAT token:\n\n\
         1. Generate a new PAT at: {}\n\
         2. Set {} to the new token\n\
         3. Restart the MCP host and the ado-mcp server",
        config.token_settings_url(),
        ENV_CREDENTIAL
    )
}
