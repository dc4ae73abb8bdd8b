//! Error types for ado-core
//!
//! Every failure an invocation can produce is projected onto a small taxonomy
//! ([`ErrorKind`]) so the host receives an actionable diagnosis instead of a raw
//! transport error.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type for ado-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller error, detected before any network activity
    InvalidParams,
    /// Upstream rejected the credential as expired or denied
    ExpiredCredential,
    /// Any other non-success upstream response
    UpstreamError,
    /// No upstream response at all (transport failure, bad state)
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidParams => "InvalidParams",
            ErrorKind::ExpiredCredential => "ExpiredCredential",
            ErrorKind::UpstreamError => "UpstreamError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed diagnosis of a failure, suitable for returning to the host verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDiagnosis {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorDiagnosis {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            remediation: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}

impl fmt::Display for ErrorDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remediation {
            Some(remediation) => write!(f, "{}\n\n{}", remediation, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors that can occur in ado-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required argument is missing or malformed
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// No handler is registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The upstream exchange failed and has been classified
    #[error("{0}")]
    Api(ErrorDiagnosis),

    /// Startup configuration is incomplete
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Error::InvalidParams(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParams(_) | Error::UnknownTool(_) => ErrorKind::InvalidParams,
            Error::Api(diagnosis) => diagnosis.kind,
            Error::Config(_) | Error::Json(_) => ErrorKind::InternalError,
        }
    }

    /// Project this error onto the diagnosis taxonomy
    pub fn diagnosis(&self) -> ErrorDiagnosis {
        match self {
            Error::Api(diagnosis) => diagnosis.clone(),
            Error::UnknownTool(name) => {
                ErrorDiagnosis::new(ErrorKind::InvalidParams, format!("Method not found: unknown tool {name}"))
            }
            Error::Json(e) => ErrorDiagnosis::new(ErrorKind::InternalError, format!("Error: {e}")),
            other => ErrorDiagnosis::new(other.kind(), other.to_string()),
        }
    }
}

impl From<ErrorDiagnosis> for Error {
    fn from(diagnosis: ErrorDiagnosis) -> Self {
        Error::Api(diagnosis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_is_reported_as_invalid_params() {
        let error = Error::UnknownTool("nope".to_string());
        let diagnosis = error.diagnosis();
        assert_eq!(diagnosis.kind, ErrorKind::InvalidParams);
        assert!(diagnosis.message.contains("Method not found"));
        assert!(diagnosis.message.contains("nope"));
    }

    #[test]
    fn api_error_keeps_its_diagnosis() {
        let diagnosis = ErrorDiagnosis::new(ErrorKind::UpstreamError, "boom").with_status(500);
        let error = Error::from(diagnosis.clone());
        assert_eq!(error.kind(), ErrorKind::UpstreamError);
        assert_eq!(error.diagnosis(), diagnosis);
    }

    #[test]
    fn diagnosis_serializes_camel_case_and_skips_empty() {
        let diagnosis = ErrorDiagnosis::new(ErrorKind::UpstreamError, "bad").with_status(404);
        let json = serde_json::to_value(&diagnosis).unwrap();
        assert_eq!(json["kind"], "UpstreamError");
        assert_eq!(json["httpStatus"], 404);
        assert!(json.get("remediation").is_none());
    }

    #[test]
    fn display_leads_with_remediation() {
        let diagnosis = ErrorDiagnosis::new(ErrorKind::ExpiredCredential, "Original error: expired")
            .with_remediation("Renew the token");
        let display = diagnosis.to_string();
        assert!(display.starts_with("Renew the token"));
        assert!(display.ends_with("Original error: expired"));
    }
}
