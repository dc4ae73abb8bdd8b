//! Error types for the MCP server

use ado_core::{ErrorDiagnosis, ErrorKind};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during MCP server operations
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the request layer, already classified
    #[error(transparent)]
    Core(#[from] ado_core::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error on the stdio transport
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// JSON-RPC error code for a failed `tools/call`
    pub fn code(&self) -> i32 {
        match self {
            Error::Core(ado_core::Error::UnknownTool(_)) => METHOD_NOT_FOUND,
            Error::Core(e) => match e.kind() {
                ErrorKind::InvalidParams => INVALID_PARAMS,
                ErrorKind::ExpiredCredential => INVALID_REQUEST,
                ErrorKind::UpstreamError | ErrorKind::InternalError => INTERNAL_ERROR,
            },
            Error::Json(_) => INVALID_PARAMS,
            Error::Io(_) => INTERNAL_ERROR,
        }
    }

    pub fn diagnosis(&self) -> ErrorDiagnosis {
        match self {
            Error::Core(e) => e.diagnosis(),
            Error::Json(e) => ErrorDiagnosis::new(ErrorKind::InvalidParams, e.to_string()),
            Error::Io(e) => ErrorDiagnosis::new(ErrorKind::InternalError, format!("Error: {e}")),
        }
    }

    /// Serialized diagnosis for the `data` member of the error object
    pub fn data(&self) -> Option<Value> {
        serde_json::to_value(self.diagnosis()).ok()
    }
}
