//! Core request layer for the Azure DevOps MCP adapter
//!
//! This crate turns a routed tool invocation into authenticated REST calls and
//! turns failures into typed diagnoses:
//!
//! - **Executor**: project resolution, URL composition, credential header,
//!   one exchange per call, unconditional telemetry
//! - **Patch documents**: ordered creation/update documents for work items,
//!   including relation removal by normalized URL
//! - **Classifier**: credential expiry vs. upstream vs. internal failures
//!
//! # Architecture
//!
//! ```text
//!          ado-mcp (dispatcher)
//!                  |
//!     +------------+-------------+
//!     |            |             |
//!   patch      Executor ----> classify
//!                  |
//!             Transport (reqwest)
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod executor;
pub mod patch;
pub mod request;
pub mod telemetry;
pub mod transport;

pub use classify::{Failure, classify};
pub use config::AdoConfig;
pub use error::{Error, ErrorDiagnosis, ErrorKind, Result};
pub use executor::{AdoContext, Executor};
pub use patch::{
    PatchDocument, PatchOp, PatchOperation, Relation, RelationSource, WorkItemUpdate,
    build_update_document, creation_document,
};
pub use request::{ApiRequest, HttpMethod};
pub use telemetry::{ChannelSink, NullSink, TelemetryEvent, TelemetrySink, TracingSink};
pub use transport::{HttpExchange, HttpResponse, ReqwestTransport, Transport, TransportError};
