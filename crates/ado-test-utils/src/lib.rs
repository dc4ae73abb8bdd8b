//! Shared test utilities for the ado-mcp workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`transport`] - [`MockTransport`], a scripted stand-in for the HTTP layer
//! - [`telemetry`] - [`RecordingSink`] for asserting on reported events
//!
//! [`test_executor`] wires both into an [`Executor`] with a canned configuration.

pub mod telemetry;
pub mod transport;

use std::sync::Arc;

use ado_core::{AdoConfig, AdoContext, Executor};

pub use telemetry::RecordingSink;
pub use transport::{MockTransport, Rule, query_pairs, query_param};

pub const TEST_ORG: &str = "contoso";
pub const TEST_PROJECT: &str = "Fabrikam";
pub const TEST_PAT: &str = "test-pat";

/// Configuration pointing at `https://dev.azure.com/contoso/Fabrikam`.
pub fn test_config() -> AdoConfig {
    AdoConfig::new(TEST_ORG, TEST_PROJECT, None, TEST_PAT)
        .unwrap_or_else(|e| panic!("test_config: {e}"))
}

/// Executor over the given mock transport, recording telemetry.
pub fn test_executor(transport: Arc<MockTransport>) -> (Executor, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let context = AdoContext::new(test_config(), sink.clone());
    (Executor::new(context, transport), sink)
}
