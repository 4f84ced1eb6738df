use std::sync::Arc;

use scriptdeck_core::catalog::ScriptCatalog;
use scriptdeck_core::ledger::ExecutionLedger;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheaply cloneable (everything is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Script discovery service; rebuilt wholesale on each listing call.
    pub catalog: Arc<ScriptCatalog>,
    /// The rolling execution log, shared by all executions.
    pub ledger: Arc<ExecutionLedger>,
}
