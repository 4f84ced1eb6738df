//! Route definitions for script listing and execution.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::scripts;
use crate::state::AppState;

/// Routes mounted under `/api`.
///
/// ```text
/// GET  /scripts               -> list_scripts
/// POST /execute/{file_name}   -> execute_script
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scripts", get(scripts::list_scripts))
        .route("/execute/{file_name}", post(scripts::execute_script))
}
