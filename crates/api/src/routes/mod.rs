pub mod health;
pub mod scripts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /scripts               list discovered scripts (fresh scan per call)
/// /execute/{file_name}   run a script, streaming its output live
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(scripts::router())
}
