//! Handlers for script listing and live execution streaming.
//!
//! The execute handler frames each output chunk as one SSE event and
//! performs no other transformation -- ANSI styling and similar
//! presentation concerns belong to the client.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::Json;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

use scriptdeck_core::binder;
use scriptdeck_core::exec::{self, ExecEvent};
use scriptdeck_core::script::ScriptDescriptor;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for the execute endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// Raw parameter mapping, keyed by parameter name.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Optional override working directory for the child process.
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// GET /api/scripts
///
/// Runs a fresh discovery pass and returns every script found, sorted
/// by name.
pub async fn list_scripts(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ScriptDescriptor>>> {
    let scripts = state
        .catalog
        .refresh()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to scan scripts directory: {e}")))?;
    Ok(Json(scripts))
}

/// Event stream type shared by the success and launch-failure paths.
type EventStream = BoxStream<'static, Result<Event, Infallible>>;

/// POST /api/execute/{file_name}
///
/// Validates parameters against the script's contract, launches the
/// child, and relays its output as one SSE event per chunk:
/// `{"output": ...}` frames, then `{"done": true}` (or `{"error": ...}`
/// on a stream-level failure). Client disconnect cancels the execution
/// and force-kills the child.
///
/// Extractors run before the handler body, so a malformed JSON body is
/// rejected with 400 even when the script name is also unknown; the 404
/// only applies to requests with a well-formed body.
pub async fn execute_script(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> AppResult<Sse<KeepAliveStream<EventStream>>> {
    let descriptor = state
        .catalog
        .get(&file_name)
        .await
        .ok_or(AppError::ScriptNotFound(file_name))?;

    // Validation happens before any process is spawned: a failure here
    // has no side effects and no ledger entry.
    let args = binder::bind(&descriptor, &request.params)?;

    let working_dir = request.working_dir.as_deref().map(std::path::Path::new);

    // Launch failure is a stream-level error signal rather than an HTTP
    // error: the client renders it in the same pane as script output.
    // No ledger entry -- the execution never produced output.
    let running = match exec::launch(&descriptor, &args, working_dir) {
        Ok(running) => running,
        Err(e) => {
            tracing::error!(script = %descriptor.file_name, error = %e, "Failed to launch script");
            let event = sse_json(json!({ "error": e.to_string() }));
            let stream: EventStream = stream::once(async move { Ok(event) }).boxed();
            return Ok(Sse::new(stream).keep_alive(KeepAlive::default()));
        }
    };

    tracing::info!(
        script = %descriptor.file_name,
        args = args.len(),
        "Execution started"
    );

    let handle = exec::spawn_execution(
        descriptor.name.clone(),
        request.params,
        running,
        Arc::clone(&state.ledger),
    );

    // Dropping the SSE body (client disconnect) drops this guard, which
    // cancels the token and kills the child.
    let guard = handle.cancel.clone().drop_guard();
    let events = ReceiverStream::new(handle.events).map(move |event| {
        let _ = &guard;
        Ok(match event {
            ExecEvent::Output(chunk) => sse_json(json!({ "output": chunk.text })),
            ExecEvent::Done { .. } => sse_json(json!({ "done": true })),
            ExecEvent::Error(message) => sse_json(json!({ "error": message })),
        })
    });

    Ok(Sse::new(events.boxed()).keep_alive(KeepAlive::default()))
}

/// Frame a JSON payload as one SSE `data:` event. Serialized JSON is a
/// single line, so the payload never splits across SSE data fields.
fn sse_json(payload: serde_json::Value) -> Event {
    Event::default().data(payload.to_string())
}
