//! Execution driver.
//!
//! One task per execution owns the child process end to end: it fans in
//! the multiplexed chunk sequence, relays each chunk to the consumer,
//! accumulates the transcript, and records exactly one ledger entry once
//! the outcome is known. The ledger sees exactly the chunk sequence the
//! consumer saw, on every path: normal exit, failure, or cancellation.

use std::sync::Arc;

use tokio::process::Child;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ledger::{ExecutionLedger, LedgerEntry, Outcome};

use super::launcher::RunningScript;
use super::stream::{self, OutputChunk, StreamOrigin};

/// Event relayed to the transport while an execution runs.
#[derive(Debug, Clone)]
pub enum ExecEvent {
    /// One decoded output chunk, in emission order.
    Output(OutputChunk),
    /// Terminal signal: the process exited with this code. Always
    /// preceded by the synthetic exit-code chunk.
    Done { exit_code: i32 },
    /// Terminal signal: the pipeline failed mid-stream. Already-relayed
    /// chunks remain valid.
    Error(String),
}

/// Consumer half of a running execution.
pub struct ExecutionHandle {
    /// Ordered event sequence; closes after the terminal event.
    pub events: mpsc::Receiver<ExecEvent>,
    /// Cancelling this token force-kills the child. Idempotent, and safe
    /// to trigger from either the consumer-disconnect path or an
    /// external stop request.
    pub cancel: CancellationToken,
}

/// Channel capacity between the driver and the transport. Small: the
/// transport relays with minimal buffering and the channel exists for
/// backpressure, not for batching.
const EVENT_BUFFER: usize = 64;

/// Closing chunk recorded when the caller cancels mid-execution.
const CANCELLED_NOTE: &str = "\n[Process terminated by user]\n";

/// Start driving `running` to completion in a background task.
///
/// The driver keeps going when the consumer disappears -- the ledger
/// entry must be written regardless -- so event sends are best-effort.
pub fn spawn_execution(
    script_name: String,
    params: serde_json::Map<String, serde_json::Value>,
    running: RunningScript,
    ledger: Arc<ExecutionLedger>,
) -> ExecutionHandle {
    let (tx, events) = mpsc::channel(EVENT_BUFFER);
    let cancel = CancellationToken::new();

    let driver = Driver {
        script_name,
        params,
        ledger,
        tx,
        transcript: String::new(),
    };
    tokio::spawn(driver.run(running, cancel.clone()));

    ExecutionHandle { events, cancel }
}

struct Driver {
    script_name: String,
    params: serde_json::Map<String, serde_json::Value>,
    ledger: Arc<ExecutionLedger>,
    tx: mpsc::Sender<ExecEvent>,
    transcript: String,
}

impl Driver {
    async fn run(mut self, running: RunningScript, cancel: CancellationToken) {
        let mut child = running.child;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (chunk_tx, mut chunk_rx) = mpsc::channel(EVENT_BUFFER);
        let stderr_tx = chunk_tx.clone();
        tokio::spawn(stream::drain_stream(stdout, StreamOrigin::Stdout, chunk_tx));
        tokio::spawn(stream::drain_stream(stderr, StreamOrigin::Stderr, stderr_tx));

        // Relay chunks until both streams hit end-of-stream or the
        // caller cancels. Killing the child closes the pipes, which in
        // turn ends both reader tasks.
        loop {
            tokio::select! {
                maybe = chunk_rx.recv() => match maybe {
                    Some(chunk) => self.emit(chunk).await,
                    None => break,
                },
                () = cancel.cancelled() => {
                    self.finish_cancelled(child).await;
                    return;
                }
            }
        }

        // Both streams closed: collect the exit status. Cancellation can
        // still arrive while a child lingers after closing its pipes.
        let status = tokio::select! {
            status = child.wait() => status,
            () = cancel.cancelled() => {
                self.finish_cancelled(child).await;
                return;
            }
        };

        match status {
            Ok(status) => {
                let exit_code = status.code().unwrap_or(-1);
                self.emit(OutputChunk {
                    origin: StreamOrigin::Stdout,
                    text: format!("[Process exited with code {exit_code}]"),
                })
                .await;
                self.record(Outcome::Completed(exit_code)).await;
                let _ = self.tx.send(ExecEvent::Done { exit_code }).await;
            }
            Err(e) => {
                let message = format!("Failed to collect exit status: {e}");
                tracing::error!(script = %self.script_name, error = %e, "Execution failed");
                self.record(Outcome::Failed(message.clone())).await;
                let _ = self.tx.send(ExecEvent::Error(message)).await;
            }
        }
    }

    /// Force-kill the child and record the cancelled outcome.
    async fn finish_cancelled(&mut self, mut child: Child) {
        if let Err(e) = child.kill().await {
            tracing::warn!(script = %self.script_name, error = %e, "Failed to kill cancelled process");
        }
        tracing::info!(script = %self.script_name, "Execution cancelled by caller");
        self.emit(OutputChunk {
            origin: StreamOrigin::Stdout,
            text: CANCELLED_NOTE.to_string(),
        })
        .await;
        self.record(Outcome::Cancelled).await;
    }

    /// Append a chunk to the transcript and relay it. The send is
    /// best-effort: a gone consumer must not stop the transcript.
    async fn emit(&mut self, chunk: OutputChunk) {
        self.transcript.push_str(&chunk.text);
        let _ = self.tx.send(ExecEvent::Output(chunk)).await;
    }

    /// Write the ledger entry. Logging failures are isolated: reported
    /// to the operational log, never propagated.
    async fn record(&mut self, outcome: Outcome) {
        let entry = LedgerEntry::new(
            &self.script_name,
            self.params.clone(),
            std::mem::take(&mut self.transcript),
            outcome,
        );
        if let Err(e) = self.ledger.record(&entry).await {
            tracing::warn!(script = %self.script_name, error = %e, "Failed to write ledger entry");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
