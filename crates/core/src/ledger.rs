//! Append-only execution ledger with size-bounded retention.
//!
//! One rolling log file shared by all executions. Every append+trim
//! cycle holds an async mutex, so concurrent executions never interleave
//! entries. Logging is best-effort: callers report failures to the
//! operational log and never let them affect the execution result.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Terminal classification of one execution. Exactly one per execution;
/// reaching it triggers ledger persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(i32),
    Failed(String),
    Cancelled,
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// The exit-code field of a ledger entry.
    ///
    /// Cancelled executions always log `N/A`: the child was force-killed,
    /// so whatever status the kill produced is not meaningful.
    fn exit_code_label(&self) -> String {
        match self {
            Self::Completed(code) => code.to_string(),
            Self::Failed(_) | Self::Cancelled => "N/A".to_string(),
        }
    }
}

const SEPARATOR: &str = "================================================================\n";
const DIVIDER: &str = "----------------------------------------------------------------\n";

/// One serialized execution record.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub execution_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub script_name: String,
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Concatenation of every emitted chunk, in emission order.
    pub transcript: String,
    pub outcome: Outcome,
}

impl LedgerEntry {
    pub fn new(
        script_name: impl Into<String>,
        params: serde_json::Map<String, serde_json::Value>,
        transcript: String,
        outcome: Outcome,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            script_name: script_name.into(),
            params,
            transcript,
            outcome,
        }
    }

    /// Render the on-disk entry: header (timestamp, script, execution
    /// id), parameter snapshot, outcome and exit-code lines, then the
    /// transcript between dividers.
    fn render(&self) -> String {
        let mut out = String::with_capacity(self.transcript.len() + 256);
        out.push_str(SEPARATOR);
        out.push_str(&format!(
            "[{}] script: {} (execution {})\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.script_name,
            self.execution_id,
        ));
        out.push_str(&format!(
            "params: {}\n",
            serde_json::Value::Object(self.params.clone())
        ));
        out.push_str(&format!("outcome: {}\n", self.outcome.label()));
        out.push_str(&format!("exit code: {}\n", self.outcome.exit_code_label()));
        out.push_str(DIVIDER);
        out.push_str(&self.transcript);
        if !self.transcript.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(SEPARATOR);
        out
    }
}

/// The rolling execution log.
pub struct ExecutionLedger {
    path: PathBuf,
    max_lines: usize,
    /// Serializes append+trim cycles across concurrent executions.
    lock: Mutex<()>,
}

impl ExecutionLedger {
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines,
            lock: Mutex::new(()),
        }
    }

    /// Path of the rolling log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, then trim the file back under the line ceiling.
    ///
    /// Called exactly once per execution, after the outcome is known.
    /// The entry is written whole before the trim runs, so the file
    /// never truncates mid-entry.
    pub async fn record(&self, entry: &LedgerEntry) -> std::io::Result<()> {
        let rendered = entry.render();

        let _guard = self.lock.lock().await;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(rendered.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        self.trim().await
    }

    /// Rewrite the file keeping only the newest `max_lines` lines.
    ///
    /// Read-all/keep-suffix/rewrite: acceptable because the ceiling
    /// bounds the file to a small fixed size.
    async fn trim(&self) -> std::io::Result<()> {
        let contents = fs::read_to_string(&self.path).await?;
        let total = contents.lines().count();
        if total <= self.max_lines {
            return Ok(());
        }

        let mut trimmed = contents
            .lines()
            .skip(total - self.max_lines)
            .collect::<Vec<&str>>()
            .join("\n");
        trimmed.push('\n');
        fs::write(&self.path, trimmed).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, transcript: &str, outcome: Outcome) -> LedgerEntry {
        let mut params = serde_json::Map::new();
        params.insert("name".into(), serde_json::json!("Ada"));
        LedgerEntry::new(name, params, transcript.to_string(), outcome)
    }

    #[tokio::test]
    async fn record_writes_structured_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = ExecutionLedger::new(dir.path().join("log"), 10_000);

        ledger
            .record(&entry("greet", "Hello, Ada\n", Outcome::Completed(0)))
            .await
            .expect("record");

        let log = std::fs::read_to_string(ledger.path()).expect("read");
        assert!(log.contains("script: greet"));
        assert!(log.contains(r#"params: {"name":"Ada"}"#));
        assert!(log.contains("outcome: completed"));
        assert!(log.contains("exit code: 0"));
        assert!(log.contains("Hello, Ada"));
    }

    #[tokio::test]
    async fn cancelled_entry_logs_na_exit_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = ExecutionLedger::new(dir.path().join("log"), 10_000);

        ledger
            .record(&entry("slow", "partial output\n", Outcome::Cancelled))
            .await
            .expect("record");

        let log = std::fs::read_to_string(ledger.path()).expect("read");
        assert!(log.contains("outcome: cancelled"));
        assert!(log.contains("exit code: N/A"));
    }

    #[tokio::test]
    async fn line_count_never_exceeds_ceiling() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = ExecutionLedger::new(dir.path().join("log"), 20);

        for i in 0..5 {
            let transcript = format!("run {i}\n").repeat(10);
            ledger
                .record(&entry("noisy", &transcript, Outcome::Completed(0)))
                .await
                .expect("record");

            let log = std::fs::read_to_string(ledger.path()).expect("read");
            assert!(
                log.lines().count() <= 20,
                "ceiling exceeded after append {i}: {} lines",
                log.lines().count()
            );
        }

        // The newest content survives the trim.
        let log = std::fs::read_to_string(ledger.path()).expect("read");
        assert!(log.contains("run 4"));
        assert!(!log.contains("run 0"));
    }

    #[tokio::test]
    async fn concurrent_records_do_not_interleave() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = std::sync::Arc::new(ExecutionLedger::new(dir.path().join("log"), 10_000));

        let a = {
            let ledger = std::sync::Arc::clone(&ledger);
            tokio::spawn(async move {
                for _ in 0..10 {
                    let transcript = "aaaa\n".repeat(20);
                    ledger
                        .record(&entry("alpha", &transcript, Outcome::Completed(0)))
                        .await
                        .expect("record");
                }
            })
        };
        let b = {
            let ledger = std::sync::Arc::clone(&ledger);
            tokio::spawn(async move {
                for _ in 0..10 {
                    let transcript = "bbbb\n".repeat(20);
                    ledger
                        .record(&entry("beta", &transcript, Outcome::Completed(0)))
                        .await
                        .expect("record");
                }
            })
        };
        a.await.expect("task a");
        b.await.expect("task b");

        // Every transcript block between dividers belongs to exactly one
        // script: no line mixes origins, and each entry's transcript is
        // contiguous.
        let log = std::fs::read_to_string(ledger.path()).expect("read");
        for section in log.split(SEPARATOR).filter(|s| s.contains("script: ")) {
            let transcript = section.split(DIVIDER).nth(1).expect("transcript");
            let is_alpha = section.contains("script: alpha");
            for line in transcript.lines() {
                if is_alpha {
                    assert_eq!(line, "aaaa", "alpha transcript corrupted: {line}");
                } else {
                    assert_eq!(line, "bbbb", "beta transcript corrupted: {line}");
                }
            }
        }
    }

    #[tokio::test]
    async fn unwritable_path_is_reported_not_fatal() {
        let ledger = ExecutionLedger::new("/nonexistent/dir/log", 100);
        let result = ledger
            .record(&entry("x", "y\n", Outcome::Completed(0)))
            .await;
        assert!(result.is_err());
    }
}
