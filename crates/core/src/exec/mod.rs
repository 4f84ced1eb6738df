//! Child-process execution pipeline.
//!
//! `launcher` spawns the interpreter with both output streams piped,
//! `stream` fans stdout and stderr into one ordered chunk sequence, and
//! `session` drives a whole execution: relaying events to the consumer,
//! accumulating the transcript, and recording exactly one ledger entry
//! once the outcome is known -- on every path (normal exit, failure,
//! cancellation).

pub mod launcher;
pub mod session;
pub mod stream;

pub use launcher::{launch, LaunchError, RunningScript};
pub use session::{spawn_execution, ExecEvent, ExecutionHandle};
pub use stream::{OutputChunk, StreamOrigin, STDERR_TAG};
