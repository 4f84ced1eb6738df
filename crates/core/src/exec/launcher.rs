//! Child-process launcher.
//!
//! Spawns the interpreter for a script with stdout and stderr piped and
//! stdin disabled -- scripts cannot prompt interactively, which is a
//! documented constraint on authored scripts. `kill_on_drop(true)`
//! guarantees the child dies with its [`RunningScript`] handle.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::script::ScriptDescriptor;

/// Failure to start a child process, distinct from the script itself
/// failing once it runs.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to start {interpreter}: {source}")]
    Spawn {
        interpreter: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// A freshly spawned script process with both output pipes attached.
///
/// Ownership of the child passes to the execution driver, which takes
/// the two reader handles and is solely responsible for releasing them.
#[derive(Debug)]
pub struct RunningScript {
    pub(crate) child: Child,
}

/// Spawn the interpreter for `descriptor` with `args` appended after the
/// script path, positionally.
///
/// Spawn failure (missing interpreter, unusable working directory)
/// surfaces synchronously here; anything after a successful spawn is a
/// runtime concern of the stream pipeline.
pub fn launch(
    descriptor: &ScriptDescriptor,
    args: &[String],
    working_dir: Option<&Path>,
) -> Result<RunningScript, LaunchError> {
    spawn_process(descriptor.kind.interpreter(), &descriptor.path, args, working_dir)
}

pub(crate) fn spawn_process(
    interpreter: &'static str,
    script_path: &Path,
    args: &[String],
    working_dir: Option<&Path>,
) -> Result<RunningScript, LaunchError> {
    let mut cmd = Command::new(interpreter);
    cmd.arg(script_path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let child = cmd
        .spawn()
        .map_err(|source| LaunchError::Spawn { interpreter, source })?;

    Ok(RunningScript { child })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    fn write_temp_script(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new()
            .suffix(".sh")
            .tempfile()
            .expect("create temp file");
        writeln!(f, "#!/bin/bash").expect("write shebang");
        write!(f, "{body}").expect("write body");
        f
    }

    #[tokio::test]
    async fn spawns_bash_script() {
        let script = write_temp_script("exit 0\n");
        let mut running =
            spawn_process("bash", script.path(), &[], None).expect("spawn");
        let status = running.child.wait().await.expect("wait");
        assert_eq!(status.code(), Some(0));
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_launch_error() {
        let script = write_temp_script("exit 0\n");
        let result = spawn_process(
            "scriptdeck-no-such-interpreter",
            script.path(),
            &[],
            None,
        );
        assert_matches!(result, Err(LaunchError::Spawn { .. }));
    }

    #[tokio::test]
    async fn stdin_is_disabled() {
        // `cat` with no arguments reads stdin; with stdin null it sees
        // EOF immediately and exits instead of hanging.
        let script = write_temp_script("cat\necho done\n");
        let mut running =
            spawn_process("bash", script.path(), &[], None).expect("spawn");
        let status = running.child.wait().await.expect("wait");
        assert_eq!(status.code(), Some(0));
    }

    #[tokio::test]
    async fn working_directory_is_applied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_temp_script("pwd\n");
        let mut running = spawn_process("bash", script.path(), &[], Some(dir.path()))
            .expect("spawn");

        let mut stdout = running.child.stdout.take().expect("stdout");
        let status = running.child.wait().await.expect("wait");
        assert_eq!(status.code(), Some(0));

        let mut out = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut stdout, &mut out)
            .await
            .expect("read");
        // The resolved path may differ due to symlinks, so canonicalize.
        let printed = String::from_utf8_lossy(&out);
        let expected = dir
            .path()
            .canonicalize()
            .expect("canonicalize dir")
            .to_str()
            .expect("path")
            .to_string();
        assert!(
            printed.trim().ends_with(expected.trim_start_matches('/')),
            "pwd output '{}' should match working directory '{expected}'",
            printed.trim(),
        );
    }
}
