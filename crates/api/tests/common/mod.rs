use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use scriptdeck_api::config::ServerConfig;
use scriptdeck_api::router::build_app_router;
use scriptdeck_api::state::AppState;
use scriptdeck_core::catalog::ScriptCatalog;
use scriptdeck_core::ledger::ExecutionLedger;

/// Test fixture: a scripts directory, a log file, and the full app
/// router built through the same `build_app_router` the production
/// binary uses, so tests exercise the real middleware stack.
pub struct TestApp {
    pub router: Router,
    pub scripts_dir: PathBuf,
    pub log_file: PathBuf,
    // Keeps the scratch directory alive for the duration of the test.
    _dir: TempDir,
}

/// Build a test app around a fresh scripts directory populated by
/// `populate`.
pub async fn test_app(populate: impl FnOnce(&Path)) -> TestApp {
    let dir = TempDir::new().expect("create temp dir");
    let scripts_dir = dir.path().join("scripts");
    std::fs::create_dir(&scripts_dir).expect("create scripts dir");
    populate(&scripts_dir);

    let log_file = dir.path().join("executions.log");
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        scripts_dir: scripts_dir.clone(),
        public_dir: dir.path().join("public"),
        log_file: log_file.clone(),
        max_log_lines: 10_000,
    };

    let catalog = Arc::new(ScriptCatalog::new(scripts_dir.clone()));
    catalog.refresh().await.expect("initial scan");
    let ledger = Arc::new(ExecutionLedger::new(log_file.clone(), config.max_log_lines));

    let state = AppState {
        config: Arc::new(config),
        catalog,
        ledger,
    };

    TestApp {
        router: build_app_router(state),
        scripts_dir,
        log_file,
        _dir: dir,
    }
}

/// Write a script file into `dir`.
pub fn write_script(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).expect("write script");
}
