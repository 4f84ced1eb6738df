use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local use and are static for
/// the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1` -- this is a localhost-only
    /// tool by design; there is no authentication layer).
    pub host: String,
    /// Bind port (default: `3131`).
    pub port: u16,
    /// Directory scanned for annotated scripts (default: `./scripts`).
    pub scripts_dir: PathBuf,
    /// Directory served as the static UI (default: `./public`).
    pub public_dir: PathBuf,
    /// Rolling execution log file (default: `./executions.log`).
    pub log_file: PathBuf,
    /// Maximum number of lines retained in the log file (default:
    /// `10000`).
    pub max_log_lines: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var         | Default            |
    /// |-----------------|--------------------|
    /// | `HOST`          | `127.0.0.1`        |
    /// | `PORT`          | `3131`             |
    /// | `SCRIPTS_DIR`   | `./scripts`        |
    /// | `PUBLIC_DIR`    | `./public`         |
    /// | `LOG_FILE`      | `./executions.log` |
    /// | `MAX_LOG_LINES` | `10000`            |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3131".into())
            .parse()
            .expect("PORT must be a valid u16");

        let scripts_dir = std::env::var("SCRIPTS_DIR")
            .unwrap_or_else(|_| "./scripts".into())
            .into();

        let public_dir = std::env::var("PUBLIC_DIR")
            .unwrap_or_else(|_| "./public".into())
            .into();

        let log_file = std::env::var("LOG_FILE")
            .unwrap_or_else(|_| "./executions.log".into())
            .into();

        let max_log_lines: usize = std::env::var("MAX_LOG_LINES")
            .unwrap_or_else(|_| "10000".into())
            .parse()
            .expect("MAX_LOG_LINES must be a valid usize");

        Self {
            host,
            port,
            scripts_dir,
            public_dir,
            log_file,
            max_log_lines,
        }
    }
}
