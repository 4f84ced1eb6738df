//! Script discovery service.
//!
//! Owns the descriptor cache explicitly: [`ScriptCatalog::refresh`]
//! rescans the scripts directory and replaces the cache wholesale, and
//! the execution path only ever reaches it through
//! [`ScriptCatalog::get`]. The cache is read-mostly and never partially
//! mutated.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::RwLock;

use crate::script::{self, ScriptDescriptor, ScriptKind};

pub struct ScriptCatalog {
    dir: PathBuf,
    scripts: RwLock<HashMap<String, ScriptDescriptor>>,
}

impl ScriptCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scripts: RwLock::new(HashMap::new()),
        }
    }

    /// Rescan the scripts directory and rebuild the cache wholesale.
    ///
    /// Returns the fresh descriptor list sorted by script name. Files
    /// with unrecognized extensions are ignored; unreadable files and
    /// malformed annotations skip that one script with a warning rather
    /// than failing the scan.
    pub async fn refresh(&self) -> std::io::Result<Vec<ScriptDescriptor>> {
        let mut fresh = HashMap::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if ScriptKind::from_path(&path).is_none() {
                continue;
            }

            let source = match tokio::fs::read_to_string(&path).await {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable script");
                    continue;
                }
            };

            match script::parse_descriptor(&path, &source) {
                Ok(descriptor) => {
                    fresh.insert(descriptor.file_name.clone(), descriptor);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping script with malformed annotations");
                }
            }
        }

        let mut list: Vec<ScriptDescriptor> = fresh.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));

        *self.scripts.write().await = fresh;
        Ok(list)
    }

    /// Look up a previously discovered script by file name.
    pub async fn get(&self, file_name: &str) -> Option<ScriptDescriptor> {
        self.scripts.read().await.get(file_name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
