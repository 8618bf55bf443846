//! Resolved run configuration shared with every extension.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Compose files probed under the workdir in non-development mode.
const COMPOSE_FILES: &[&str] = &["docker-compose.yml", "docker-compose.prod.yml"];

/// Immutable run configuration.
///
/// Built once by the orchestrator and shared read-only with the engine and
/// all extensions; the capability registry is the only structure extensions
/// may mutate during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    workdir: PathBuf,
    development: bool,
    compose_files: Vec<PathBuf>,
}

impl RunContext {
    /// Resolve the context for `workdir`.
    ///
    /// Outside development mode the compose-file list is derived from the
    /// files that actually exist under `workdir`.
    pub fn new(workdir: PathBuf, development: bool) -> Self {
        let compose_files = if development {
            Vec::new()
        } else {
            existing_compose_files(&workdir)
        };
        Self {
            workdir,
            development,
            compose_files,
        }
    }

    /// Project root directory; the working directory of native extensions.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn development(&self) -> bool {
        self.development
    }

    pub fn compose_files(&self) -> &[PathBuf] {
        &self.compose_files
    }

    /// Environment injected into native extension subprocesses.
    ///
    /// Always carries `PROJECT_DIR` and `DEVELOPMENT`; `COMPOSE_FILE` is set
    /// only outside development mode and lists the compose files that exist.
    pub fn env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(
            "PROJECT_DIR".to_string(),
            self.workdir.display().to_string(),
        );
        env.insert(
            "DEVELOPMENT".to_string(),
            if self.development { "1" } else { "0" }.to_string(),
        );
        if !self.development {
            env.insert(
                "COMPOSE_FILE".to_string(),
                join_compose_files(&self.compose_files),
            );
        }
        env
    }
}

fn existing_compose_files(workdir: &Path) -> Vec<PathBuf> {
    COMPOSE_FILES
        .iter()
        .map(|name| workdir.join(name))
        .filter(|path| path.exists())
        .collect()
}

/// `COMPOSE_FILE` entries are joined with the platform path-list delimiter.
fn join_compose_files(files: &[PathBuf]) -> String {
    let delimiter = if cfg!(windows) { ";" } else { ":" };
    files
        .iter()
        .map(|file| file.display().to_string())
        .collect::<Vec<_>>()
        .join(delimiter)
}
