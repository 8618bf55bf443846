//! Self-update from a fixed release URL.
//!
//! The update check is a short-circuiting pre-step: fetch the published
//! program, ask it for its version, and replace the installed program only
//! when the published version is strictly newer. Installation is staged next
//! to the target and committed with an atomic rename, so an interrupted
//! update never leaves a half-written program behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use semver::Version;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Fixed URL the published program is fetched from.
pub const UPDATE_URL: &str = "https://dl.bootstrap-deploy.dev/bootstrap/latest/bootstrap";

/// Seam over the single outbound GET; tests use canned payloads.
pub trait Fetcher {
    fn fetch(&self) -> Result<Vec<u8>>;
}

/// Fetches the published program over HTTP.
pub struct HttpFetcher {
    url: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self) -> Result<Vec<u8>> {
        let response = reqwest::blocking::get(&self.url)
            .with_context(|| format!("fetch {}", self.url))?
            .error_for_status()
            .with_context(|| format!("fetch {}", self.url))?;
        let body = response
            .bytes()
            .with_context(|| format!("read body of {}", self.url))?;
        Ok(body.to_vec())
    }
}

/// Result of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Installed { from: Version, to: Version },
    AlreadyLatest { current: Version },
}

/// Fetch the published program and install it over `target` when newer.
///
/// The payload is staged as `<target>.update` on the same filesystem, probed
/// for the version it reports, and renamed over `target` only when that
/// version is strictly newer than `local`. The staged copy is removed
/// otherwise; the installed program is untouched.
pub fn self_update<F: Fetcher>(
    fetcher: &F,
    local: &Version,
    target: &Path,
) -> Result<UpdateOutcome> {
    let payload = fetcher.fetch()?;
    let digest = Sha256::digest(&payload);
    info!(
        bytes = payload.len(),
        sha256 = %hex::encode(digest),
        "fetched published program"
    );

    let staged = staged_path(target);
    fs::write(&staged, &payload).with_context(|| format!("write {}", staged.display()))?;
    mark_executable(&staged)?;

    let remote = match probe_version(&staged) {
        Ok(remote) => remote,
        Err(err) => {
            let _ = fs::remove_file(&staged);
            return Err(err);
        }
    };
    debug!(local = %local, remote = %remote, "version gate");

    if *local < remote {
        fs::rename(&staged, target)
            .with_context(|| format!("install {} -> {}", staged.display(), target.display()))?;
        info!(version = %remote, "update installed");
        Ok(UpdateOutcome::Installed {
            from: local.clone(),
            to: remote,
        })
    } else {
        fs::remove_file(&staged).with_context(|| format!("remove {}", staged.display()))?;
        Ok(UpdateOutcome::AlreadyLatest {
            current: local.clone(),
        })
    }
}

fn staged_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".update");
    target.with_file_name(name)
}

/// Run `program --version` and parse the version it reports.
pub fn probe_version(program: &Path) -> Result<Version> {
    let output = Command::new(program)
        .arg("--version")
        .output()
        .with_context(|| format!("run {} --version", program.display()))?;
    if !output.status.success() {
        bail!(
            "{} --version failed with status {:?}",
            program.display(),
            output.status.code()
        );
    }
    extract_version(&String::from_utf8_lossy(&output.stdout))
}

/// First semver-looking token in a version report (e.g. `bootstrap 0.2.1`).
pub fn extract_version(text: &str) -> Result<Version> {
    let pattern = Regex::new(r"\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?")
        .context("compile version pattern")?;
    let matched = pattern
        .find(text)
        .ok_or_else(|| anyhow!("no version found in {text:?}"))?;
    Version::parse(matched.as_str())
        .with_context(|| format!("parse version '{}'", matched.as_str()))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
