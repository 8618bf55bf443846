//! Git submodule initialization.
//!
//! Shells out to `git submodule`; only submodules whose status marker
//! indicates "uninitialized" (a leading `-` on the first token) are touched.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

/// Initialize and update the uninitialized submodules of `repo`.
///
/// No-op when the repository has no `.gitmodules` manifest. Submodules are
/// processed in the order `git submodule status` reports them; the first
/// failing git command aborts the operation.
pub fn init_gitmodules(repo: &Path) -> Result<()> {
    if !repo.join(".gitmodules").exists() {
        debug!(repo = %repo.display(), "no submodule manifest");
        return Ok(());
    }

    let status = run_git(repo, &["submodule", "status"])?;
    for directory in uninitialized_modules(&status) {
        info!(submodule = %directory, "initializing submodule");
        run_git(repo, &["submodule", "init", &directory])?;
        run_git(repo, &["submodule", "update", &directory])?;
    }
    Ok(())
}

/// Directories of submodules that have not been initialized yet.
///
/// Status lines are `<marker><sha> <directory> [<ref>]`; a leading `-` on
/// the first token marks an uninitialized submodule. Order is preserved.
fn uninitialized_modules(status: &str) -> Vec<String> {
    status
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let marker = tokens.next()?;
            let directory = tokens.next()?;
            marker
                .starts_with('-')
                .then(|| directory.to_string())
        })
        .collect()
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .with_context(|| format!("run git {:?}", args))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {:?} failed: {}", args, stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
