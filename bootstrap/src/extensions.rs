//! Extension discovery and execution.
//!
//! Extensions live in a `<program>.d` directory next to the installed
//! program and run one at a time in lexicographic filename order, so
//! integrators sequence them by name (`10-setup`, `20-migrate`, ...). Two
//! execution models exist, selected by classification at discovery time:
//! dynamic-library modules called in process with the run context and the
//! capability registry, and native executables spawned as child processes
//! in the project root. A failure in either aborts the remaining sequence.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use libloading::Library;
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::exit_codes;
use crate::registry::CapabilityRegistry;

/// Entry point exported by extension modules.
pub type ExtensionEntry = fn(&RunContext, &mut CapabilityRegistry) -> Result<()>;

/// Symbol resolved in extension modules; a module without it is skipped.
pub const ENTRY_SYMBOL: &[u8] = b"bootstrap_extension\0";

/// How a discovered directory entry will be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    /// Dynamic library loaded in process and handed the registry.
    Module,
    /// Executable spawned as a child process.
    Executable,
    /// Everything else: directories, non-executable files.
    Ignored,
}

/// A classified extension directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub path: PathBuf,
    pub kind: ExtensionKind,
}

/// The extension directory is a fixed sibling of the program: `<stem>.d`.
pub fn extension_dir_for(program: &Path) -> PathBuf {
    let mut name = program
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    name.push(".d");
    program.with_file_name(name)
}

/// Classify one directory entry.
pub fn classify(path: &Path) -> ExtensionKind {
    if !path.is_file() {
        return ExtensionKind::Ignored;
    }
    if path.extension().and_then(|ext| ext.to_str()) == Some(std::env::consts::DLL_EXTENSION) {
        return ExtensionKind::Module;
    }
    if is_executable(path) {
        return ExtensionKind::Executable;
    }
    ExtensionKind::Ignored
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(std::env::consts::EXE_EXTENSION)
}

/// Enumerate and classify the entries of `dir`, sorted by filename.
pub fn discover(dir: &Path) -> Result<Vec<Extension>> {
    let mut extensions = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("read extension dir {}", dir.display()))?
    {
        let entry = entry.context("read extension entry")?;
        let path = entry.path();
        extensions.push(Extension {
            kind: classify(&path),
            path,
        });
    }
    extensions.sort_by(|left, right| left.path.file_name().cmp(&right.path.file_name()));
    Ok(extensions)
}

/// Seam for module execution; production uses [`DylibLoader`], tests use fakes.
pub trait ModuleLoader {
    fn run(&self, path: &Path, ctx: &RunContext, registry: &mut CapabilityRegistry) -> Result<()>;
}

/// Loads extension modules with `libloading` and calls their entry point.
#[derive(Default)]
pub struct DylibLoader {
    // Libraries stay loaded for the rest of the run: capabilities an
    // extension registered may point into its code.
    libraries: RefCell<Vec<Library>>,
}

impl DylibLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[allow(unsafe_code)]
impl ModuleLoader for DylibLoader {
    fn run(&self, path: &Path, ctx: &RunContext, registry: &mut CapabilityRegistry) -> Result<()> {
        // SAFETY: extensions are trusted code run with the invoking user's
        // privileges. Every library is retained in `self.libraries` until the
        // process exits, so function pointers a module hands out (including
        // registered capabilities) never outlive its code.
        unsafe {
            let library = Library::new(path)
                .with_context(|| format!("load extension module {}", path.display()))?;
            let entry = match library.get::<ExtensionEntry>(ENTRY_SYMBOL) {
                Ok(symbol) => Some(*symbol),
                Err(err) => {
                    debug!(path = %path.display(), err = %err, "no entry point, skipping");
                    None
                }
            };
            let result = match entry {
                Some(entry) => entry(ctx, registry)
                    .with_context(|| format!("extension {}", path.display())),
                None => Ok(()),
            };
            self.libraries.borrow_mut().push(library);
            result
        }
    }
}

/// Execute every extension in `dir` in lexicographic filename order.
///
/// Returns [`exit_codes::NO_EXTENSIONS`] when the directory is absent
/// (nothing configured, not a crash) and [`exit_codes::OK`] after the whole
/// sequence ran. The first failure — a module entry-point error or a
/// non-zero child exit — propagates and no later extension runs.
pub fn run_extensions<L: ModuleLoader>(
    dir: &Path,
    ctx: &RunContext,
    registry: &mut CapabilityRegistry,
    loader: &L,
) -> Result<i32> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "no extension directory");
        return Ok(exit_codes::NO_EXTENSIONS);
    }

    for extension in discover(dir)? {
        match extension.kind {
            ExtensionKind::Module => {
                info!(path = %extension.path.display(), "running extension module");
                loader.run(&extension.path, ctx, registry)?;
            }
            ExtensionKind::Executable => {
                info!(path = %extension.path.display(), "running extension executable");
                run_executable(&extension.path, ctx)?;
            }
            ExtensionKind::Ignored => {
                debug!(path = %extension.path.display(), "skipping");
            }
        }
    }
    Ok(exit_codes::OK)
}

/// Spawn a native extension with the project root as working directory.
///
/// Stdio is inherited so the extension's own output reaches the operator
/// directly; there is no timeout — cancellation is the operator's job.
fn run_executable(path: &Path, ctx: &RunContext) -> Result<()> {
    let status = Command::new(path)
        .current_dir(ctx.workdir())
        .envs(ctx.env())
        .status()
        .with_context(|| format!("spawn extension {}", path.display()))?;
    if !status.success() {
        bail!(
            "extension {} failed with status {:?}",
            path.display(),
            status.code()
        );
    }
    Ok(())
}
