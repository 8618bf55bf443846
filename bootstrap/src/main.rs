//! Deployment bootstrap helper.
//!
//! Prepares a project directory for a container-based deployment and hands
//! control to the operator's extensions in `<program>.d`, exposing shared
//! primitives (backups, secrets, prompts, submodules) through a capability
//! registry. `--update` replaces the installed program with the published
//! version when one is newer, instead of running extensions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use semver::Version;

use bootstrap::builtins::register_builtins;
use bootstrap::context::RunContext;
use bootstrap::exit_codes;
use bootstrap::extensions::{DylibLoader, extension_dir_for, run_extensions};
use bootstrap::logging;
use bootstrap::registry::CapabilityRegistry;
use bootstrap::update::{HttpFetcher, UPDATE_URL, UpdateOutcome, self_update};

#[derive(Parser)]
#[command(name = "bootstrap", version, about = "Deployment bootstrap helper")]
struct Cli {
    /// Project root directory. By default, the current directory.
    #[arg(short, long)]
    workdir: Option<PathBuf>,
    /// Development mode (default: the DEVELOPMENT environment variable).
    #[arg(long)]
    development: bool,
    /// Update the current version of the program.
    #[arg(long)]
    update: bool,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILURE);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    if cli.update {
        return run_update();
    }

    let workdir = resolve_workdir(cli.workdir)?;
    let development = cli.development || development_from_env();
    let ctx = RunContext::new(workdir, development);

    let mut registry = CapabilityRegistry::new();
    register_builtins(&mut registry);

    let program = std::env::current_exe().context("resolve current executable")?;
    let loader = DylibLoader::new();
    run_extensions(&extension_dir_for(&program), &ctx, &mut registry, &loader)
}

fn run_update() -> Result<i32> {
    let local = Version::parse(env!("CARGO_PKG_VERSION")).context("parse embedded version")?;
    let target = std::env::current_exe().context("resolve current executable")?;

    match self_update(&HttpFetcher::new(UPDATE_URL), &local, &target)? {
        UpdateOutcome::Installed { from, to } => {
            println!("The update was successful ({from} -> {to}).");
        }
        UpdateOutcome::AlreadyLatest { current } => {
            println!("The latest version is installed ({current}).");
        }
    }
    Ok(exit_codes::OK)
}

fn resolve_workdir(workdir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolve current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("resolve workdir {}", dir.display()))
}

/// A non-zero integer `DEVELOPMENT` enables development mode by default.
fn development_from_env() -> bool {
    std::env::var("DEVELOPMENT")
        .ok()
        .and_then(|value| value.trim().parse::<i32>().ok())
        .map(|value| value != 0)
        .unwrap_or(false)
}
