//! Builtin capabilities registered into every run's registry.
//!
//! Each builtin adapts a typed primitive to the registry's JSON calling
//! convention. Extension modules may replace any of them (last registration
//! wins) or register their own alongside. Relative paths in parameters are
//! resolved against the run context's project root, so module extensions
//! and native extensions agree on what a relative path means.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::backup::{backup_file, restore_file};
use crate::context::RunContext;
use crate::gitmodules::init_gitmodules;
use crate::prompt::{PromptOptions, prompt};
use crate::registry::CapabilityRegistry;
use crate::secret::{SecretOutcome, SecretRequest, SecretSource, make_secret};

#[derive(Debug, Deserialize)]
struct PathParams {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SecretParams {
    path: PathBuf,
    #[serde(default)]
    length: Option<usize>,
    #[serde(default)]
    rewrite: bool,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    symbols: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptParams {
    msg: String,
    #[serde(default)]
    default: Option<String>,
    #[serde(default = "default_true")]
    trim_spaces: bool,
    #[serde(default = "default_true")]
    show_default: bool,
}

fn default_true() -> bool {
    true
}

fn parse<T: serde::de::DeserializeOwned>(name: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).with_context(|| format!("invalid parameters for '{name}'"))
}

fn resolve(ctx: &RunContext, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        ctx.workdir().join(path)
    }
}

fn path_capability(
    name: &'static str,
    operation: fn(&Path) -> Result<()>,
) -> crate::registry::Capability {
    Box::new(move |ctx, args| {
        let params: PathParams = parse(name, args)?;
        operation(&resolve(ctx, params.path))?;
        Ok(Value::Null)
    })
}

/// Register every builtin capability.
pub fn register_builtins(registry: &mut CapabilityRegistry) {
    registry.register("backup_file", path_capability("backup_file", backup_file));
    registry.register("restore_file", path_capability("restore_file", restore_file));
    registry.register(
        "init_gitmodules",
        path_capability("init_gitmodules", init_gitmodules),
    );

    registry.register(
        "make_secret",
        Box::new(|ctx, args| {
            let params: SecretParams = parse("make_secret", args)?;
            let outcome = make_secret(&SecretRequest {
                path: resolve(ctx, params.path),
                length: params.length,
                rewrite: params.rewrite,
                // An empty value means "generate one", as an absent value does.
                value: params
                    .value
                    .filter(|value| !value.is_empty())
                    .map(SecretSource::Literal),
                symbols: params.symbols,
            })?;
            Ok(json!({ "created": outcome == SecretOutcome::Created }))
        }),
    );

    registry.register(
        "prompt",
        Box::new(|_ctx, args| {
            let params: PromptParams = parse("prompt", args)?;
            let value = prompt(
                &params.msg,
                &PromptOptions {
                    default: params.default.as_deref(),
                    callback: None,
                    trim_spaces: params.trim_spaces,
                    show_default: params.show_default,
                },
            )?;
            Ok(Value::String(value))
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        register_builtins(&mut registry);
        registry
    }

    #[test]
    fn registers_all_builtin_names() {
        assert_eq!(
            registry().list(),
            vec![
                "backup_file",
                "init_gitmodules",
                "make_secret",
                "prompt",
                "restore_file",
            ]
        );
    }

    #[test]
    fn backup_and_restore_round_trip_through_the_registry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = RunContext::new(temp.path().to_path_buf(), true);
        let registry = registry();
        fs::write(temp.path().join("config.yml"), "content").expect("write");

        registry
            .call("backup_file", &ctx, json!({"path": "config.yml"}))
            .expect("backup");
        assert!(!temp.path().join("config.yml").exists());
        assert!(temp.path().join("config.yml.back").exists());

        registry
            .call("restore_file", &ctx, json!({"path": "config.yml"}))
            .expect("restore");
        assert_eq!(
            fs::read_to_string(temp.path().join("config.yml")).expect("read"),
            "content"
        );
    }

    #[test]
    fn relative_secret_paths_resolve_against_the_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = RunContext::new(temp.path().to_path_buf(), true);

        let result = registry()
            .call(
                "make_secret",
                &ctx,
                json!({"path": "secrets/db_password", "length": 12}),
            )
            .expect("make secret");

        assert_eq!(result, json!({"created": true}));
        let content =
            fs::read_to_string(temp.path().join("secrets/db_password")).expect("read");
        assert_eq!(content.chars().count(), 12);
    }

    #[test]
    fn empty_value_parameter_generates_a_secret() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = RunContext::new(temp.path().to_path_buf(), true);

        registry()
            .call(
                "make_secret",
                &ctx,
                json!({"path": "token", "length": 8, "value": ""}),
            )
            .expect("make secret");

        let content = fs::read_to_string(temp.path().join("token")).expect("read");
        assert_eq!(content.chars().count(), 8);
    }

    #[test]
    fn malformed_parameters_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = RunContext::new(temp.path().to_path_buf(), true);

        let err = registry()
            .call("backup_file", &ctx, json!({"file": "config.yml"}))
            .expect_err("missing 'path'");
        assert!(err.to_string().contains("invalid parameters for 'backup_file'"));
    }
}
