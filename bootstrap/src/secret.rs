//! Secret file generation.
//!
//! A secret is a plain-text file whose content is the verbatim secret
//! string. An existing secret is authoritative: it is only replaced when the
//! caller explicitly asks for a rewrite.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use rand::Rng;
use tracing::info;

/// Default alphabet: digits, ASCII letters, and punctuation that is safe in
/// typical secret-file contexts.
pub const DEFAULT_SYMBOLS: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!#$%&()*+-.;=?[]^_{}~";

/// Where the secret's value comes from.
pub enum SecretSource {
    /// Use the string verbatim.
    Literal(String),
    /// Invoke the generator and use its result verbatim.
    Generator(Box<dyn Fn() -> String>),
}

/// Parameters for [`make_secret`].
pub struct SecretRequest {
    /// Target file; parent directories are created as needed.
    pub path: PathBuf,
    /// Length of a generated value. `None` or `< 1` picks a random length in
    /// `[64, 128)`. Ignored when an explicit source is given.
    pub length: Option<usize>,
    /// Overwrite an existing secret instead of keeping it.
    pub rewrite: bool,
    /// Explicit value; `None` generates a random string.
    pub value: Option<SecretSource>,
    /// Alphabet for generated values; `None` uses [`DEFAULT_SYMBOLS`].
    pub symbols: Option<String>,
}

impl SecretRequest {
    /// Request for a generated secret with all defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            length: None,
            rewrite: false,
            value: None,
            symbols: None,
        }
    }
}

/// What [`make_secret`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOutcome {
    Created,
    ReusedExisting,
}

/// Write a secret file, keeping an existing one unless `rewrite` is set.
pub fn make_secret(request: &SecretRequest) -> Result<SecretOutcome> {
    let name = request
        .path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    if request.path.exists() && !request.rewrite {
        info!(secret = %name, "using an existing secret");
        return Ok(SecretOutcome::ReusedExisting);
    }

    let value = match &request.value {
        Some(SecretSource::Literal(value)) => value.clone(),
        Some(SecretSource::Generator(generate)) => generate(),
        None => {
            let symbols = request.symbols.as_deref().unwrap_or(DEFAULT_SYMBOLS);
            ensure!(!symbols.is_empty(), "symbol alphabet must not be empty");
            random_secret(effective_length(request.length), symbols)
        }
    };

    if let Some(parent) = request.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&request.path, &value)
        .with_context(|| format!("write {}", request.path.display()))?;
    info!(secret = %name, "the secret has been created");
    Ok(SecretOutcome::Created)
}

fn effective_length(length: Option<usize>) -> usize {
    match length {
        Some(length) if length >= 1 => length,
        _ => rand::thread_rng().gen_range(64..128),
    }
}

/// Random string drawn uniformly from `symbols` (`thread_rng` is a CSPRNG).
fn random_secret(length: usize, symbols: &str) -> String {
    let alphabet: Vec<char> = symbols.chars().collect();
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_secret_with_default_length_and_alphabet() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("secrets").join("db_password");

        let outcome = make_secret(&SecretRequest::new(&path)).expect("make secret");
        assert_eq!(outcome, SecretOutcome::Created);

        let content = fs::read_to_string(&path).expect("read");
        assert!((64..128).contains(&content.chars().count()));
        assert!(content.chars().all(|ch| DEFAULT_SYMBOLS.contains(ch)));
    }

    #[test]
    fn respects_explicit_length() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("token");

        make_secret(&SecretRequest {
            length: Some(16),
            ..SecretRequest::new(&path)
        })
        .expect("make secret");

        assert_eq!(fs::read_to_string(&path).expect("read").chars().count(), 16);
    }

    #[test]
    fn non_positive_length_falls_back_to_random_range() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("token");

        make_secret(&SecretRequest {
            length: Some(0),
            ..SecretRequest::new(&path)
        })
        .expect("make secret");

        let content = fs::read_to_string(&path).expect("read");
        assert!((64..128).contains(&content.chars().count()));
    }

    #[test]
    fn existing_secret_is_kept_without_rewrite() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("api_key");
        fs::write(&path, "existing-secret").expect("write");

        let outcome = make_secret(&SecretRequest::new(&path)).expect("make secret");

        assert_eq!(outcome, SecretOutcome::ReusedExisting);
        assert_eq!(fs::read_to_string(&path).expect("read"), "existing-secret");
    }

    #[test]
    fn rewrite_replaces_an_existing_secret() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("api_key");
        fs::write(&path, "existing-secret").expect("write");

        let outcome = make_secret(&SecretRequest {
            rewrite: true,
            value: Some(SecretSource::Literal("fresh".to_string())),
            ..SecretRequest::new(&path)
        })
        .expect("make secret");

        assert_eq!(outcome, SecretOutcome::Created);
        assert_eq!(fs::read_to_string(&path).expect("read"), "fresh");
    }

    #[test]
    fn literal_value_is_written_verbatim() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("literal");

        make_secret(&SecretRequest {
            length: Some(3),
            value: Some(SecretSource::Literal("exact value".to_string())),
            ..SecretRequest::new(&path)
        })
        .expect("make secret");

        // The explicit value wins; length only applies to generated secrets.
        assert_eq!(fs::read_to_string(&path).expect("read"), "exact value");
    }

    #[test]
    fn generator_result_is_used_verbatim() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("generated");

        make_secret(&SecretRequest {
            value: Some(SecretSource::Generator(Box::new(|| {
                "from-generator".to_string()
            }))),
            ..SecretRequest::new(&path)
        })
        .expect("make secret");

        assert_eq!(fs::read_to_string(&path).expect("read"), "from-generator");
    }

    #[test]
    fn custom_alphabet_constrains_generated_characters() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pin");

        make_secret(&SecretRequest {
            length: Some(32),
            symbols: Some("0123456789".to_string()),
            ..SecretRequest::new(&path)
        })
        .expect("make secret");

        let content = fs::read_to_string(&path).expect("read");
        assert!(content.chars().all(|ch| ch.is_ascii_digit()));
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("bad");

        let err = make_secret(&SecretRequest {
            symbols: Some(String::new()),
            ..SecretRequest::new(&path)
        })
        .expect_err("empty alphabet");

        assert!(err.to_string().contains("symbol alphabet"));
        assert!(!path.exists());
    }
}
