//! Stable exit codes for the bootstrap CLI.

/// All extensions ran, or the update check finished.
pub const OK: i32 = 0;
/// Any propagated failure: extension error, git/subprocess failure, fetch error.
pub const FAILURE: i32 = 1;
/// The extension directory does not exist (nothing configured).
pub const NO_EXTENSIONS: i32 = 2;
