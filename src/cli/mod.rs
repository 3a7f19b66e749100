//! CLI module
//!
//! Provides:
//! - Argument parsing (clap derive)
//! - Configuration loading with flag overrides
//! - Command dispatch (verify, decode, scan-count)

pub mod args;
pub mod dispatch;

// Re-exports
pub use args::{Args, Command};
pub use dispatch::{apply_overrides, exit_code_for, run, ExitCode};

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;
