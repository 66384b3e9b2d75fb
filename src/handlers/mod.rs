//! CLI command handlers.
//!
//! This module contains the handler functions for the run modes,
//! separated from main.rs to enable unit testing.

mod check;

use std::process::ExitCode;

use crate::error::PipecheckError;

pub use check::{Session, run_interval_mode, run_once_mode};

/// Exit status for configuration, resolution and startup failures.
pub const EXIT_FATAL: u8 = 2;

/// Report a fatal error and return the matching exit code.
pub fn fatal(err: &PipecheckError) -> ExitCode {
    tracing::error!(error = %err, "fatal error");
    eprintln!("Error: {}", err);
    ExitCode::from(EXIT_FATAL)
}
