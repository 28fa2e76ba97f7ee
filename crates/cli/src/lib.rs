//! osk CLI library
//!
//! Command definitions, exit codes and output formatting, exported for the
//! binary and the integration tests.

pub mod commands;
pub mod exit_code;
pub mod output;
