//! One-line failure reporting for non-debug runs.

use std::io::{self, Write};
use tooltree_dispatch::{CliConfig, CliError};

/// Printed when an error carries no message of its own.
pub const GENERIC_FAILURE: &str = "error occurred, use --debug to debug";

/// The single line shown to the user for `err`.
pub fn failure_line(err: &CliError) -> String {
    err.message()
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

pub fn report_failure(err: &CliError, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", failure_line(err))?;
    out.flush()
}

/// True if the run asked for the debugger.
///
/// Checked on the raw tokens so that it also holds when the failure
/// happened before `--debug` could be parsed.
pub fn debug_requested(config: &CliConfig, tokens: &[String]) -> bool {
    config.include_debug_arg && tokens.iter().any(|token| token == "--debug")
}
