//! Command-sequence matching.
//!
//! Matching looks only at the non-flag tokens of the input and picks the
//! registered sequence that is a prefix of them:
//!
//! ```text
//! input:       db --verbose migrate up 3
//! non-flag:    db migrate up 3
//! candidates:  [db migrate] [db] []       (longest first)
//! matched:     db migrate
//! remaining:   --verbose up 3
//! ```
//!
//! With `sort_command_index` on (the default) longer candidates are tried
//! first, so `db migrate` wins over `db`. The sort is stable: candidates of
//! equal length keep their registration order, and the first registered one
//! wins. With sorting off, candidates are tried purely in registration order.

use crate::config::CliConfig;
use crate::error::NoMatchingCommandError;
use crate::index::CommandIndex;
use crate::sequence::{is_flag_token, CommandSequence, RawCommand};

/// Finds the command sequence `raw` invokes.
///
/// Falls back to the configured default sequence when nothing matches.
pub fn match_command_sequence(
    raw: &RawCommand,
    index: &CommandIndex,
    config: &CliConfig,
) -> Result<CommandSequence, NoMatchingCommandError> {
    let tokens = raw.tokens();
    let words: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|token| !is_flag_token(token))
        .collect();

    let mut candidates: Vec<&CommandSequence> = index.sequences().collect();
    if config.sort_command_index {
        candidates.sort_by_key(|sequence| std::cmp::Reverse(sequence.len()));
    }

    if let Some(found) = candidates.iter().find(|c| c.matches_tokens(&words)) {
        tracing::debug!(sequence = %found, "matched command sequence");
        return Ok((*found).clone());
    }

    if let Some(default) = &config.default_command_sequence {
        tracing::debug!(sequence = %default, "falling back to default command sequence");
        return Ok(default.clone());
    }

    Err(NoMatchingCommandError {
        input: words.iter().map(|w| w.to_string()).collect(),
        candidates: candidates.into_iter().cloned().collect(),
    })
}

/// Removes the words of `sequence` from `tokens`.
///
/// Each word removes its first occurrence; removal stops at the first word
/// not present, leaving the rest untouched.
pub fn strip_command_sequence(tokens: &[String], sequence: &CommandSequence) -> Vec<String> {
    let mut remaining = tokens.to_vec();
    for word in sequence.words() {
        match remaining.iter().position(|token| token == word) {
            Some(pos) => {
                remaining.remove(pos);
            }
            None => break,
        }
    }
    remaining
}
