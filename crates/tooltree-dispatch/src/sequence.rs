//! Command sequences and raw command input.
//!
//! A [`CommandSequence`] is the ordered list of words that identifies a
//! command's position in the hierarchy (`mytool db migrate` is `["db",
//! "migrate"]`). The empty sequence is the root command.
//!
//! [`RawCommand`] is what the user typed, either as one line or as a token
//! list. Only whitespace splitting is performed; everything else is left to
//! the argument parser.

use serde::Serialize;
use std::fmt;

/// Ordered words identifying a command in the hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CommandSequence(Vec<String>);

impl CommandSequence {
    /// The root command (empty sequence).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a sequence from any list of words.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(words.into_iter().map(Into::into).collect())
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `prefix` is a (not necessarily strict) prefix of this sequence.
    pub fn starts_with(&self, prefix: &CommandSequence) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Returns true if the leading non-flag tokens spell out this sequence.
    pub fn matches_tokens(&self, tokens: &[&str]) -> bool {
        tokens.len() >= self.0.len() && self.0.iter().zip(tokens).all(|(word, token)| word == token)
    }

    /// Returns the words after the first `n`.
    pub fn tail(&self, n: usize) -> CommandSequence {
        Self(self.0.iter().skip(n).cloned().collect())
    }

    /// Returns a new sequence with `other` appended.
    pub fn concat(&self, other: &CommandSequence) -> CommandSequence {
        let mut words = self.0.clone();
        words.extend(other.0.iter().cloned());
        Self(words)
    }
}

impl fmt::Display for CommandSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

impl From<Vec<String>> for CommandSequence {
    fn from(words: Vec<String>) -> Self {
        Self(words)
    }
}

impl From<&[&str]> for CommandSequence {
    fn from(words: &[&str]) -> Self {
        Self::new(words.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for CommandSequence {
    fn from(words: [&str; N]) -> Self {
        Self::new(words)
    }
}

/// Splits a command line on whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

/// Returns true for tokens that look like flags (`-x`, `--name`).
pub fn is_flag_token(token: &str) -> bool {
    token.starts_with('-')
}

/// User input, either a single line or an already-split token list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCommand {
    Line(String),
    Tokens(Vec<String>),
}

impl RawCommand {
    /// Returns the input as a token list.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            RawCommand::Line(line) => tokenize(line),
            RawCommand::Tokens(tokens) => tokens.clone(),
        }
    }

    /// Reads the current process arguments, skipping the binary name.
    pub fn from_env() -> Self {
        RawCommand::Tokens(std::env::args().skip(1).collect())
    }
}

impl From<&str> for RawCommand {
    fn from(line: &str) -> Self {
        RawCommand::Line(line.to_string())
    }
}

impl From<String> for RawCommand {
    fn from(line: String) -> Self {
        RawCommand::Line(line)
    }
}

impl From<Vec<String>> for RawCommand {
    fn from(tokens: Vec<String>) -> Self {
        RawCommand::Tokens(tokens)
    }
}

impl From<Vec<&str>> for RawCommand {
    fn from(tokens: Vec<&str>) -> Self {
        RawCommand::Tokens(tokens.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for RawCommand {
    fn from(tokens: &[&str]) -> Self {
        RawCommand::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}
