//! Error taxonomy for the dispatch pipeline.
//!
//! Every stage has its own error type so callers (and tests) can tell a
//! resolution failure from a parse failure. They all convert into
//! [`CliError`], which is what the pipeline returns and what the app layer
//! turns into either a debugger session or a single printed line.

use std::fmt;
use thiserror::Error;

use crate::sequence::CommandSequence;

/// A command reference could not be turned into a command spec.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The dotted module path is not present in the module registry.
    #[error("unknown command module: {path}")]
    UnknownModule { path: String },

    /// The module was loaded but exposes no command factory.
    #[error("module has no command factory: {module}")]
    NoFactory { module: String },

    /// Loading the module failed.
    #[error("could not load command module {reference}: {source}")]
    LoadFailed {
        reference: String,
        #[source]
        source: anyhow::Error,
    },

    /// The factory ran but returned an error.
    #[error("command factory failed for {reference}: {source}")]
    FactoryFailed {
        reference: String,
        #[source]
        source: anyhow::Error,
    },
}

/// No registered sequence matched the input and no default was configured.
#[derive(Debug, Error)]
pub struct NoMatchingCommandError {
    /// The tokens that were matched against.
    pub input: Vec<String>,
    /// The candidate sequences, in the order they were tried.
    pub candidates: Vec<CommandSequence>,
}

impl fmt::Display for NoMatchingCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.input.is_empty() {
            write!(f, "no command given")?;
        } else {
            write!(f, "unknown command: {}", self.input.join(" "))?;
        }
        let visible: Vec<String> = self
            .candidates
            .iter()
            .filter(|c| !c.is_root())
            .map(|c| c.to_string())
            .collect();
        if !visible.is_empty() {
            write!(f, " (available: {})", visible.join(", "))?;
        }
        Ok(())
    }
}

/// A token-level grammar violation, or an argument schema that cannot be compiled.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ArgumentParsingError {
    /// One-line, user-facing description.
    pub message: String,
    #[source]
    pub source: Option<clap::Error>,
}

impl ArgumentParsingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn from_clap(message: impl Into<String>, source: clap::Error) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}

/// A required argument was absent from the parsed arguments.
#[derive(Debug, Error)]
#[error("missing required argument: {name}")]
pub struct MissingArgumentError {
    pub name: String,
}

/// A command declared an extra-data key that nothing in the config supplies.
#[derive(Debug, Error)]
#[error("unknown extra data: {key}")]
pub struct UnknownExtraDataError {
    pub key: String,
}

/// Where a middleware failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewarePhase {
    Pre,
    Post,
}

impl fmt::Display for MiddlewarePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewarePhase::Pre => write!(f, "pre-middleware"),
            MiddlewarePhase::Post => write!(f, "post-middleware"),
        }
    }
}

/// Any failure of one invocation.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    NoMatch(#[from] NoMatchingCommandError),

    #[error(transparent)]
    Parse(#[from] ArgumentParsingError),

    #[error(transparent)]
    MissingArgument(#[from] MissingArgumentError),

    #[error(transparent)]
    UnknownExtraData(#[from] UnknownExtraDataError),

    /// An extra-data getter failed.
    #[error("{source}")]
    ExtraData {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// A pre or post middleware failed.
    #[error("{source}")]
    Middleware {
        phase: MiddlewarePhase,
        #[source]
        source: anyhow::Error,
    },

    /// The command body itself failed.
    #[error("{0}")]
    Command(anyhow::Error),

    /// The invocation itself was malformed (e.g. neither index nor spec given).
    #[error("{0}")]
    Invocation(String),

    /// The async runtime could not be started.
    #[error("could not start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl CliError {
    /// The user-facing message, if the error carries one.
    ///
    /// Only the first line is returned. Errors whose message is empty yield `None`.
    pub fn message(&self) -> Option<String> {
        let text = self.to_string();
        let first = text.lines().map(str::trim).find(|l| !l.is_empty())?;
        Some(first.to_string())
    }

    /// Returns true if this error came from a command body.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, CliError::Command(_))
    }
}

/// A configuration bug found while assembling the CLI.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A sequence was registered twice.
    #[error("duplicate command: {0}")]
    DuplicateCommand(CommandSequence),

    /// A plugin requires extra data that no static value or getter provides.
    #[error("extra_data required: {0}")]
    MissingExtraData(String),

    /// Other configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
