//! The invocation pipeline.
//!
//! [`run`] is the single entry point that takes user input all the way to
//! a finished command:
//!
//! ```text
//! raw command
//!   → match sequence   (unless given explicitly)
//!   → strip sequence words from the tokens
//!   → resolve the command reference
//!   → parse arguments  (unless given pre-parsed)
//!   → --help?  → re-run as `help <sequence>`
//!   → execute          (middleware + handler)
//! ```
//!
//! An [`Invocation`] either names a command index (the normal case) or a
//! single command spec. Handlers can start nested invocations through
//! [`execute_other_command_sequence`] and [`execute_other_command_spec`],
//! which reuse the current context's tokens, index and config.

use serde_json::Value;
use std::rc::Rc;

use crate::config::CliConfig;
use crate::context::ParseContext;
use crate::dispatch::execute;
use crate::error::{CliError, NoMatchingCommandError};
use crate::index::CommandIndex;
use crate::matcher::{match_command_sequence, strip_command_sequence};
use crate::parser::{effective_args, parse_raw_command, ParsedArgs};
use crate::sequence::{CommandSequence, RawCommand};
use crate::spec::CommandSpec;

/// Everything one run of the pipeline needs.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Defaults to the process arguments.
    pub raw_command: Option<RawCommand>,
    pub command_index: Option<Rc<CommandIndex>>,
    /// Skips matching when set.
    pub command_sequence: Option<CommandSequence>,
    /// Used instead of the index when set.
    pub command_spec: Option<CommandSpec>,
    pub config: Rc<CliConfig>,
    /// Skips parsing when set.
    pub args: Option<ParsedArgs>,
}

impl Invocation {
    pub fn new(config: Rc<CliConfig>) -> Self {
        Self {
            raw_command: None,
            command_index: None,
            command_sequence: None,
            command_spec: None,
            config,
            args: None,
        }
    }

    pub fn raw(mut self, raw: impl Into<RawCommand>) -> Self {
        self.raw_command = Some(raw.into());
        self
    }

    pub fn index(mut self, index: Rc<CommandIndex>) -> Self {
        self.command_index = Some(index);
        self
    }

    pub fn sequence(mut self, sequence: impl Into<CommandSequence>) -> Self {
        self.command_sequence = Some(sequence.into());
        self
    }

    pub fn spec(mut self, spec: CommandSpec) -> Self {
        self.command_spec = Some(spec);
        self
    }

    pub fn args(mut self, args: ParsedArgs) -> Self {
        self.args = Some(args);
        self
    }
}

/// Runs one invocation to completion.
pub fn run(invocation: Invocation) -> Result<(), CliError> {
    let ctx = Rc::new(build_parse_context(&invocation)?);
    let parsed = match invocation.args {
        Some(args) => args,
        None => {
            let parsed =
                parse_raw_command(&ctx.raw_command, &ctx.command_spec, &ctx.config, Some(&ctx));
            match parsed {
                Ok(parsed) => parsed,
                Err(_) if help_requested(&ctx, None) => return run_help(&ctx),
                Err(err) => return Err(err.into()),
            }
        }
    };

    if help_requested(&ctx, Some(&parsed)) {
        return run_help(&ctx);
    }

    execute(ctx, parsed)
}

/// Re-runs the invocation as `help <matched sequence>`.
fn run_help(ctx: &ParseContext) -> Result<(), CliError> {
    let subject = ctx.command_sequence.clone().unwrap_or_default();
    tracing::debug!(subject = %subject, "help flag given, running help command");
    let help = CommandSequence::from(["help"]);
    let mut tokens = help.words().to_vec();
    tokens.extend(subject.words().iter().cloned());
    let mut nested = Invocation::new(ctx.config.clone())
        .raw(tokens)
        .sequence(help);
    nested.command_index = ctx.command_index.clone();
    run(nested)
}

/// Matches, strips and resolves, producing the context for `invocation`.
pub fn build_parse_context(invocation: &Invocation) -> Result<ParseContext, CliError> {
    let raw = invocation
        .raw_command
        .clone()
        .unwrap_or_else(RawCommand::from_env);
    let tokens = raw.tokens();
    let config = invocation.config.clone();

    if let Some(spec) = &invocation.command_spec {
        let remaining = match &invocation.command_sequence {
            Some(sequence) => strip_command_sequence(&tokens, sequence),
            None => tokens,
        };
        return Ok(ParseContext::new(
            remaining,
            invocation.command_index.clone(),
            invocation.command_sequence.clone(),
            spec.clone(),
            config,
        ));
    }

    let index = invocation.command_index.clone().ok_or_else(|| {
        CliError::Invocation("either a command index or a command spec is required".to_string())
    })?;

    let sequence = match &invocation.command_sequence {
        Some(sequence) => sequence.clone(),
        None => match_command_sequence(&raw, &index, &config)?,
    };
    let reference = index.get(&sequence).ok_or_else(|| NoMatchingCommandError {
        input: sequence.words().to_vec(),
        candidates: index.sequences().cloned().collect(),
    })?;
    let spec = reference.resolve(&config.modules)?;
    let remaining = strip_command_sequence(&tokens, &sequence);

    Ok(ParseContext::new(
        remaining,
        Some(index),
        Some(sequence),
        spec,
        config,
    ))
}

/// True if `--help` was given and a `help` command can take over.
///
/// Without parsed arguments (parsing failed), the raw tokens are checked so
/// that help works even when required arguments are missing.
fn help_requested(ctx: &ParseContext, parsed: Option<&ParsedArgs>) -> bool {
    let help = CommandSequence::from(["help"]);
    let flagged = match parsed {
        Some(parsed) => parsed.get("help") == Some(&Value::Bool(true)),
        None => help_flag_names(ctx)
            .iter()
            .any(|name| ctx.raw_command.iter().any(|t| t == name)),
    };
    flagged
        && ctx.config.include_help_arg
        && !ctx.command_spec.args.iter().any(|a| a.destination() == "help")
        && ctx.has_command(&help)
        && ctx.command_sequence.as_ref() != Some(&help)
}

/// Names the standard help flag kept after conflict resolution; a command
/// declaring `-h` for itself leaves only `--help`.
fn help_flag_names(ctx: &ParseContext) -> Vec<String> {
    effective_args(&ctx.command_spec, &ctx.config, ctx.command_index.as_deref())
        .into_iter()
        .find(|arg| arg.internal && arg.destination() == "help")
        .map(|arg| arg.names)
        .unwrap_or_default()
}

/// Runs another registered command from inside a handler.
pub fn execute_other_command_sequence(
    ctx: &ParseContext,
    sequence: impl Into<CommandSequence>,
    args: Option<ParsedArgs>,
) -> Result<(), CliError> {
    let mut invocation = Invocation::new(ctx.config.clone())
        .raw(ctx.raw_command.clone())
        .sequence(sequence);
    invocation.command_index = ctx.command_index.clone();
    invocation.args = args;
    run(invocation)
}

/// Runs an unregistered command spec from inside a handler.
pub fn execute_other_command_spec(
    ctx: &ParseContext,
    spec: CommandSpec,
    args: Option<ParsedArgs>,
) -> Result<(), CliError> {
    let mut invocation = Invocation::new(ctx.config.clone())
        .raw(ctx.raw_command.clone())
        .spec(spec);
    invocation.args = args;
    run(invocation)
}
