//! Argument schema compilation and parsing.
//!
//! A command's [`ArgSpec`] list is compiled into a `clap::Command` at parse
//! time and the remaining tokens are parsed against it. clap owns the
//! token-level grammar; this module owns the mapping in both directions:
//!
//! - schema: names, actions, value counts, value types, choices
//! - results: every destination in [`ParsedArgs`], filled with the parsed
//!   value or its implicit default
//! - errors: clap errors condensed into one user-facing line
//!
//! # Effective arguments
//!
//! The parsed schema is the command's own arguments, then the config's
//! common arguments, then the standard ones: `--debug`, `-h/--help` and the
//! `cd` tempfile argument, each only when enabled. Later arguments lose
//! names (and destinations) already taken by earlier ones.
//!
//! # Parse modes
//!
//! clap lets positional values surround options. Unless the mode is one of
//! the intermixed ones, a variadic positional whose values are split by an
//! option is rejected (or, in `Known` mode, cut at the split). In the
//! `Known` modes unknown tokens are dropped one at a time and parsing is
//! retried.

use clap::builder::{PossibleValuesParser, ValueRange};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::{Map, Number, Value};
use std::path::PathBuf;

use crate::config::{cd_arg, debug_arg, help_arg, CliConfig, ParseMode};
use crate::context::ParseContext;
use crate::error::ArgumentParsingError;
use crate::index::CommandIndex;
use crate::sequence::CommandSequence;
use crate::spec::{Action, ArgSpec, CommandSpec, Nargs, ValueType};

/// Parsed values keyed by destination.
pub type ParsedArgs = Map<String, Value>;

/// Parses `raw` against the effective arguments of `spec`.
pub fn parse_raw_command(
    raw: &[String],
    spec: &CommandSpec,
    config: &CliConfig,
    context: Option<&ParseContext>,
) -> Result<ParsedArgs, ArgumentParsingError> {
    let index = context.and_then(|ctx| ctx.command_index.as_deref());
    let args = effective_args(spec, config, index);
    let command = compile(&args, config)?;
    let mode = config.parse_mode;
    tracing::debug!(?mode, args = args.len(), tokens = raw.len(), "parsing arguments");

    let mut tokens = raw.to_vec();
    let matches = loop {
        match command.clone().try_get_matches_from(tokens.clone()) {
            Ok(matches) => break matches,
            Err(err) if mode.ignores_unknown() && err.kind() == ErrorKind::UnknownArgument => {
                let offending = context_text(&err, ContextKind::InvalidArg).unwrap_or_default();
                if !drop_token(&mut tokens, &offending) {
                    return Err(convert_error(err));
                }
                tracing::debug!(token = %offending, "ignoring unknown argument");
            }
            Err(err) => return Err(convert_error(err)),
        }
    };

    let mut parsed = ParsedArgs::new();
    for arg in &args {
        let id = arg.destination();
        let value = if matches.value_source(&id) == Some(ValueSource::CommandLine) {
            extract(arg, &id, &matches, mode)?
        } else {
            arg.implicit_default()
        };
        parsed.insert(id, value);
    }
    Ok(parsed)
}

/// The full argument list a command is parsed with.
pub fn effective_args(
    spec: &CommandSpec,
    config: &CliConfig,
    index: Option<&CommandIndex>,
) -> Vec<ArgSpec> {
    let mut standard = Vec::new();
    if config.include_debug_arg {
        standard.push(debug_arg());
    }
    if config.include_help_arg && !spec.args.iter().any(|a| a.destination() == "help") {
        standard.push(help_arg());
    }
    if index.is_some_and(|index| index.contains(&CommandSequence::from(["cd"]))) {
        standard.push(cd_arg());
    }

    let mut args: Vec<ArgSpec> = Vec::new();
    let candidates = spec
        .args
        .iter()
        .chain(&config.common_args)
        .cloned()
        .chain(standard);
    for candidate in candidates {
        if let Some(arg) = without_conflicts(candidate, &args) {
            args.push(arg);
        }
    }
    args
}

fn without_conflicts(mut candidate: ArgSpec, taken: &[ArgSpec]) -> Option<ArgSpec> {
    let dest = candidate.destination();
    if taken.iter().any(|a| a.destination() == dest) {
        return None;
    }
    if candidate.is_flag_style() {
        let before = candidate.names.len();
        candidate
            .names
            .retain(|name| !taken.iter().any(|a| a.names.contains(name)));
        if candidate.names.is_empty() {
            return None;
        }
        if candidate.names.len() != before && candidate.dest.is_none() {
            candidate.dest = Some(dest);
        }
    }
    Some(candidate)
}

fn compile(args: &[ArgSpec], config: &CliConfig) -> Result<Command, ArgumentParsingError> {
    let mut command = Command::new(config.base_command().to_string())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true);
    for arg in args {
        command = command.arg(compile_arg(arg)?);
    }
    Ok(command)
}

fn compile_arg(spec: &ArgSpec) -> Result<Arg, ArgumentParsingError> {
    if spec.names.is_empty() {
        return Err(ArgumentParsingError::new("argument declared without a name"));
    }
    validate_action(spec)?;
    let id = spec.destination();
    let mut arg = Arg::new(id.clone()).hide(spec.internal);

    if spec.is_flag_style() {
        let mut longs = Vec::new();
        let mut shorts = Vec::new();
        for name in &spec.names {
            if let Some(long) = name.strip_prefix("--") {
                if long.is_empty() {
                    return Err(invalid_name(name));
                }
                longs.push(long.to_string());
            } else {
                let mut chars = name.trim_start_matches('-').chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => shorts.push(c),
                    _ => return Err(invalid_name(name)),
                }
            }
        }
        if let Some((first, rest)) = longs.split_first() {
            arg = arg.long(first.clone());
            for alias in rest {
                arg = arg.visible_alias(alias.clone());
            }
        }
        if let Some((first, rest)) = shorts.split_first() {
            arg = arg.short(*first);
            for alias in rest {
                arg = arg.visible_short_alias(*alias);
            }
        }
        arg = arg.required(spec.required == Some(true) && !spec.internal);
        if spec.takes_values() {
            arg = arg.value_name(
                spec.metavar
                    .clone()
                    .unwrap_or_else(|| id.to_uppercase()),
            );
        }
    } else {
        if spec.names.len() > 1 {
            return Err(ArgumentParsingError::new(format!(
                "positional argument {} must have exactly one name",
                spec.names.join("/")
            )));
        }
        arg = arg
            .required(spec.required.unwrap_or(!spec.is_optional()))
            .value_name(spec.metavar.clone().unwrap_or_else(|| spec.names[0].clone()));
    }

    arg = arg.action(match spec.action {
        Action::StoreTrue => ArgAction::SetTrue,
        Action::StoreFalse => ArgAction::SetFalse,
        Action::Count | Action::AppendConst => ArgAction::Count,
        Action::StoreConst => ArgAction::SetTrue,
        Action::Append | Action::Extend => ArgAction::Append,
        Action::Store if spec.is_positional() && spec.is_multi_valued() => ArgAction::Append,
        Action::Store => ArgAction::Set,
    });

    if let Some(help) = &spec.help {
        arg = arg.help(help.clone());
    }

    if spec.takes_values() {
        if let Some(nargs) = spec.nargs {
            arg = arg.num_args(match nargs {
                Nargs::Exactly(n) => ValueRange::new(n),
                Nargs::Optional => ValueRange::new(0..=1),
                Nargs::ZeroOrMore => ValueRange::new(0..),
                Nargs::OneOrMore => ValueRange::new(1..),
            });
        }
        arg = match (&spec.choices, spec.value_type) {
            (Some(choices), _) => arg.value_parser(PossibleValuesParser::new(choices.clone())),
            (None, ValueType::Int) => arg
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true),
            (None, ValueType::Float) => arg
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true),
            (None, ValueType::Bool) => arg.value_parser(value_parser!(bool)),
            (None, ValueType::Path) => arg.value_parser(value_parser!(PathBuf)),
            (None, ValueType::String) => arg,
        };
    }
    Ok(arg)
}

/// Rejects action and nargs combinations that cannot be parsed.
fn validate_action(spec: &ArgSpec) -> Result<(), ArgumentParsingError> {
    let names = spec.names.join("/");
    if spec.takes_values() && spec.nargs == Some(Nargs::Exactly(0)) {
        return Err(ArgumentParsingError::new(format!(
            "argument {}: nargs must be nonzero for actions that store values",
            names
        )));
    }
    if matches!(spec.action, Action::StoreConst | Action::AppendConst) {
        if spec.const_value.is_none() {
            return Err(ArgumentParsingError::new(format!(
                "argument {}: const action without a const value",
                names
            )));
        }
        if spec.is_positional() {
            return Err(ArgumentParsingError::new(format!(
                "argument {}: const actions need an option name",
                names
            )));
        }
    }
    Ok(())
}

fn invalid_name(name: &str) -> ArgumentParsingError {
    ArgumentParsingError::new(format!(
        "invalid option name '{}': short options take a single character",
        name
    ))
}

fn extract(
    arg: &ArgSpec,
    id: &str,
    matches: &ArgMatches,
    mode: ParseMode,
) -> Result<Value, ArgumentParsingError> {
    match arg.action {
        Action::StoreTrue | Action::StoreFalse => {
            let flag = matches
                .try_get_one::<bool>(id)
                .map_err(|e| schema_mismatch(id, e))?;
            Ok(Value::Bool(flag.copied().unwrap_or(false)))
        }
        Action::Count => {
            let count = matches
                .try_get_one::<u8>(id)
                .map_err(|e| schema_mismatch(id, e))?;
            Ok(Value::from(count.copied().unwrap_or(0)))
        }
        Action::StoreConst => Ok(arg.const_value.clone().unwrap_or(Value::Null)),
        Action::AppendConst => {
            let count = matches
                .try_get_one::<u8>(id)
                .map_err(|e| schema_mismatch(id, e))?;
            let value = arg.const_value.clone().unwrap_or(Value::Null);
            Ok(Value::Array(vec![
                value;
                usize::from(count.copied().unwrap_or(0))
            ]))
        }
        Action::Append if arg.nargs.is_some_and(Nargs::is_variadic) => {
            let occurrences = matches
                .try_get_raw_occurrences(id)
                .map_err(|e| schema_mismatch(id, e))?;
            let mut groups = Vec::new();
            for occurrence in occurrences.into_iter().flatten() {
                let values = occurrence
                    .map(|raw| convert(arg, &raw.to_string_lossy()))
                    .collect::<Result<Vec<_>, _>>()?;
                groups.push(Value::Array(values));
            }
            Ok(Value::Array(groups))
        }
        _ => {
            let mut raw: Vec<String> = matches
                .try_get_raw(id)
                .map_err(|e| schema_mismatch(id, e))?
                .into_iter()
                .flatten()
                .map(|v| v.to_string_lossy().into_owned())
                .collect();
            if arg.is_positional() && arg.is_multi_valued() && !mode.allows_intermixed() {
                if let Some(split) = first_gap(matches, id) {
                    if !mode.ignores_unknown() {
                        return Err(ArgumentParsingError::new(format!(
                            "unrecognized arguments: {}",
                            raw[split..].join(" ")
                        )));
                    }
                    raw.truncate(split);
                }
            }
            let values = raw
                .iter()
                .map(|v| convert(arg, v))
                .collect::<Result<Vec<_>, _>>()?;
            if arg.is_multi_valued() {
                Ok(Value::Array(values))
            } else {
                Ok(values.into_iter().next().unwrap_or(Value::Null))
            }
        }
    }
}

/// Position of the first value separated from its predecessor by other tokens.
fn first_gap(matches: &ArgMatches, id: &str) -> Option<usize> {
    let indices: Vec<usize> = matches.indices_of(id)?.collect();
    indices
        .windows(2)
        .position(|pair| pair[1] != pair[0] + 1)
        .map(|pos| pos + 1)
}

fn convert(arg: &ArgSpec, raw: &str) -> Result<Value, ArgumentParsingError> {
    let invalid = || {
        ArgumentParsingError::new(format!(
            "argument {}: invalid {} value: '{}'",
            arg.names.join("/"),
            arg.value_type.name(),
            raw
        ))
    };
    Ok(match arg.value_type {
        ValueType::String | ValueType::Path => Value::String(raw.to_string()),
        ValueType::Int => Value::from(raw.parse::<i64>().map_err(|_| invalid())?),
        ValueType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid)?,
        ValueType::Bool => Value::Bool(raw.parse::<bool>().map_err(|_| invalid())?),
    })
}

fn schema_mismatch(id: &str, err: clap::parser::MatchesError) -> ArgumentParsingError {
    ArgumentParsingError::new(format!("argument {}: {}", id, err))
}

fn drop_token(tokens: &mut Vec<String>, offending: &str) -> bool {
    if offending.is_empty() {
        return false;
    }
    let prefix = format!("{}=", offending);
    match tokens
        .iter()
        .position(|t| t == offending || t.starts_with(&prefix))
    {
        Some(pos) => {
            tokens.remove(pos);
            true
        }
        None => false,
    }
}

fn context_text(err: &clap::Error, kind: ContextKind) -> Option<String> {
    match err.get(kind)? {
        ContextValue::String(s) => Some(s.clone()),
        ContextValue::Strings(v) => Some(v.join(", ")),
        _ => None,
    }
}

/// Condenses a clap error into a single line.
fn convert_error(err: clap::Error) -> ArgumentParsingError {
    let arg = context_text(&err, ContextKind::InvalidArg);
    let value = context_text(&err, ContextKind::InvalidValue);
    let message = match (err.kind(), arg, value) {
        (ErrorKind::UnknownArgument, Some(arg), _) => {
            format!("unrecognized arguments: {}", arg)
        }
        (ErrorKind::InvalidValue, Some(arg), Some(value)) if value.is_empty() => {
            format!("argument {}: expected a value", arg)
        }
        (ErrorKind::InvalidValue, Some(arg), Some(value)) => {
            match context_text(&err, ContextKind::ValidValue) {
                Some(valid) => format!(
                    "argument {}: invalid choice: '{}' (choose from {})",
                    arg, value, valid
                ),
                None => format!("argument {}: invalid value '{}'", arg, value),
            }
        }
        (ErrorKind::ValueValidation, Some(arg), Some(value)) => {
            format!("argument {}: invalid value '{}'", arg, value)
        }
        (ErrorKind::MissingRequiredArgument, Some(arg), _) => {
            format!("the following arguments are required: {}", arg)
        }
        _ => first_line(&err),
    };
    ArgumentParsingError::from_clap(message, err)
}

fn first_line(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error: ").to_string())
        .unwrap_or_else(|| err.kind().to_string())
}
