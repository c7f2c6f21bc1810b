//! Help data extraction from the command index.

use serde::Serialize;
use std::collections::BTreeMap;
use tooltree_dispatch::{ArgSpec, CommandIndex, CommandSequence, ParseContext};

/// Label for uncategorized commands when the configured labels are lowercase.
const OTHER_CATEGORY: &str = "other";

#[derive(Debug, Serialize)]
pub(crate) struct HelpData {
    pub usage: String,
    pub description: Vec<String>,
    /// Command line that shows help for a subcommand, for index-level help.
    pub hint: Option<String>,
    pub subcommand_header: String,
    pub groups: Vec<Group>,
    pub arguments: Vec<ArgumentRow>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Group {
    pub title: Option<String>,
    pub commands: Vec<SubcommandRow>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubcommandRow {
    pub name: String,
    pub about: String,
    pub padding: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ArgumentRow {
    pub name: String,
    pub metavar: Option<String>,
    pub help: String,
    pub default: Option<String>,
    pub padding: String,
}

struct Listed {
    sequence: CommandSequence,
    name: String,
    about: String,
}

/// Help for the root command: usage, description and every subcommand.
pub(crate) fn extract_root_help(ctx: &ParseContext, show_hidden: bool) -> HelpData {
    let base = ctx.config.base_command();
    let description = ctx
        .config
        .description
        .as_deref()
        .map(text_lines)
        .unwrap_or_default();
    let groups = match &ctx.command_index {
        Some(index) => categorized(ctx, list_commands(ctx, index, None, show_hidden)),
        None => Vec::new(),
    };

    HelpData {
        usage: format!("{} <subcommand> [options]", base),
        description,
        hint: Some(format!("{} <subcommand> -h", base)),
        subcommand_header: "available subcommands:".to_string(),
        groups,
        arguments: Vec::new(),
    }
}

/// Help for a sequence that is only a prefix of registered commands.
pub(crate) fn extract_prefix_help(
    ctx: &ParseContext,
    prefix: &CommandSequence,
    show_hidden: bool,
) -> HelpData {
    let called = format!("{} {}", ctx.config.base_command(), prefix);
    let listed = match &ctx.command_index {
        Some(index) => list_commands(ctx, index, Some(prefix), show_hidden),
        None => Vec::new(),
    };
    let groups = if listed.is_empty() {
        Vec::new()
    } else {
        vec![padded_group(None, listed, None)]
    };

    HelpData {
        usage: format!("{} <subcommand> [options]", called),
        description: vec![format!("{} is used to call subcommands", called)],
        hint: Some(format!("{} <subcommand> -h", called)),
        subcommand_header: "available subcommands:".to_string(),
        groups,
        arguments: Vec::new(),
    }
}

/// Help for the command `ctx` is bound to.
pub(crate) fn extract_subcommand_help(ctx: &ParseContext) -> HelpData {
    let spec = &ctx.command_spec;
    let args: Vec<&ArgSpec> = spec
        .visible_args()
        .chain(ctx.config.common_args.iter().filter(|a| !a.internal))
        .collect();

    let mut usage = vec![ctx.config.base_command().to_string()];
    if let Some(sequence) = &ctx.command_sequence {
        usage.extend(sequence.words().iter().cloned());
    }
    usage.extend(args.iter().filter_map(|arg| usage_word(arg)));
    usage.push("[options]".to_string());

    HelpData {
        usage: usage.join(" "),
        description: text_lines(&spec.help_text(ctx)),
        hint: None,
        subcommand_header: String::new(),
        groups: Vec::new(),
        arguments: argument_rows(&args),
    }
}

/// Resolves and lists the commands below `prefix` (or all, for the root).
///
/// Commands that fail to resolve are still listed, without help text.
fn list_commands(
    ctx: &ParseContext,
    index: &CommandIndex,
    prefix: Option<&CommandSequence>,
    show_hidden: bool,
) -> Vec<Listed> {
    let chop = prefix.map_or(0, CommandSequence::len);
    let mut listed = Vec::new();
    for (sequence, reference) in index.iter() {
        if sequence.is_root() {
            continue;
        }
        if let Some(prefix) = prefix {
            if sequence.len() <= prefix.len() || !sequence.starts_with(prefix) {
                continue;
            }
        }
        let (about, hidden) = match reference.resolve(&ctx.config.modules) {
            Ok(spec) => {
                let hidden = spec.hidden;
                let bound = ctx.rebind(Some(sequence.clone()), spec);
                (first_line(&bound.command_spec.help_text(&bound)), hidden)
            }
            Err(err) => {
                tracing::debug!(sequence = %sequence, error = %err, "listing unresolvable command");
                (String::new(), false)
            }
        };
        if hidden && !show_hidden {
            continue;
        }
        listed.push(Listed {
            name: sequence.tail(chop).to_string(),
            sequence: sequence.clone(),
            about,
        });
    }
    listed
}

/// Splits listed commands by help category.
///
/// Without categories everything lands in one untitled group, in index
/// order. With categories, groups are sorted by name with the catch-all
/// group last, and commands are sorted within each group.
fn categorized(ctx: &ParseContext, mut listed: Vec<Listed>) -> Vec<Group> {
    if listed.is_empty() {
        return Vec::new();
    }
    let width = name_width(&listed);
    let categories = &ctx.config.help_subcommand_categories;
    if categories.is_empty() {
        return vec![padded_group(None, listed, Some(width))];
    }

    let other = other_label(categories.values().next().map(String::as_str));
    listed.sort_by(|a, b| a.sequence.cmp(&b.sequence));
    let mut by_category: BTreeMap<String, Vec<Listed>> = BTreeMap::new();
    for item in listed {
        let category = categories
            .get(&item.sequence)
            .cloned()
            .unwrap_or_else(|| other.clone());
        by_category.entry(category).or_default().push(item);
    }

    let titled = by_category.len() > 1;
    let mut order: Vec<String> = by_category.keys().cloned().collect();
    if let Some(position) = order.iter().position(|c| *c == other) {
        let last = order.remove(position);
        order.push(last);
    }

    order
        .into_iter()
        .filter_map(|category| {
            let items = by_category.remove(&category)?;
            let title = titled.then(|| format!("{} subcommands", category));
            Some(padded_group(title, items, Some(width)))
        })
        .collect()
}

fn other_label(first_category: Option<&str>) -> String {
    let capitalized = first_category
        .and_then(|c| c.chars().next())
        .is_some_and(char::is_uppercase);
    if capitalized {
        "Other".to_string()
    } else {
        OTHER_CATEGORY.to_string()
    }
}

fn name_width(listed: &[Listed]) -> usize {
    listed.iter().map(|l| l.name.len()).max().unwrap_or(0)
}

fn padded_group(title: Option<String>, listed: Vec<Listed>, width: Option<usize>) -> Group {
    let width = width.unwrap_or_else(|| name_width(&listed));
    let commands = listed
        .into_iter()
        .map(|item| SubcommandRow {
            padding: " ".repeat(width.saturating_sub(item.name.len())),
            name: item.name,
            about: item.about,
        })
        .collect();
    Group { title, commands }
}

/// The word an argument contributes to the usage line, if any.
fn usage_word(arg: &ArgSpec) -> Option<String> {
    if arg.is_positional() {
        let suffix = if arg.is_multi_valued() { "..." } else { "" };
        return Some(format!("<{}>{}", arg.primary_name(), suffix));
    }
    if arg.required == Some(true) {
        let metavar = metavar(arg).unwrap_or_else(|| arg.destination());
        return Some(format!("{} <{}>", arg.primary_name(), metavar));
    }
    None
}

fn metavar(arg: &ArgSpec) -> Option<String> {
    if arg.is_positional() || !arg.takes_values() {
        return None;
    }
    if let Some(metavar) = &arg.metavar {
        return Some(metavar.clone());
    }
    if let Some(choices) = &arg.choices {
        return Some(format!("{{{}}}", choices.join(",")));
    }
    Some(arg.destination().to_uppercase())
}

fn argument_rows(args: &[&ArgSpec]) -> Vec<ArgumentRow> {
    let mut rows: Vec<ArgumentRow> = args
        .iter()
        .map(|arg| {
            let name = if arg.is_positional() {
                format!("<{}>", arg.primary_name())
            } else {
                arg.names.join(", ")
            };
            let default = arg
                .default
                .as_ref()
                .filter(|value| !value.is_null() && !arg.is_boolean_flag())
                .map(|value| match value {
                    serde_json::Value::String(s) => format!("(default: {})", s),
                    other => format!("(default: {})", other),
                });
            ArgumentRow {
                name,
                metavar: metavar(arg),
                help: arg.help.clone().unwrap_or_default(),
                default,
                padding: String::new(),
            }
        })
        .collect();

    let column = |row: &ArgumentRow| row.name.len() + row.metavar.as_ref().map_or(0, |m| m.len() + 1);
    let width = rows.iter().map(column).max().unwrap_or(0);
    for row in &mut rows {
        row.padding = " ".repeat(width - column(row));
    }
    rows
}

fn text_lines(text: &str) -> Vec<String> {
    text.trim_end().lines().map(|l| l.trim_end().to_string()).collect()
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").trim_end().to_string()
}
