//! Hidden `cli ...` developer subcommands.

use anyhow::anyhow;
use console::Style;
use serde_json::json;
use tooltree_dispatch::{
    ArgSpec, CommandSequence, CommandSpec, FunctionArgs, Handler, Nargs, ParseContext, CONTEXT_KEY,
};

use crate::help::default_help_theme;
use crate::output::{Output, OUTPUT_KEY};

fn dev_command(handler: fn(&FunctionArgs) -> anyhow::Result<()>, help: &str) -> CommandSpec {
    CommandSpec::new(Handler::from_fn(handler))
        .help(help)
        .hidden()
        .extra_data(CONTEXT_KEY)
        .extra_data(OUTPUT_KEY)
}

pub(crate) fn index_spec() -> CommandSpec {
    dev_command(index_command, "print command index of possible subcommands")
}

pub(crate) fn spec_spec() -> CommandSpec {
    dev_command(spec_command, "print command spec for a given command sequence")
        .arg(ArgSpec::new("command_sequence").nargs(Nargs::OneOrMore))
}

pub(crate) fn config_spec() -> CommandSpec {
    dev_command(config_command, "print cli config")
}

pub(crate) fn theme_spec() -> CommandSpec {
    dev_command(theme_command, "display cli style theme")
}

fn parts(args: &FunctionArgs) -> anyhow::Result<(&ParseContext, &Output)> {
    Ok((&**args.context()?, args.extra::<Output>(OUTPUT_KEY)?))
}

fn index_command(args: &FunctionArgs) -> anyhow::Result<()> {
    let (ctx, output) = parts(args)?;
    let Some(index) = &ctx.command_index else {
        output.line("no command index specified")?;
        return Ok(());
    };
    let rows: Vec<(String, String)> = index
        .iter()
        .filter(|(sequence, _)| !sequence.is_root())
        .map(|(sequence, reference)| (sequence.to_string(), reference.describe()))
        .collect();
    if rows.is_empty() {
        output.line("command index is empty")?;
        return Ok(());
    }

    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    output.line("command index:")?;
    for (name, reference) in rows {
        output.line(&format!("    {:<width$}    {}", name, reference, width = width))?;
    }
    Ok(())
}

fn spec_command(args: &FunctionArgs) -> anyhow::Result<()> {
    let (ctx, output) = parts(args)?;
    let sequence = CommandSequence::from(args.get::<Vec<String>>("command_sequence")?);
    let index = ctx
        .command_index
        .as_ref()
        .ok_or_else(|| anyhow!("no command index specified"))?;
    let Some(reference) = index.get(&sequence) else {
        output.line("could not find spec for given command sequence")?;
        return Ok(());
    };

    let spec = reference.resolve(&ctx.config.modules)?;
    let bound = ctx.rebind(Some(sequence.clone()), spec);
    let handler = if bound.command_spec.handler.is_async() {
        "async"
    } else {
        "sync"
    };
    let summary = json!({
        "sequence": sequence,
        "reference": reference.describe(),
        "handler": handler,
        "help": bound.command_spec.help_text(&bound),
        "args": bound.command_spec.args,
        "extra_data": bound.command_spec.extra_data,
        "hidden": bound.command_spec.hidden,
        "special": bound.command_spec.special,
    });
    output.line(&serde_json::to_string_pretty(&summary)?)?;
    Ok(())
}

fn config_command(args: &FunctionArgs) -> anyhow::Result<()> {
    let (ctx, output) = parts(args)?;
    output.line(&format!("{:#?}", ctx.config))?;
    Ok(())
}

fn theme_command(args: &FunctionArgs) -> anyhow::Result<()> {
    let (ctx, output) = parts(args)?;
    let mut theme = default_help_theme();
    theme.extend(ctx.config.style_theme.clone());

    let styled = output.supports_styling();
    let width = theme.keys().map(|role| role.len() + 1).max().unwrap_or(0);
    for (role, spec) in &theme {
        let sample = if styled {
            Style::from_dotted_str(spec)
                .force_styling(true)
                .apply_to(spec)
                .to_string()
        } else {
            spec.clone()
        };
        let label = format!("{}:", role);
        output.line(&format!("{:<width$}  {}", label, sample, width = width))?;
    }
    Ok(())
}
