//! `help [subcommand...] [--hidden]`

use anyhow::anyhow;
use tooltree_dispatch::{
    ArgSpec, CommandSequence, CommandSpec, FunctionArgs, Handler, Nargs, NoMatchingCommandError,
    ParseContext, CONTEXT_KEY,
};

use crate::help::{render_prefix_help, render_root_help, render_subcommand_help, HelpConfig};
use crate::output::{Output, OUTPUT_KEY};

pub(crate) fn command_spec() -> CommandSpec {
    CommandSpec::new(Handler::from_fn(help_command))
        .help("output help")
        .arg(
            ArgSpec::new("subcommand")
                .nargs(Nargs::ZeroOrMore)
                .help("command to describe"),
        )
        .arg(
            ArgSpec::new("--hidden")
                .store_true()
                .help("include hidden commands"),
        )
        .extra_data(CONTEXT_KEY)
        .extra_data(OUTPUT_KEY)
}

fn help_command(args: &FunctionArgs) -> anyhow::Result<()> {
    let subject: Vec<String> = args.get("subcommand")?;
    let ctx = args.context()?;
    let output = args.extra::<Output>(OUTPUT_KEY)?;
    let config = HelpConfig {
        show_hidden: args.flag("hidden"),
        styled: output.supports_styling(),
    };
    let text = help_text(ctx, &CommandSequence::from(subject), config)?;
    output.write_str(&text)?;
    Ok(())
}

/// Root help for an empty subject, command help for a registered one, or
/// a listing when the subject is only a prefix.
pub(crate) fn help_text(
    ctx: &ParseContext,
    subject: &CommandSequence,
    config: HelpConfig,
) -> anyhow::Result<String> {
    if subject.is_root() {
        return Ok(render_root_help(ctx, config)?);
    }
    let index = ctx
        .command_index
        .as_ref()
        .ok_or_else(|| anyhow!("no command index to describe"))?;

    if let Some(reference) = index.get(subject) {
        let spec = reference.resolve(&ctx.config.modules)?;
        let bound = ctx.rebind(Some(subject.clone()), spec);
        return Ok(render_subcommand_help(&bound, config)?);
    }
    if index.is_prefix(subject) {
        return Ok(render_prefix_help(ctx, subject, config)?);
    }
    Err(NoMatchingCommandError {
        input: subject.words().to_vec(),
        candidates: index.sequences().cloned().collect(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tooltree_dispatch::{CliConfig, CommandIndex};

    fn ctx() -> ParseContext {
        let mut index = CommandIndex::new();
        index.insert(
            ["db", "migrate"],
            CommandSpec::new(Handler::from_fn(|_| Ok(())))
                .help("run migrations")
                .arg(ArgSpec::new("target")),
        );
        ParseContext::new(
            Vec::new(),
            Some(Rc::new(index)),
            Some(CommandSequence::from(["help"])),
            command_spec(),
            Rc::new(CliConfig::builder().base_command("tool").build()),
        )
    }

    #[test]
    fn test_exact_subject_shows_command_help() {
        let text = help_text(&ctx(), &CommandSequence::from(["db", "migrate"]), HelpConfig::default())
            .unwrap();
        assert!(text.contains("tool db migrate <target> [options]"), "{}", text);
    }

    #[test]
    fn test_prefix_subject_lists_children() {
        let text = help_text(&ctx(), &CommandSequence::from(["db"]), HelpConfig::default()).unwrap();
        assert!(text.contains("tool db is used to call subcommands"), "{}", text);
        assert!(text.contains("    migrate    run migrations"), "{}", text);
    }

    #[test]
    fn test_unknown_subject_fails() {
        let err = help_text(&ctx(), &CommandSequence::from(["nope"]), HelpConfig::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("unknown command: nope"), "{}", err);
    }
}
