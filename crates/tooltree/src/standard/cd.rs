//! `cd <dirname>`
//!
//! A process cannot change its parent shell's directory, so `cd` relies on
//! a shell function wrapping the program: the wrapper passes a tempfile
//! through `--new_dir_tempfile`, the command writes the destination into
//! it, and the wrapper `cd`s there. Without the tempfile the command prints
//! the wrapper to install.

use anyhow::{anyhow, Context};
use std::fs;
use tooltree_dispatch::{
    ArgSpec, CommandSpec, FunctionArgs, Handler, ParseContext, CD_ARG_DEST, CONTEXT_KEY,
};

use crate::output::{Output, OUTPUT_KEY};

const PROGRAM_PLACEHOLDER: &str = "<PROGRAM_NAME>";

const CD_SNIPPET_TEMPLATE: &str = r#"function {program_name} {
    local tempfile="$(mktemp -t tmp.XXXXXX)"
    command {program_name} "$@" --new_dir_tempfile "$tempfile"
    if [[ -s "$tempfile" ]]; then
        cd "$(cat "$tempfile")"
    fi
    rm -f "$tempfile" 2>/dev/null
}"#;

pub(crate) fn command_spec() -> CommandSpec {
    CommandSpec::new(Handler::from_fn(cd_command))
        .dynamic_help(cd_help)
        .arg(ArgSpec::new("dirname").help("name of the destination"))
        .extra_data(CONTEXT_KEY)
        .extra_data(OUTPUT_KEY)
        .cd()
}

fn cd_help(ctx: &ParseContext) -> String {
    let mut help = String::from("change working directory to specified location");
    let names = &ctx.config.cd_dir_help;
    if !names.is_empty() {
        let width = names.keys().map(String::len).max().unwrap_or(0);
        help.push_str("\n\ndestinations:");
        for (name, text) in names {
            help.push_str(&format!("\n    {:<width$}    {}", name, text, width = width));
        }
    }
    help
}

/// The shell wrapper for `program_name`.
pub fn cd_snippet(program_name: &str) -> String {
    CD_SNIPPET_TEMPLATE.replace("{program_name}", program_name)
}

fn cd_command(args: &FunctionArgs) -> anyhow::Result<()> {
    let ctx = args.context()?;
    let output = args.extra::<Output>(OUTPUT_KEY)?;

    let Some(tempfile) = args.str(CD_ARG_DEST) else {
        return print_setup(ctx.config.base_command.as_deref(), output);
    };

    let dirname: String = args.get("dirname")?;
    let getter = ctx
        .config
        .cd_dir_getter
        .as_ref()
        .ok_or_else(|| anyhow!("must specify path getter"))?;
    let path = getter(&dirname)?;
    tracing::debug!(dirname = %dirname, path = %path, "writing cd destination");
    fs::write(tempfile, path)
        .with_context(|| format!("cannot write cd destination to {}", tempfile))?;
    Ok(())
}

fn print_setup(base_command: Option<&str>, output: &Output) -> anyhow::Result<()> {
    let program_name = base_command.unwrap_or(PROGRAM_PLACEHOLDER);
    output.line("using the cd subcommand requires special configuration")?;
    output.line("")?;
    output.line("add the following snippet to your shell config (e.g. ~/.profile):")?;
    output.line("")?;
    output.line(&cd_snippet(program_name))?;
    if base_command.is_none() {
        output.line("")?;
        output.line(&format!(
            "where {} is the name of the root command",
            PROGRAM_PLACEHOLDER
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tooltree_dispatch::CliConfig;

    #[test]
    fn test_snippet_substitutes_program_name() {
        let snippet = cd_snippet("proj");
        assert!(snippet.starts_with("function proj {"));
        assert!(snippet.contains("command proj \"$@\" --new_dir_tempfile \"$tempfile\""));
        assert!(!snippet.contains("{program_name}"));
    }

    #[test]
    fn test_help_lists_known_destinations() {
        let config = CliConfig::builder()
            .cd_dir_help("root", "project root")
            .cd_dir_help("data", "data directory")
            .build();
        let ctx = ParseContext::new(Vec::new(), None, None, command_spec(), Rc::new(config));
        let help = ctx.command_spec.help_text(&ctx);

        assert!(help.starts_with("change working directory to specified location\n"));
        assert!(help.contains("\n    data    data directory"));
        assert!(help.contains("\n    root    project root"));
    }
}
