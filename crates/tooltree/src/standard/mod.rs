//! Standard subcommands.
//!
//! | sequence      | enabled by                  |
//! |---------------|-----------------------------|
//! | `help`        | `include_help_subcommand`   |
//! | `version`     | `include_version_subcommand`|
//! | `cd`          | `include_cd_subcommand`     |
//! | `cli index`, `cli spec`, `cli config`, `cli theme` | `include_cli_subcommands` (hidden) |
//!
//! Each one lives in the module registry under `tooltree.standard.*` and is
//! indexed by path, so it is only built when an invocation or a help
//! listing resolves it.

mod cd;
mod cli;
mod help;
mod version;

use tooltree_dispatch::{CliConfig, CommandSequence, ModuleRegistry};

pub use cd::cd_snippet;

pub const HELP_PATH: &str = "tooltree.standard.help";
pub const VERSION_PATH: &str = "tooltree.standard.version";
pub const CD_PATH: &str = "tooltree.standard.cd";
pub const CLI_INDEX_PATH: &str = "tooltree.standard.cli.index";
pub const CLI_SPEC_PATH: &str = "tooltree.standard.cli.spec";
pub const CLI_CONFIG_PATH: &str = "tooltree.standard.cli.config";
pub const CLI_THEME_PATH: &str = "tooltree.standard.cli.theme";

/// Registers every standard subcommand module.
pub fn register_modules(modules: &mut ModuleRegistry) {
    modules.register_factory(HELP_PATH, || Ok(help::command_spec()));
    modules.register_factory(VERSION_PATH, || Ok(version::command_spec()));
    modules.register_factory(CD_PATH, || Ok(cd::command_spec()));
    modules.register_factory(CLI_INDEX_PATH, || Ok(cli::index_spec()));
    modules.register_factory(CLI_SPEC_PATH, || Ok(cli::spec_spec()));
    modules.register_factory(CLI_CONFIG_PATH, || Ok(cli::config_spec()));
    modules.register_factory(CLI_THEME_PATH, || Ok(cli::theme_spec()));
}

/// The `(sequence, module path)` entries `config` enables.
pub fn standard_entries(config: &CliConfig) -> Vec<(CommandSequence, &'static str)> {
    let mut entries = Vec::new();
    if config.include_help_subcommand {
        entries.push((CommandSequence::from(["help"]), HELP_PATH));
    }
    if config.include_version_subcommand {
        entries.push((CommandSequence::from(["version"]), VERSION_PATH));
    }
    if config.include_cd_subcommand {
        entries.push((CommandSequence::from(["cd"]), CD_PATH));
    }
    if config.include_cli_subcommands {
        entries.push((CommandSequence::from(["cli", "index"]), CLI_INDEX_PATH));
        entries.push((CommandSequence::from(["cli", "spec"]), CLI_SPEC_PATH));
        entries.push((CommandSequence::from(["cli", "config"]), CLI_CONFIG_PATH));
        entries.push((CommandSequence::from(["cli", "theme"]), CLI_THEME_PATH));
    }
    entries
}
