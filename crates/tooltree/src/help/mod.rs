//! Help rendering for command indexes.
//!
//! Help is extracted into serializable data and rendered through a minijinja
//! template, styled with the config's style theme:
//!
//! - [`render_root_help`]: usage, description and every visible subcommand,
//!   grouped by help category when categories are configured
//! - [`render_prefix_help`]: the subcommands below a sequence prefix
//! - [`render_subcommand_help`]: usage and argument table of one command
//! - [`default_help_theme`]: the styles used for roles the config leaves unset

pub(crate) mod data;
mod render;

pub use render::{
    default_help_theme, render_prefix_help, render_root_help, render_subcommand_help, HelpConfig,
    HelpError,
};
