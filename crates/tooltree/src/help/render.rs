//! Help rendering functions.

use console::Style;
use minijinja::{Environment, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tooltree_dispatch::{CommandSequence, ParseContext, StyleTheme};

use super::data::{extract_prefix_help, extract_root_help, extract_subcommand_help, HelpData};

const TEMPLATE: &str = include_str!("template.txt");

/// Errors that can occur while rendering help.
#[derive(Debug, Error)]
pub enum HelpError {
    #[error("help template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Options for one help rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelpConfig {
    /// List hidden commands too.
    pub show_hidden: bool,
    /// Emit ANSI styles from the theme.
    pub styled: bool,
}

/// Returns the default theme for help rendering.
///
/// Roles set in the config's style theme override these.
pub fn default_help_theme() -> StyleTheme {
    [
        ("title", "bold"),
        ("description", ""),
        ("option", "cyan"),
        ("metavar", "dim"),
        ("comment", "dim.italic"),
    ]
    .into_iter()
    .map(|(role, style)| (role.to_string(), style.to_string()))
    .collect()
}

/// Renders help for the root command, listing all subcommands.
pub fn render_root_help(ctx: &ParseContext, config: HelpConfig) -> Result<String, HelpError> {
    let data = extract_root_help(ctx, config.show_hidden);
    render_data(&data, &ctx.config.style_theme, config.styled)
}

/// Renders help listing the commands registered below `prefix`.
pub fn render_prefix_help(
    ctx: &ParseContext,
    prefix: &CommandSequence,
    config: HelpConfig,
) -> Result<String, HelpError> {
    let data = extract_prefix_help(ctx, prefix, config.show_hidden);
    render_data(&data, &ctx.config.style_theme, config.styled)
}

/// Renders help for the command `ctx` is bound to.
pub fn render_subcommand_help(ctx: &ParseContext, config: HelpConfig) -> Result<String, HelpError> {
    let data = extract_subcommand_help(ctx);
    render_data(&data, &ctx.config.style_theme, config.styled)
}

fn render_data(data: &HelpData, theme: &StyleTheme, styled: bool) -> Result<String, HelpError> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    register_style_filter(&mut env, theme, styled);
    env.add_template("help", TEMPLATE)?;
    let rendered = env.get_template("help")?.render(data)?;
    Ok(tidy(&rendered))
}

/// `{{ text | style("role") }}` applies the role's style, or nothing when unstyled.
fn register_style_filter(env: &mut Environment<'static>, theme: &StyleTheme, styled: bool) {
    let styles: BTreeMap<String, Style> = if styled {
        let mut merged = default_help_theme();
        merged.extend(theme.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
            .into_iter()
            .map(|(role, spec)| (role, Style::from_dotted_str(&spec).force_styling(true)))
            .collect()
    } else {
        BTreeMap::new()
    };

    env.add_filter("style", move |value: Value, role: String| -> String {
        let text = value.to_string();
        match styles.get(&role) {
            Some(style) if !text.is_empty() => style.apply_to(text).to_string(),
            _ => text,
        }
    });
}

/// Drops trailing whitespace from each line and ends with exactly one newline.
fn tidy(rendered: &str) -> String {
    let mut out = rendered
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let len = out.trim_end().len();
    out.truncate(len);
    out.push('\n');
    out
}
