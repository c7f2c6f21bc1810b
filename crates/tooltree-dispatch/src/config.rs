//! CLI-wide configuration.
//!
//! [`CliConfig`] describes the whole CLI: naming, parse behavior, middleware,
//! which standard subcommands exist, and the extra data handlers can ask for.
//! It is assembled once through [`CliConfigBuilder`], whose `build()` merges
//! the recorded overrides onto the documented defaults, and is then shared
//! immutably (`Rc<CliConfig>`) by every stage of an invocation.
//!
//! # Defaults
//!
//! - `sort_command_index`: `true` (longest sequence wins)
//! - `parse_mode`: [`ParseMode::Strict`]
//! - no standard subcommands, no debug/help flags
//! - no middleware, no extra data
//!
//! ```rust
//! use tooltree_dispatch::{CliConfig, ParseMode};
//!
//! let config = CliConfig::builder()
//!     .base_command("mytool")
//!     .version("1.2.0")
//!     .include_debug_arg(true)
//!     .parse_mode(ParseMode::Intermixed)
//!     .build();
//!
//! assert!(config.sort_command_index);
//! assert_eq!(config.base_command(), "mytool");
//! ```

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dispatch::AsyncScope;
use crate::extra::ExtraDataGetter;
use crate::handler::ExtraValue;
use crate::hooks::Middleware;
use crate::resolve::ModuleRegistry;
use crate::sequence::CommandSequence;
use crate::spec::ArgSpec;

/// Placeholder shown when no base command is configured.
pub const DEFAULT_BASE_COMMAND: &str = "<base-command>";

/// How strictly the parser treats the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Unknown tokens are errors.
    #[default]
    Strict,
    /// Unknown tokens are ignored.
    Known,
    /// Positional values may be interleaved with options.
    Intermixed,
    /// Both of the above.
    KnownIntermixed,
}

impl ParseMode {
    pub fn ignores_unknown(self) -> bool {
        matches!(self, ParseMode::Known | ParseMode::KnownIntermixed)
    }

    pub fn allows_intermixed(self) -> bool {
        matches!(self, ParseMode::Intermixed | ParseMode::KnownIntermixed)
    }
}

/// Produces the directory a `cd` command should switch to.
pub type CdDirGetter = Rc<dyn Fn(&str) -> anyhow::Result<String>>;

/// Help styles, keyed by role (`title`, `description`, `option`, `metavar`, `comment`).
///
/// Values use `console`'s dotted style syntax, e.g. `"bold.cyan"`.
pub type StyleTheme = BTreeMap<String, String>;

/// Process-wide CLI configuration. Immutable once built.
#[derive(Clone)]
pub struct CliConfig {
    pub base_command: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub parse_mode: ParseMode,
    /// Arguments appended to every command's schema.
    pub common_args: Vec<ArgSpec>,
    pub default_command_sequence: Option<CommandSequence>,
    /// `(alias, target)` prefix aliases applied to the command index.
    pub command_sequence_aliases: Vec<(CommandSequence, CommandSequence)>,
    /// Try longer sequences first when matching.
    pub sort_command_index: bool,
    pub style_theme: StyleTheme,
    pub pre_middlewares: Vec<Middleware>,
    pub post_middlewares: Vec<Middleware>,
    pub include_help_subcommand: bool,
    pub include_version_subcommand: bool,
    pub include_cd_subcommand: bool,
    /// Hidden `cli ...` developer subcommands.
    pub include_cli_subcommands: bool,
    pub cd_dir_getter: Option<CdDirGetter>,
    pub cd_dir_help: BTreeMap<String, String>,
    pub include_debug_arg: bool,
    pub include_help_arg: bool,
    pub extra_data: IndexMap<String, ExtraValue>,
    pub extra_data_getters: IndexMap<String, ExtraDataGetter>,
    pub help_subcommand_categories: IndexMap<CommandSequence, String>,
    pub async_scope: Option<Rc<dyn AsyncScope>>,
    /// Modules that `CommandRef::Path` references resolve against.
    pub modules: ModuleRegistry,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_command: None,
            description: None,
            version: None,
            parse_mode: ParseMode::Strict,
            common_args: Vec::new(),
            default_command_sequence: None,
            command_sequence_aliases: Vec::new(),
            sort_command_index: true,
            style_theme: StyleTheme::new(),
            pre_middlewares: Vec::new(),
            post_middlewares: Vec::new(),
            include_help_subcommand: false,
            include_version_subcommand: false,
            include_cd_subcommand: false,
            include_cli_subcommands: false,
            cd_dir_getter: None,
            cd_dir_help: BTreeMap::new(),
            include_debug_arg: false,
            include_help_arg: false,
            extra_data: IndexMap::new(),
            extra_data_getters: IndexMap::new(),
            help_subcommand_categories: IndexMap::new(),
            async_scope: None,
            modules: ModuleRegistry::new(),
        }
    }
}

impl CliConfig {
    pub fn builder() -> CliConfigBuilder {
        CliConfigBuilder::default()
    }

    /// Base command name, or a placeholder.
    pub fn base_command(&self) -> &str {
        self.base_command.as_deref().unwrap_or(DEFAULT_BASE_COMMAND)
    }

    /// True if `key` is satisfiable by a static value or a getter.
    pub fn provides_extra_data(&self, key: &str) -> bool {
        self.extra_data.contains_key(key) || self.extra_data_getters.contains_key(key)
    }

    /// Rebuilds a builder from this config, to derive a modified copy.
    pub fn to_builder(&self) -> CliConfigBuilder {
        CliConfigBuilder {
            base: self.clone(),
        }
    }
}

impl fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConfig")
            .field("base_command", &self.base_command)
            .field("description", &self.description)
            .field("version", &self.version)
            .field("parse_mode", &self.parse_mode)
            .field("common_args", &self.common_args.len())
            .field("default_command_sequence", &self.default_command_sequence)
            .field("command_sequence_aliases", &self.command_sequence_aliases)
            .field("sort_command_index", &self.sort_command_index)
            .field("style_theme", &self.style_theme)
            .field("pre_middlewares", &self.pre_middlewares.len())
            .field("post_middlewares", &self.post_middlewares.len())
            .field("include_help_subcommand", &self.include_help_subcommand)
            .field("include_version_subcommand", &self.include_version_subcommand)
            .field("include_cd_subcommand", &self.include_cd_subcommand)
            .field("include_cli_subcommands", &self.include_cli_subcommands)
            .field("include_debug_arg", &self.include_debug_arg)
            .field("include_help_arg", &self.include_help_arg)
            .field("extra_data", &self.extra_data.keys().collect::<Vec<_>>())
            .field(
                "extra_data_getters",
                &self.extra_data_getters.keys().collect::<Vec<_>>(),
            )
            .field("async_scope", &self.async_scope.is_some())
            .field("modules", &self.modules)
            .finish()
    }
}

/// Records overrides; `build()` merges them onto the defaults.
#[derive(Clone, Default)]
pub struct CliConfigBuilder {
    base: CliConfig,
}

impl CliConfigBuilder {
    pub fn base_command(mut self, name: impl Into<String>) -> Self {
        self.base.base_command = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.base.description = Some(description.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.base.version = Some(version.into());
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.base.parse_mode = mode;
        self
    }

    pub fn common_arg(mut self, arg: ArgSpec) -> Self {
        self.base.common_args.push(arg);
        self
    }

    pub fn default_command_sequence(mut self, sequence: impl Into<CommandSequence>) -> Self {
        self.base.default_command_sequence = Some(sequence.into());
        self
    }

    pub fn command_sequence_alias(
        mut self,
        alias: impl Into<CommandSequence>,
        target: impl Into<CommandSequence>,
    ) -> Self {
        self.base
            .command_sequence_aliases
            .push((alias.into(), target.into()));
        self
    }

    pub fn sort_command_index(mut self, sort: bool) -> Self {
        self.base.sort_command_index = sort;
        self
    }

    pub fn style(mut self, role: impl Into<String>, style: impl Into<String>) -> Self {
        self.base.style_theme.insert(role.into(), style.into());
        self
    }

    pub fn pre_middleware(mut self, middleware: Middleware) -> Self {
        self.base.pre_middlewares.push(middleware);
        self
    }

    pub fn post_middleware(mut self, middleware: Middleware) -> Self {
        self.base.post_middlewares.push(middleware);
        self
    }

    pub fn include_help_subcommand(mut self, include: bool) -> Self {
        self.base.include_help_subcommand = include;
        self
    }

    pub fn include_version_subcommand(mut self, include: bool) -> Self {
        self.base.include_version_subcommand = include;
        self
    }

    pub fn include_cd_subcommand(mut self, include: bool) -> Self {
        self.base.include_cd_subcommand = include;
        self
    }

    pub fn include_cli_subcommands(mut self, include: bool) -> Self {
        self.base.include_cli_subcommands = include;
        self
    }

    /// Enables `help`, `version`, and the hidden `cli` subcommands plus the
    /// `--help` and `--debug` flags.
    pub fn standard_subcommands(self) -> Self {
        self.include_help_subcommand(true)
            .include_version_subcommand(true)
            .include_cli_subcommands(true)
            .include_help_arg(true)
            .include_debug_arg(true)
    }

    pub fn cd_dir_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + 'static,
    {
        self.base.cd_dir_getter = Some(Rc::new(getter));
        self
    }

    pub fn cd_dir_help(mut self, name: impl Into<String>, help: impl Into<String>) -> Self {
        self.base.cd_dir_help.insert(name.into(), help.into());
        self
    }

    pub fn include_debug_arg(mut self, include: bool) -> Self {
        self.base.include_debug_arg = include;
        self
    }

    pub fn include_help_arg(mut self, include: bool) -> Self {
        self.base.include_help_arg = include;
        self
    }

    /// Registers a static extra-data value.
    pub fn extra_data<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.base.extra_data.insert(key.into(), Rc::new(value));
        self
    }

    /// Registers an extra-data getter.
    pub fn extra_data_getter(mut self, key: impl Into<String>, getter: ExtraDataGetter) -> Self {
        self.base.extra_data_getters.insert(key.into(), getter);
        self
    }

    pub fn help_category(
        mut self,
        sequence: impl Into<CommandSequence>,
        category: impl Into<String>,
    ) -> Self {
        self.base
            .help_subcommand_categories
            .insert(sequence.into(), category.into());
        self
    }

    pub fn async_scope<S: AsyncScope + 'static>(mut self, scope: S) -> Self {
        self.base.async_scope = Some(Rc::new(scope));
        self
    }

    pub fn modules(mut self, modules: ModuleRegistry) -> Self {
        self.base.modules.extend(&modules);
        self
    }

    /// Gives mutable access to the module registry being built.
    pub fn modules_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.base.modules
    }

    /// Read access to the configuration as built so far.
    pub fn peek(&self) -> &CliConfig {
        &self.base
    }

    pub fn build(self) -> CliConfig {
        self.base
    }
}

/// Hidden `--debug` flag: enter the debugger when an error occurs.
pub fn debug_arg() -> ArgSpec {
    ArgSpec::new("--debug")
        .store_true()
        .help("enter debugger if an error occurs")
        .internal()
}

/// Hidden `--help` flag: print help for the matched command.
pub fn help_arg() -> ArgSpec {
    ArgSpec::with_names(["-h", "--help"])
        .store_true()
        .help("output help message")
        .internal()
}

/// Hidden argument the shell wrapper uses to receive the `cd` destination.
pub fn cd_arg() -> ArgSpec {
    ArgSpec::new("--new_dir_tempfile")
        .help("used internally by cd command to track destination dir")
        .internal()
}

/// Destination name of [`cd_arg`].
pub const CD_ARG_DEST: &str = "new_dir_tempfile";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::builder().build();
        assert!(config.sort_command_index);
        assert_eq!(config.parse_mode, ParseMode::Strict);
        assert_eq!(config.base_command(), DEFAULT_BASE_COMMAND);
        assert!(!config.include_help_subcommand);
        assert!(config.default_command_sequence.is_none());
    }

    #[test]
    fn test_overrides_merge_onto_defaults() {
        let config = CliConfig::builder()
            .base_command("tool")
            .sort_command_index(false)
            .build();
        assert_eq!(config.base_command(), "tool");
        assert!(!config.sort_command_index);
        assert_eq!(config.parse_mode, ParseMode::Strict);
    }

    #[test]
    fn test_standard_subcommands_shortcut() {
        let config = CliConfig::builder().standard_subcommands().build();
        assert!(config.include_help_subcommand);
        assert!(config.include_version_subcommand);
        assert!(config.include_cli_subcommands);
        assert!(config.include_debug_arg);
        assert!(config.include_help_arg);
        assert!(!config.include_cd_subcommand);
    }

    #[test]
    fn test_provides_extra_data() {
        let config = CliConfig::builder()
            .extra_data("token", String::from("abc"))
            .extra_data_getter("db", ExtraDataGetter::from_fn(|_| Ok(1u8)))
            .build();
        assert!(config.provides_extra_data("token"));
        assert!(config.provides_extra_data("db"));
        assert!(!config.provides_extra_data("cache"));
    }

    #[test]
    fn test_to_builder_derives_copy() {
        let original = CliConfig::builder().base_command("a").build();
        let derived = original.to_builder().version("2").build();
        assert_eq!(derived.base_command(), "a");
        assert_eq!(derived.version.as_deref(), Some("2"));
        assert!(original.version.is_none());
    }

    #[test]
    fn test_parse_mode_flags() {
        assert!(ParseMode::Known.ignores_unknown());
        assert!(!ParseMode::Known.allows_intermixed());
        assert!(ParseMode::KnownIntermixed.ignores_unknown());
        assert!(ParseMode::KnownIntermixed.allows_intermixed());
        assert!(!ParseMode::Strict.ignores_unknown());
    }

    #[test]
    fn test_standard_args_are_internal() {
        assert!(debug_arg().internal);
        assert!(help_arg().internal);
        assert_eq!(cd_arg().destination(), CD_ARG_DEST);
    }
}
