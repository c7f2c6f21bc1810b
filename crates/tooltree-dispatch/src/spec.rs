//! Declarative command and argument specifications.
//!
//! A [`CommandSpec`] is the resolved description of one command: what to
//! call, which arguments it takes, how to describe it in help, and which
//! contextual values it needs injected. Each argument is an [`ArgSpec`].
//!
//! ```rust
//! use tooltree_dispatch::{ArgSpec, CommandSpec, Handler, Nargs};
//!
//! let spec = CommandSpec::new(Handler::from_fn(|args| {
//!     let files: Vec<String> = args.get("files")?;
//!     let count: i64 = args.get("count")?;
//!     println!("{} files, count {}", files.len(), count);
//!     Ok(())
//! }))
//! .help("process some files")
//! .arg(ArgSpec::new("files").nargs(Nargs::OneOrMore))
//! .arg(ArgSpec::with_names(["-c", "--count"]).int().default(0));
//! assert_eq!(spec.args.len(), 2);
//! ```

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

use crate::context::ParseContext;
use crate::handler::Handler;
use crate::sequence::is_flag_token;

/// What the parser does when it sees an argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Store the given value(s).
    #[default]
    Store,
    /// Boolean flag, `true` when present.
    StoreTrue,
    /// Boolean flag, `false` when present.
    StoreFalse,
    /// Repeatable option collecting every occurrence.
    Append,
    /// Counts occurrences (`-vvv`).
    Count,
    /// Flag storing the argument's const value when present.
    StoreConst,
    /// Flag appending the const value once per occurrence.
    AppendConst,
    /// Like `Append`, but every value of every occurrence lands in one flat list.
    Extend,
}

/// Number of values an argument consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Nargs {
    /// Exactly `n` values.
    Exactly(usize),
    /// Zero or one value (`?`).
    Optional,
    /// Any number of values (`*`).
    ZeroOrMore,
    /// At least one value (`+`).
    OneOrMore,
}

impl Nargs {
    /// True when the argument produces a list rather than a scalar.
    pub fn is_variadic(self) -> bool {
        match self {
            Nargs::Exactly(n) => n != 1,
            Nargs::Optional => false,
            Nargs::ZeroOrMore | Nargs::OneOrMore => true,
        }
    }
}

impl fmt::Display for Nargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nargs::Exactly(n) => write!(f, "{}", n),
            Nargs::Optional => write!(f, "?"),
            Nargs::ZeroOrMore => write!(f, "*"),
            Nargs::OneOrMore => write!(f, "+"),
        }
    }
}

/// Type coercion applied to argument values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    String,
    Int,
    Float,
    Bool,
    Path,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "str",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Path => "path",
        }
    }
}

/// Declares one command-line argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgSpec {
    /// One positional name, or one or more flag aliases (`-c`, `--count`).
    pub names: Vec<String>,
    pub action: Action,
    pub nargs: Option<Nargs>,
    pub default: Option<Value>,
    pub value_type: ValueType,
    pub choices: Option<Vec<String>>,
    pub required: Option<bool>,
    pub help: Option<String>,
    pub metavar: Option<String>,
    /// Destination name override.
    pub dest: Option<String>,
    /// Framework-injected argument: hidden from help and never required.
    pub internal: bool,
    /// Value stored by `StoreConst` and `AppendConst`.
    #[serde(rename = "const")]
    pub const_value: Option<Value>,
}

impl ArgSpec {
    /// Creates an argument with a single name (`"path"` or `"--verbose"`).
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_names([name.into()])
    }

    /// Creates an argument with several aliases (`["-v", "--verbose"]`).
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            action: Action::Store,
            nargs: None,
            default: None,
            value_type: ValueType::String,
            choices: None,
            required: None,
            help: None,
            metavar: None,
            dest: None,
            internal: false,
            const_value: None,
        }
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn store_true(self) -> Self {
        self.action(Action::StoreTrue)
    }

    pub fn store_false(self) -> Self {
        self.action(Action::StoreFalse)
    }

    pub fn append(self) -> Self {
        self.action(Action::Append)
    }

    pub fn count(self) -> Self {
        self.action(Action::Count)
    }

    pub fn store_const(mut self, value: impl Into<Value>) -> Self {
        self.const_value = Some(value.into());
        self.action(Action::StoreConst)
    }

    pub fn append_const(mut self, value: impl Into<Value>) -> Self {
        self.const_value = Some(value.into());
        self.action(Action::AppendConst)
    }

    pub fn extend(self) -> Self {
        self.action(Action::Extend)
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn int(self) -> Self {
        self.value_type(ValueType::Int)
    }

    pub fn float(self) -> Self {
        self.value_type(ValueType::Float)
    }

    pub fn path(self) -> Self {
        self.value_type(ValueType::Path)
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// True when every name is flag-like (`-x`, `--name`).
    pub fn is_flag_style(&self) -> bool {
        !self.names.is_empty() && self.names.iter().all(|n| is_flag_token(n))
    }

    /// True for a positional argument.
    pub fn is_positional(&self) -> bool {
        !self.is_flag_style()
    }

    /// True for `store_true` / `store_false` flags.
    pub fn is_boolean_flag(&self) -> bool {
        matches!(self.action, Action::StoreTrue | Action::StoreFalse)
    }

    /// True when occurrences carry values from the command line.
    pub fn takes_values(&self) -> bool {
        matches!(self.action, Action::Store | Action::Append | Action::Extend)
    }

    /// True when the argument collects a list of values.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self.action,
            Action::Append | Action::AppendConst | Action::Extend
        ) || self.nargs.is_some_and(Nargs::is_variadic)
    }

    /// The name the destination is derived from: the first `--long` name,
    /// else the first name.
    pub fn primary_name(&self) -> &str {
        self.names
            .iter()
            .find(|n| n.starts_with("--"))
            .or_else(|| self.names.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Key under which the parsed value is stored.
    pub fn destination(&self) -> String {
        match &self.dest {
            Some(dest) => dest.clone(),
            None => normalize_name(self.primary_name()),
        }
    }

    /// True if the argument may be absent from the command line.
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
            || !self.takes_values()
            || self.is_flag_style()
            || matches!(self.nargs, Some(Nargs::Optional | Nargs::ZeroOrMore))
    }

    /// Value used when an optional argument is absent.
    pub fn implicit_default(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match self.action {
            Action::StoreTrue => Value::Bool(false),
            Action::StoreFalse => Value::Bool(true),
            Action::Count => Value::from(0),
            Action::StoreConst => Value::Null,
            Action::Append | Action::AppendConst | Action::Extend => Value::Array(Vec::new()),
            Action::Store => match self.nargs {
                Some(Nargs::ZeroOrMore) => Value::Array(Vec::new()),
                _ => Value::Null,
            },
        }
    }
}

/// Strips leading dashes and turns `-` into `_` (`--dry-run` → `dry_run`).
pub fn normalize_name(name: &str) -> String {
    name.trim_start_matches('-').replace('-', "_")
}

/// Help for a command: fixed text, or computed from the active context.
#[derive(Clone)]
pub enum HelpText {
    Literal(String),
    Dynamic(Rc<dyn Fn(&ParseContext) -> String>),
}

impl HelpText {
    pub fn render(&self, ctx: &ParseContext) -> String {
        match self {
            HelpText::Literal(text) => text.clone(),
            HelpText::Dynamic(f) => f(ctx),
        }
    }
}

impl fmt::Debug for HelpText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelpText::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            HelpText::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Framework-level requirements of a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpecialParams {
    /// The command receives the cd tempfile argument (`new_dir_tempfile`).
    pub cd: bool,
}

/// The resolved, concrete description of one command.
#[derive(Clone)]
pub struct CommandSpec {
    pub handler: Handler,
    pub args: Vec<ArgSpec>,
    pub help: Option<HelpText>,
    /// Contextual values to inject (`"context"`, or keys of the config's extra data).
    pub extra_data: Vec<String>,
    pub hidden: bool,
    pub special: SpecialParams,
}

impl CommandSpec {
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            args: Vec::new(),
            help: None,
            extra_data: Vec::new(),
            hidden: false,
            special: SpecialParams::default(),
        }
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn args<I: IntoIterator<Item = ArgSpec>>(mut self, args: I) -> Self {
        self.args.extend(args);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(HelpText::Literal(help.into()));
        self
    }

    pub fn dynamic_help<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParseContext) -> String + 'static,
    {
        self.help = Some(HelpText::Dynamic(Rc::new(f)));
        self
    }

    pub fn extra_data(mut self, key: impl Into<String>) -> Self {
        self.extra_data.push(key.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn cd(mut self) -> Self {
        self.special.cd = true;
        self
    }

    /// Help text for this command, or an empty string.
    pub fn help_text(&self, ctx: &ParseContext) -> String {
        self.help.as_ref().map(|h| h.render(ctx)).unwrap_or_default()
    }

    /// Arguments shown to users (internal ones excluded).
    pub fn visible_args(&self) -> impl Iterator<Item = &ArgSpec> {
        self.args.iter().filter(|a| !a.internal)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("handler", &self.handler)
            .field("args", &self.args)
            .field("help", &self.help)
            .field("extra_data", &self.extra_data)
            .field("hidden", &self.hidden)
            .field("special", &self.special)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_destination_prefers_long_name() {
        let arg = ArgSpec::with_names(["-n", "--dry-run"]);
        assert_eq!(arg.primary_name(), "--dry-run");
        assert_eq!(arg.destination(), "dry_run");
    }

    #[test]
    fn test_destination_short_only() {
        assert_eq!(ArgSpec::new("-v").destination(), "v");
    }

    #[test]
    fn test_destination_override() {
        let arg = ArgSpec::new("--from").dest("source");
        assert_eq!(arg.destination(), "source");
    }

    #[test]
    fn test_positional_vs_flag_style() {
        assert!(ArgSpec::new("path").is_positional());
        assert!(ArgSpec::with_names(["-p", "--path"]).is_flag_style());
    }

    #[test]
    fn test_optionality() {
        assert!(!ArgSpec::new("path").is_optional());
        assert!(ArgSpec::new("path").default("x").is_optional());
        assert!(ArgSpec::new("path").nargs(Nargs::ZeroOrMore).is_optional());
        assert!(ArgSpec::new("--count").is_optional());
        assert!(!ArgSpec::new("path").nargs(Nargs::OneOrMore).is_optional());
    }

    #[test]
    fn test_implicit_defaults() {
        assert_eq!(ArgSpec::new("--count").default(0).implicit_default(), json!(0));
        assert_eq!(ArgSpec::new("--yes").store_true().implicit_default(), json!(false));
        assert_eq!(ArgSpec::new("--no-x").store_false().implicit_default(), json!(true));
        assert_eq!(ArgSpec::new("-v").count().implicit_default(), json!(0));
        assert_eq!(
            ArgSpec::new("items").nargs(Nargs::ZeroOrMore).implicit_default(),
            json!([])
        );
        assert_eq!(ArgSpec::new("--name").implicit_default(), Value::Null);
    }

    #[test]
    fn test_multi_valued() {
        assert!(ArgSpec::new("x").nargs(Nargs::Exactly(2)).is_multi_valued());
        assert!(!ArgSpec::new("x").nargs(Nargs::Exactly(1)).is_multi_valued());
        assert!(ArgSpec::new("--tag").append().is_multi_valued());
        assert!(!ArgSpec::new("--tag").nargs(Nargs::Optional).is_multi_valued());
        assert!(ArgSpec::new("--tag").extend().is_multi_valued());
        assert!(ArgSpec::new("--slow").append_const("slow").is_multi_valued());
    }

    #[test]
    fn test_const_actions() {
        let arg = ArgSpec::new("--fast").store_const(9);
        assert_eq!(arg.const_value, Some(json!(9)));
        assert!(arg.is_optional());
        assert!(!arg.takes_values());
        assert_eq!(arg.implicit_default(), Value::Null);
        assert_eq!(
            ArgSpec::new("--slow").append_const("slow").implicit_default(),
            json!([])
        );
        assert!(ArgSpec::new("--tag").extend().takes_values());
    }

    #[test]
    fn test_visible_args_skip_internal() {
        let spec = CommandSpec::new(Handler::from_fn(|_| Ok(())))
            .arg(ArgSpec::new("path"))
            .arg(ArgSpec::new("--secret").internal());
        let names: Vec<_> = spec.visible_args().map(|a| a.primary_name()).collect();
        assert_eq!(names, vec!["path"]);
    }
}
