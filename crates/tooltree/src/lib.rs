//! # tooltree - declarative hierarchical CLIs
//!
//! tooltree builds command-line tools from a map of multi-word command
//! sequences to declarative command specs. Matching, argument parsing and
//! dispatch live in [`tooltree_dispatch`] (re-exported here); this crate adds
//! what an application needs on top:
//!
//! - [`App`] / [`AppBuilder`]: one place to register commands and plugins
//! - standard subcommands: `help`, `version`, `cd` and hidden `cli ...`
//!   developer commands ([`standard`])
//! - styled help rendered from minijinja templates ([`help`])
//! - failure handling: one-line reports, or a debugger with `--debug`
//!   ([`report`], [`debugger`])
//! - logging setup for binaries ([`logging`])
//!
//! ## Quick start
//!
//! ```rust
//! use tooltree::{App, ArgSpec, CommandSpec, Handler};
//!
//! let app = App::builder()
//!     .configure(|c| c.base_command("notes").version("0.1.0").standard_subcommands())
//!     .command(
//!         ["note", "add"],
//!         CommandSpec::new(Handler::from_fn(|args| {
//!             let text: String = args.get("text")?;
//!             assert_eq!(text, "hello");
//!             Ok(())
//!         }))
//!         .help("add a note")
//!         .arg(ArgSpec::new("text")),
//!     )?
//!     .build()?;
//!
//! app.try_run("note add hello")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Binaries usually end `main` with `app.run()`, which reads the process
//! arguments and turns failures into a one-line message and exit status 1.

mod app;
pub mod debugger;
pub mod help;
pub mod logging;
mod output;
pub mod report;
pub mod standard;

pub use app::{App, AppBuilder};
pub use output::{Output, OUTPUT_KEY};

pub use tooltree_dispatch;
pub use tooltree_dispatch::{
    add_plugin, execute_other_command_sequence, execute_other_command_spec, run, Action, ArgSpec,
    ArgumentParsingError, AsyncScope, CliConfig, CliConfigBuilder, CliError, CommandIndex,
    CommandModule, CommandRef, CommandSequence, CommandSpec, ExtraDataGetter, FunctionArgs,
    Handler, HelpText, Invocation, Middleware, MiddlewarePhase, ModuleRegistry, Nargs,
    NoMatchingCommandError, ParseContext, ParseMode, ParsedArgs, Plugin, RawCommand, SetupError,
    StaticModule, ValueType, CONTEXT_KEY,
};
