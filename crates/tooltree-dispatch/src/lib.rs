//! Command resolution, argument parsing and dispatch for declarative,
//! hierarchical CLIs.
//!
//! `tooltree-dispatch` maps multi-word command sequences (`db migrate`,
//! `config get`) to lazily-resolved command specs, parses the remaining
//! tokens against each command's declarative argument schema, and invokes
//! the command's handler with exactly the arguments it declared.
//!
//! # Pipeline
//!
//! ```text
//! raw tokens
//!   → matcher      longest registered sequence wins
//!   → resolver     CommandRef → CommandSpec (inline, factory, module path)
//!   → parser       ArgSpec list compiled to clap, parsed, defaults filled
//!   → reconciler   declared args + extra data + context
//!   → dispatcher   pre-middleware → handler (sync or async) → post-middleware
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::rc::Rc;
//! use tooltree_dispatch::{run, ArgSpec, CliConfig, CommandIndex, CommandSpec, Handler, Invocation};
//!
//! let mut index = CommandIndex::new();
//! index.insert(
//!     ["greet"],
//!     CommandSpec::new(Handler::from_fn(|args| {
//!         println!("hello {}", args.get::<String>("name")?);
//!         Ok(())
//!     }))
//!     .arg(ArgSpec::new("name")),
//! );
//!
//! let config = Rc::new(CliConfig::builder().base_command("demo").build());
//! run(Invocation::new(config).raw("greet world").index(Rc::new(index))).unwrap();
//! ```
//!
//! The `tooltree` crate builds on this one with an `App` facade, standard
//! subcommands, help rendering and failure reporting.

mod config;
mod context;
mod dispatch;
mod error;
mod extra;
mod handler;
mod hooks;
mod index;
mod matcher;
mod parser;
mod pipeline;
mod plugin;
mod reconcile;
mod resolve;
mod runtime;
mod sequence;
mod spec;

pub use config::{
    cd_arg, debug_arg, help_arg, CdDirGetter, CliConfig, CliConfigBuilder, ParseMode, StyleTheme,
    CD_ARG_DEST, DEFAULT_BASE_COMMAND,
};
pub use context::ParseContext;
pub use dispatch::{execute, AsyncScope};
pub use error::{
    ArgumentParsingError, CliError, MiddlewarePhase, MissingArgumentError,
    NoMatchingCommandError, ResolutionError, SetupError, UnknownExtraDataError,
};
pub use extra::{AsyncGetterFn, ExtraDataGetter, GetterFn, GetterInputs, SyncGetterFn, CONTEXT_KEY};
pub use handler::{AsyncHandlerFn, ExtraValue, FunctionArgs, Handler, SyncHandlerFn};
pub use hooks::{run_middlewares, AsyncMiddlewareFn, Middleware, SyncMiddlewareFn};
pub use index::CommandIndex;
pub use matcher::{match_command_sequence, strip_command_sequence};
pub use parser::{effective_args, parse_raw_command, ParsedArgs};
pub use pipeline::{
    build_parse_context, execute_other_command_sequence, execute_other_command_spec, run,
    Invocation,
};
pub use plugin::{add_plugin, Plugin};
pub use reconcile::reconcile;
pub use resolve::{CommandFactory, CommandModule, CommandRef, ModuleLoader, ModuleRegistry, StaticModule};
pub use sequence::{is_flag_token, tokenize, CommandSequence, RawCommand};
pub use spec::{
    normalize_name, Action, ArgSpec, CommandSpec, HelpText, Nargs, SpecialParams, ValueType,
};
