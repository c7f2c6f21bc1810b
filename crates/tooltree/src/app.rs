//! The application facade.
//!
//! [`App`] owns a finished command index and config and decides what the
//! user sees when a run fails. It is assembled by [`AppBuilder`], which
//! merges user commands, plugins and the enabled standard subcommands:
//!
//! 1. user commands, in registration order
//! 2. plugins, skipping sequences already taken
//! 3. standard subcommands, skipping sequences already taken
//! 4. command-sequence aliases
//!
//! ```rust
//! use tooltree::{App, ArgSpec, CommandSpec, Handler, Output};
//!
//! let output = Output::buffer();
//! let app = App::builder()
//!     .configure(|config| config.base_command("demo").standard_subcommands())
//!     .command(
//!         ["greet"],
//!         CommandSpec::new(Handler::from_fn(|args| {
//!             println!("hello {}", args.get::<String>("name")?);
//!             Ok(())
//!         }))
//!         .arg(ArgSpec::new("name"))
//!         .help("say hello"),
//!     )?
//!     .output(output.clone())
//!     .build()?;
//!
//! app.try_run("help")?;
//! assert!(output.contents().contains("say hello"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::{self, Write};
use std::process::ExitCode;
use std::rc::Rc;
use tooltree_dispatch::{
    add_plugin, run, CliConfig, CliConfigBuilder, CliError, CommandIndex, CommandRef,
    CommandSequence, Invocation, Plugin, RawCommand, SetupError,
};

use crate::debugger::{default_debuggers, enter_debugger, Debugger, Failure};
use crate::output::{Output, OUTPUT_KEY};
use crate::report::{debug_requested, report_failure};
use crate::standard::{register_modules, standard_entries};

/// A ready-to-run CLI.
pub struct App {
    index: Rc<CommandIndex>,
    config: Rc<CliConfig>,
    output: Output,
    debuggers: Vec<Rc<dyn Debugger>>,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn index(&self) -> &CommandIndex {
        &self.index
    }

    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// The sink standard subcommands write to.
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// An invocation of this app's index and config.
    pub fn invocation(&self, raw: impl Into<RawCommand>) -> Invocation {
        Invocation::new(self.config.clone())
            .raw(raw)
            .index(self.index.clone())
    }

    /// Runs `raw` and returns any failure to the caller.
    pub fn try_run(&self, raw: impl Into<RawCommand>) -> Result<(), CliError> {
        run(self.invocation(raw))
    }

    /// Runs `raw`, reporting a failure to `err_out`. Returns the exit status.
    ///
    /// Without `--debug` a failure prints exactly one line. With it, the
    /// failure goes to the first available debugger instead.
    pub fn run_from(&self, raw: impl Into<RawCommand>, err_out: &mut dyn Write) -> u8 {
        let raw = raw.into();
        let tokens = raw.tokens();
        match self.try_run(raw) {
            Ok(()) => 0,
            Err(err) => {
                self.handle_failure(&err, &tokens, err_out);
                1
            }
        }
    }

    /// Runs the process arguments, reporting failures to stderr.
    pub fn run(&self) -> ExitCode {
        ExitCode::from(self.run_from(RawCommand::from_env(), &mut io::stderr()))
    }

    fn handle_failure(&self, err: &CliError, tokens: &[String], out: &mut dyn Write) {
        tracing::debug!(error = ?err, "invocation failed");
        if debug_requested(&self.config, tokens) {
            let failure = Failure {
                error: err,
                raw_command: tokens,
            };
            match enter_debugger(&self.debuggers, &failure, out) {
                Ok(true) => return,
                Ok(false) => tracing::warn!("no debugger available"),
                Err(io_err) => tracing::warn!(error = %io_err, "debugger failed"),
            }
        }
        if let Err(io_err) = report_failure(err, out) {
            tracing::warn!(error = %io_err, "cannot report failure");
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("index", &self.index.len())
            .field("config", &self.config)
            .field("output", &self.output)
            .field(
                "debuggers",
                &self.debuggers.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Assembles an [`App`].
#[derive(Default)]
pub struct AppBuilder {
    config: CliConfigBuilder,
    index: CommandIndex,
    plugins: Vec<Plugin>,
    output: Option<Output>,
    debuggers: Vec<Rc<dyn Debugger>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the config being built.
    pub fn config(mut self, config: CliConfigBuilder) -> Self {
        self.config = config;
        self
    }

    /// Adjusts the config being built.
    ///
    /// ```rust
    /// let app = tooltree::App::builder()
    ///     .configure(|c| c.base_command("tool").version("1.0.0"))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(app.config().version.as_deref(), Some("1.0.0"));
    /// ```
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(CliConfigBuilder) -> CliConfigBuilder,
    {
        self.config = configure(self.config);
        self
    }

    /// Registers a command. Registering a sequence twice is an error.
    pub fn command(
        mut self,
        sequence: impl Into<CommandSequence>,
        reference: impl Into<CommandRef>,
    ) -> Result<Self, SetupError> {
        let sequence = sequence.into();
        if !self.index.insert_if_absent(sequence.clone(), reference) {
            return Err(SetupError::DuplicateCommand(sequence));
        }
        Ok(self)
    }

    /// Registers every command of `index`.
    pub fn commands(mut self, index: CommandIndex) -> Result<Self, SetupError> {
        for (sequence, reference) in index.iter() {
            self = self.command(sequence.clone(), reference.clone())?;
        }
        Ok(self)
    }

    /// Adds a plugin; it is merged when the app is built.
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Sets the sink for standard subcommand output (stdout by default).
    pub fn output(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }

    /// Adds a debugger strategy, tried before the built-in ones.
    pub fn debugger<D: Debugger + 'static>(mut self, debugger: D) -> Self {
        self.debuggers.push(Rc::new(debugger));
        self
    }

    pub fn build(self) -> Result<App, SetupError> {
        let AppBuilder {
            mut config,
            mut index,
            plugins,
            output,
            mut debuggers,
        } = self;

        let output = output.unwrap_or_default();
        if !config.peek().provides_extra_data(OUTPUT_KEY) {
            config = config.extra_data(OUTPUT_KEY, output.clone());
        }

        for plugin in plugins {
            add_plugin(&mut index, &mut config, plugin)?;
        }

        register_modules(config.modules_mut());
        for (sequence, path) in standard_entries(config.peek()) {
            if !index.insert_if_absent(sequence.clone(), CommandRef::path(path)) {
                tracing::debug!(sequence = %sequence, "standard subcommand replaced by app command");
            }
        }

        let config = config.build();
        let index = index.with_aliases(&config.command_sequence_aliases);
        if let Some(default) = &config.default_command_sequence {
            if !index.contains(default) {
                return Err(SetupError::Config(format!(
                    "default command sequence is not registered: {}",
                    default
                )));
            }
        }

        debuggers.extend(default_debuggers());
        tracing::debug!(commands = index.len(), "app built");
        Ok(App {
            index: Rc::new(index),
            config: Rc::new(config),
            output,
            debuggers,
        })
    }
}
