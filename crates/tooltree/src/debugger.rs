//! Post-mortem debugging of failed invocations.
//!
//! When a run fails with `--debug`, the app walks its ordered list of
//! [`Debugger`] strategies and hands the failure to the first one that is
//! available. The default chain is:
//!
//! 1. [`InspectDebugger`]: an interactive inspector, only when stdin and
//!    stderr are terminals
//! 2. [`ReportDebugger`]: prints the full error chain, always available
//!
//! Applications can put their own strategies in front through
//! `AppBuilder::debugger`.

use std::error::Error;
use std::io::{self, BufRead, IsTerminal, Write};
use std::rc::Rc;
use tooltree_dispatch::CliError;

/// Banner printed when a debugger takes over.
pub const DEBUGGER_BANNER: &str = "[ENTERING DEBUGGER]";

/// A failed invocation, as handed to a debugger.
#[derive(Debug)]
pub struct Failure<'a> {
    pub error: &'a CliError,
    /// Tokens of the failed invocation.
    pub raw_command: &'a [String],
}

impl Failure<'_> {
    /// Messages of the error and its causes, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = Vec::new();
        match self.error {
            CliError::Command(err) => messages.extend(err.chain().map(ToString::to_string)),
            other => {
                let mut current: Option<&dyn Error> = Some(other);
                while let Some(err) = current {
                    messages.push(err.to_string());
                    current = err.source();
                }
            }
        }
        messages.dedup();
        messages
    }

    /// Pipeline stage the error came from.
    pub fn stage(&self) -> &'static str {
        match self.error {
            CliError::Resolution(_) => "resolution",
            CliError::NoMatch(_) => "matching",
            CliError::Parse(_) => "parsing",
            CliError::MissingArgument(_) | CliError::UnknownExtraData(_) => "reconciliation",
            CliError::ExtraData { .. } => "extra data",
            CliError::Middleware { .. } => "middleware",
            CliError::Command(_) => "command",
            CliError::Invocation(_) | CliError::Runtime(_) => "invocation",
        }
    }
}

/// One way of debugging a failure.
pub trait Debugger {
    fn name(&self) -> &'static str;

    /// Whether this strategy can run in the current environment.
    fn is_available(&self) -> bool;

    fn debug(&self, failure: &Failure<'_>, out: &mut dyn Write) -> io::Result<()>;
}

/// Hands `failure` to the first available debugger. Returns false if none was.
pub fn enter_debugger(
    debuggers: &[Rc<dyn Debugger>],
    failure: &Failure<'_>,
    out: &mut dyn Write,
) -> io::Result<bool> {
    for debugger in debuggers {
        if !debugger.is_available() {
            tracing::trace!(debugger = debugger.name(), "debugger unavailable");
            continue;
        }
        tracing::debug!(debugger = debugger.name(), "entering debugger");
        debugger.debug(failure, out)?;
        return Ok(true);
    }
    Ok(false)
}

/// The default strategy chain.
pub fn default_debuggers() -> Vec<Rc<dyn Debugger>> {
    vec![Rc::new(InspectDebugger), Rc::new(ReportDebugger)]
}

/// Prints the banner and the full error chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportDebugger;

impl Debugger for ReportDebugger {
    fn name(&self) -> &'static str {
        "report"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn debug(&self, failure: &Failure<'_>, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", DEBUGGER_BANNER)?;
        writeln!(out, "failed during {}", failure.stage())?;
        for (depth, message) in failure.chain().iter().enumerate() {
            if depth == 0 {
                writeln!(out, "error: {}", message)?;
            } else {
                writeln!(out, "caused by: {}", message)?;
            }
        }
        out.flush()
    }
}

/// A small interactive inspector read from stdin.
///
/// Commands: `chain`, `context`, `help`, `quit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InspectDebugger;

impl InspectDebugger {
    /// Runs an inspector session over `lines` until `quit` or end of input.
    pub fn session<I>(&self, failure: &Failure<'_>, lines: I, out: &mut dyn Write) -> io::Result<()>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        writeln!(out, "{}", DEBUGGER_BANNER)?;
        writeln!(out, "error: {}", failure.error)?;
        writeln!(out, "type 'help' for commands")?;

        let mut lines = lines.into_iter();
        loop {
            write!(out, "(debug) ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                writeln!(out)?;
                return Ok(());
            };
            match line?.trim() {
                "" => {}
                "chain" | "c" => {
                    for (depth, message) in failure.chain().iter().enumerate() {
                        writeln!(out, "  {}: {}", depth, message)?;
                    }
                }
                "context" | "ctx" => {
                    writeln!(out, "  command line: {}", failure.raw_command.join(" "))?;
                    writeln!(out, "  stage: {}", failure.stage())?;
                }
                "help" | "?" => {
                    writeln!(out, "  chain    show the error and its causes")?;
                    writeln!(out, "  context  show the failed command line")?;
                    writeln!(out, "  quit     leave the debugger")?;
                }
                "quit" | "q" | "exit" => return Ok(()),
                other => writeln!(out, "  unknown command: {}", other)?,
            }
        }
    }
}

impl Debugger for InspectDebugger {
    fn name(&self) -> &'static str {
        "inspect"
    }

    fn is_available(&self) -> bool {
        io::stdin().is_terminal() && console::Term::stderr().is_term()
    }

    fn debug(&self, failure: &Failure<'_>, out: &mut dyn Write) -> io::Result<()> {
        self.session(failure, io::stdin().lock().lines(), out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tooltree_dispatch::MiddlewarePhase;

    fn tokens() -> Vec<String> {
        vec!["deploy".to_string(), "--debug".to_string()]
    }

    #[test]
    fn test_chain_walks_command_causes() {
        let err = CliError::Command(anyhow::anyhow!("disk full").context("cannot save"));
        let tokens = tokens();
        let failure = Failure {
            error: &err,
            raw_command: &tokens,
        };
        assert_eq!(failure.chain(), vec!["cannot save", "disk full"]);
        assert_eq!(failure.stage(), "command");
    }

    #[test]
    fn test_chain_does_not_repeat_transparent_sources() {
        let err = CliError::Middleware {
            phase: MiddlewarePhase::Pre,
            source: anyhow::anyhow!("denied"),
        };
        let tokens = tokens();
        let failure = Failure {
            error: &err,
            raw_command: &tokens,
        };
        assert_eq!(failure.chain(), vec!["denied"]);
    }

    #[test]
    fn test_report_prints_banner_and_causes() {
        let err = CliError::Command(anyhow::anyhow!("root cause").context("outer"));
        let tokens = tokens();
        let mut out: Vec<u8> = Vec::new();
        ReportDebugger
            .debug(
                &Failure {
                    error: &err,
                    raw_command: &tokens,
                },
                &mut out,
            )
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "[ENTERING DEBUGGER]\nfailed during command\nerror: outer\ncaused by: root cause\n"
        );
    }

    #[test]
    fn test_inspector_session_commands() {
        let err = CliError::Command(anyhow::anyhow!("boom"));
        let tokens = tokens();
        let failure = Failure {
            error: &err,
            raw_command: &tokens,
        };
        let input = ["context", "bogus", "quit", "chain"]
            .into_iter()
            .map(|line| Ok(line.to_string()));
        let mut out: Vec<u8> = Vec::new();
        InspectDebugger.session(&failure, input, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("[ENTERING DEBUGGER]\nerror: boom\n"));
        assert!(text.contains("  command line: deploy --debug\n"));
        assert!(text.contains("  unknown command: bogus\n"));
        // session ended at quit
        assert!(!text.contains("  0: boom"));
    }

    struct Unavailable(Rc<RefCell<bool>>);

    impl Debugger for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        fn is_available(&self) -> bool {
            false
        }

        fn debug(&self, _: &Failure<'_>, _: &mut dyn Write) -> io::Result<()> {
            *self.0.borrow_mut() = true;
            Ok(())
        }
    }

    #[test]
    fn test_chain_falls_back_to_next_strategy() {
        let called = Rc::new(RefCell::new(false));
        let debuggers: Vec<Rc<dyn Debugger>> =
            vec![Rc::new(Unavailable(called.clone())), Rc::new(ReportDebugger)];
        let err = CliError::Invocation("bad".to_string());
        let tokens = tokens();
        let mut out: Vec<u8> = Vec::new();

        let handled = enter_debugger(
            &debuggers,
            &Failure {
                error: &err,
                raw_command: &tokens,
            },
            &mut out,
        )
        .unwrap();

        assert!(handled);
        assert!(!*called.borrow());
        assert!(String::from_utf8(out).unwrap().starts_with(DEBUGGER_BANNER));
    }

    #[test]
    fn test_empty_chain_handles_nothing() {
        let err = CliError::Invocation("bad".to_string());
        let tokens = tokens();
        let handled = enter_debugger(
            &[],
            &Failure {
                error: &err,
                raw_command: &tokens,
            },
            &mut Vec::<u8>::new(),
        )
        .unwrap();
        assert!(!handled);
    }
}
