//! Per-invocation parse context.
//!
//! A [`ParseContext`] is built once per invocation, after the command has
//! been matched and resolved, and is then shared read-only (`Rc`) with the
//! parser, middleware, dynamic help text, and handlers that ask for it via
//! the `context` extra-data key.

use std::fmt;
use std::rc::Rc;

use crate::config::CliConfig;
use crate::index::CommandIndex;
use crate::sequence::CommandSequence;
use crate::spec::CommandSpec;

#[derive(Clone)]
pub struct ParseContext {
    /// Tokens left after the command sequence was stripped.
    pub raw_command: Vec<String>,
    pub command_index: Option<Rc<CommandIndex>>,
    /// `None` when the invocation was given a spec directly.
    pub command_sequence: Option<CommandSequence>,
    pub command_spec: CommandSpec,
    pub config: Rc<CliConfig>,
}

impl ParseContext {
    pub fn new(
        raw_command: Vec<String>,
        command_index: Option<Rc<CommandIndex>>,
        command_sequence: Option<CommandSequence>,
        command_spec: CommandSpec,
        config: Rc<CliConfig>,
    ) -> Self {
        Self {
            raw_command,
            command_index,
            command_sequence,
            command_spec,
            config,
        }
    }

    /// A copy of this context bound to another command.
    pub fn rebind(&self, sequence: Option<CommandSequence>, spec: CommandSpec) -> Self {
        Self {
            raw_command: self.raw_command.clone(),
            command_index: self.command_index.clone(),
            command_sequence: sequence,
            command_spec: spec,
            config: self.config.clone(),
        }
    }

    /// The matched sequence as display text, empty for root or direct specs.
    pub fn sequence_text(&self) -> String {
        self.command_sequence
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// True if `sequence` is registered in the index.
    pub fn has_command(&self, sequence: &CommandSequence) -> bool {
        self.command_index
            .as_ref()
            .is_some_and(|index| index.contains(sequence))
    }
}

impl fmt::Debug for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseContext")
            .field("raw_command", &self.raw_command)
            .field(
                "command_index",
                &self.command_index.as_ref().map(|index| index.len()),
            )
            .field("command_sequence", &self.command_sequence)
            .field("command_spec", &self.command_spec)
            .field("base_command", &self.config.base_command())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;

    fn context() -> ParseContext {
        let mut index = CommandIndex::new();
        index.insert(["a"], CommandSpec::new(Handler::from_fn(|_| Ok(()))));
        ParseContext::new(
            vec!["--x".into()],
            Some(Rc::new(index)),
            Some(CommandSequence::from(["a"])),
            CommandSpec::new(Handler::from_fn(|_| Ok(()))).help("a"),
            Rc::new(CliConfig::default()),
        )
    }

    #[test]
    fn test_rebind_keeps_shared_state() {
        let ctx = context();
        let other = CommandSpec::new(Handler::from_fn(|_| Ok(()))).help("b");
        let rebound = ctx.rebind(Some(CommandSequence::from(["b"])), other.clone());

        assert_eq!(rebound.raw_command, ctx.raw_command);
        assert!(Rc::ptr_eq(&rebound.config, &ctx.config));
        assert_eq!(rebound.sequence_text(), "b");
        assert!(rebound.command_spec.handler.ptr_eq(&other.handler));
        assert_eq!(ctx.sequence_text(), "a");
    }

    #[test]
    fn test_has_command() {
        let ctx = context();
        assert!(ctx.has_command(&CommandSequence::from(["a"])));
        assert!(!ctx.has_command(&CommandSequence::from(["b"])));
    }
}
