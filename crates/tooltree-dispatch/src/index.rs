//! The command index: every registered sequence and its command reference.
//!
//! Registration order is preserved. It does not affect which sequence wins
//! a match when length sorting is on, but it decides ties, the unsorted
//! matching order, and the order commands are listed in help.

use indexmap::IndexMap;

use crate::error::ResolutionError;
use crate::resolve::{CommandRef, ModuleRegistry};
use crate::sequence::CommandSequence;

/// Registry mapping command sequences to command references.
#[derive(Debug, Clone, Default)]
pub struct CommandIndex {
    entries: IndexMap<CommandSequence, CommandRef>,
}

impl CommandIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from the module tree under `root`.
    ///
    /// Every registered module `root.<a>.<b>.<name><postfix>` becomes the
    /// sequence `a b name`, referenced by its module path. The root itself is
    /// the empty sequence when it is registered and has a factory.
    ///
    /// ```rust
    /// use tooltree_dispatch::{CommandIndex, CommandSequence, CommandSpec, Handler, ModuleRegistry};
    ///
    /// let mut modules = ModuleRegistry::new();
    /// modules.register_factory("app.db.migrate_command", || {
    ///     Ok(CommandSpec::new(Handler::from_fn(|_| Ok(()))))
    /// });
    /// let index = CommandIndex::from_modules(&modules, "app", "_command")?;
    /// assert!(index.contains(&CommandSequence::from(["db", "migrate"])));
    /// # Ok::<(), tooltree_dispatch::ResolutionError>(())
    /// ```
    pub fn from_modules(
        modules: &ModuleRegistry,
        root: &str,
        postfix: &str,
    ) -> Result<Self, ResolutionError> {
        let mut index = CommandIndex::new();
        if modules.contains(root) && modules.load(root)?.factory().is_some() {
            index.insert(CommandSequence::default(), CommandRef::path(root));
        }

        let prefix = format!("{}.", root);
        for path in modules.paths() {
            let Some(relative) = path.strip_prefix(&prefix) else {
                continue;
            };
            let mut words: Vec<&str> = relative.split('.').collect();
            let name = match words.last().and_then(|last| last.strip_suffix(postfix)) {
                Some(name) if !name.is_empty() => name,
                _ => continue,
            };
            if let Some(last) = words.last_mut() {
                *last = name;
            }
            tracing::trace!(module = %path, "indexing command module");
            index.insert(CommandSequence::from(words.as_slice()), CommandRef::path(path));
        }
        Ok(index)
    }

    /// Registers a command, replacing any previous entry for the sequence.
    pub fn insert(
        &mut self,
        sequence: impl Into<CommandSequence>,
        reference: impl Into<CommandRef>,
    ) -> Option<CommandRef> {
        self.entries.insert(sequence.into(), reference.into())
    }

    /// Registers a command unless the sequence is taken. Returns true if inserted.
    pub fn insert_if_absent(
        &mut self,
        sequence: impl Into<CommandSequence>,
        reference: impl Into<CommandRef>,
    ) -> bool {
        let sequence = sequence.into();
        if self.entries.contains_key(&sequence) {
            return false;
        }
        self.entries.insert(sequence, reference.into());
        true
    }

    pub fn get(&self, sequence: &CommandSequence) -> Option<&CommandRef> {
        self.entries.get(sequence)
    }

    pub fn contains(&self, sequence: &CommandSequence) -> bool {
        self.entries.contains_key(sequence)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CommandSequence, &CommandRef)> {
        self.entries.iter()
    }

    pub fn sequences(&self) -> impl Iterator<Item = &CommandSequence> {
        self.entries.keys()
    }

    /// Entries strictly below `prefix` (`db` → `db migrate`, `db backup`).
    pub fn children_of<'a>(
        &'a self,
        prefix: &'a CommandSequence,
    ) -> impl Iterator<Item = (&'a CommandSequence, &'a CommandRef)> + 'a {
        self.entries
            .iter()
            .filter(move |(seq, _)| seq.len() > prefix.len() && seq.starts_with(prefix))
    }

    /// True if some registered sequence lies strictly below `prefix`.
    pub fn is_prefix(&self, prefix: &CommandSequence) -> bool {
        self.children_of(prefix).next().is_some()
    }

    /// Adds alias sequences: for each `(alias, target)`, every entry starting
    /// with `target` is also registered under `alias` followed by the rest of
    /// its words. Existing entries are never overwritten.
    pub fn with_aliases(mut self, aliases: &[(CommandSequence, CommandSequence)]) -> Self {
        let mut added = Vec::new();
        for (alias, target) in aliases {
            for (sequence, reference) in &self.entries {
                if sequence.starts_with(target) {
                    let aliased = alias.concat(&sequence.tail(target.len()));
                    added.push((aliased, reference.clone()));
                }
            }
        }
        for (sequence, reference) in added {
            if !self.entries.contains_key(&sequence) {
                tracing::trace!(alias = %sequence, "registering command alias");
                self.entries.insert(sequence, reference);
            }
        }
        self
    }
}

impl<S, R> FromIterator<(S, R)> for CommandIndex
where
    S: Into<CommandSequence>,
    R: Into<CommandRef>,
{
    fn from_iter<I: IntoIterator<Item = (S, R)>>(iter: I) -> Self {
        let mut index = CommandIndex::new();
        for (sequence, reference) in iter {
            index.insert(sequence, reference);
        }
        index
    }
}
