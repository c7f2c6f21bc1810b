//! Plugins: bundles of commands contributed to a host CLI.
//!
//! A plugin carries its own command index (plus the modules its path
//! references resolve against), an optional help category for the commands
//! it adds, and the extra-data keys its commands need. The host registers it
//! during setup with [`add_plugin`]; the host's own commands always win.

use indexmap::IndexSet;

use crate::config::CliConfigBuilder;
use crate::error::SetupError;
use crate::index::CommandIndex;
use crate::resolve::ModuleRegistry;

#[derive(Debug, Clone, Default)]
pub struct Plugin {
    pub command_index: CommandIndex,
    pub modules: ModuleRegistry,
    /// Category the added commands are listed under in help.
    pub help_category: Option<String>,
    /// Keys the host must provide through static values or getters.
    pub required_extra_data: IndexSet<String>,
    /// Reject sequences the host already registered instead of skipping them.
    pub strict: bool,
}

impl Plugin {
    pub fn new(command_index: CommandIndex) -> Self {
        Self {
            command_index,
            ..Self::default()
        }
    }

    pub fn modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = modules;
        self
    }

    pub fn help_category(mut self, category: impl Into<String>) -> Self {
        self.help_category = Some(category.into());
        self
    }

    pub fn requires(mut self, key: impl Into<String>) -> Self {
        self.required_extra_data.insert(key.into());
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// Registers `plugin` into the host's index and config.
pub fn add_plugin(
    index: &mut CommandIndex,
    config: &mut CliConfigBuilder,
    plugin: Plugin,
) -> Result<(), SetupError> {
    for key in &plugin.required_extra_data {
        if !config.peek().provides_extra_data(key) {
            return Err(SetupError::MissingExtraData(key.clone()));
        }
    }

    let mut added = Vec::new();
    for (sequence, reference) in plugin.command_index.iter() {
        if index.contains(sequence) {
            if plugin.strict {
                return Err(SetupError::DuplicateCommand(sequence.clone()));
            }
            tracing::warn!(sequence = %sequence, "plugin command shadowed by existing command");
            continue;
        }
        added.push((sequence.clone(), reference.clone()));
    }

    config.modules_mut().extend(&plugin.modules);
    for (sequence, reference) in added {
        if let Some(category) = &plugin.help_category {
            *config = std::mem::take(config).help_category(sequence.clone(), category.clone());
        }
        index.insert(sequence, reference);
    }
    Ok(())
}
