//! Lazy command references.
//!
//! The command index does not hold command specs directly. It holds a
//! [`CommandRef`], which is only turned into a [`CommandSpec`] when the
//! command is actually needed: matched for execution, or listed in help.
//! Large CLIs can therefore register hundreds of commands without building
//! every one of them on startup.
//!
//! A reference is one of:
//!
//! - `Inline`: a spec value, returned as-is
//! - `Factory`: a zero-argument function building the spec
//! - `Path`: a dotted module path looked up in a [`ModuleRegistry`]
//! - `Module`: an already-loaded [`CommandModule`]
//!
//! Modules are how command definitions live apart from the index: a module
//! loader runs the first time its path is resolved, and the module it
//! returns may or may not expose a command factory.

use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

use crate::error::ResolutionError;
use crate::spec::CommandSpec;

/// A zero-argument function building a command spec.
pub type CommandFactory = Rc<dyn Fn() -> anyhow::Result<CommandSpec>>;

/// Loads a module on demand.
pub type ModuleLoader = Rc<dyn Fn() -> anyhow::Result<Rc<dyn CommandModule>>>;

/// A unit of command definitions.
pub trait CommandModule {
    /// Dotted path of the module, used in diagnostics.
    fn name(&self) -> &str;

    /// The module's command factory, if it has one.
    fn factory(&self) -> Option<CommandFactory>;
}

/// A module made from a name and an optional factory.
#[derive(Clone)]
pub struct StaticModule {
    name: String,
    factory: Option<CommandFactory>,
}

impl StaticModule {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<CommandSpec> + 'static,
    {
        Self {
            name: name.into(),
            factory: Some(Rc::new(factory)),
        }
    }

    /// A module without a command factory (e.g. a package grouping others).
    pub fn without_factory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factory: None,
        }
    }
}

impl CommandModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn factory(&self) -> Option<CommandFactory> {
        self.factory.clone()
    }
}

/// Dotted module paths mapped to their loaders.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    loaders: IndexMap<String, ModuleLoader>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a loader that runs when `path` is first resolved.
    pub fn register_loader<F>(&mut self, path: impl Into<String>, loader: F)
    where
        F: Fn() -> anyhow::Result<Rc<dyn CommandModule>> + 'static,
    {
        self.loaders.insert(path.into(), Rc::new(loader));
    }

    /// Registers an already-built module under `path`.
    pub fn register<M: CommandModule + 'static>(&mut self, path: impl Into<String>, module: M) {
        let module: Rc<dyn CommandModule> = Rc::new(module);
        let loader: ModuleLoader = Rc::new(move || Ok(module.clone()));
        self.loaders.insert(path.into(), loader);
    }

    /// Registers a module whose only content is a command factory.
    pub fn register_factory<F>(&mut self, path: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<CommandSpec> + 'static,
    {
        let path = path.into();
        let module = StaticModule::new(path.clone(), factory);
        self.register(path, module);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.loaders.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// Merges another registry in; entries of `other` win on conflict.
    pub fn extend(&mut self, other: &ModuleRegistry) {
        for (path, loader) in &other.loaders {
            self.loaders.insert(path.clone(), loader.clone());
        }
    }

    /// Loads the module registered under `path`.
    pub fn load(&self, path: &str) -> Result<Rc<dyn CommandModule>, ResolutionError> {
        let loader = self
            .loaders
            .get(path)
            .ok_or_else(|| ResolutionError::UnknownModule {
                path: path.to_string(),
            })?;
        loader().map_err(|source| ResolutionError::LoadFailed {
            reference: path.to_string(),
            source,
        })
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.loaders.keys()).finish()
    }
}

/// A reference to a command spec, resolved on demand.
#[derive(Clone)]
pub enum CommandRef {
    Inline(CommandSpec),
    Path(String),
    Module(Rc<dyn CommandModule>),
    Factory(CommandFactory),
}

impl CommandRef {
    pub fn path(path: impl Into<String>) -> Self {
        CommandRef::Path(path.into())
    }

    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<CommandSpec> + 'static,
    {
        CommandRef::Factory(Rc::new(f))
    }

    pub fn module<M: CommandModule + 'static>(module: M) -> Self {
        CommandRef::Module(Rc::new(module))
    }

    /// Short description used in diagnostics and `cli index` output.
    pub fn describe(&self) -> String {
        match self {
            CommandRef::Inline(_) => "<inline spec>".to_string(),
            CommandRef::Path(path) => path.clone(),
            CommandRef::Module(module) => format!("<module {}>", module.name()),
            CommandRef::Factory(_) => "<factory>".to_string(),
        }
    }

    /// Turns the reference into a concrete command spec.
    ///
    /// Resolution has no side effects beyond those of loading a module or
    /// running a factory, and may be repeated.
    pub fn resolve(&self, modules: &ModuleRegistry) -> Result<CommandSpec, ResolutionError> {
        tracing::trace!(reference = %self.describe(), "resolving command reference");
        match self {
            CommandRef::Inline(spec) => Ok(spec.clone()),
            CommandRef::Factory(factory) => {
                factory().map_err(|source| ResolutionError::FactoryFailed {
                    reference: self.describe(),
                    source,
                })
            }
            CommandRef::Path(path) => {
                let module = modules.load(path)?;
                invoke_module_factory(module.as_ref())
            }
            CommandRef::Module(module) => invoke_module_factory(module.as_ref()),
        }
    }
}

fn invoke_module_factory(module: &dyn CommandModule) -> Result<CommandSpec, ResolutionError> {
    let factory = module
        .factory()
        .ok_or_else(|| ResolutionError::NoFactory {
            module: module.name().to_string(),
        })?;
    factory().map_err(|source| ResolutionError::FactoryFailed {
        reference: module.name().to_string(),
        source,
    })
}

impl From<CommandSpec> for CommandRef {
    fn from(spec: CommandSpec) -> Self {
        CommandRef::Inline(spec)
    }
}

impl fmt::Debug for CommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandRef({})", self.describe())
    }
}
