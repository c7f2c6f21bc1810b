//! Command handler types.
//!
//! Handlers hold the business logic of a command. They receive the final,
//! reconciled [`FunctionArgs`] and return `anyhow::Result<()>`, so `?` works
//! for error propagation. Output is produced as a side effect.
//!
//! # Sync vs Async
//!
//! Whether a handler is asynchronous is decided once, when it is registered:
//!
//! ```rust
//! use tooltree_dispatch::Handler;
//!
//! let sync = Handler::from_fn(|args| {
//!     println!("hello {}", args.get::<String>("name")?);
//!     Ok(())
//! });
//!
//! let async_handler = Handler::from_async_fn(|args| async move {
//!     println!("hello {}", args.get::<String>("name")?);
//!     Ok(())
//! });
//!
//! assert!(!sync.is_async());
//! assert!(async_handler.is_async());
//! ```
//!
//! Async handlers take their arguments by value because the returned future
//! must own everything it touches; the dispatcher drives it to completion
//! before moving on.
//!
//! # Injected values
//!
//! Besides parsed arguments, [`FunctionArgs`] carries the extra data a
//! command declared: values from the config, values computed by getters,
//! and the active [`ParseContext`] under the `context` key.

use futures::future::{FutureExt, LocalBoxFuture};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use crate::context::ParseContext;

/// A type-erased extra-data value.
pub type ExtraValue = Rc<dyn Any>;

/// Signature of synchronous handlers.
pub type SyncHandlerFn = Rc<dyn Fn(&FunctionArgs) -> anyhow::Result<()>>;

/// Signature of asynchronous handlers.
pub type AsyncHandlerFn = Rc<dyn Fn(FunctionArgs) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

/// A command body, tagged with how it must be invoked.
#[derive(Clone)]
pub enum Handler {
    Sync(SyncHandlerFn),
    Async(AsyncHandlerFn),
}

impl Handler {
    /// Wraps a synchronous closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&FunctionArgs) -> anyhow::Result<()> + 'static,
    {
        Handler::Sync(Rc::new(f))
    }

    /// Wraps a closure returning a future.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(FunctionArgs) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        Handler::Async(Rc::new(move |args| f(args).boxed_local()))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }

    /// Returns true if both handlers wrap the same function object.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        match (self, other) {
            (Handler::Sync(a), Handler::Sync(b)) => Rc::ptr_eq(a, b),
            (Handler::Async(a), Handler::Async(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync(..)"),
            Handler::Async(_) => f.write_str("Handler::Async(..)"),
        }
    }
}

/// The arguments a handler is invoked with.
///
/// Plain values come from the command line (or defaults); extra data and
/// the context come from the config and the pipeline.
#[derive(Clone, Default)]
pub struct FunctionArgs {
    values: Map<String, Value>,
    extra: HashMap<String, ExtraValue>,
    context: Option<Rc<ParseContext>>,
}

impl FunctionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn insert_extra(&mut self, key: impl Into<String>, value: ExtraValue) {
        self.extra.insert(key.into(), value);
    }

    pub fn set_context(&mut self, ctx: Rc<ParseContext>) {
        self.context = Some(ctx);
    }

    /// All plain values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Names of the injected extra-data values.
    pub fn extra_keys(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Raw JSON value of an argument.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserializes an argument into `T`.
    ///
    /// Fails if the argument is absent or has an incompatible shape. Use
    /// `Option<T>` as the target type for arguments that may be null.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("argument not found: {}", name))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("argument {} has unexpected type: {}", name, e))
    }

    /// Returns the argument as a string slice, if it is a string.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Returns a boolean flag; absent or non-boolean values read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Gets an injected extra-data value by key and type.
    pub fn extra<T: 'static>(&self, key: &str) -> anyhow::Result<&T> {
        let value = self
            .extra
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("extra data not injected: {}", key))?;
        value.downcast_ref::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "extra data {} is not of type {}",
                key,
                std::any::type_name::<T>()
            )
        })
    }

    /// Gets the shared handle of an injected extra-data value.
    pub fn extra_rc(&self, key: &str) -> Option<ExtraValue> {
        self.extra.get(key).cloned()
    }

    /// The active parse context, if the command declared `context`.
    pub fn context(&self) -> anyhow::Result<&Rc<ParseContext>> {
        self.context
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("parse context was not requested by this command"))
    }
}

impl fmt::Debug for FunctionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extra: Vec<&String> = self.extra.keys().collect();
        extra.sort();
        f.debug_struct("FunctionArgs")
            .field("values", &self.values)
            .field("extra", &extra)
            .field("context", &self.context.is_some())
            .finish()
    }
}

impl PartialEq for FunctionArgs {
    /// Compares plain values, extra-data keys, and context identity.
    fn eq(&self, other: &Self) -> bool {
        let same_context = match (&self.context, &other.context) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        let mut keys: Vec<&String> = self.extra.keys().collect();
        let mut other_keys: Vec<&String> = other.extra.keys().collect();
        keys.sort();
        other_keys.sort();
        self.values == other.values && keys == other_keys && same_context
    }
}
