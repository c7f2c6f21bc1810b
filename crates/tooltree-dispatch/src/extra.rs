//! Extra data: contextual values handlers need beyond parsed arguments.
//!
//! A command lists the keys it needs in `CommandSpec::extra_data`. Each key
//! is satisfied, in order of precedence, by:
//!
//! 1. [`CONTEXT_KEY`]: the active `ParseContext` itself
//! 2. a static value registered in the config
//! 3. an [`ExtraDataGetter`] registered in the config, invoked lazily
//!
//! Getters are how expensive resources (a database handle, an API client)
//! are only created for the commands that actually use them.

use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use crate::error::CliError;
use crate::handler::ExtraValue;
use crate::runtime::block_on;

/// Extra-data key that injects the active parse context.
pub const CONTEXT_KEY: &str = "context";

/// Declared inputs passed to a getter on every call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetterInputs {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

pub type SyncGetterFn = Rc<dyn Fn(&GetterInputs) -> anyhow::Result<ExtraValue>>;
pub type AsyncGetterFn =
    Rc<dyn Fn(GetterInputs) -> LocalBoxFuture<'static, anyhow::Result<ExtraValue>>>;

#[derive(Clone)]
pub enum GetterFn {
    Sync(SyncGetterFn),
    Async(AsyncGetterFn),
}

/// A lazily-invoked producer of an extra-data value.
#[derive(Clone)]
pub struct ExtraDataGetter {
    function: GetterFn,
    inputs: GetterInputs,
}

impl ExtraDataGetter {
    /// Wraps a synchronous getter.
    pub fn from_fn<F, T>(f: F) -> Self
    where
        F: Fn(&GetterInputs) -> anyhow::Result<T> + 'static,
        T: 'static,
    {
        let function: SyncGetterFn =
            Rc::new(move |inputs| f(inputs).map(|value| Rc::new(value) as ExtraValue));
        Self {
            function: GetterFn::Sync(function),
            inputs: GetterInputs::default(),
        }
    }

    /// Wraps an asynchronous getter.
    pub fn from_async_fn<F, Fut, T>(f: F) -> Self
    where
        F: Fn(GetterInputs) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<T>> + 'static,
        T: 'static,
    {
        let function: AsyncGetterFn = Rc::new(move |inputs| {
            f(inputs)
                .map(|result| result.map(|value| Rc::new(value) as ExtraValue))
                .boxed_local()
        });
        Self {
            function: GetterFn::Async(function),
            inputs: GetterInputs::default(),
        }
    }

    /// Adds a positional input.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.inputs.args.push(value.into());
        self
    }

    /// Adds a keyword input.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.kwargs.insert(name.into(), value.into());
        self
    }

    pub fn inputs(&self) -> &GetterInputs {
        &self.inputs
    }

    pub fn is_async(&self) -> bool {
        matches!(self.function, GetterFn::Async(_))
    }

    /// Invokes the getter, driving async getters to completion.
    pub fn call(&self, key: &str) -> Result<ExtraValue, CliError> {
        tracing::debug!(key, is_async = self.is_async(), "invoking extra data getter");
        let result = match &self.function {
            GetterFn::Sync(f) => f(&self.inputs),
            GetterFn::Async(f) => block_on(f(self.inputs.clone()))?,
        };
        result.map_err(|source| CliError::ExtraData {
            key: key.to_string(),
            source,
        })
    }
}

impl fmt::Debug for ExtraDataGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraDataGetter")
            .field("async", &self.is_async())
            .field("inputs", &self.inputs)
            .finish()
    }
}
