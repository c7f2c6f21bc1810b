//! Middleware run around every command.
//!
//! Middleware are cross-cutting callables configured on the CLI (not per
//! command). They see the parse context and the parsed arguments, and run in
//! registration order:
//!
//! ```text
//! parsed args
//!   → PRE-MIDDLEWARE   ← (auth checks, validation, setup)
//!   → handler
//!   → POST-MIDDLEWARE  ← (cleanup, reporting)
//! ```
//!
//! A failing pre-middleware aborts the invocation before the handler runs.
//! Post-middleware only run after the handler succeeded.

use futures::future::{FutureExt, LocalBoxFuture};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use crate::context::ParseContext;
use crate::error::{CliError, MiddlewarePhase};
use crate::parser::ParsedArgs;
use crate::runtime::block_on;

pub type SyncMiddlewareFn = Rc<dyn Fn(&ParseContext, &ParsedArgs) -> anyhow::Result<()>>;
pub type AsyncMiddlewareFn =
    Rc<dyn Fn(Rc<ParseContext>, ParsedArgs) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

/// A pre or post middleware.
#[derive(Clone)]
pub enum Middleware {
    Sync(SyncMiddlewareFn),
    Async(AsyncMiddlewareFn),
}

impl Middleware {
    /// Wraps a synchronous middleware.
    ///
    /// ```rust
    /// use tooltree_dispatch::{CliConfig, Middleware};
    ///
    /// let config = CliConfig::builder()
    ///     .pre_middleware(Middleware::from_fn(|ctx, _args| {
    ///         if ctx.raw_command.iter().any(|t| t == "--forbidden") {
    ///             anyhow::bail!("forbidden");
    ///         }
    ///         Ok(())
    ///     }))
    ///     .build();
    /// assert_eq!(config.pre_middlewares.len(), 1);
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ParseContext, &ParsedArgs) -> anyhow::Result<()> + 'static,
    {
        Middleware::Sync(Rc::new(f))
    }

    /// Wraps an asynchronous middleware.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Rc<ParseContext>, ParsedArgs) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        Middleware::Async(Rc::new(move |ctx, args| f(ctx, args).boxed_local()))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Middleware::Async(_))
    }

    fn call(&self, ctx: &Rc<ParseContext>, args: &ParsedArgs) -> Result<anyhow::Result<()>, CliError> {
        match self {
            Middleware::Sync(f) => Ok(f(ctx.as_ref(), args)),
            Middleware::Async(f) => block_on(f(ctx.clone(), args.clone())),
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Middleware::Sync(_) => f.write_str("Middleware::Sync(..)"),
            Middleware::Async(_) => f.write_str("Middleware::Async(..)"),
        }
    }
}

/// Runs `middlewares` in order, stopping at the first failure.
pub fn run_middlewares(
    middlewares: &[Middleware],
    phase: MiddlewarePhase,
    ctx: &Rc<ParseContext>,
    args: &ParsedArgs,
) -> Result<(), CliError> {
    if !middlewares.is_empty() {
        tracing::debug!(%phase, count = middlewares.len(), "running middleware");
    }
    for middleware in middlewares {
        middleware
            .call(ctx, args)?
            .map_err(|source| CliError::Middleware { phase, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use crate::handler::Handler;
    use crate::spec::CommandSpec;
    use std::cell::RefCell;

    fn ctx() -> Rc<ParseContext> {
        Rc::new(ParseContext::new(
            vec!["--flag".into()],
            None,
            None,
            CommandSpec::new(Handler::from_fn(|_| Ok(()))),
            Rc::new(CliConfig::default()),
        ))
    }

    #[test]
    fn test_runs_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (log.clone(), log.clone());
        let middlewares = vec![
            Middleware::from_fn(move |_, _| {
                a.borrow_mut().push("first");
                Ok(())
            }),
            Middleware::from_async_fn(move |_, _| {
                let b = b.clone();
                async move {
                    b.borrow_mut().push("second");
                    Ok(())
                }
            }),
        ];

        run_middlewares(&middlewares, MiddlewarePhase::Pre, &ctx(), &ParsedArgs::new()).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_failure_stops_chain_and_records_phase() {
        let reached = Rc::new(RefCell::new(false));
        let flag = reached.clone();
        let middlewares = vec![
            Middleware::from_fn(|_, _| anyhow::bail!("denied")),
            Middleware::from_fn(move |_, _| {
                *flag.borrow_mut() = true;
                Ok(())
            }),
        ];

        let err = run_middlewares(&middlewares, MiddlewarePhase::Post, &ctx(), &ParsedArgs::new())
            .unwrap_err();
        match err {
            CliError::Middleware { phase, source } => {
                assert_eq!(phase, MiddlewarePhase::Post);
                assert_eq!(source.to_string(), "denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!*reached.borrow());
    }

    #[test]
    fn test_middleware_sees_context() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let middlewares = vec![Middleware::from_fn(move |ctx, _| {
            sink.borrow_mut().extend(ctx.raw_command.clone());
            Ok(())
        })];
        run_middlewares(&middlewares, MiddlewarePhase::Pre, &ctx(), &ParsedArgs::new()).unwrap();
        assert_eq!(*seen.borrow(), vec!["--flag".to_string()]);
    }
}
