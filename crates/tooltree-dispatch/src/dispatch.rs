//! Command execution.
//!
//! [`execute`] runs one resolved command through its lifecycle:
//!
//! ```text
//! Idle → PreMiddleware → Invoking → PostMiddleware → Done
//!             │              │             │
//!             └──────────────┴─────────────┴──→ Failed
//! ```
//!
//! Reconciliation of the parsed arguments happens right before invoking, so
//! pre-middleware can run even when extra-data getters would fail.
//!
//! Sync handlers are called directly. Async handlers are driven on a
//! one-shot current-thread runtime, inside the config's [`AsyncScope`] when
//! one is set.

use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::context::ParseContext;
use crate::error::{CliError, MiddlewarePhase};
use crate::handler::Handler;
use crate::hooks::run_middlewares;
use crate::parser::ParsedArgs;
use crate::reconcile::reconcile;
use crate::runtime::block_on;

/// Scoped setup around async handlers (e.g. opening a connection pool).
///
/// `enter` runs on the handler's event loop before the handler; `exit` runs
/// after it, whether the handler succeeded or not.
pub trait AsyncScope {
    fn enter(&self) -> LocalBoxFuture<'_, anyhow::Result<()>>;

    fn exit(&self);
}

/// Runs middleware and the handler of `ctx.command_spec`.
pub fn execute(ctx: Rc<ParseContext>, parsed: ParsedArgs) -> Result<(), CliError> {
    let config = ctx.config.clone();
    run_middlewares(&config.pre_middlewares, MiddlewarePhase::Pre, &ctx, &parsed)?;

    let args = reconcile(&parsed, &ctx)?;
    match &ctx.command_spec.handler {
        Handler::Sync(handler) => {
            tracing::debug!(command = %ctx.sequence_text(), "invoking sync handler");
            handler(&args).map_err(CliError::Command)?;
        }
        Handler::Async(handler) => {
            tracing::debug!(command = %ctx.sequence_text(), "invoking async handler");
            let future = handler(args);
            let result = match &config.async_scope {
                Some(scope) => block_on(async {
                    let outcome = match scope.enter().await {
                        Ok(()) => future.await,
                        Err(err) => Err(err),
                    };
                    scope.exit();
                    outcome
                })?,
                None => block_on(future)?,
            };
            result.map_err(CliError::Command)?;
        }
    }

    run_middlewares(&config.post_middlewares, MiddlewarePhase::Post, &ctx, &parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use crate::hooks::Middleware;
    use crate::spec::{ArgSpec, CommandSpec};
    use futures::FutureExt;
    use serde_json::json;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn ctx(spec: CommandSpec, config: CliConfig) -> Rc<ParseContext> {
        Rc::new(ParseContext::new(Vec::new(), None, None, spec, Rc::new(config)))
    }

    fn record(log: &Log, entry: &str) -> Middleware {
        let log = log.clone();
        let entry = entry.to_string();
        Middleware::from_fn(move |_, _| {
            log.borrow_mut().push(entry.clone());
            Ok(())
        })
    }

    #[test]
    fn test_lifecycle_order() {
        let log: Log = Rc::default();
        let handler_log = log.clone();
        let spec = CommandSpec::new(Handler::from_fn(move |args| {
            handler_log
                .borrow_mut()
                .push(format!("handler {}", args.str("name").unwrap_or("?")));
            Ok(())
        }))
        .arg(ArgSpec::new("--name"));
        let config = CliConfig::builder()
            .pre_middleware(record(&log, "pre"))
            .post_middleware(record(&log, "post"))
            .build();

        let mut parsed = ParsedArgs::new();
        parsed.insert("name".into(), json!("x"));
        execute(ctx(spec, config), parsed).unwrap();

        assert_eq!(*log.borrow(), vec!["pre", "handler x", "post"]);
    }

    #[test]
    fn test_handler_error_skips_post_middleware() {
        let log: Log = Rc::default();
        let spec = CommandSpec::new(Handler::from_fn(|_| anyhow::bail!("boom")));
        let config = CliConfig::builder().post_middleware(record(&log, "post")).build();

        let err = execute(ctx(spec, config), ParsedArgs::new()).unwrap_err();
        assert!(err.is_command_failure());
        assert_eq!(err.message().as_deref(), Some("boom"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_pre_middleware_failure_skips_handler() {
        let called = Rc::new(RefCell::new(false));
        let flag = called.clone();
        let spec = CommandSpec::new(Handler::from_fn(move |_| {
            *flag.borrow_mut() = true;
            Ok(())
        }));
        let config = CliConfig::builder()
            .pre_middleware(Middleware::from_fn(|_, _| anyhow::bail!("not allowed")))
            .build();

        let err = execute(ctx(spec, config), ParsedArgs::new()).unwrap_err();
        assert!(matches!(err, CliError::Middleware { phase: MiddlewarePhase::Pre, .. }));
        assert!(!*called.borrow());
    }

    #[test]
    fn test_async_handler_is_awaited() {
        let done = Rc::new(RefCell::new(false));
        let flag = done.clone();
        let spec = CommandSpec::new(Handler::from_async_fn(move |_| {
            let flag = flag.clone();
            async move {
                tokio::task::yield_now().await;
                *flag.borrow_mut() = true;
                Ok(())
            }
        }));

        execute(ctx(spec, CliConfig::default()), ParsedArgs::new()).unwrap();
        assert!(*done.borrow());
    }

    struct RecordingScope(Log);

    impl AsyncScope for RecordingScope {
        fn enter(&self) -> LocalBoxFuture<'_, anyhow::Result<()>> {
            async move {
                self.0.borrow_mut().push("enter".into());
                Ok(())
            }
            .boxed_local()
        }

        fn exit(&self) {
            self.0.borrow_mut().push("exit".into());
        }
    }

    #[test]
    fn test_async_scope_wraps_handler() {
        let log: Log = Rc::default();
        let handler_log = log.clone();
        let spec = CommandSpec::new(Handler::from_async_fn(move |_| {
            let log = handler_log.clone();
            async move {
                log.borrow_mut().push("handler".into());
                Err::<(), _>(anyhow::anyhow!("failed inside scope"))
            }
        }));
        let config = CliConfig::builder()
            .async_scope(RecordingScope(log.clone()))
            .build();

        let err = execute(ctx(spec, config), ParsedArgs::new()).unwrap_err();
        assert!(err.is_command_failure());
        assert_eq!(*log.borrow(), vec!["enter", "handler", "exit"]);
    }
}
