//! One-shot event loops for async handlers, middleware and getters.
//!
//! The pipeline is synchronous. Whenever it meets async work, it builds a
//! fresh current-thread tokio runtime, drives the future to completion, and
//! drops the runtime before moving on. No future ever outlives the stage
//! that created it.

use std::future::Future;

use crate::error::CliError;

/// Runs `future` to completion on a new current-thread runtime.
///
/// Fails if called from inside another runtime (an async handler invoking
/// an async command synchronously), since tokio cannot nest runtimes on one
/// thread.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, CliError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(CliError::Invocation(
            "cannot drive async work from inside a running event loop".to_string(),
        ));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
