//! # Worker run entry.
//!
//! [`RunEntry`] is what every worker process executes after it reports online.
//! The common handle type is [`RunRef`], an `Arc<dyn RunEntry>` that the pool
//! configuration and the worker runtime share.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use poolvisor::{EntryError, RunFn, RunRef, WorkerId};
//! use tokio_util::sync::CancellationToken;
//!
//! let run: RunRef = RunFn::arc(|id: WorkerId, ctx: CancellationToken| async move {
//!     while !ctx.is_cancelled() {
//!         tokio::time::sleep(Duration::from_millis(100)).await;
//!     }
//!     println!("worker {id} done");
//!     Ok::<_, EntryError>(())
//! });
//! # let _ = run;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::WorkerId;
use crate::entry::join_failure;
use crate::error::EntryError;

/// Shared handle to a run entry.
pub type RunRef = Arc<dyn RunEntry>;

/// # Main body of a worker.
///
/// `ctx` is cancelled when the worker accepts a shutdown directive or is forced
/// down; long-running loops should watch it and wind down.
#[async_trait]
pub trait RunEntry: Send + Sync + 'static {
    /// Runs the worker's work.
    async fn run(&self, id: WorkerId, ctx: CancellationToken) -> Result<(), EntryError>;
}

/// Closure-backed [`RunEntry`].
///
/// Wraps `F: Fn(WorkerId, CancellationToken) -> Fut`; a fresh future is created
/// per invocation.
pub struct RunFn<F> {
    f: F,
}

impl<F> RunFn<F> {
    /// Wraps an async closure.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(WorkerId, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EntryError>> + Send + 'static,
    {
        Self { f }
    }

    /// Wraps an async closure and returns it as a shared handle.
    pub fn arc<Fut>(f: F) -> Arc<Self>
    where
        F: Fn(WorkerId, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EntryError>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

impl RunFn<()> {
    /// Wraps a synchronous closure.
    ///
    /// The closure runs on tokio's blocking pool. A panic inside it becomes
    /// [`EntryError::Panicked`].
    pub fn blocking<G>(g: G) -> RunRef
    where
        G: Fn(WorkerId, CancellationToken) -> Result<(), EntryError> + Send + Sync + 'static,
    {
        let g = Arc::new(g);
        RunFn::arc(move |id: WorkerId, ctx: CancellationToken| {
            let g = Arc::clone(&g);
            async move {
                tokio::task::spawn_blocking(move || g(id, ctx))
                    .await
                    .unwrap_or_else(|err| Err(join_failure(err)))
            }
        })
    }
}

#[async_trait]
impl<F, Fut> RunEntry for RunFn<F>
where
    F: Fn(WorkerId, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EntryError>> + Send + 'static,
{
    async fn run(&self, id: WorkerId, ctx: CancellationToken) -> Result<(), EntryError> {
        (self.f)(id, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_closure_receives_identity() {
        let run: RunRef = RunFn::arc(|id: WorkerId, _ctx: CancellationToken| async move {
            if id.get() == 7 {
                Ok(())
            } else {
                Err(EntryError::fail("wrong id"))
            }
        });
        assert!(run.run(WorkerId::new(7), CancellationToken::new()).await.is_ok());
        assert!(run.run(WorkerId::new(8), CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_blocking_closure_is_normalised() {
        let run: RunRef = RunFn::blocking(|_id, ctx: CancellationToken| {
            if ctx.is_cancelled() {
                Ok(())
            } else {
                Err("not cancelled".into())
            }
        });

        let token = CancellationToken::new();
        token.cancel();
        assert!(run.run(WorkerId::new(1), token).await.is_ok());

        let err = run
            .run(WorkerId::new(1), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "entry_failed");
    }

    #[tokio::test]
    async fn test_blocking_panic_becomes_entry_error() {
        let run: RunRef = RunFn::blocking(|_id, _ctx| -> Result<(), EntryError> {
            panic!("kaboom");
        });
        let err = run
            .run(WorkerId::new(1), CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            EntryError::Panicked { info } => assert_eq!(info, "kaboom"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
