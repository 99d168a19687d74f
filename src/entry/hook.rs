//! # Worker shutdown hook.
//!
//! Invoked at most once per worker lifetime, when the first graceful shutdown
//! directive arrives. Its result decides the worker's exit status:
//! `Ok` exits 0, `Err` (or a panic) exits 1.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::WorkerId;
use crate::entry::join_failure;
use crate::error::EntryError;
use crate::signal::ShutdownSignal;

/// Shared handle to a shutdown hook.
pub type HookRef = Arc<dyn ShutdownHook>;

/// # Cleanup run before a worker leaves gracefully.
#[async_trait]
pub trait ShutdownHook: Send + Sync + 'static {
    /// Performs cleanup; `signal` is the signal that started the pool shutdown.
    async fn shutdown(&self, id: WorkerId, signal: ShutdownSignal) -> Result<(), EntryError>;
}

/// Closure-backed [`ShutdownHook`].
pub struct HookFn<F> {
    f: F,
}

impl<F> HookFn<F> {
    /// Wraps an async closure.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(WorkerId, ShutdownSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EntryError>> + Send + 'static,
    {
        Self { f }
    }

    /// Wraps an async closure and returns it as a shared handle.
    ///
    /// ```rust
    /// use poolvisor::{EntryError, HookFn, HookRef, ShutdownSignal, WorkerId};
    ///
    /// let hook: HookRef = HookFn::arc(|id: WorkerId, signal: ShutdownSignal| async move {
    ///     println!("worker {id} closing on {signal}");
    ///     Ok::<_, EntryError>(())
    /// });
    /// # let _ = hook;
    /// ```
    pub fn arc<Fut>(f: F) -> Arc<Self>
    where
        F: Fn(WorkerId, ShutdownSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EntryError>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

impl HookFn<()> {
    /// Wraps a synchronous closure, executed on tokio's blocking pool.
    pub fn blocking<G>(g: G) -> HookRef
    where
        G: Fn(WorkerId, ShutdownSignal) -> Result<(), EntryError> + Send + Sync + 'static,
    {
        let g = Arc::new(g);
        HookFn::arc(move |id: WorkerId, signal: ShutdownSignal| {
            let g = Arc::clone(&g);
            async move {
                tokio::task::spawn_blocking(move || g(id, signal))
                    .await
                    .unwrap_or_else(|err| Err(join_failure(err)))
            }
        })
    }
}

#[async_trait]
impl<F, Fut> ShutdownHook for HookFn<F>
where
    F: Fn(WorkerId, ShutdownSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EntryError>> + Send + 'static,
{
    async fn shutdown(&self, id: WorkerId, signal: ShutdownSignal) -> Result<(), EntryError> {
        (self.f)(id, signal).await
    }
}
