//! User entry points executed inside a worker process.
//!
//! Both callables are normalised into one asynchronous contract returning
//! `Result<(), EntryError>`, whatever shape the user's function has:
//!
//! - [`RunEntry`] the worker's main body, receives its [`WorkerId`](crate::WorkerId)
//!   and a [`CancellationToken`](tokio_util::sync::CancellationToken) cancelled once
//!   the worker starts shutting down;
//! - [`ShutdownHook`] optional cleanup invoked at most once when a graceful
//!   shutdown directive arrives.
//!
//! [`RunFn`] and [`HookFn`] adapt closures: async closures directly, and
//! synchronous closures through their `blocking` constructors (executed on the
//! blocking thread pool so they never stall directive handling).

mod hook;
mod run;

pub use hook::{HookFn, HookRef, ShutdownHook};
pub use run::{RunEntry, RunFn, RunRef};

use tokio::task::JoinError;

use crate::error::{EntryError, panic_message};

/// Converts a join failure of an entry task into an [`EntryError`].
pub(crate) fn join_failure(err: JoinError) -> EntryError {
    if err.is_panic() {
        EntryError::Panicked {
            info: panic_message(&*err.into_panic()),
        }
    } else {
        EntryError::fail("entry task cancelled")
    }
}
