//! # Cross-platform OS signal listener.
//!
//! [`ShutdownSignals`] registers listeners for the recognised shutdown set and
//! yields each delivery as a [`ShutdownSignal`].
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGHUP` (terminal hangup)
//! - `SIGUSR2`
//!
//! **Windows platforms:**
//! - `Ctrl-C` reported as `SIGINT`
//! - `Ctrl-Break` reported as `SIGBREAK`
//!
//! Registering replaces the default disposition of these signals for the whole
//! process, so neither role is killed by them outright: the master turns them
//! into a pool shutdown, a worker only logs them and waits for the master's
//! directive.

use crate::signal::ShutdownSignal;

/// Registered listeners for the shutdown signal set.
#[cfg(unix)]
pub struct ShutdownSignals {
    int: tokio::signal::unix::Signal,
    term: tokio::signal::unix::Signal,
    hup: tokio::signal::unix::Signal,
    usr2: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Installs the listeners. Must be called from inside a tokio runtime.
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            int: signal(SignalKind::interrupt())?,
            term: signal(SignalKind::terminate())?,
            hup: signal(SignalKind::hangup())?,
            usr2: signal(SignalKind::user_defined2())?,
        })
    }

    /// Waits for the next signal; `None` if the listeners were torn down.
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        tokio::select! {
            s = self.int.recv() => s.map(|()| ShutdownSignal::Int),
            s = self.term.recv() => s.map(|()| ShutdownSignal::Term),
            s = self.hup.recv() => s.map(|()| ShutdownSignal::Hup),
            s = self.usr2.recv() => s.map(|()| ShutdownSignal::Usr2),
        }
    }
}

/// Registered listeners for the shutdown signal set.
#[cfg(windows)]
pub struct ShutdownSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
    ctrl_break: tokio::signal::windows::CtrlBreak,
}

#[cfg(windows)]
impl ShutdownSignals {
    /// Installs the listeners. Must be called from inside a tokio runtime.
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
            ctrl_break: tokio::signal::windows::ctrl_break()?,
        })
    }

    /// Waits for the next signal; `None` if the listeners were torn down.
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        tokio::select! {
            s = self.ctrl_c.recv() => s.map(|()| ShutdownSignal::Int),
            s = self.ctrl_break.recv() => s.map(|()| ShutdownSignal::Break),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_usr2_is_reported() {
        let mut signals = ShutdownSignals::register().unwrap();
        // SAFETY: a handler for SIGUSR2 is installed above.
        unsafe { libc::raise(libc::SIGUSR2) };
        assert_eq!(signals.recv().await, Some(ShutdownSignal::Usr2));
    }
}
