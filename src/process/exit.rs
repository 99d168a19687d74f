//! How a worker process terminated, as seen by the master.

use std::fmt;
use std::process::ExitStatus;

/// Termination of a worker process.
///
/// The master treats every termination the same way (the exit observer runs
/// regardless of cause); this only feeds events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exited normally with the given status code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
    /// Status could not be determined.
    Unknown,
}

impl WorkerExit {
    /// Clean exit with status 0.
    pub fn is_success(&self) -> bool {
        matches!(self, WorkerExit::Exited(0))
    }

    /// Exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        match self {
            WorkerExit::Exited(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return WorkerExit::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return WorkerExit::Signaled(sig);
            }
        }
        WorkerExit::Unknown
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Exited(code) => write!(f, "exit code {code}"),
            WorkerExit::Signaled(sig) => write!(f, "killed by signal {sig}"),
            WorkerExit::Unknown => f.write_str("unknown status"),
        }
    }
}
