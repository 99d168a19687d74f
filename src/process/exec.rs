//! # Re-exec spawner.
//!
//! Each worker is a fresh instance of the current executable with the same
//! arguments. The child learns its role from [`WORKER_ID_ENV`] and finds its
//! control socket on fd 3 ([`CONTROL_FD_ENV`]).
//!
//! Per worker the master runs two tasks:
//! - a **writer** draining the link's queue into the socket (so `send` never blocks);
//! - a **watcher** reading `online` reports and waiting for the process, which
//!   posts `exited` exactly once.

use std::ffi::OsString;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{CONTROL_FD_ENV, Notifier, Spawn, WORKER_ID_ENV, WorkerExit, WorkerLink};
use crate::core::WorkerId;
use crate::error::ChannelError;
use crate::protocol::{Directive, Report};

/// File descriptor the control socket occupies in the worker.
pub(crate) const CONTROL_FD: RawFd = 3;

/// Forks workers by re-executing a program (by default the current one).
#[derive(Debug, Clone)]
pub struct ExecSpawner {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExecSpawner {
    /// Re-executes the current binary with the current arguments.
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: std::env::args_os().skip(1).collect(),
        })
    }

    /// Executes `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument passed to every worker.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl Spawn for ExecSpawner {
    fn spawn(&mut self, id: WorkerId, notifier: Notifier) -> io::Result<Box<dyn WorkerLink>> {
        let (parent, child_end) = std::os::unix::net::UnixStream::pair()?;
        let child_fd = child_end.as_raw_fd();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(WORKER_ID_ENV, id.to_string())
            .env(CONTROL_FD_ENV, CONTROL_FD.to_string())
            .stdin(Stdio::null());

        // SAFETY: only async-signal-safe libc calls between fork and exec.
        unsafe {
            cmd.pre_exec(move || install_control_fd(child_fd));
        }

        let child = cmd.spawn()?;
        drop(child_end);
        let pid = child.id();

        parent.set_nonblocking(true)?;
        let (read, write) = tokio::net::UnixStream::from_std(parent)?.into_split();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(write_directives(id, write, rx));
        tokio::spawn(watch_worker(id, read, child, notifier));

        Ok(Box::new(ExecLink { tx, pid }))
    }
}

/// Places the socket on fd 3 without close-on-exec.
fn install_control_fd(fd: RawFd) -> io::Result<()> {
    if fd == CONTROL_FD {
        // dup2 onto itself keeps FD_CLOEXEC, clear it by hand.
        // SAFETY: fcntl on a descriptor this process owns; failures come back as -1.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        // SAFETY: as above.
        if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) } < 0 {
            return Err(io::Error::last_os_error());
        }
        return Ok(());
    }
    // SAFETY: `fd` is the child's end of the socket pair; dup2 replaces whatever
    // occupies fd 3 and the copy starts without FD_CLOEXEC.
    if unsafe { libc::dup2(fd, CONTROL_FD) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

struct ExecLink {
    tx: mpsc::UnboundedSender<String>,
    pid: Option<u32>,
}

impl WorkerLink for ExecLink {
    fn send(&self, directive: &Directive) -> Result<(), ChannelError> {
        let line = directive.to_line()?;
        self.tx.send(line).map_err(|_| ChannelError::Closed)
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

async fn write_directives(
    id: WorkerId,
    mut write: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = rx.recv().await {
        if let Err(err) = write.write_all(line.as_bytes()).await {
            debug!(worker = id.get(), error = %err, "control write failed");
            break;
        }
    }
}

async fn watch_worker(id: WorkerId, read: OwnedReadHalf, mut child: Child, notifier: Notifier) {
    let mut lines = BufReader::new(read).lines();
    let mut reading = true;

    let status = loop {
        tokio::select! {
            biased;
            line = lines.next_line(), if reading => match line {
                Ok(Some(line)) => match Report::from_line(&line) {
                    Ok(Report::Online) => notifier.online(id),
                    Ok(Report::Unknown) => debug!(worker = id.get(), "ignoring unknown report"),
                    Err(err) => warn!(worker = id.get(), error = %err, "malformed report"),
                },
                Ok(None) | Err(_) => reading = false,
            },
            status = child.wait() => break status,
        }
    };

    let exit = match status {
        Ok(status) => WorkerExit::from(status),
        Err(err) => {
            warn!(worker = id.get(), error = %err, "failed to wait for worker");
            WorkerExit::Unknown
        }
    };
    notifier.exited(id, exit);
}
