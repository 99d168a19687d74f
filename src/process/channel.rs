//! Worker end of the control socket: line-delimited JSON in both directions.

use std::io;
use std::os::fd::{FromRawFd, RawFd};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use super::{CONTROL_FD_ENV, Control};
use crate::error::{ChannelError, RuntimeError};
use crate::protocol::{Directive, Report};

/// Control channel inherited from the master.
#[derive(Debug)]
pub struct ControlChannel {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl ControlChannel {
    /// Wraps an already connected stream.
    pub fn new(stream: UnixStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            write,
        }
    }

    /// Adopts the descriptor named by [`CONTROL_FD_ENV`].
    ///
    /// Must be called once, from inside a tokio runtime, in a process started by
    /// [`ExecSpawner`](super::ExecSpawner).
    pub fn from_env() -> Result<Self, RuntimeError> {
        let raw = std::env::var(CONTROL_FD_ENV)
            .map_err(|_| RuntimeError::WorkerEnv(format!("{CONTROL_FD_ENV} is not set")))?;
        let fd: RawFd = raw
            .parse()
            .map_err(|_| RuntimeError::WorkerEnv(format!("{CONTROL_FD_ENV}={raw:?} is not a descriptor")))?;

        // Keep the socket out of anything the user's code executes.
        set_cloexec(fd)
            .map_err(|err| RuntimeError::WorkerEnv(format!("control descriptor {fd}: {err}")))?;

        // SAFETY: the descriptor was validated above and is owned by this process
        // alone; it is adopted exactly once.
        let std_stream = unsafe { std::os::unix::net::UnixStream::from_raw_fd(fd) };
        std_stream
            .set_nonblocking(true)
            .and_then(|()| UnixStream::from_std(std_stream))
            .map(Self::new)
            .map_err(|err| RuntimeError::WorkerEnv(format!("control descriptor {fd}: {err}")))
    }
}

/// Sets `FD_CLOEXEC` on `fd`; fails if the descriptor is not open.
fn set_cloexec(fd: RawFd) -> io::Result<()> {
    // SAFETY: F_GETFD/F_SETFD only read and write the descriptor flags; an
    // invalid `fd` is reported through the return value.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[async_trait]
impl Control for ControlChannel {
    async fn recv(&mut self) -> Result<Option<Directive>, ChannelError> {
        match self.lines.next_line().await? {
            Some(line) => Ok(Some(Directive::from_line(&line)?)),
            None => Ok(None),
        }
    }

    async fn report(&mut self, report: Report) -> Result<(), ChannelError> {
        let line = report.to_line()?;
        self.write.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ShutdownSignal;

    #[tokio::test]
    async fn test_directives_and_reports_cross_the_socket() {
        let (master, worker) = UnixStream::pair().unwrap();
        let mut channel = ControlChannel::new(worker);
        let (master_read, mut master_write) = master.into_split();
        let mut master_lines = BufReader::new(master_read).lines();

        channel.report(Report::Online).await.unwrap();
        let line = master_lines.next_line().await.unwrap().unwrap();
        assert_eq!(Report::from_line(&line).unwrap(), Report::Online);

        let shutdown = Directive::shutdown(ShutdownSignal::Term).to_line().unwrap();
        master_write.write_all(shutdown.as_bytes()).await.unwrap();
        master_write
            .write_all(b"{\"type\":\"reload\"}\n")
            .await
            .unwrap();
        drop(master_write);

        assert_eq!(
            channel.recv().await.unwrap(),
            Some(Directive::Shutdown {
                signal: ShutdownSignal::Term
            })
        );
        assert_eq!(channel.recv().await.unwrap(), Some(Directive::Unknown));
        assert_eq!(channel.recv().await.unwrap(), None);
    }

    #[test]
    fn test_set_cloexec_marks_open_descriptors_only() {
        use std::os::fd::AsRawFd;

        let (a, _b) = std::os::unix::net::UnixStream::pair().unwrap();
        let fd = a.as_raw_fd();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert!(unsafe { libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) } >= 0);

        set_cloexec(fd).unwrap();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert_ne!(flags & libc::FD_CLOEXEC, 0);

        assert!(set_cloexec(-1).is_err());
    }

    #[tokio::test]
    async fn test_malformed_line_is_a_codec_error() {
        let (master, worker) = UnixStream::pair().unwrap();
        let mut channel = ControlChannel::new(worker);
        let (_read, mut write) = master.into_split();

        write.write_all(b"garbage\n").await.unwrap();
        let err = channel.recv().await.unwrap_err();
        assert_eq!(err.as_label(), "channel_codec");
    }
}
