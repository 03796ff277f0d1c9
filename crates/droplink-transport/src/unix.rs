use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use tracing::trace;

use crate::config::CompanionConfig;
use crate::error::{Result, TransportError};

/// Parent-side endpoints of the companion's stdio pipes.
///
/// The stdout descriptor is switched to non-blocking mode at spawn time;
/// reads that would block wait for readiness via `poll(2)` with the
/// configured timeout. Stdin stays blocking (local pipe writes are assumed
/// prompt).
pub(crate) struct PipePair {
    stdin: ChildStdin,
    stdout: ChildStdout,
}

/// Launch the companion with its stdio wired to fresh pipes.
///
/// `Command` with `Stdio::piped()` keeps the parent-side ends out of the
/// child, so EOF detection works once the companion exits.
pub(crate) fn spawn(config: &CompanionConfig) -> Result<(Child, PipePair)> {
    let mut child = Command::new(&config.program)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| TransportError::Launch {
            program: config.program.clone(),
            source,
        })?;

    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(TransportError::Launch {
            program: config.program.clone(),
            source: std::io::Error::other("spawned child is missing stdio pipes"),
        });
    };

    if let Err(source) = set_nonblocking(stdout.as_raw_fd()) {
        let _ = child.kill();
        let _ = child.wait();
        return Err(TransportError::Launch {
            program: config.program.clone(),
            source,
        });
    }

    Ok((child, PipePair { stdin, stdout }))
}

fn set_nonblocking(fd: libc::c_int) -> std::io::Result<()> {
    // SAFETY: `fd` is an open descriptor owned by this process; F_GETFL and
    // F_SETFL do not touch caller memory.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags == -1 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: As above.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

impl PipePair {
    pub(crate) fn write_exact(&mut self, bytes: &[u8]) -> Result<()> {
        self.stdin.write_all(bytes)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Read exactly `buf.len()` bytes, waiting up to `timeout` whenever the
    /// descriptor has no data ready.
    pub(crate) fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => {
                    trace!(bytes = n, "read chunk from companion");
                    filled += n;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => self.wait_readable(timeout)?,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn wait_readable(&self, timeout: Duration) -> Result<()> {
        let mut poll_for = libc::pollfd {
            fd: self.stdout.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: `poll_for` is a valid pollfd for the duration of the call
        // and the descriptor is owned by `self.stdout`.
        let rc = unsafe { libc::poll(&mut poll_for, 1, timeout_ms) };
        match rc {
            1 => Ok(()), // Readable, or HUP: the next read reports EOF.
            0 => {
                trace!(?timeout, "poll timed out waiting for companion");
                Err(TransportError::Timeout(timeout))
            }
            _ => Err(TransportError::Io(std::io::Error::last_os_error())),
        }
    }
}
