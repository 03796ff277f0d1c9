use std::process::Child;

use tracing::{debug, info, trace, warn};

use crate::config::CompanionConfig;
use crate::error::Result;
use crate::platform;
use crate::traits::CompanionTransport;

/// An owned connection to the companion process.
///
/// Exclusive owner of the process handle and the pipe endpoints; callers
/// only ever see success/failure outcomes. The companion is launched lazily
/// on first use and reused while it stays alive. Any I/O failure tears the
/// connection down, so the next operation relaunches from scratch — the
/// byte stream has no way to resynchronize mid-flight.
///
/// Single caller at a time: methods take `&mut self` and there is no
/// internal locking. Concurrent use requires external serialization.
pub struct Connection {
    config: CompanionConfig,
    live: Option<Live>,
}

struct Live {
    child: Child,
    pipe: platform::PipePair,
}

impl Connection {
    /// Create an unlaunched connection. No process is spawned until the
    /// first I/O operation.
    pub fn new(config: CompanionConfig) -> Self {
        Self { config, live: None }
    }

    /// The launch configuration this connection uses.
    pub fn config(&self) -> &CompanionConfig {
        &self.config
    }

    /// Process id of the live companion, if one is running.
    pub fn companion_pid(&self) -> Option<u32> {
        self.live.as_ref().map(|live| live.child.id())
    }

    fn teardown(&mut self) {
        if let Some(live) = self.live.take() {
            let Live { mut child, pipe } = live;
            // Close our pipe ends first so a companion blocked on stdin
            // can unblock before the kill lands.
            drop(pipe);
            let _ = child.kill();
            let _ = child.wait();
            debug!("companion torn down");
        }
    }
}

impl CompanionTransport for Connection {
    fn ensure_connected(&mut self) -> Result<()> {
        if let Some(live) = &mut self.live {
            match live.child.try_wait() {
                Ok(None) => {
                    trace!("reusing live companion");
                    return Ok(());
                }
                Ok(Some(status)) => {
                    debug!(%status, "companion exited; relaunching");
                }
                Err(err) => {
                    warn!(error = %err, "could not query companion state; relaunching");
                }
            }
            self.teardown();
        }

        let (child, pipe) = platform::spawn(&self.config)?;
        info!(program = ?self.config.program, pid = child.id(), "launched companion");
        self.live = Some(Live { child, pipe });
        Ok(())
    }

    fn write_exact(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        let result = match self.live.as_mut() {
            Some(live) => live.pipe.write_exact(bytes),
            None => Err(crate::error::TransportError::Disconnected),
        };
        if let Err(err) = result {
            warn!(error = %err, "companion write failed");
            self.teardown();
            return Err(err);
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure_connected()?;
        let timeout = self.config.read_timeout;
        let result = match self.live.as_mut() {
            Some(live) => live.pipe.read_exact(buf, timeout),
            None => Err(crate::error::TransportError::Disconnected),
        };
        if let Err(err) = result {
            warn!(error = %err, "companion read failed");
            self.teardown();
            return Err(err);
        }
        Ok(())
    }

    fn terminate(&mut self) {
        self.teardown();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("program", &self.config.program)
            .field("live", &self.live.is_some())
            .finish()
    }
}
