use crate::error::Result;

/// Capability surface of the companion transport.
///
/// [`Connection`](crate::Connection) is the one production implementation,
/// with exactly one platform variant compiled in per target. Dispatcher
/// tests substitute scripted implementations.
///
/// Contract shared by every implementation:
/// - `write_exact` is all-or-nothing from the caller's point of view.
/// - `read_exact` fills the whole buffer, or fails with
///   [`TransportError::Timeout`](crate::TransportError::Timeout) after the
///   bounded wait, or [`TransportError::Disconnected`](crate::TransportError::Disconnected)
///   on end-of-stream. No partial data is ever surfaced.
/// - After any I/O failure the connection is torn down; the next operation
///   relaunches the companion.
pub trait CompanionTransport {
    /// Launch the companion if it is not already running. Idempotent while
    /// the companion stays alive.
    fn ensure_connected(&mut self) -> Result<()>;

    /// Write the full byte sequence to the companion's stdin.
    fn write_exact(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read exactly `buf.len()` bytes from the companion's stdout.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Kill the companion and release the pipe endpoints.
    fn terminate(&mut self);
}
