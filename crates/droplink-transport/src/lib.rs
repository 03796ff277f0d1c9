//! Companion process lifecycle and timed pipe I/O.
//!
//! This is the lowest layer of droplink. It owns the companion process
//! handle and the stdio pipe endpoints, and provides exact-length blocking
//! reads and writes with a bounded read timeout. The companion is launched
//! lazily on first use and reused while it stays alive; after a failure the
//! next operation relaunches it from scratch.
//!
//! Two platform variants exist only in how blocking-with-timeout reads are
//! achieved: overlapped named-pipe reads on Windows, non-blocking
//! descriptors with `poll(2)` on Unix. Both satisfy the same external
//! contract.

pub mod config;
pub mod connection;
pub mod error;
pub mod traits;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix as platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use windows as platform;

pub use config::{CompanionConfig, DEFAULT_READ_TIMEOUT};
pub use connection::Connection;
pub use error::{Result, TransportError};
pub use traits::CompanionTransport;
