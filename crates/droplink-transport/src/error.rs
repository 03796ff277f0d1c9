use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in companion transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The companion process could not be started.
    #[error("failed to launch companion {program}: {source}")]
    Launch {
        program: PathBuf,
        source: std::io::Error,
    },

    /// A read did not complete within the bounded timeout.
    #[error("companion read timed out after {0:?}")]
    Timeout(Duration),

    /// The companion closed its end of the pipe.
    #[error("companion closed the pipe")]
    Disconnected,

    /// An I/O error occurred on a pipe endpoint.
    #[error("pipe I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
