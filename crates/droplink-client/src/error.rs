use droplink_transport::TransportError;
use droplink_wire::Tag;

/// Errors surfaced to host applications.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Malformed caller input, rejected before any I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// The companion process could not be started.
    #[error("companion launch failure: {0}")]
    Launch(#[source] TransportError),

    /// Timeout, end-of-stream, write failure, or protocol
    /// desynchronization. The connection is suspect; the next call
    /// relaunches the companion.
    #[error("companion communication failure: {0}")]
    Comms(String),

    /// Reply body buffer allocation failed.
    #[error("out of memory allocating {0}-byte reply body")]
    OutOfMemory(usize),

    /// The companion explicitly rejected a well-formed request.
    #[error("companion rejected request with status {0}")]
    Rejected(Tag),

    /// Fallback for failures outside the taxonomy.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl ClientError {
    /// Stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ClientError::Launch(_) => ErrorKind::LaunchFailure,
            ClientError::Comms(_) => ErrorKind::CommsFailure,
            ClientError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            ClientError::Rejected(_) => ErrorKind::RequestFailed,
            ClientError::Unknown(_) => ErrorKind::UnknownError,
        }
    }

    /// Stable human-readable message for this error's kind.
    pub fn message(&self) -> &'static str {
        self.kind().message()
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Launch { .. } => ClientError::Launch(err),
            other => ClientError::Comms(other.to_string()),
        }
    }
}

/// Error classification with one stable message per kind, so a host
/// application can log or display failures without matching on variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    LaunchFailure,
    CommsFailure,
    OutOfMemory,
    RequestFailed,
    UnknownError,
}

impl ErrorKind {
    /// Human-readable message for this kind. Pure lookup, no I/O.
    pub const fn message(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "Invalid request",
            ErrorKind::LaunchFailure => "App launch failure",
            ErrorKind::CommsFailure => "App communication failure",
            ErrorKind::OutOfMemory => "Out of memory",
            ErrorKind::RequestFailed => "Request failed by app",
            ErrorKind::UnknownError => "Unknown error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn transport_launch_maps_to_launch_kind() {
        let err: ClientError = TransportError::Launch {
            program: "companion".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::LaunchFailure);
    }

    #[test]
    fn transport_timeout_maps_to_comms_kind() {
        let err: ClientError = TransportError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(err.kind(), ErrorKind::CommsFailure);
    }

    #[test]
    fn transport_eof_maps_to_comms_kind() {
        let err: ClientError = TransportError::Disconnected.into();
        assert_eq!(err.kind(), ErrorKind::CommsFailure);
    }

    #[test]
    fn messages_are_stable() {
        assert_eq!(ErrorKind::CommsFailure.message(), "App communication failure");
        assert_eq!(ErrorKind::InvalidRequest.message(), "Invalid request");
        assert_eq!(ErrorKind::LaunchFailure.message(), "App launch failure");
        assert_eq!(ErrorKind::OutOfMemory.message(), "Out of memory");
        assert_eq!(ErrorKind::RequestFailed.message(), "Request failed by app");
        assert_eq!(ErrorKind::UnknownError.message(), "Unknown error");
    }
}
