use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use droplink_transport::{CompanionConfig, CompanionTransport, Connection};
use droplink_wire::{
    decode_header, encode_request, Tag, DROP, HEADER_SIZE, INIT, MAX_BODY_LEN, POLL, QUIT,
};

use crate::error::{ClientError, Result};

/// Synchronous request/response client for the companion process.
///
/// One outstanding request at a time: every call writes a framed request,
/// then blocks (bounded by the transport's read timeout) until the
/// correlated reply arrives. There is no internal locking; wrap the client
/// in a mutex to share it across threads.
pub struct Client<T = Connection> {
    transport: T,
}

impl Client<Connection> {
    /// Client over a real companion process launched per `config`.
    pub fn new(config: CompanionConfig) -> Self {
        Self::with_transport(Connection::new(config))
    }
}

impl<T: CompanionTransport> Client<T> {
    /// Client over an arbitrary transport implementation.
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One-time setup request (`init`). The payload carries the host
    /// application's identification and must be non-empty.
    pub fn setup(&mut self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Err(ClientError::InvalidRequest("setup payload must not be empty"));
        }
        self.call(0, INIT, Some(payload)).map(|_| ())
    }

    /// Submit a drop request, correlated by a caller-chosen non-zero id.
    /// The result arrives asynchronously via [`Client::poll_completed`].
    pub fn submit(&mut self, payload: &[u8], request_id: i16) -> Result<()> {
        if payload.is_empty() {
            return Err(ClientError::InvalidRequest("drop payload must not be empty"));
        }
        if request_id == 0 {
            return Err(ClientError::InvalidRequest(
                "request id 0 is reserved for control requests",
            ));
        }
        self.call(request_id, DROP, Some(payload)).map(|_| ())
    }

    /// Ask the companion to quit, then terminate it regardless of how the
    /// reply went. A later request launches a fresh instance.
    pub fn close(&mut self) -> Result<()> {
        let result = self.call(0, QUIT, None).map(|_| ());
        self.transport.terminate();
        result
    }

    /// Drain all currently-completed results.
    ///
    /// Issues zero-body `poll` requests until the companion replies with an
    /// empty body. Each non-empty reply body is handed to `handler` exactly
    /// once, in completion order. A dispatch error aborts the drain;
    /// results already delivered in this call stand. Returns the number of
    /// results delivered.
    pub fn poll_completed<F>(&mut self, mut handler: F) -> Result<usize>
    where
        F: FnMut(Bytes),
    {
        let mut delivered = 0;
        loop {
            match self.call(0, POLL, None)? {
                Some(body) if !body.is_empty() => {
                    // body_len decodes from a u16, so this can only trip if
                    // the wire format grows past the protocol's cap.
                    if body.len() > MAX_BODY_LEN {
                        return Err(ClientError::Comms(format!(
                            "poll result of {} bytes exceeds the wire format",
                            body.len()
                        )));
                    }
                    trace!(bytes = body.len(), "delivering completed result");
                    handler(body);
                    delivered += 1;
                }
                _ => {
                    debug!(delivered, "poll drain complete");
                    return Ok(delivered);
                }
            }
        }
    }

    /// Issue one framed request and read its correlated reply.
    ///
    /// Validation happens before any I/O touches the transport: the body
    /// must be absent or non-empty, and no larger than the wire format can
    /// carry. On success the reply body (if any) is returned as a buffer
    /// owned by the caller; on every failure path it is released
    /// internally.
    pub fn call(&mut self, request_id: i16, tag: Tag, body: Option<&[u8]>) -> Result<Option<Bytes>> {
        if let Some(body) = body {
            if body.is_empty() {
                return Err(ClientError::InvalidRequest(
                    "body must be absent rather than empty",
                ));
            }
            if body.len() > MAX_BODY_LEN {
                return Err(ClientError::InvalidRequest("body exceeds 65535 bytes"));
            }
        }
        let body = body.unwrap_or(&[]);

        let mut frame = BytesMut::with_capacity(HEADER_SIZE + body.len());
        encode_request(tag, request_id, body, &mut frame)
            .map_err(|_| ClientError::InvalidRequest("body exceeds 65535 bytes"))?;

        trace!(%tag, request_id, body_len = body.len(), "sending request");
        self.transport.write_exact(&frame)?;

        let mut header_bytes = [0u8; HEADER_SIZE];
        self.transport.read_exact(&mut header_bytes)?;
        let header = decode_header(header_bytes);

        if header.request_id != request_id {
            warn!(
                expected = request_id,
                received = header.request_id,
                "reply correlation mismatch; stream desynchronized"
            );
            // No resynchronization is possible on a raw byte stream; drop
            // the companion so the next call starts clean.
            self.transport.terminate();
            return Err(ClientError::Comms(format!(
                "reply correlates to request {} (expected {})",
                header.request_id, request_id
            )));
        }

        let reply_body = if header.body_len > 0 {
            let len = usize::from(header.body_len);
            let mut buf = Vec::new();
            buf.try_reserve_exact(len)
                .map_err(|_| ClientError::OutOfMemory(len))?;
            buf.resize(len, 0);
            self.transport.read_exact(&mut buf)?;
            Some(Bytes::from(buf))
        } else {
            None
        };

        if !header.tag.is_okay() {
            debug!(status = %header.tag, request_id, "companion rejected request");
            // reply_body drops here; nothing leaks to the caller on failure
            return Err(ClientError::Rejected(header.tag));
        }

        trace!(request_id, body_len = header.body_len, "request acknowledged");
        Ok(reply_body)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::time::Duration;

    use droplink_transport::TransportError;
    use droplink_wire::OKAY;

    use super::*;
    use crate::error::ErrorKind;

    /// Scripted transport: serves reads from a canned byte stream and
    /// records everything else.
    #[derive(Default)]
    struct Scripted {
        reply_stream: VecDeque<u8>,
        written: Vec<u8>,
        connects: usize,
        terminates: usize,
        fail_connect: bool,
        fail_read: Option<TransportError>,
    }

    impl Scripted {
        fn with_replies(replies: &[(Tag, i16, &[u8])]) -> Self {
            let mut stream = BytesMut::new();
            for (tag, id, body) in replies {
                encode_request(*tag, *id, body, &mut stream).unwrap();
            }
            Self {
                reply_stream: stream.to_vec().into(),
                ..Self::default()
            }
        }
    }

    impl CompanionTransport for Scripted {
        fn ensure_connected(&mut self) -> droplink_transport::Result<()> {
            self.connects += 1;
            if self.fail_connect {
                return Err(TransportError::Launch {
                    program: PathBuf::from("companion"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Ok(())
        }

        fn write_exact(&mut self, bytes: &[u8]) -> droplink_transport::Result<()> {
            self.ensure_connected()?;
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn read_exact(&mut self, buf: &mut [u8]) -> droplink_transport::Result<()> {
            self.ensure_connected()?;
            if self.reply_stream.len() < buf.len() {
                if let Some(err) = self.fail_read.take() {
                    return Err(err);
                }
                return Err(TransportError::Disconnected);
            }
            for slot in buf.iter_mut() {
                *slot = self.reply_stream.pop_front().unwrap();
            }
            Ok(())
        }

        fn terminate(&mut self) {
            self.terminates += 1;
        }
    }

    #[test]
    fn setup_rejects_empty_payload_before_io() {
        let mut client = Client::with_transport(Scripted::default());

        let err = client.setup(b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let scripted = client.transport();
        assert_eq!(scripted.connects, 0);
        assert!(scripted.written.is_empty());
    }

    #[test]
    fn submit_rejects_reserved_request_id() {
        let mut client = Client::with_transport(Scripted::default());
        let err = client.submit(b"{}", 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(client.transport().connects, 0);
    }

    #[test]
    fn submit_rejects_oversize_payload() {
        let mut client = Client::with_transport(Scripted::default());
        let payload = vec![b'x'; MAX_BODY_LEN + 1];
        let err = client.submit(&payload, 7).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(client.transport().connects, 0);
    }

    #[test]
    fn call_rejects_present_but_empty_body() {
        let mut client = Client::with_transport(Scripted::default());
        let err = client.call(1, DROP, Some(b"")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn submit_writes_framed_request_and_accepts_okay() {
        let mut client = Client::with_transport(Scripted::with_replies(&[(OKAY, 42, b"")]));

        client.submit(b"{}", 42).unwrap();

        let mut expected = BytesMut::new();
        encode_request(DROP, 42, b"{}", &mut expected).unwrap();
        assert_eq!(client.transport().written, expected.to_vec());
    }

    #[test]
    fn call_returns_caller_owned_reply_body() {
        let mut client =
            Client::with_transport(Scripted::with_replies(&[(OKAY, 5, b"{\"ok\":true}")]));

        let body = client.call(5, DROP, Some(b"{}")).unwrap().unwrap();
        assert_eq!(body.as_ref(), b"{\"ok\":true}");
    }

    #[test]
    fn correlation_mismatch_is_comms_failure_and_terminates() {
        let mut client = Client::with_transport(Scripted::with_replies(&[(OKAY, 9, b"{}")]));

        let err = client.call(8, DROP, Some(b"{}")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CommsFailure);
        assert_eq!(client.transport().terminates, 1);
    }

    #[test]
    fn non_okay_status_is_request_failed_not_comms() {
        let mut client =
            Client::with_transport(Scripted::with_replies(&[(Tag(*b"fail"), 3, b"{}")]));

        let err = client.call(3, DROP, Some(b"{}")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert!(matches!(err, ClientError::Rejected(tag) if tag == Tag(*b"fail")));
    }

    #[test]
    fn launch_failure_surfaces_distinctly() {
        let mut client = Client::with_transport(Scripted {
            fail_connect: true,
            ..Scripted::default()
        });

        let err = client.setup(b"{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LaunchFailure);
    }

    #[test]
    fn read_timeout_surfaces_as_comms_failure() {
        let mut client = Client::with_transport(Scripted {
            fail_read: Some(TransportError::Timeout(Duration::from_secs(5))),
            ..Scripted::default()
        });

        let err = client.submit(b"{}", 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CommsFailure);
    }

    #[test]
    fn poll_with_nothing_pending_returns_without_calling_handler() {
        let mut client = Client::with_transport(Scripted::with_replies(&[(OKAY, 0, b"")]));

        let mut calls = 0;
        let delivered = client.poll_completed(|_| calls += 1).unwrap();

        assert_eq!(delivered, 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn poll_drains_pending_results_in_order() {
        let mut client = Client::with_transport(Scripted::with_replies(&[
            (OKAY, 0, br#"{"requestID":1,"data":{}}"#),
            (OKAY, 0, br#"{"requestID":2,"data":{}}"#),
            (OKAY, 0, br#"{"requestID":3,"data":{}}"#),
            (OKAY, 0, b""),
        ]));

        let mut seen = Vec::new();
        let delivered = client
            .poll_completed(|body| seen.push(body.to_vec()))
            .unwrap();

        assert_eq!(delivered, 3);
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], br#"{"requestID":1,"data":{}}"#.to_vec());
        assert_eq!(seen[2], br#"{"requestID":3,"data":{}}"#.to_vec());
    }

    #[test]
    fn poll_error_aborts_but_keeps_delivered_results() {
        let mut transport = Scripted::with_replies(&[(OKAY, 0, br#"{"requestID":1,"data":{}}"#)]);
        transport.fail_read = Some(TransportError::Disconnected);
        let mut client = Client::with_transport(transport);

        let mut calls = 0;
        let err = client.poll_completed(|_| calls += 1).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommsFailure);
        assert_eq!(calls, 1);
    }

    #[test]
    fn close_terminates_even_when_quit_is_rejected() {
        let mut client =
            Client::with_transport(Scripted::with_replies(&[(Tag(*b"nope"), 0, b"")]));

        let err = client.close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert_eq!(client.transport().terminates, 1);
    }

    #[test]
    fn close_terminates_on_success_too() {
        let mut client = Client::with_transport(Scripted::with_replies(&[(OKAY, 0, b"")]));
        client.close().unwrap();
        assert_eq!(client.transport().terminates, 1);
    }

    #[test]
    fn never_payload_and_error_together() {
        // Rejected replies still consume the body, but the caller only ever
        // sees the error.
        let mut client =
            Client::with_transport(Scripted::with_replies(&[(Tag(*b"fail"), 4, b"detail")]));

        let result = client.call(4, DROP, Some(b"{}"));
        assert!(result.is_err());
    }
}
