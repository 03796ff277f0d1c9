//! End-to-end dispatch against a real child process.
//!
//! `cat` echoes every request byte-for-byte, so the "reply" carries the
//! request's own command tag as its status: correlation succeeds (the id
//! comes back unchanged) and the dispatcher classifies the exchange as a
//! companion-side rejection. That exercises the full launch → frame →
//! write → timed read → correlate path without a protocol-aware companion.

#![cfg(unix)]

use std::ffi::OsString;
use std::time::Duration;

use droplink_client::{Client, ClientError, CompanionConfig, ErrorKind, DROP};

fn echo_client() -> Client {
    let config = CompanionConfig::new("cat")
        .with_args(Vec::<OsString>::new())
        .with_read_timeout(Duration::from_millis(500));
    Client::new(config)
}

#[test]
fn echoed_request_correlates_and_reports_rejection() {
    let mut client = echo_client();

    let err = client.submit(b"{\"stems\":{}}", 42).unwrap_err();

    // The echoed status tag is `drop`, not `okay`.
    assert_eq!(err.kind(), ErrorKind::RequestFailed);
    assert!(matches!(err, ClientError::Rejected(tag) if tag == DROP));
}

#[test]
fn echoed_body_is_read_in_full_before_status_check() {
    let mut client = echo_client();
    let payload = vec![b'a'; 4096];

    // A rejection after a 4 KiB body proves the body read completed;
    // otherwise the status bytes would have been misaligned.
    let err = client.submit(&payload, 7).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestFailed);
}

#[test]
fn launch_failure_reaches_the_caller() {
    let config = CompanionConfig::new("/nonexistent/droplink-companion");
    let mut client = Client::new(config);

    let err = client.setup(b"{\"appID\":\"demo\"}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LaunchFailure);
}
