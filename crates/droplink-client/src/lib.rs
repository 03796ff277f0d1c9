//! Request dispatch and polling client for the droplink companion process.
//!
//! This is the layer a host application talks to. A [`Client`] composes
//! framed requests, drives them through the platform transport one at a
//! time, correlates replies by request id, and drains completed
//! asynchronous results via repeated polling.
//!
//! Payload contents are opaque JSON byte blobs to this layer; only the
//! optional [`CompletedRequest`] view interprets the poll-result envelope.

pub mod client;
pub mod error;
pub mod reply;

pub use client::Client;
pub use error::{ClientError, ErrorKind, Result};
pub use reply::CompletedRequest;

pub use droplink_transport::{CompanionConfig, CompanionTransport, Connection};
pub use droplink_wire::{Tag, DROP, INIT, OKAY, POLL, QUIT};
