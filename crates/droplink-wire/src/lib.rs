//! Fixed-header message framing for the droplink companion protocol.
//!
//! Every message in both directions is framed with an 8-byte header:
//! - A 4-byte command or status tag (`init`, `drop`, `quit`, `poll`, `okay`)
//! - A 2-byte little-endian signed request id (0 reserved for control)
//! - A 2-byte little-endian unsigned body length (max 65535)
//!
//! Pure encode/decode only. No I/O happens in this crate.

pub mod codec;
pub mod error;
pub mod tag;

pub use codec::{decode_header, encode_header, encode_request, Header, HEADER_SIZE, MAX_BODY_LEN};
pub use error::{Result, WireError};
pub use tag::{Tag, DROP, INIT, OKAY, POLL, QUIT};
