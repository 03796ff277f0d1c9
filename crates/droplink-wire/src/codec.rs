use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};
use crate::tag::Tag;

/// Header size: tag (4) + request id (2) + body length (2) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Maximum body length representable by the 16-bit length field.
pub const MAX_BODY_LEN: usize = 65_535;

/// A decoded message header.
///
/// On requests the tag is a command (`init`, `drop`, `quit`, `poll`); on
/// replies it is a status, compared against [`crate::OKAY`] by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Command or status tag.
    pub tag: Tag,
    /// Caller-chosen correlation id; 0 is reserved for control requests.
    pub request_id: i16,
    /// Length in bytes of the body that follows.
    pub body_len: u16,
}

/// Encode a message header into the wire format.
///
/// Wire format:
/// ```text
/// ┌─────────────┬─────────────────┬──────────────────┬──────────────────┐
/// │ Tag (4B)    │ RequestID       │ BodyLength       │ Body             │
/// │ raw bytes   │ (2B LE signed)  │ (2B LE unsigned) │ (BodyLength B)   │
/// └─────────────┴─────────────────┴──────────────────┴──────────────────┘
/// ```
///
/// Oversize bodies are rejected here even though callers check upstream;
/// a length that silently truncates to 16 bits would desynchronize the
/// stream.
pub fn encode_header(tag: Tag, request_id: i16, body_len: usize, dst: &mut BytesMut) -> Result<()> {
    if body_len > MAX_BODY_LEN {
        return Err(WireError::BodyTooLarge {
            size: body_len,
            max: MAX_BODY_LEN,
        });
    }
    dst.reserve(HEADER_SIZE);
    dst.put_slice(tag.as_bytes());
    dst.put_i16_le(request_id);
    dst.put_u16_le(body_len as u16);
    Ok(())
}

/// Encode a complete request (header + body) into one buffer.
pub fn encode_request(tag: Tag, request_id: i16, body: &[u8], dst: &mut BytesMut) -> Result<()> {
    encode_header(tag, request_id, body.len(), dst)?;
    dst.put_slice(body);
    Ok(())
}

/// Decode a message header from 8 wire bytes.
///
/// Any 8 bytes are structurally valid; semantic validation (status tag,
/// request id correlation) is the dispatcher's job.
pub fn decode_header(bytes: [u8; HEADER_SIZE]) -> Header {
    let tag = Tag([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let request_id = i16::from_le_bytes([bytes[4], bytes[5]]);
    let body_len = u16::from_le_bytes([bytes[6], bytes[7]]);
    Header {
        tag,
        request_id,
        body_len,
    }
}
