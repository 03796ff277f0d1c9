use std::fmt;

/// A 4-byte command or status tag, written to the wire as raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

/// Request tag: one-time setup payload.
pub const INIT: Tag = Tag(*b"init");
/// Request tag: submit a drop, correlated by a non-zero request id.
pub const DROP: Tag = Tag(*b"drop");
/// Request tag: graceful companion shutdown, request id 0.
pub const QUIT: Tag = Tag(*b"quit");
/// Request tag: drain one completed result, request id 0.
pub const POLL: Tag = Tag(*b"poll");
/// Status tag acknowledging a successful request.
pub const OKAY: Tag = Tag(*b"okay");

impl Tag {
    /// The raw wire bytes of this tag.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Whether this tag is the success acknowledgement.
    pub fn is_okay(&self) -> bool {
        *self == OKAY
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tags are ASCII in practice but nothing on the wire enforces it.
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn okay_detection() {
        assert!(OKAY.is_okay());
        assert!(!DROP.is_okay());
        assert!(!Tag(*b"fail").is_okay());
    }

    #[test]
    fn display_printable() {
        assert_eq!(DROP.to_string(), "drop");
        assert_eq!(Tag([0x01, b'o', b'k', 0xFF]).to_string(), "\\x01ok\\xff");
    }
}
