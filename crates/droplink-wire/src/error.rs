/// Errors that can occur during header encoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The body exceeds the 16-bit length field of the wire format.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, WireError>;
