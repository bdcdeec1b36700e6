use std::fmt;

/// Errors raised while extracting or decoding frames.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Frame terminator does not match `FRAME_END`, or unknown frame type.
    Corrupted,
    /// Declared frame size exceeds the negotiated `frame_max`.
    FrameTooLarge { size: usize, max: usize },
    /// Buffered bytes would exceed the configured capacity.
    BufferOverflow { size: usize, max: usize },
    /// Payload does not match the expected layout, or a value cannot be encoded.
    Syntax(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Corrupted => f.write_str("corrupted frame"),
            Error::FrameTooLarge { size, max } => {
                write!(f, "frame size {} exceeds maximum {}", size, max)
            }
            Error::BufferOverflow { size, max } => {
                write!(f, "read buffer size {} exceeds maximum {}", size, max)
            }
            Error::Syntax(msg) => write!(f, "syntax error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Syntax(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Syntax(msg.to_string())
    }
}
