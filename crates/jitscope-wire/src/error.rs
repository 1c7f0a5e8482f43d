use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    Encode(String),
    Decode(String),
    /// The graph sentinel did not occur exactly once in a serialized envelope.
    SentinelCollision { occurrences: usize },
    /// Spliced text must be a JSON object or array, never a quoted string.
    NotStructuredJson,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(error) => write!(f, "encode frame: {error}"),
            Self::Decode(error) => write!(f, "decode frame: {error}"),
            Self::SentinelCollision { occurrences } => write!(
                f,
                "graph sentinel must occur exactly once in the envelope, found {occurrences}"
            ),
            Self::NotStructuredJson => {
                write!(f, "raw json fragment must start with '{{' or '['")
            }
        }
    }
}

impl Error for WireError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer endpoint is gone.
    Closed { channel: &'static str },
    FrameTooLarge {
        channel: &'static str,
        len: usize,
        max: usize,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed { channel } => write!(f, "{channel} channel closed"),
            Self::FrameTooLarge { channel, len, max } => write!(
                f,
                "frame too large for {channel} channel: {len} bytes (max {max})"
            ),
        }
    }
}

impl Error for TransportError {}
