use crate::WireError;

/// Placeholder written into an envelope's `graph` field before the raw graph
/// text is spliced in. Larger than any id or source offset the protocol
/// carries.
pub const GRAPH_SENTINEL: u64 = 9_007_199_254_740_881;

/// A fragment of already-serialized JSON, spliced verbatim into a frame.
///
/// The runtime hands over each compiled graph as JSON text. Keeping it as a
/// `RawJson` lets the control side forward it without parsing or escaping it
/// again. The text is trusted; only its outer shape is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJson(String);

impl RawJson {
    pub fn new(text: impl Into<String>) -> Result<Self, WireError> {
        let text = text.into();
        match text.trim_start().as_bytes().first() {
            Some(b'{') | Some(b'[') => Ok(Self(text)),
            _ => Err(WireError::NotStructuredJson),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Replaces the single [`GRAPH_SENTINEL`] token in `envelope` with `raw`.
pub fn splice_sentinel(envelope: &str, raw: &RawJson) -> Result<String, WireError> {
    let token = GRAPH_SENTINEL.to_string();
    let occurrences = envelope.matches(token.as_str()).count();
    if occurrences != 1 {
        return Err(WireError::SentinelCollision { occurrences });
    }
    Ok(envelope.replacen(token.as_str(), raw.as_str(), 1))
}
