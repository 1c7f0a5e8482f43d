//! Wire protocol for jitscope.
//!
//! Two independent channel pairs connect the three parties:
//!
//! ```text
//! runtime (actor) <── runtime channel ──> control <── panel channel ──> render surface
//! ```
//!
//! Both carry JSON text frames. The runtime channel speaks [`ActorRequest`] /
//! [`ActorPacket`]; the panel channel speaks [`PanelRequest`] /
//! [`PanelEvent`]. Compiled graphs travel as pre-serialized text and are
//! spliced into their envelope without re-encoding, see [`RawJson`] and
//! [`GraphFrame`].

mod channel;
mod error;
mod messages;
mod raw;

pub use channel::*;
pub use error::*;
pub use messages::*;
pub use raw::*;

use facet::Facet;

/// Serializes a message to a compact JSON frame.
pub fn encode<T>(value: &T) -> Result<String, WireError>
where
    T: for<'facet> Facet<'facet>,
{
    facet_json::to_string(value).map_err(|error| WireError::Encode(error.to_string()))
}

/// Parses a JSON frame into a message.
pub fn decode<T>(frame: &str) -> Result<T, WireError>
where
    T: for<'facet> Facet<'facet>,
{
    facet_json::from_str(frame).map_err(|error| WireError::Decode(error.to_string()))
}
