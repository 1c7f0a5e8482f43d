use facet::Facet;
use jitscope_types::{CompilationId, Graph, Script};
use std::fmt;

use crate::{GRAPH_SENTINEL, RawJson, WireError, encode, splice_sentinel};

// ── panel channel ───────────────────────────────────────────────

/// Messages from the render surface to the control side.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
#[facet(tag = "type", rename_all = "kebab-case")]
pub enum PanelRequest {
    /// Start a session: register and attach the runtime actor.
    Connect,
    /// End the session: detach and unregister the runtime actor.
    Disconnect,
    SelectCompilation { id: CompilationId },
    RemoveCompilation { id: CompilationId },
    /// Free-form diagnostic text, logged by the control side.
    Message { msg: String },
}

/// Messages from the control side to the render surface.
#[derive(Facet, Debug, Clone)]
#[repr(u8)]
#[facet(tag = "type", rename_all = "kebab-case")]
pub enum PanelEvent {
    /// A new compilation was recorded and can be listed.
    RecordCompilation {
        id: CompilationId,
        scripts: Vec<Script>,
    },
    /// The graph of a selected compilation. Produced by [`GraphFrame::encode`].
    CompilationGraph {
        id: CompilationId,
        scripts: Vec<Script>,
        graph: Graph,
    },
    Registered,
    Unregistered,
    Attached,
    Detached,
    /// A request could not be served. `id` names the compilation involved, if any.
    Error {
        #[facet(default)]
        id: Option<CompilationId>,
        message: String,
    },
}

/// Outgoing `compilation-graph` frame carrying the graph as raw JSON.
#[derive(Debug, Clone)]
pub struct GraphFrame {
    pub id: CompilationId,
    pub scripts: Vec<Script>,
    pub graph: RawJson,
}

#[derive(Facet)]
struct GraphEnvelope {
    #[facet(rename = "type")]
    kind: String,
    id: CompilationId,
    scripts: Vec<Script>,
    graph: u64,
}

impl GraphFrame {
    /// Serializes the envelope with [`GRAPH_SENTINEL`] as the graph, then
    /// splices the raw graph text in its place.
    pub fn encode(&self) -> Result<String, WireError> {
        let envelope = GraphEnvelope {
            kind: String::from("compilation-graph"),
            id: self.id,
            scripts: self.scripts.clone(),
            graph: GRAPH_SENTINEL,
        };
        let text = encode(&envelope)?;
        splice_sentinel(&text, &self.graph)
    }
}

// ── runtime channel ─────────────────────────────────────────────

/// Requests from the control side to the runtime actor.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[facet(tag = "type", rename_all = "kebab-case")]
pub enum ActorRequest {
    Attach,
    Detach,
    /// Connectivity check.
    Hello,
}

/// Frames sent by the runtime actor: one reply per request, plus
/// compilation events whenever the actor is attached.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
#[facet(tag = "type", rename_all = "kebab-case")]
pub enum ActorPacket {
    State {
        state: ActorStateName,
    },
    Hello {
        msg: String,
    },
    WrongState {
        expected: ActorStateName,
        actual: ActorStateName,
    },
    ProtocolError {
        message: String,
    },
    /// One completed compilation. `json` is the compiler's serialized graph.
    Compilation {
        scripts: Vec<Script>,
        json: String,
    },
}

impl ActorPacket {
    /// Whether this packet answers a request (as opposed to an event).
    pub fn is_reply(&self) -> bool {
        !matches!(self, Self::Compilation { .. })
    }
}

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum ActorStateName {
    Detached,
    Attached,
}

impl fmt::Display for ActorStateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => f.write_str("detached"),
            Self::Attached => f.write_str("attached"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    #[derive(Facet)]
    struct SplicedEnvelope {
        #[facet(rename = "type")]
        kind: String,
        id: u64,
        graph: facet_value::Value,
    }

    fn sample_script() -> Script {
        Script {
            display_name: Some(String::from("loop")),
            url: String::from("file:///work/bench.js"),
            start_line: 4,
            line_count: 10,
            source_start: 33,
            source_length: 200,
        }
    }

    #[test]
    fn panel_requests_are_tagged_by_type() {
        let text = encode(&PanelRequest::SelectCompilation {
            id: CompilationId::new(3),
        })
        .expect("request must encode");
        assert!(text.contains(r#""type":"select-compilation""#), "{text}");
        assert!(text.contains(r#""id":3"#), "{text}");

        let back: PanelRequest = decode(r#"{"type":"connect"}"#).expect("connect must decode");
        assert_eq!(back, PanelRequest::Connect);

        let msg: PanelRequest =
            decode(r#"{"type":"message","msg":"hi"}"#).expect("message must decode");
        assert_eq!(
            msg,
            PanelRequest::Message {
                msg: String::from("hi")
            }
        );
    }

    #[test]
    fn unknown_message_type_fails_to_decode() {
        assert!(decode::<PanelRequest>(r#"{"type":"reboot"}"#).is_err());
        assert!(decode::<PanelRequest>("not json").is_err());
    }

    #[test]
    fn sentinel_splice_yields_structured_graph_field() {
        let frame = GraphFrame {
            id: CompilationId::new(5),
            scripts: vec![sample_script()],
            graph: RawJson::new("{\"blocks\":[]}\n").expect("object is valid"),
        };
        let text = frame.encode().expect("frame must encode");
        assert!(!text.contains(&GRAPH_SENTINEL.to_string()));

        let envelope: SplicedEnvelope = decode(&text).expect("spliced frame must parse");
        assert_eq!(envelope.kind, "compilation-graph");
        assert_eq!(envelope.id, 5);
        let graph = envelope.graph.as_object().expect("graph must be an object");
        let blocks = graph
            .get("blocks")
            .and_then(|v| v.as_array())
            .expect("blocks must be an array");
        assert!(blocks.is_empty());
    }

    #[test]
    fn spliced_frame_decodes_as_panel_event() {
        let raw = r#"{"mir":{"blocks":[{"number":0,"successors":[]}]},"lir":{"blocks":[]}}"#;
        let frame = GraphFrame {
            id: CompilationId::new(1),
            scripts: vec![sample_script()],
            graph: RawJson::new(raw).expect("object is valid"),
        };
        let text = frame.encode().expect("frame must encode");
        match decode::<PanelEvent>(&text).expect("event must decode") {
            PanelEvent::CompilationGraph { id, scripts, graph } => {
                assert_eq!(id, CompilationId::new(1));
                assert_eq!(scripts, vec![sample_script()]);
                assert_eq!(graph.mir.blocks.len(), 1);
                assert!(graph.lir.blocks.is_empty());
            }
            other => panic!("expected compilation-graph, got {other:?}"),
        }
    }

    #[test]
    fn actor_packets_round_trip_through_text() {
        let wrong = ActorPacket::WrongState {
            expected: ActorStateName::Detached,
            actual: ActorStateName::Attached,
        };
        let text = encode(&wrong).expect("packet must encode");
        assert!(text.contains(r#""type":"wrong-state""#), "{text}");
        assert!(text.contains(r#""expected":"detached""#), "{text}");
        assert_eq!(decode::<ActorPacket>(&text).expect("packet must decode"), wrong);
        assert!(wrong.is_reply());

        let event: ActorPacket = decode(r#"{"type":"compilation","scripts":[],"json":"{}"}"#)
            .expect("event must decode");
        assert!(!event.is_reply());
    }
}
