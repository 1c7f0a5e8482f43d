use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use jitscope_types::Script;
use jitscope_wire::{
    ActorPacket, ActorRequest, ActorStateName, FrameChannel, TransportError, WireError, decode,
    encode,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontError {
    Transport(TransportError),
    Wire(WireError),
    /// The actor refused the request in its current state.
    WrongState {
        expected: ActorStateName,
        actual: ActorStateName,
    },
    /// The actor could not decode the request.
    Protocol(String),
    UnexpectedReply(String),
}

impl fmt::Display for FrontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "actor transport: {error}"),
            Self::Wire(error) => write!(f, "actor wire: {error}"),
            Self::WrongState { expected, actual } => write!(
                f,
                "wrong state: expected '{expected}', but current state is '{actual}'"
            ),
            Self::Protocol(message) => write!(f, "actor protocol error: {message}"),
            Self::UnexpectedReply(reply) => write!(f, "unexpected actor reply: {reply}"),
        }
    }
}

impl Error for FrontError {}

impl From<TransportError> for FrontError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<WireError> for FrontError {
    fn from(error: WireError) -> Self {
        Self::Wire(error)
    }
}

/// A compilation reported by the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationEvent {
    pub scripts: Vec<Script>,
    /// The compiler's serialized graph, untouched.
    pub json: String,
}

/// Control-side stub for the runtime actor.
///
/// Requests are strictly one at a time. Compilation events that show up
/// while a reply is awaited are kept, in order, for [`ActorFront::next_event`].
pub struct ActorFront {
    channel: FrameChannel,
    backlog: VecDeque<CompilationEvent>,
}

impl ActorFront {
    pub fn new(channel: FrameChannel) -> Self {
        Self {
            channel,
            backlog: VecDeque::new(),
        }
    }

    pub async fn attach(&mut self) -> Result<ActorStateName, FrontError> {
        self.expect_state(ActorRequest::Attach).await
    }

    pub async fn detach(&mut self) -> Result<ActorStateName, FrontError> {
        self.expect_state(ActorRequest::Detach).await
    }

    pub async fn hello(&mut self) -> Result<String, FrontError> {
        match self.call(ActorRequest::Hello).await? {
            ActorPacket::Hello { msg } => Ok(msg),
            other => Err(unexpected(other)),
        }
    }

    /// Next compilation event, oldest first. `None` once the actor is gone.
    /// Cancel-safe.
    pub async fn next_event(&mut self) -> Option<CompilationEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        loop {
            let frame = self.channel.next_frame().await?;
            match decode::<ActorPacket>(&frame) {
                Ok(ActorPacket::Compilation { scripts, json }) => {
                    return Some(CompilationEvent { scripts, json });
                }
                Ok(other) => warn!(packet = ?other, "unsolicited actor reply dropped"),
                Err(error) => warn!(%error, "undecodable actor frame dropped"),
            }
        }
    }

    /// Drops buffered events; returns how many there were.
    pub fn discard_backlog(&mut self) -> usize {
        let dropped = self.backlog.len();
        self.backlog.clear();
        dropped
    }

    async fn expect_state(&mut self, request: ActorRequest) -> Result<ActorStateName, FrontError> {
        match self.call(request).await? {
            ActorPacket::State { state } => Ok(state),
            other => Err(unexpected(other)),
        }
    }

    async fn call(&mut self, request: ActorRequest) -> Result<ActorPacket, FrontError> {
        debug!(?request, "actor request");
        self.channel.post(encode(&request)?)?;
        loop {
            let frame = self
                .channel
                .next_frame()
                .await
                .ok_or(TransportError::Closed {
                    channel: self.channel.name(),
                })?;
            let packet = match decode::<ActorPacket>(&frame) {
                Ok(packet) => packet,
                Err(error) => {
                    warn!(%error, "undecodable actor frame skipped");
                    continue;
                }
            };
            match packet {
                ActorPacket::Compilation { scripts, json } => {
                    self.backlog.push_back(CompilationEvent { scripts, json });
                }
                ActorPacket::WrongState { expected, actual } => {
                    return Err(FrontError::WrongState { expected, actual });
                }
                ActorPacket::ProtocolError { message } => {
                    return Err(FrontError::Protocol(message));
                }
                reply => return Ok(reply),
            }
        }
    }
}

fn unexpected(packet: ActorPacket) -> FrontError {
    FrontError::UnexpectedReply(format!("{packet:?}"))
}
