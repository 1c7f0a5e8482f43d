use std::error::Error;
use std::fmt;

use jitscope_wire::{ActorPacket, ActorRequest, ActorStateName, FrameChannel, decode, encode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{CompilationHook, DebuggerSession, Host, RawCompilation};

pub const HELLO_MESSAGE: &str = "Hello from the backend!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorError {
    WrongState {
        expected: ActorStateName,
        actual: ActorStateName,
    },
    /// A request frame could not be decoded.
    Protocol { message: String },
}

impl ActorError {
    pub fn to_packet(&self) -> ActorPacket {
        match self {
            Self::WrongState { expected, actual } => ActorPacket::WrongState {
                expected: *expected,
                actual: *actual,
            },
            Self::Protocol { message } => ActorPacket::ProtocolError {
                message: message.clone(),
            },
        }
    }
}

impl fmt::Display for ActorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongState { expected, actual } => write!(
                f,
                "wrong state: expected '{expected}', but current state is '{actual}'"
            ),
            Self::Protocol { message } => write!(f, "protocol error: {message}"),
        }
    }
}

impl Error for ActorError {}

enum ActorState<S> {
    Detached,
    Attached(AttachedSession<S>),
}

struct AttachedSession<S> {
    session: S,
    compilations: mpsc::UnboundedReceiver<RawCompilation>,
}

/// Runtime-side endpoint that turns compilation hook firings into packets.
pub struct JitActor<H: Host> {
    host: H,
    state: ActorState<H::Session>,
}

impl<H: Host> JitActor<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: ActorState::Detached,
        }
    }

    pub fn state(&self) -> ActorStateName {
        match self.state {
            ActorState::Detached => ActorStateName::Detached,
            ActorState::Attached(_) => ActorStateName::Attached,
        }
    }

    fn expect_state(&self, expected: ActorStateName) -> Result<(), ActorError> {
        let actual = self.state();
        if actual != expected {
            return Err(ActorError::WrongState { expected, actual });
        }
        Ok(())
    }

    /// Installs the compilation hook and starts delivering compilations.
    pub fn attach(&mut self) -> Result<ActorStateName, ActorError> {
        self.expect_state(ActorStateName::Detached)?;
        let (hook, compilations) = CompilationHook::new();
        let mut session = self.host.make_debugger();
        session.set_compilation_hook(Some(hook));
        session.add_debuggees();
        session.set_enabled(true);
        self.state = ActorState::Attached(AttachedSession {
            session,
            compilations,
        });
        info!("jit actor attached");
        Ok(ActorStateName::Attached)
    }

    /// Removes the hook and releases the debugger session. Compilations
    /// still queued at this point are dropped.
    pub fn detach(&mut self) -> Result<ActorStateName, ActorError> {
        self.expect_state(ActorStateName::Attached)?;
        if let ActorState::Attached(mut attached) =
            std::mem::replace(&mut self.state, ActorState::Detached)
        {
            attached.session.remove_all_debuggees();
            attached.session.set_compilation_hook(None);
            attached.session.set_enabled(false);
            let dropped = attached.compilations.len();
            if dropped > 0 {
                debug!(dropped, "discarding compilations queued before detach");
            }
        }
        info!("jit actor detached");
        Ok(ActorStateName::Detached)
    }

    pub fn hello(&self) -> ActorPacket {
        debug!("jit actor hello");
        ActorPacket::Hello {
            msg: String::from(HELLO_MESSAGE),
        }
    }

    pub fn handle_request(&mut self, request: ActorRequest) -> ActorPacket {
        let result = match request {
            ActorRequest::Attach => self.attach(),
            ActorRequest::Detach => self.detach(),
            ActorRequest::Hello => return self.hello(),
        };
        match result {
            Ok(state) => ActorPacket::State { state },
            Err(error) => {
                warn!(?request, %error, "rejected actor request");
                error.to_packet()
            }
        }
    }

    /// Builds the event for one completed compilation.
    pub fn on_compilation_complete(&self, compilation: RawCompilation) -> ActorPacket {
        let scripts = compilation.registered_scripts();
        debug!(
            scripts = scripts.len(),
            graph_bytes = compilation.json.len(),
            "compilation completed"
        );
        ActorPacket::Compilation {
            scripts,
            json: compilation.json,
        }
    }

    /// Waits for the next queued compilation. Never resolves while detached.
    async fn next_compilation(&mut self) -> RawCompilation {
        match &mut self.state {
            ActorState::Attached(attached) => match attached.compilations.recv().await {
                Some(compilation) => compilation,
                None => std::future::pending().await,
            },
            ActorState::Detached => std::future::pending().await,
        }
    }

    /// Serves requests from `channel` and forwards compilations until the
    /// peer goes away, then tears the actor down.
    pub async fn serve(mut self, mut channel: FrameChannel) {
        info!(channel = channel.name(), "jit actor serving");
        loop {
            let packet = tokio::select! {
                biased;
                frame = channel.next_frame() => {
                    let Some(frame) = frame else { break };
                    match decode::<ActorRequest>(&frame) {
                        Ok(request) => self.handle_request(request),
                        Err(error) => {
                            warn!(%error, "undecodable actor request");
                            ActorError::Protocol { message: error.to_string() }.to_packet()
                        }
                    }
                }
                compilation = self.next_compilation() => self.on_compilation_complete(compilation),
            };
            let frame = match encode(&packet) {
                Ok(frame) => frame,
                Err(error) => {
                    warn!(%error, "failed to encode actor packet");
                    continue;
                }
            };
            if let Err(error) = channel.post(frame) {
                warn!(%error, "failed to post actor packet");
                if matches!(error, jitscope_wire::TransportError::Closed { .. }) {
                    break;
                }
            }
        }
        self.destroy();
    }

    /// Detaches if needed and releases the actor.
    pub fn destroy(mut self) {
        debug!("jit actor destroy");
        if matches!(self.state, ActorState::Attached(_)) {
            let _ = self.detach();
        }
    }
}

impl<H: Host> Drop for JitActor<H> {
    fn drop(&mut self) {
        if matches!(self.state, ActorState::Attached(_)) {
            let _ = self.detach();
        }
    }
}
