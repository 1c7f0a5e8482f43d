use std::error::Error;
use std::fmt;

use jitscope_graph::{InlineTree, IrMode, encode, reconstruct};
use jitscope_types::{CompilationId, Graph, Script};
use jitscope_wire::{FrameChannel, PanelEvent, PanelRequest, TransportError, WireError, decode};
use tracing::{debug, info, warn};

use crate::{ClientConfig, Renderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    Transport(TransportError),
    Wire(WireError),
    /// The control side answered with an `error` event.
    Remote { message: String },
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "panel transport: {error}"),
            Self::Wire(error) => write!(f, "panel wire: {error}"),
            Self::Remote { message } => f.write_str(message),
        }
    }
}

impl Error for PanelError {}

impl From<TransportError> for PanelError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<WireError> for PanelError {
    fn from(error: WireError) -> Self {
        Self::Wire(error)
    }
}

/// One line of the compilation listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub id: CompilationId,
    pub scripts: Vec<Script>,
}

impl ListEntry {
    /// `name (file:line)` of the outermost script.
    pub fn title(&self) -> String {
        match self.scripts.first() {
            Some(script) => format!("{} ({})", script.name(), script.location()),
            None => format!("compilation {}", self.id),
        }
    }
}

/// The compilation currently on display.
#[derive(Debug, Clone)]
pub struct Selection {
    pub id: CompilationId,
    pub scripts: Vec<Script>,
    pub graph: Graph,
    pub tree: InlineTree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome<I> {
    Rendered(I),
    /// Nothing is shown; the error indicator carries the message.
    Failed(String),
}

/// Render surface state: listing, connection indicator, mode, and the
/// latest render.
pub struct Panel<R: Renderer> {
    channel: FrameChannel,
    renderer: R,
    entries: Vec<ListEntry>,
    connected: bool,
    mode: IrMode,
    selection: Option<Selection>,
    outcome: Option<RenderOutcome<R::Image>>,
}

impl<R: Renderer> Panel<R> {
    pub fn new(channel: FrameChannel, renderer: R, mode: IrMode) -> Self {
        Self {
            channel,
            renderer,
            entries: Vec::new(),
            connected: false,
            mode,
            selection: None,
            outcome: None,
        }
    }

    /// A panel drawing in the configured default mode.
    pub fn with_config(channel: FrameChannel, renderer: R, config: &ClientConfig) -> Self {
        Self::new(channel, renderer, config.default_mode)
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn mode(&self) -> IrMode {
        self.mode
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn outcome(&self) -> Option<&RenderOutcome<R::Image>> {
        self.outcome.as_ref()
    }

    pub async fn connect(&mut self) -> Result<(), PanelError> {
        self.post(&PanelRequest::Connect)?;
        loop {
            match self.next_event().await? {
                PanelEvent::Attached => return Ok(()),
                PanelEvent::Error { message, .. } => return Err(PanelError::Remote { message }),
                _ => {}
            }
        }
    }

    pub async fn disconnect(&mut self) -> Result<(), PanelError> {
        self.post(&PanelRequest::Disconnect)?;
        loop {
            match self.next_event().await? {
                PanelEvent::Unregistered => return Ok(()),
                PanelEvent::Error { message, .. } => return Err(PanelError::Remote { message }),
                _ => {}
            }
        }
    }

    /// Requests the graph of `id` and renders it in the current mode.
    pub async fn select(&mut self, id: CompilationId) -> Result<(), PanelError> {
        self.post(&PanelRequest::SelectCompilation { id })?;
        loop {
            match self.next_event().await? {
                PanelEvent::CompilationGraph {
                    id: got,
                    scripts,
                    graph,
                } if got == id => {
                    let tree = reconstruct(&graph.mir.blocks, &scripts);
                    self.selection = Some(Selection {
                        id,
                        scripts,
                        graph,
                        tree,
                    });
                    self.render();
                    return Ok(());
                }
                PanelEvent::Error { id: about, message } if about.is_none() || about == Some(id) => {
                    self.selection = None;
                    self.outcome = Some(RenderOutcome::Failed(message.clone()));
                    return Err(PanelError::Remote { message });
                }
                _ => {}
            }
        }
    }

    /// Switches the display mode and redraws the current selection.
    pub fn set_mode(&mut self, mode: IrMode) {
        if self.mode == mode {
            return;
        }
        debug!(%mode, "display mode changed");
        self.mode = mode;
        self.render();
    }

    /// Drops `id` from the listing and tells the control side to forget it.
    pub fn remove(&mut self, id: CompilationId) -> Result<(), PanelError> {
        self.entries.retain(|entry| entry.id != id);
        if self.selection.as_ref().is_some_and(|s| s.id == id) {
            self.selection = None;
            self.outcome = None;
        }
        self.post(&PanelRequest::RemoveCompilation { id })
    }

    /// Forwards a diagnostic line to the control side's log.
    pub fn message(&mut self, msg: impl Into<String>) -> Result<(), PanelError> {
        self.post(&PanelRequest::Message { msg: msg.into() })
    }

    /// Waits for the next event from the control side and applies its
    /// bookkeeping. Undecodable frames surface as an `error` event.
    pub async fn next_event(&mut self) -> Result<PanelEvent, PanelError> {
        let frame = self.channel.next_frame().await.ok_or(TransportError::Closed {
            channel: self.channel.name(),
        })?;
        let event = match decode::<PanelEvent>(&frame) {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, "undecodable panel event");
                PanelEvent::Error {
                    id: None,
                    message: error.to_string(),
                }
            }
        };
        match &event {
            PanelEvent::RecordCompilation { id, scripts } => {
                self.entries.push(ListEntry {
                    id: *id,
                    scripts: scripts.clone(),
                });
            }
            PanelEvent::Attached => {
                self.connected = true;
                self.entries.clear();
            }
            PanelEvent::Detached => self.connected = false,
            PanelEvent::Registered | PanelEvent::Unregistered => {
                debug!(event = ?event, "session lifecycle");
            }
            PanelEvent::Error { id, message } => info!(?id, %message, "control side error"),
            PanelEvent::CompilationGraph { .. } => {}
        }
        Ok(event)
    }

    fn post(&self, request: &PanelRequest) -> Result<(), PanelError> {
        let text = jitscope_wire::encode(request)?;
        self.channel.post(text)?;
        Ok(())
    }

    fn render(&mut self) {
        let Some(selection) = &self.selection else {
            return;
        };
        let dot = encode(self.mode, &selection.graph, &selection.scripts, &selection.tree);
        self.outcome = Some(match self.renderer.render(&dot) {
            Ok(image) => RenderOutcome::Rendered(image),
            Err(error) => {
                warn!(id = %selection.id, %error, "render failed");
                RenderOutcome::Failed(error.to_string())
            }
        });
    }
}
