use jitscope_types::CompilationId;
use jitscope_wire::{FrameChannel, GraphFrame, PanelEvent, PanelRequest, RawJson, decode, encode};
use tracing::{debug, info, warn};

use crate::{ActorFront, CompilationEvent, SnapshotStore};

/// Control side of one panel session.
///
/// Owns the snapshot store and the actor front, and serves the panel channel
/// and actor events from a single loop, one message at a time.
pub struct Controller {
    store: SnapshotStore,
    actor: ActorFront,
    panel: FrameChannel,
    attached: bool,
    actor_open: bool,
}

impl Controller {
    pub fn new(actor: ActorFront, panel: FrameChannel) -> Self {
        Self {
            store: SnapshotStore::new(),
            actor,
            panel,
            attached: false,
            actor_open: true,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Runs until the panel channel closes.
    pub async fn run(mut self) {
        info!(channel = self.panel.name(), "controller running");
        loop {
            tokio::select! {
                biased;
                frame = self.panel.next_frame() => {
                    let Some(frame) = frame else { break };
                    self.handle_frame(&frame).await;
                }
                event = self.actor.next_event(), if self.actor_open => match event {
                    Some(event) => self.record(event),
                    None => {
                        warn!("actor channel closed");
                        self.actor_open = false;
                        self.attached = false;
                    }
                },
            }
        }
        info!(recorded = self.store.len(), "panel closed, controller stopping");
    }

    async fn handle_frame(&mut self, frame: &str) {
        let request = match decode::<PanelRequest>(frame) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "undecodable panel request");
                self.send_error(None, error.to_string());
                return;
            }
        };
        debug!(?request, "panel request");

        match request {
            PanelRequest::Connect => self.connect().await,
            PanelRequest::Disconnect => self.disconnect().await,
            PanelRequest::SelectCompilation { id } => self.select(id),
            PanelRequest::RemoveCompilation { id } => {
                if let Err(error) = self.store.remove(id) {
                    self.send_error(Some(id), error.to_string());
                }
            }
            PanelRequest::Message { msg } => info!(%msg, "panel message"),
        }
    }

    async fn connect(&mut self) {
        self.send(&PanelEvent::Registered);
        match self.actor.attach().await {
            Ok(_) => {
                // Ids restart only once a new session exists.
                self.store.clear();
                self.attached = true;
                self.send(&PanelEvent::Attached);
            }
            Err(error) => {
                warn!(%error, "attach failed");
                self.send_error(None, error.to_string());
            }
        }
    }

    async fn disconnect(&mut self) {
        match self.actor.detach().await {
            Ok(_) => {
                self.attached = false;
                let dropped = self.actor.discard_backlog();
                if dropped > 0 {
                    debug!(dropped, "dropping compilations received during detach");
                }
                self.send(&PanelEvent::Detached);
                self.send(&PanelEvent::Unregistered);
            }
            Err(error) => {
                warn!(%error, "detach failed");
                self.send_error(None, error.to_string());
            }
        }
    }

    fn select(&self, id: CompilationId) {
        let snapshot = match self.store.get(id) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.send_error(Some(id), error.to_string());
                return;
            }
        };
        let frame = GraphFrame {
            id,
            scripts: snapshot.scripts.clone(),
            graph: snapshot.graph.clone(),
        };
        let posted = frame
            .encode()
            .map_err(|error| error.to_string())
            .and_then(|text| self.panel.post(text).map_err(|error| error.to_string()));
        if let Err(message) = posted {
            warn!(%id, %message, "failed to send compilation graph");
            self.send_error(Some(id), message);
        }
    }

    fn record(&mut self, event: CompilationEvent) {
        if !self.attached {
            debug!("compilation arrived with no attached session, ignored");
            return;
        }
        let graph = match RawJson::new(event.json) {
            Ok(graph) => graph,
            Err(error) => {
                warn!(%error, "compilation graph ignored");
                return;
            }
        };
        let scripts = event.scripts;
        let id = self.store.append(scripts.clone(), graph);
        debug!(%id, scripts = scripts.len(), "compilation recorded");
        self.send(&PanelEvent::RecordCompilation { id, scripts });
    }

    fn send_error(&self, id: Option<CompilationId>, message: String) {
        self.send(&PanelEvent::Error { id, message });
    }

    fn send(&self, event: &PanelEvent) {
        let result = encode(event)
            .map_err(|error| error.to_string())
            .and_then(|text| self.panel.post(text).map_err(|error| error.to_string()));
        if let Err(error) = result {
            warn!(%error, "failed to send panel event");
        }
    }
}
