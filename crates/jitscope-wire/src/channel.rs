use tokio::sync::mpsc;
use tracing::trace;

use crate::TransportError;

/// Default upper bound on a single frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 128 * 1024 * 1024;

/// One endpoint of a bidirectional text frame channel.
///
/// Frames are delivered whole, in order, at most once, with no
/// acknowledgement. Each direction is an unbounded queue so a burst of
/// compilations never blocks the sender.
pub struct FrameChannel {
    name: &'static str,
    max_frame_bytes: usize,
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Creates two connected endpoints.
pub fn channel_pair(name: &'static str, max_frame_bytes: usize) -> (FrameChannel, FrameChannel) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        FrameChannel {
            name,
            max_frame_bytes,
            tx: a_tx,
            rx: a_rx,
        },
        FrameChannel {
            name,
            max_frame_bytes,
            tx: b_tx,
            rx: b_rx,
        },
    )
}

impl FrameChannel {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueues a frame for the peer.
    pub fn post(&self, frame: String) -> Result<(), TransportError> {
        if frame.len() > self.max_frame_bytes {
            return Err(TransportError::FrameTooLarge {
                channel: self.name,
                len: frame.len(),
                max: self.max_frame_bytes,
            });
        }
        trace!(channel = self.name, frame_len = frame.len(), "post frame");
        self.tx
            .send(frame)
            .map_err(|_| TransportError::Closed { channel: self.name })
    }

    /// Waits for the next frame. `None` once the peer is gone and the queue
    /// is drained. Cancel-safe.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Posts `frame` and resolves with whatever frame arrives next.
    ///
    /// Correlation is purely positional: do not have more than one request
    /// outstanding on the same channel.
    pub async fn request(&mut self, frame: String) -> Result<String, TransportError> {
        self.post(frame)?;
        self.next_frame()
            .await
            .ok_or(TransportError::Closed { channel: self.name })
    }
}
