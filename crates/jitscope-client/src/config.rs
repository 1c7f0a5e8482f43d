use jitscope_graph::IrMode;
use jitscope_wire::{DEFAULT_MAX_FRAME_BYTES, FrameChannel};
use tracing::warn;

pub const MAX_FRAME_BYTES_ENV: &str = "JITSCOPE_MAX_FRAME_BYTES";
pub const DEFAULT_MODE_ENV: &str = "JITSCOPE_DEFAULT_MODE";

/// Client settings. Invalid values fall back to the defaults with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Largest frame either channel endpoint will post.
    pub max_frame_bytes: usize,
    /// Mode a freshly opened panel draws in.
    pub default_mode: IrMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            default_mode: IrMode::Mir,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            max_frame_bytes: max_frame_bytes(lookup(MAX_FRAME_BYTES_ENV)),
            default_mode: default_mode(lookup(DEFAULT_MODE_ENV)),
        }
    }

    /// A connected channel pair capped at [`ClientConfig::max_frame_bytes`].
    pub fn channel_pair(&self, name: &'static str) -> (FrameChannel, FrameChannel) {
        jitscope_wire::channel_pair(name, self.max_frame_bytes)
    }
}

fn max_frame_bytes(raw: Option<String>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_MAX_FRAME_BYTES;
    };
    match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => v,
        _ => {
            warn!(
                value = %raw,
                default = DEFAULT_MAX_FRAME_BYTES,
                "invalid {MAX_FRAME_BYTES_ENV}, using default"
            );
            DEFAULT_MAX_FRAME_BYTES
        }
    }
}

fn default_mode(raw: Option<String>) -> IrMode {
    let Some(raw) = raw else {
        return IrMode::Mir;
    };
    match raw.parse::<IrMode>() {
        Ok(mode) => mode,
        Err(error) => {
            warn!(%error, "invalid {DEFAULT_MODE_ENV}, using mir");
            IrMode::Mir
        }
    }
}
