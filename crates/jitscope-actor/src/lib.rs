//! The runtime-side half of jitscope.
//!
//! A [`JitActor`] lives inside the instrumented runtime. Once attached it
//! installs a compilation hook through the [`Host`] and streams one
//! `compilation` packet per finished compilation over its
//! [`FrameChannel`](jitscope_wire::FrameChannel):
//!
//! ```rust,ignore
//! let (runtime_side, control_side) = jitscope_wire::channel_pair("runtime", max_frame_bytes);
//! tokio::spawn(JitActor::new(host).serve(runtime_side));
//! ```
//!
//! The actor is a two-state machine, `detached` and `attached`; requests
//! made in the wrong state are answered with a `wrong-state` packet and do
//! not change anything.

mod actor;
mod host;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use actor::*;
pub use host::*;
