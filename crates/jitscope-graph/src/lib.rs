//! Turns one compilation's graph into something a human can look at.
//!
//! [`reconstruct`] recovers the inlining call tree from the flattened
//! per-block resume points, and [`encode`] compiles a pass (or the call tree
//! itself) into Graphviz DOT text for an external renderer.

pub mod dot;
pub mod hierarchy;

pub use dot::{IrMode, encode};
pub use hierarchy::{FrameId, InlineFrame, InlineTree, ReconstructionIssue, reconstruct};
