//! Shared data model for jitscope.
//!
//! Everything here mirrors what the instrumented runtime emits for one
//! compilation:
//!
//! - [`Script`]: source metadata for a compiled (or inlined) function.
//! - [`Graph`]: the compiler's control-flow graph at two lowering stages,
//!   [`Graph::mir`] and [`Graph::lir`], each a list of [`Block`]s.
//! - [`ResumePoint`]: a compiler checkpoint; its `caller` links an inlined
//!   block back to the call site that caused the inlining.
//!
//! These values are produced by the runtime and never mutated afterwards.

mod graph;
mod ids;
mod script;

pub use graph::*;
pub use ids::*;
pub use script::*;
