//! Client side of jitscope.
//!
//! Two halves share this crate:
//!
//! - the control side, [`Controller`], which owns the [`SnapshotStore`] and
//!   talks to the runtime actor through an [`ActorFront`];
//! - the render surface, [`Panel`], which lists recorded compilations,
//!   requests graphs, and hands DOT text to a [`Renderer`].
//!
//! They talk over a panel channel from [`jitscope_wire::channel_pair`]:
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env();
//! let (control_side, panel_side) = config.channel_pair("panel");
//! tokio::spawn(Controller::new(ActorFront::new(runtime_side), control_side).run());
//! let mut panel = Panel::with_config(panel_side, DotSource, &config);
//! panel.connect().await?;
//! ```

mod config;
mod control;
mod front;
pub mod logging;
mod panel;
mod render;
mod store;

pub use config::*;
pub use control::*;
pub use front::*;
pub use panel::*;
pub use render::*;
pub use store::*;
