//! Compositing and the orchestrator loop
//!
//! - [`layout`]: grid geometry and nearest-neighbour scaling
//! - [`canvas`]: the persistent tiled canvas
//! - [`display`]: rendering surfaces and key bindings
//! - [`orchestrator`]: the fixed-period loop owning sessions and recorder

pub mod canvas;
pub mod display;
pub mod layout;
pub mod orchestrator;

pub use canvas::{CompositeFrame, Compositor};
pub use display::{
    Command, ConsoleDisplay, Display, DisplayFeedback, HeadlessDisplay, KeyBindings, KEY_ESC,
};
pub use layout::{resize_nearest, Grid, GridLayout};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunSummary};
