//! Layout, incremental update and direct-manipulation engine for
//! hierarchical Gantt timelines.
//!
//! The engine is renderer-agnostic. A host hands a [`TimelineSession`] the
//! node tree, forwards pointer and keyboard input, and receives one-way
//! intents through [`ScheduleHost`] and geometry updates through
//! [`RenderSink`].

pub mod config;
pub mod error;
pub mod host;
pub mod interaction;
pub mod io;
pub mod layout;
pub mod model;
pub mod render;
pub mod session;

pub use config::TimelineConfig;
pub use error::{Result, TimelineError};
pub use host::{Ack, IntentTicket, ScheduleHost};
pub use interaction::{Gesture, GestureOutcome, PointerTarget};
pub use layout::{route, Point, ToggleOutcome};
pub use model::{CollapseKey, Node, NodeKind, ToggleDirection};
pub use render::{NullSink, RenderSink, SceneUpdate};
pub use session::TimelineSession;
