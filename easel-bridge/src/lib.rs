//! # easel-bridge — Event/action bridge to the embedded diagram editor
//!
//! Translates application-level intents into the embedded drawio
//! component's tagged wire actions, and its inbound wire events into
//! typed, subscribable notifications.
//!
//! ## Architecture
//!
//! ```text
//! Application intent                        Embedded component
//!       │                                           ▲
//!       ▼                                           │ JSON action
//! DrawioInstance ──EmbedAction──▸ ActionChannel ────┘
//!       ▲                                           │ JSON event
//!       │ typed broadcast (per category)            ▼
//! Subscribers ◀──EmbedEvent match──── handle_wire_event()
//! ```
//!
//! The [`channel::ActionChannel`] trait is the boundary to the real
//! message transport (queuing, request/response correlation, and origin
//! validation live behind it). [`DrawioInstance`] owns one broadcast
//! sender per inbound event category, so every category is an
//! independent fan-out with multiple subscribers and no backpressure.
//!
//! ## Modules
//!
//! - [`channel`] — transport boundary trait and its error type
//! - [`protocol`] — tagged wire actions, events, and payload shapes
//! - [`instance`] — [`DrawioInstance`], the bridge itself
//! - [`ghosts`] — session-map → ghost cursor/selection projection

pub mod channel;
pub mod ghosts;
pub mod instance;
pub mod protocol;

// Re-exports for convenience
pub use channel::{ActionChannel, ChannelError};
pub use ghosts::{project_ghosts, GhostUpdate};
pub use instance::{BridgeError, DrawioInstance, EventDispatch};
pub use protocol::{
    CursorMove, EmbedAction, EmbedEvent, FocusChange, GhostCursor, GhostSelection, NewVertex,
    NodeSelection, PluginLoad, SelectionChange, Vertex,
};
