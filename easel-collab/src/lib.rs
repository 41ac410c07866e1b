//! # easel-collab — Session view-state model for Easel
//!
//! Tracks "who is looking at what" across the peers of a collaborative
//! diagram-editing session: which document each peer has open, where its
//! cursor is, and which cells it has selected.
//!
//! ## Architecture
//!
//! ```text
//! Collaboration transport
//!       │  SessionUpdate (tagged union)
//!       ▼
//! SessionModel::apply()
//!       │  structural-equality dedup
//!       ▼
//! BTreeMap<PeerId, PeerViewState>
//!       │
//!       ▼  SessionChange (broadcast)
//! Observers (ghost cursors, presence UI, …)
//! ```
//!
//! ## Modules
//!
//! - [`view_state`] — value shapes: [`Point`], [`NormalizedUri`],
//!   [`ViewState`], [`PeerViewState`]
//! - [`session`] — [`SessionModel`], the single mutation point for the
//!   peer map, with change fan-out over a tokio broadcast channel

pub mod session;
pub mod view_state;

// Re-exports for convenience
pub use session::{SessionChange, SessionModel, SessionUpdate};
pub use view_state::{NormalizedUri, PeerId, PeerViewState, Point, ViewState};
