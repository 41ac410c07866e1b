//! Per-session peer map with deduplicated change fan-out.
//!
//! [`SessionModel::apply`] is the sole mutation point for the map; a
//! structurally identical update collapses to a no-op so observers never
//! see needless re-render cascades. Changes fan out over a tokio
//! broadcast channel — every observer gets an independent receiver,
//! lagging receivers drop oldest rather than block.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::broadcast;

use crate::view_state::{PeerId, PeerViewState, Point, ViewState};

/// Default capacity of the change broadcast channel.
const DEFAULT_CHANGE_CAPACITY: usize = 64;

/// Update events arriving from the collaboration transport.
///
/// Wire shape is an internally tagged JSON object:
/// `{"type": "updateViewState", "peerId": 3, "newViewState": {…}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionUpdate {
    /// Replace a peer's entire view state (`None` = peer closed its view).
    #[serde(rename_all = "camelCase")]
    UpdateViewState {
        peer_id: PeerId,
        new_view_state: Option<ViewState>,
    },
    /// Drop a peer from the session map.
    #[serde(rename_all = "camelCase")]
    RemovePeer { peer_id: PeerId },
    /// Move only a peer's cursor (`None` = cursor left the canvas).
    #[serde(rename_all = "camelCase")]
    UpdateCursor {
        peer_id: PeerId,
        cursor_position: Option<Point>,
    },
}

/// Change notifications emitted to observers, keyed by peer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    /// A peer's entry was created or replaced; carries the new snapshot.
    ViewStateChanged { peer_id: PeerId, entry: PeerViewState },
    /// A peer's entry was removed.
    PeerRemoved { peer_id: PeerId },
}

/// Latest view state reported by each remote peer of one session.
///
/// `BTreeMap` storage keeps [`SessionModel::peers`] iteration in
/// ascending peer-id order, so downstream projections are deterministic.
/// Single-threaded by design: no internal locking, callers serialize
/// through `apply`.
pub struct SessionModel {
    peers: BTreeMap<PeerId, PeerViewState>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for SessionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionModel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Create with a custom change-channel capacity (for testing).
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            peers: BTreeMap::new(),
            changes,
        }
    }

    /// Apply one update from the collaboration transport.
    ///
    /// `UpdateViewState` replaces the peer's entry only when the candidate
    /// differs structurally from what is stored; an identical update is a
    /// designed no-op with no notification. `RemovePeer` drops the entry
    /// and notifies only if one existed. `UpdateCursor` merges a new
    /// cursor into an open view and dedups the same way; a lone cursor
    /// for an unknown peer or a closed view cannot conjure an entry.
    pub fn apply(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::UpdateViewState { peer_id, new_view_state } => {
                let candidate = PeerViewState {
                    peer_id,
                    view_state: new_view_state,
                };
                if self.peers.get(&peer_id) == Some(&candidate) {
                    return; // dedup: identical update, no notification
                }
                self.peers.insert(peer_id, candidate.clone());
                self.notify(SessionChange::ViewStateChanged { peer_id, entry: candidate });
            }

            SessionUpdate::RemovePeer { peer_id } => {
                if self.peers.remove(&peer_id).is_some() {
                    log::debug!("peer {peer_id} removed from session");
                    self.notify(SessionChange::PeerRemoved { peer_id });
                }
            }

            SessionUpdate::UpdateCursor { peer_id, cursor_position } => {
                let Some(entry) = self.peers.get_mut(&peer_id) else {
                    return;
                };
                let Some(view) = entry.view_state.as_mut() else {
                    return; // no open view to attach a cursor to
                };
                if view.current_cursor == cursor_position {
                    return;
                }
                view.current_cursor = cursor_position;
                let snapshot = entry.clone();
                self.notify(SessionChange::ViewStateChanged { peer_id, entry: snapshot });
            }
        }
    }

    /// Subscribe to change notifications.
    ///
    /// Each receiver is independent; delivery is synchronous fan-out at
    /// `apply` time with no backpressure.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    /// Look up a single peer's entry.
    pub fn peer(&self, peer_id: PeerId) -> Option<&PeerViewState> {
        self.peers.get(&peer_id)
    }

    /// All entries, in ascending peer-id order.
    pub fn peers(&self) -> impl Iterator<Item = &PeerViewState> {
        self.peers.values()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    fn notify(&self, change: SessionChange) {
        // No receivers is fine — observers are optional.
        let _ = self.changes.send(change);
    }
}

// ===================================================================
// Tests
// ===================================================================
