//! Projection from the session peer map to ghost rendering actions.
//!
//! For one document, turns every remote peer's view state into the
//! cursor and selection payloads of `updateGhostCursors` /
//! `updateGhostSelections`. Output order follows input order, so a map
//! fed from [`SessionModel::peers`] projects deterministically.
//!
//! [`SessionModel::peers`]: easel_collab::SessionModel::peers

use easel_collab::{NormalizedUri, PeerViewState};

use crate::instance::{BridgeError, DrawioInstance};
use crate::protocol::{GhostCursor, GhostSelection};

/// One frame of ghost data for a single document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GhostUpdate {
    pub cursors: Vec<GhostCursor>,
    pub selections: Vec<GhostSelection>,
}

impl GhostUpdate {
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty() && self.selections.is_empty()
    }
}

/// Project the peers viewing `uri` into ghost payloads.
///
/// A peer contributes a selection entry whenever its open view is this
/// document — an empty selection still clears its previous highlight —
/// and a cursor entry only while its cursor is on the canvas.
pub fn project_ghosts<'a>(
    peers: impl IntoIterator<Item = &'a PeerViewState>,
    uri: &NormalizedUri,
) -> GhostUpdate {
    let mut update = GhostUpdate::default();

    for peer in peers {
        let Some(view) = peer.view_state.as_ref() else {
            continue;
        };
        if view.active_uri != *uri {
            continue;
        }

        update.selections.push(GhostSelection {
            peer_id: peer.peer_id,
            selected_cell_ids: view.selected_cell_ids.clone(),
        });
        if let Some(position) = view.current_cursor {
            update.cursors.push(GhostCursor { peer_id: peer.peer_id, position });
        }
    }

    update
}

impl DrawioInstance {
    /// Push one projected frame to the component, cursors first.
    pub fn apply_ghost_update(&self, update: GhostUpdate) -> Result<(), BridgeError> {
        self.update_ghost_cursors(update.cursors)?;
        self.update_ghost_selections(update.selections)
    }
}

// ===================================================================
// Tests
// ===================================================================
