//! Value shapes describing what a peer is looking at.
//!
//! All types serialize as camelCase JSON so they can travel unchanged
//! over the session update feed and into the embedded component's
//! ghost-rendering actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer identifier of a remote session participant.
///
/// Negative values are accepted without validation; the trust boundary
/// belongs to the collaboration transport, not this layer.
pub type PeerId = i64;

/// 2D position in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Opaque, canonicalized document identifier.
///
/// Canonicalization happens where the URI is produced (host side);
/// here equality, ordering, and hashing are plain string operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedUri(String);

impl NormalizedUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NormalizedUri {
    fn from(uri: &str) -> Self {
        Self(uri.to_string())
    }
}

/// The document, cursor, and selection a peer currently has active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// Document the peer has open.
    pub active_uri: NormalizedUri,
    /// Cursor position on the canvas; `None` when the cursor left it.
    pub current_cursor: Option<Point>,
    /// Selected cell ids, in selection order. Duplicates are tolerated.
    pub selected_cell_ids: Vec<String>,
}

impl ViewState {
    pub fn new(active_uri: NormalizedUri) -> Self {
        Self {
            active_uri,
            current_cursor: None,
            selected_cell_ids: Vec::new(),
        }
    }

    pub fn with_cursor(mut self, cursor: Point) -> Self {
        self.current_cursor = Some(cursor);
        self
    }

    pub fn with_selection(mut self, cell_ids: Vec<String>) -> Self {
        self.selected_cell_ids = cell_ids;
        self
    }
}

/// One entry of the session map: a peer and its last-known view state.
///
/// `view_state: None` means the peer has no view open. Structural
/// equality (derived `PartialEq`) is the dedup comparison used by
/// [`crate::SessionModel::apply`] — never serialized-string comparison,
/// so field order can never affect the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerViewState {
    pub peer_id: PeerId,
    pub view_state: Option<ViewState>,
}

// ===================================================================
// Tests
// ===================================================================
