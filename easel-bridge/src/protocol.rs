//! Tagged wire shapes of the embedded component's message protocol.
//!
//! The schema is defined by the embedded drawio component; this module
//! only models the subset the bridge interprets. Outbound actions carry
//! an `action` discriminant, inbound events an `event` discriminant,
//! both with camelCase payload fields:
//!
//! ```text
//! out: {"action": "updateGhostCursors", "cursors": [...]}
//! in:  {"event": "nodeSelected", "label": "...", "linkedData": {...}}
//! ```

use easel_collab::{PeerId, Point};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ───────────────────────────────────────────────────────────────────
// Payload shapes
// ───────────────────────────────────────────────────────────────────

/// An existing diagram vertex, as reported by `getVertices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: String,
    pub label: String,
}

/// A vertex to be created (the component assigns the id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVertex {
    pub label: String,
}

/// A remote peer's cursor, rendered as a ghost on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostCursor {
    pub peer_id: PeerId,
    pub position: Point,
}

/// A remote peer's selection, rendered as ghost highlights.
///
/// An empty `selected_cell_ids` clears the peer's previous highlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostSelection {
    pub peer_id: PeerId,
    pub selected_cell_ids: Vec<String>,
}

// ───────────────────────────────────────────────────────────────────
// Outbound actions
// ───────────────────────────────────────────────────────────────────

/// Actions sent to the embedded component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EmbedAction {
    #[serde(rename_all = "camelCase")]
    LinkSelectedNodeWithData { linked_data: Value },

    GetVertices,

    #[serde(rename_all = "camelCase")]
    SetNodeSelectionEnabled { enabled: bool },

    #[serde(rename_all = "camelCase")]
    UpdateVertices { vertices_to_update: Vec<Vertex> },

    #[serde(rename_all = "camelCase")]
    AddVertices { vertices: Vec<NewVertex> },

    #[serde(rename_all = "camelCase")]
    UpdateGhostCursors { cursors: Vec<GhostCursor> },

    #[serde(rename_all = "camelCase")]
    UpdateGhostSelections { selections: Vec<GhostSelection> },
}

// ───────────────────────────────────────────────────────────────────
// Inbound events
// ───────────────────────────────────────────────────────────────────

/// A node was selected inside the component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelection {
    pub label: String,
    pub linked_data: Value,
}

/// A component-side plugin finished loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginLoad {
    pub plugin_id: String,
}

/// The component gained or lost keyboard focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusChange {
    pub has_focus: bool,
}

/// The local cursor moved; `None` means it left the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMove {
    #[serde(default)]
    pub new_position: Option<Point>,
}

/// The local selection changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionChange {
    pub selected_cell_ids: Vec<String>,
}

/// Inbound events this bridge interprets, as a closed tagged union.
///
/// The component emits further event kinds; those stay opaque here and
/// fall through to the channel's default handling (see
/// [`crate::DrawioInstance::handle_wire_event`]).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EmbedEvent {
    NodeSelected(NodeSelection),
    PluginLoaded(PluginLoad),
    FocusChanged(FocusChange),
    CursorChanged(CursorMove),
    SelectionChanged(SelectionChange),
}

/// Event tags claimed by [`EmbedEvent`]. Anything else is not ours.
pub(crate) const KNOWN_EVENT_TAGS: [&str; 5] = [
    "nodeSelected",
    "pluginLoaded",
    "focusChanged",
    "cursorChanged",
    "selectionChanged",
];

// ===================================================================
// Tests
// ===================================================================
