//! The bridge itself: one [`DrawioInstance`] per embedded component.
//!
//! Outbound methods serialize an [`EmbedAction`] and hand it to the
//! channel; `get_vertices` is the single request/response operation and
//! fails hard on a mismatched response tag (protocol desynchronization
//! is surfaced, never papered over with an empty default). Inbound wire
//! events are matched exhaustively and fanned out on per-category
//! broadcast channels.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::channel::{ActionChannel, ChannelError};
use crate::protocol::{
    CursorMove, EmbedAction, EmbedEvent, FocusChange, GhostCursor, GhostSelection, NewVertex,
    NodeSelection, PluginLoad, SelectionChange, Vertex, KNOWN_EVENT_TAGS,
};

/// Capacity of each per-category event channel.
const EVENT_CAPACITY: usize = 64;

/// Response tag expected for `getVertices`.
const GET_VERTICES_TAG: &str = "getVertices";

/// Errors surfaced by bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The correlated response carried the wrong tag — the wire is
    /// desynchronized. No retry at this layer.
    #[error("invalid response: expected tag '{expected}', got '{found}'")]
    InvalidResponse {
        expected: &'static str,
        found: String,
    },

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("malformed wire payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Outcome of dispatching one inbound wire event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDispatch {
    /// The event was one of ours and has been fanned out.
    Handled,
    /// Not a tag this bridge claims; the caller's default handling owns it.
    Unhandled(Value),
}

#[derive(Deserialize)]
struct GetVerticesResponse {
    vertices: Vec<Vertex>,
}

/// Typed facade over one embedded drawio component.
pub struct DrawioInstance {
    channel: Arc<dyn ActionChannel>,
    node_selected: broadcast::Sender<NodeSelection>,
    plugin_loaded: broadcast::Sender<PluginLoad>,
    focus_changed: broadcast::Sender<FocusChange>,
    cursor_changed: broadcast::Sender<CursorMove>,
    selection_changed: broadcast::Sender<SelectionChange>,
}

impl DrawioInstance {
    pub fn new(channel: Arc<dyn ActionChannel>) -> Self {
        Self::with_capacity(channel, EVENT_CAPACITY)
    }

    /// Create with a custom per-category channel capacity (for testing).
    pub fn with_capacity(channel: Arc<dyn ActionChannel>, capacity: usize) -> Self {
        let (node_selected, _) = broadcast::channel(capacity);
        let (plugin_loaded, _) = broadcast::channel(capacity);
        let (focus_changed, _) = broadcast::channel(capacity);
        let (cursor_changed, _) = broadcast::channel(capacity);
        let (selection_changed, _) = broadcast::channel(capacity);
        Self {
            channel,
            node_selected,
            plugin_loaded,
            focus_changed,
            cursor_changed,
            selection_changed,
        }
    }

    // ---------------------------------------------------------------
    // Outbound actions
    // ---------------------------------------------------------------

    /// Attach application data to the currently selected node.
    pub fn link_selected_node_with_data(&self, linked_data: Value) -> Result<(), BridgeError> {
        self.send(EmbedAction::LinkSelectedNodeWithData { linked_data })
    }

    /// Toggle whether nodes may be selected at all.
    pub fn set_node_selection_enabled(&self, enabled: bool) -> Result<(), BridgeError> {
        self.send(EmbedAction::SetNodeSelectionEnabled { enabled })
    }

    /// Relabel existing vertices.
    pub fn update_vertices(&self, vertices: Vec<Vertex>) -> Result<(), BridgeError> {
        self.send(EmbedAction::UpdateVertices { vertices_to_update: vertices })
    }

    /// Insert new vertices; the component assigns ids.
    pub fn add_vertices(&self, vertices: Vec<NewVertex>) -> Result<(), BridgeError> {
        self.send(EmbedAction::AddVertices { vertices })
    }

    /// Replace the rendered set of remote ghost cursors.
    pub fn update_ghost_cursors(&self, cursors: Vec<GhostCursor>) -> Result<(), BridgeError> {
        self.send(EmbedAction::UpdateGhostCursors { cursors })
    }

    /// Replace the rendered set of remote ghost selections.
    pub fn update_ghost_selections(
        &self,
        selections: Vec<GhostSelection>,
    ) -> Result<(), BridgeError> {
        self.send(EmbedAction::UpdateGhostSelections { selections })
    }

    /// Fetch the component's current vertices.
    ///
    /// The correlated response must carry the `getVertices` tag; any
    /// other tag fails with [`BridgeError::InvalidResponse`].
    pub async fn get_vertices(&self) -> Result<Vec<Vertex>, BridgeError> {
        let action = serde_json::to_value(EmbedAction::GetVertices)?;
        let response = self.channel.request(action).await?;

        let tag = response
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if tag != GET_VERTICES_TAG {
            return Err(BridgeError::InvalidResponse {
                expected: GET_VERTICES_TAG,
                found: tag.to_string(),
            });
        }

        let parsed: GetVerticesResponse = serde_json::from_value(response)?;
        Ok(parsed.vertices)
    }

    fn send(&self, action: EmbedAction) -> Result<(), BridgeError> {
        let value = serde_json::to_value(action)?;
        self.channel.send(value)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Inbound dispatch
    // ---------------------------------------------------------------

    /// Dispatch one inbound wire event to its typed subscribers.
    ///
    /// Invoked by the channel on arrival, one event at a time. Tags this
    /// bridge does not claim are returned as
    /// [`EventDispatch::Unhandled`] so the channel's default handling
    /// can take over; a claimed tag with a malformed payload is an
    /// error.
    pub fn handle_wire_event(&self, raw: Value) -> Result<EventDispatch, BridgeError> {
        let tag = raw.get("event").and_then(Value::as_str);
        if !tag.is_some_and(|t| KNOWN_EVENT_TAGS.contains(&t)) {
            log::debug!("passing through unrecognized event tag {tag:?}");
            return Ok(EventDispatch::Unhandled(raw));
        }

        match serde_json::from_value::<EmbedEvent>(raw)? {
            EmbedEvent::NodeSelected(payload) => {
                let _ = self.node_selected.send(payload);
            }
            EmbedEvent::PluginLoaded(payload) => {
                let _ = self.plugin_loaded.send(payload);
            }
            EmbedEvent::FocusChanged(payload) => {
                let _ = self.focus_changed.send(payload);
            }
            EmbedEvent::CursorChanged(payload) => {
                let _ = self.cursor_changed.send(payload);
            }
            EmbedEvent::SelectionChanged(payload) => {
                let _ = self.selection_changed.send(payload);
            }
        }
        Ok(EventDispatch::Handled)
    }

    // ---------------------------------------------------------------
    // Subscriptions (independent per category)
    // ---------------------------------------------------------------

    pub fn subscribe_node_selected(&self) -> broadcast::Receiver<NodeSelection> {
        self.node_selected.subscribe()
    }

    pub fn subscribe_plugin_loaded(&self) -> broadcast::Receiver<PluginLoad> {
        self.plugin_loaded.subscribe()
    }

    pub fn subscribe_focus_changed(&self) -> broadcast::Receiver<FocusChange> {
        self.focus_changed.subscribe()
    }

    pub fn subscribe_cursor_changed(&self) -> broadcast::Receiver<CursorMove> {
        self.cursor_changed.subscribe()
    }

    pub fn subscribe_selection_changed(&self) -> broadcast::Receiver<SelectionChange> {
        self.selection_changed.subscribe()
    }
}

// ===================================================================
// Tests
// ===================================================================
