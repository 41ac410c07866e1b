//! Transport boundary to the embedded component.
//!
//! The real channel (webview messaging, request/response correlation,
//! origin validation) lives outside this crate; the bridge only needs
//! the two primitives below. Actions are delivered in call order (FIFO
//! per direction); there is no cross-ordering guarantee between an
//! outbound request and unrelated inbound events.

use futures_util::future::BoxFuture;
use serde_json::Value;

/// Failures of the underlying message channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel to the embedded component is closed")]
    Closed,

    #[error("failed to deliver action: {0}")]
    Send(String),
}

/// Bidirectional message channel to one embedded component instance.
///
/// Implementations must preserve send order. A dropped [`request`]
/// future leaves any correlation state to the channel's own lifecycle;
/// the bridge never cancels or retries.
///
/// [`request`]: ActionChannel::request
pub trait ActionChannel: Send + Sync {
    /// Fire-and-forget delivery of a tagged action object.
    fn send(&self, action: Value) -> Result<(), ChannelError>;

    /// Deliver an action and resolve with its correlated response.
    fn request(&self, action: Value) -> BoxFuture<'static, Result<Value, ChannelError>>;
}
