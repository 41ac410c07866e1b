//! Error taxonomy for settings access.

use std::path::PathBuf;

/// Failures surfaced by configuration reads and writes.
///
/// Malformed persisted scalars are not defensively validated (defaults
/// apply on absence only); malformed structured values surface from
/// whichever getter parses them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `${workspaceFolder}` was used for a document outside any workspace.
    #[error("no workspace folder encloses '{uri}' while expanding ${{workspaceFolder}}")]
    NoWorkspaceFolder { uri: String },

    #[error("failed to read library file '{path}': {source}")]
    LibraryRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An XML library payload had no element content to extract.
    #[error("library XML carries no element content")]
    MalformedXml,

    #[error("malformed JSON in persisted setting: {0}")]
    Json(#[from] serde_json::Error),

    #[error("local-storage value is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("local-storage value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The persisted local-storage value had an unexpected JSON shape.
    #[error("local-storage value must be a string or an object, got {found}")]
    LocalStorageShape { found: &'static str },

    #[error("failed to persist settings: {0}")]
    Persist(#[from] std::io::Error),
}
