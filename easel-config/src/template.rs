//! Minimal template substitution for settings values.
//!
//! One placeholder is recognized: `${workspaceFolder}`, the root of the
//! workspace enclosing the document whose setting is being read.
//! Unrecognized placeholders pass through untouched.

use easel_collab::NormalizedUri;

use crate::error::ConfigError;
use crate::host::HostEnvironment;

const WORKSPACE_FOLDER: &str = "${workspaceFolder}";

/// Expand recognized placeholders in `input` for the given document.
///
/// Fails with [`ConfigError::NoWorkspaceFolder`] when the placeholder is
/// used but no workspace encloses the document — a descriptive error,
/// never a default path. The host is not consulted otherwise.
pub fn expand_placeholders(
    input: &str,
    uri: &NormalizedUri,
    host: &dyn HostEnvironment,
) -> Result<String, ConfigError> {
    if !input.contains(WORKSPACE_FOLDER) {
        return Ok(input.to_string());
    }

    let root = host
        .workspace_root(uri)
        .ok_or_else(|| ConfigError::NoWorkspaceFolder {
            uri: uri.as_str().to_string(),
        })?;

    Ok(input.replace(WORKSPACE_FOLDER, &root.to_string_lossy()))
}

// ===================================================================
// Tests
// ===================================================================
