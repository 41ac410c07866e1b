//! Host editor boundary: theme, context flags, workspaces, files.

use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use easel_collab::NormalizedUri;

/// The host's active visual theme family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKind {
    Light,
    Dark,
    HighContrast,
}

/// The slice of the host editor this crate consumes.
///
/// `set_context` mirrors a boolean into the host's when-clause context
/// (used to gate UI contributions). `workspace_root` answers which
/// workspace, if any, encloses a document.
pub trait HostEnvironment: Send + Sync {
    fn active_theme(&self) -> ThemeKind;

    fn set_context(&self, key: &str, value: bool);

    fn workspace_root(&self, uri: &NormalizedUri) -> Option<PathBuf>;

    /// Async file read through the host's file system access.
    fn read_file(&self, path: &Path) -> BoxFuture<'static, std::io::Result<Vec<u8>>>;
}

/// Host implementation backed by explicit state and `tokio::fs`.
///
/// Doubles as the test host: theme and workspace roots are mutable, and
/// context flags written by the config layer can be read back.
pub struct NativeHost {
    theme: Mutex<ThemeKind>,
    roots: Mutex<Vec<PathBuf>>,
    context: Mutex<HashMap<String, bool>>,
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHost {
    pub fn new() -> Self {
        Self {
            theme: Mutex::new(ThemeKind::Dark),
            roots: Mutex::new(Vec::new()),
            context: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_theme(&self, theme: ThemeKind) {
        *self.theme.lock().unwrap() = theme;
    }

    pub fn add_workspace_root(&self, root: impl Into<PathBuf>) {
        self.roots.lock().unwrap().push(root.into());
    }

    /// Read back a context flag previously mirrored by the config layer.
    pub fn context_flag(&self, key: &str) -> Option<bool> {
        self.context.lock().unwrap().get(key).copied()
    }
}

impl HostEnvironment for NativeHost {
    fn active_theme(&self) -> ThemeKind {
        *self.theme.lock().unwrap()
    }

    fn set_context(&self, key: &str, value: bool) {
        self.context.lock().unwrap().insert(key.to_string(), value);
    }

    fn workspace_root(&self, uri: &NormalizedUri) -> Option<PathBuf> {
        // Document URIs use the file scheme; roots are plain paths.
        let path = uri.as_str().strip_prefix("file://").unwrap_or(uri.as_str());

        // Longest enclosing root wins, and only at a path boundary.
        self.roots
            .lock()
            .unwrap()
            .iter()
            .filter(|root| {
                let root = root.to_string_lossy();
                path.strip_prefix(root.as_ref())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .max_by_key(|root| root.as_os_str().len())
            .cloned()
    }

    fn read_file(&self, path: &Path) -> BoxFuture<'static, std::io::Result<Vec<u8>>> {
        let path = path.to_path_buf();
        Box::pin(async move { tokio::fs::read(&path).await })
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_requires_path_boundary() {
        let host = NativeHost::new();
        host.add_workspace_root("/home/dev/project");

        let inside = NormalizedUri::new("file:///home/dev/project/diagrams/a.drawio");
        assert_eq!(host.workspace_root(&inside), Some(PathBuf::from("/home/dev/project")));

        // Sibling with a shared prefix is not enclosed.
        let sibling = NormalizedUri::new("file:///home/dev/project-notes/a.drawio");
        assert_eq!(host.workspace_root(&sibling), None);
    }

    #[test]
    fn test_longest_enclosing_root_wins() {
        let host = NativeHost::new();
        host.add_workspace_root("/repo");
        host.add_workspace_root("/repo/docs");

        let uri = NormalizedUri::new("file:///repo/docs/a.drawio");
        assert_eq!(host.workspace_root(&uri), Some(PathBuf::from("/repo/docs")));
    }

    #[test]
    fn test_context_flags_round_trip() {
        let host = NativeHost::new();
        assert_eq!(host.context_flag("easel.flag"), None);
        host.set_context("easel.flag", true);
        assert_eq!(host.context_flag("easel.flag"), Some(true));
    }
}
