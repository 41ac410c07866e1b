//! Per-document diagram configuration.
//!
//! One [`DiagramConfig`] per document URI; every getter re-reads the
//! store so values track setting changes without an extra cache layer.
//! Custom libraries are normalized from four raw source shapes into the
//! uniform [`LibraryData`] union the embedded component consumes.

use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use easel_collab::NormalizedUri;

use crate::config::keys;
use crate::error::ConfigError;
use crate::host::{HostEnvironment, ThemeKind};
use crate::store::{SettingTarget, SettingsStore};
use crate::template::expand_placeholders;

/// Theme value meaning "resolve against the host's active theme".
pub const AUTOMATIC_THEME: &str = "automatic";

/// Default embed URL for online mode.
pub const DEFAULT_ONLINE_URL: &str = "https://embed.diagrams.net/";

/// Whether the embedded component runs from bundled assets or a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramMode {
    Offline,
    Online { url: String },
}

/// Raw custom-library entry as persisted, a closed union decided at
/// parse time — one variant per source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibrarySource {
    /// Inline JSON library content.
    Json { json: String },
    /// Inline XML wrapper whose element content is the JSON library.
    Xml { xml: String },
    /// External file, template-expanded and sniffed by extension.
    File { file: String },
    /// Remote library loaded by the component itself.
    Url { url: String },
}

/// Normalized library description handed to the embedded component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LibraryData {
    Value { value: Value },
    Url { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PluginEntry {
    file: String,
}

/// Per-document settings facade.
pub struct DiagramConfig {
    uri: NormalizedUri,
    store: Arc<dyn SettingsStore>,
    host: Arc<dyn HostEnvironment>,
    readable_local_storage: bool,
}

impl DiagramConfig {
    pub(crate) fn new(
        uri: NormalizedUri,
        store: Arc<dyn SettingsStore>,
        host: Arc<dyn HostEnvironment>,
        readable_local_storage: bool,
    ) -> Self {
        Self {
            uri,
            store,
            host,
            readable_local_storage,
        }
    }

    pub fn uri(&self) -> &NormalizedUri {
        &self.uri
    }

    // ---------------------------------------------------------------
    // Theme
    // ---------------------------------------------------------------

    /// Raw theme setting, `"automatic"` when unset.
    pub fn theme(&self) -> String {
        self.read_string(keys::THEME, AUTOMATIC_THEME)
    }

    /// Theme with `"automatic"` resolved against the host's active
    /// theme: light and high-contrast map to Kennedy, dark to dark.
    /// Explicit values pass through unchanged.
    pub fn resolved_theme(&self) -> String {
        let raw = self.theme();
        if raw != AUTOMATIC_THEME {
            return raw;
        }
        match self.host.active_theme() {
            ThemeKind::Light | ThemeKind::HighContrast => "Kennedy".to_string(),
            ThemeKind::Dark => "dark".to_string(),
        }
    }

    pub async fn set_theme(&self, theme: &str) -> Result<(), ConfigError> {
        self.store
            .write(keys::THEME, Value::String(theme.to_string()), SettingTarget::Global)
            .await
    }

    // ---------------------------------------------------------------
    // Mode
    // ---------------------------------------------------------------

    /// Offline (bundled assets, the default) or online with its base URL.
    pub fn mode(&self) -> DiagramMode {
        if self.read_bool(keys::OFFLINE, true) {
            DiagramMode::Offline
        } else {
            DiagramMode::Online {
                url: self.read_string(keys::ONLINE_URL, DEFAULT_ONLINE_URL),
            }
        }
    }

    pub fn code_link_enabled(&self) -> bool {
        self.read_bool(keys::CODE_LINK_ACTIVATED, false)
    }

    pub async fn set_code_link_enabled(&self, enabled: bool) -> Result<(), ConfigError> {
        self.store
            .write(keys::CODE_LINK_ACTIVATED, Value::Bool(enabled), SettingTarget::Global)
            .await
    }

    // ---------------------------------------------------------------
    // Local storage blob
    // ---------------------------------------------------------------

    /// The component's local-storage map. At rest it is a base64-encoded
    /// JSON string; the readable development encoding (a plain object)
    /// is accepted transparently.
    pub fn local_storage(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        match self.store.read(keys::LOCAL_STORAGE, Some(&self.uri)) {
            None => Ok(BTreeMap::new()),
            Some(Value::String(encoded)) => {
                let bytes = general_purpose::STANDARD.decode(encoded.as_bytes())?;
                let json = String::from_utf8(bytes)?;
                Ok(serde_json::from_str(&json)?)
            }
            Some(Value::Object(entries)) => Ok(entries
                .into_iter()
                .map(|(key, value)| {
                    let text = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, text)
                })
                .collect()),
            Some(other) => Err(ConfigError::LocalStorageShape {
                found: json_type_name(&other),
            }),
        }
    }

    /// Persist the local-storage map.
    ///
    /// With the development override active, values are stored as parsed
    /// JSON where they parse, for readable settings files. That is a
    /// debugging affordance, not a format contract.
    pub async fn set_local_storage(
        &self,
        map: &BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        let value = if self.readable_local_storage {
            Value::Object(
                map.iter()
                    .map(|(key, value)| {
                        let parsed = serde_json::from_str::<Value>(value)
                            .unwrap_or_else(|_| Value::String(value.clone()));
                        (key.clone(), parsed)
                    })
                    .collect(),
            )
        } else {
            let json = serde_json::to_string(map)?;
            Value::String(general_purpose::STANDARD.encode(json.as_bytes()))
        };

        self.store
            .write(keys::LOCAL_STORAGE, value, SettingTarget::Document(self.uri.clone()))
            .await
    }

    // ---------------------------------------------------------------
    // Plugins, fonts, libraries
    // ---------------------------------------------------------------

    /// Plugin files for this document, each path template-expanded.
    pub fn plugins(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let entries: Vec<PluginEntry> = match self.store.read(keys::PLUGINS, Some(&self.uri)) {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        entries
            .into_iter()
            .map(|entry| {
                expand_placeholders(&entry.file, &self.uri, &*self.host).map(PathBuf::from)
            })
            .collect()
    }

    pub fn custom_fonts(&self) -> Result<Vec<String>, ConfigError> {
        match self.store.read(keys::CUSTOM_FONTS, Some(&self.uri)) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Custom libraries, normalized into [`LibraryData`]. Recomputed on
    /// each access; file sources are read through the host.
    pub async fn custom_libraries(&self) -> Result<Vec<LibraryData>, ConfigError> {
        let sources: Vec<LibrarySource> =
            match self.store.read(keys::CUSTOM_LIBRARIES, Some(&self.uri)) {
                Some(value) => serde_json::from_value(value)?,
                None => Vec::new(),
            };

        let mut libraries = Vec::with_capacity(sources.len());
        for source in sources {
            libraries.push(self.normalize_library(source).await?);
        }
        Ok(libraries)
    }

    async fn normalize_library(&self, source: LibrarySource) -> Result<LibraryData, ConfigError> {
        match source {
            LibrarySource::Json { json } => Ok(LibraryData::Value {
                value: serde_json::from_str(&json)?,
            }),
            LibrarySource::Xml { xml } => Ok(LibraryData::Value {
                value: serde_json::from_str(&xml_payload(&xml)?)?,
            }),
            LibrarySource::Url { url } => Ok(LibraryData::Url { url }),
            LibrarySource::File { file } => {
                let path = PathBuf::from(expand_placeholders(&file, &self.uri, &*self.host)?);
                let bytes = self.host.read_file(&path).await.map_err(|source| {
                    ConfigError::LibraryRead { path: path.clone(), source }
                })?;
                let text = String::from_utf8_lossy(&bytes);

                let is_xml = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
                let payload = if is_xml {
                    xml_payload(&text)?
                } else {
                    text.into_owned()
                };
                Ok(LibraryData::Value {
                    value: serde_json::from_str(&payload)?,
                })
            }
        }
    }

    fn read_bool(&self, key: &str, default: bool) -> bool {
        self.store
            .read(key, Some(&self.uri))
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    fn read_string(&self, key: &str, default: &str) -> String {
        self.store
            .read(key, Some(&self.uri))
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }
}

/// Extract the text content of an XML document's root element.
///
/// Library XML wraps its JSON payload in a single element
/// (`<mxlibrary>[…]</mxlibrary>`); nested markup contributes its text
/// the way `textContent` would.
fn xml_payload(xml: &str) -> Result<String, ConfigError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut payload = String::new();
    let mut depth = 0u32;
    let mut seen_element = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                depth += 1;
                seen_element = true;
            }
            Ok(Event::End(_)) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Text(ref e)) if depth > 0 => {
                payload.push_str(&e.xml_content().map_err(|_| ConfigError::MalformedXml)?);
            }
            // Entity and character references arrive as separate events;
            // unknown entities have no resolution here and are malformed.
            Ok(Event::GeneralRef(ref e)) if depth > 0 => {
                if let Some(ch) = e.resolve_char_ref().map_err(|_| ConfigError::MalformedXml)? {
                    payload.push(ch);
                } else {
                    let name = e.decode().map_err(|_| ConfigError::MalformedXml)?;
                    let resolved = quick_xml::escape::resolve_predefined_entity(&name)
                        .ok_or(ConfigError::MalformedXml)?;
                    payload.push_str(resolved);
                }
            }
            Ok(Event::CData(ref e)) if depth > 0 => {
                payload.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::Eof) => break,
            Err(_) => return Err(ConfigError::MalformedXml),
            _ => {}
        }
        buf.clear();
    }

    if !seen_element {
        return Err(ConfigError::MalformedXml);
    }
    Ok(payload)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::NativeHost;
    use crate::store::MemorySettings;
    use serde_json::json;

    fn setup(readable: bool) -> (Arc<MemorySettings>, Arc<NativeHost>, Arc<DiagramConfig>) {
        let store = Arc::new(MemorySettings::new());
        let host = Arc::new(NativeHost::new());
        let config = Config::with_options(
            Arc::clone(&store) as Arc<dyn SettingsStore>,
            Arc::clone(&host) as Arc<dyn HostEnvironment>,
            readable,
        );
        let diagram = config.diagram(&NormalizedUri::new("file:///repo/flow.drawio"));
        (store, host, diagram)
    }

    fn doc_uri() -> NormalizedUri {
        NormalizedUri::new("file:///repo/flow.drawio")
    }

    // ── Theme resolution ─────────────────────────────────────────

    #[test]
    fn test_automatic_theme_resolves_against_host() {
        let (_store, host, diagram) = setup(false);

        host.set_theme(ThemeKind::Light);
        assert_eq!(diagram.resolved_theme(), "Kennedy");
        host.set_theme(ThemeKind::HighContrast);
        assert_eq!(diagram.resolved_theme(), "Kennedy");
        host.set_theme(ThemeKind::Dark);
        assert_eq!(diagram.resolved_theme(), "dark");
    }

    #[test]
    fn test_explicit_theme_passes_through() {
        let (store, host, diagram) = setup(false);
        store.seed_document(&doc_uri(), keys::THEME, json!("min"));

        host.set_theme(ThemeKind::Dark);
        assert_eq!(diagram.theme(), "min");
        assert_eq!(diagram.resolved_theme(), "min");
    }

    // ── Mode ─────────────────────────────────────────────────────

    #[test]
    fn test_mode_defaults_to_offline() {
        let (_store, _host, diagram) = setup(false);
        assert_eq!(diagram.mode(), DiagramMode::Offline);
    }

    #[test]
    fn test_online_mode_carries_url() {
        let (store, _host, diagram) = setup(false);
        store.seed_document(&doc_uri(), keys::OFFLINE, json!(false));

        assert_eq!(
            diagram.mode(),
            DiagramMode::Online { url: DEFAULT_ONLINE_URL.to_string() }
        );

        store.seed_document(&doc_uri(), keys::ONLINE_URL, json!("https://draw.internal/"));
        assert_eq!(
            diagram.mode(),
            DiagramMode::Online { url: "https://draw.internal/".to_string() }
        );
    }

    // ── Local storage ────────────────────────────────────────────

    #[tokio::test]
    async fn test_local_storage_round_trips_through_base64() {
        let (store, _host, diagram) = setup(false);

        let mut map = BTreeMap::new();
        map.insert(".drawio-config".to_string(), r#"{"language":"en"}"#.to_string());
        map.insert("ui".to_string(), "min".to_string());

        diagram.set_local_storage(&map).await.unwrap();

        // At rest the value is an opaque base64 string.
        let at_rest = store.read(keys::LOCAL_STORAGE, Some(&doc_uri())).unwrap();
        assert!(at_rest.is_string());

        assert_eq!(diagram.local_storage().unwrap(), map);
    }

    #[tokio::test]
    async fn test_readable_local_storage_stores_parsed_values() {
        let (store, _host, diagram) = setup(true);

        let mut map = BTreeMap::new();
        map.insert("config".to_string(), r#"{"language":"en"}"#.to_string());
        map.insert("plain".to_string(), "hello".to_string());

        diagram.set_local_storage(&map).await.unwrap();

        let at_rest = store.read(keys::LOCAL_STORAGE, Some(&doc_uri())).unwrap();
        assert_eq!(at_rest["config"]["language"], "en");
        assert_eq!(at_rest["plain"], "hello");

        // The readable encoding still reads back as the same map.
        assert_eq!(diagram.local_storage().unwrap(), map);
    }

    #[test]
    fn test_absent_local_storage_is_empty() {
        let (_store, _host, diagram) = setup(false);
        assert!(diagram.local_storage().unwrap().is_empty());
    }

    #[test]
    fn test_wrong_local_storage_shape_errors() {
        let (store, _host, diagram) = setup(false);
        store.seed_document(&doc_uri(), keys::LOCAL_STORAGE, json!(42));
        assert!(matches!(
            diagram.local_storage(),
            Err(ConfigError::LocalStorageShape { found: "number" })
        ));
    }

    // ── Plugins & fonts ──────────────────────────────────────────

    #[test]
    fn test_plugins_expand_workspace_folder() {
        let (store, host, diagram) = setup(false);
        host.add_workspace_root("/repo");
        store.seed_document(
            &doc_uri(),
            keys::PLUGINS,
            json!([{"file": "${workspaceFolder}/plugins/link.js"}]),
        );

        assert_eq!(
            diagram.plugins().unwrap(),
            vec![PathBuf::from("/repo/plugins/link.js")]
        );
    }

    #[test]
    fn test_plugin_expansion_failure_propagates() {
        let (store, _host, diagram) = setup(false); // no workspace roots
        store.seed_document(
            &doc_uri(),
            keys::PLUGINS,
            json!([{"file": "${workspaceFolder}/plugins/link.js"}]),
        );

        assert!(matches!(
            diagram.plugins(),
            Err(ConfigError::NoWorkspaceFolder { .. })
        ));
    }

    #[test]
    fn test_custom_fonts_default_empty() {
        let (store, _host, diagram) = setup(false);
        assert!(diagram.custom_fonts().unwrap().is_empty());

        store.seed_document(&doc_uri(), keys::CUSTOM_FONTS, json!(["Fira Code"]));
        assert_eq!(diagram.custom_fonts().unwrap(), vec!["Fira Code"]);
    }

    #[test]
    fn test_malformed_custom_fonts_surface_as_error() {
        let (store, _host, diagram) = setup(false);
        store.seed_document(&doc_uri(), keys::CUSTOM_FONTS, json!("Fira Code"));

        assert!(matches!(diagram.custom_fonts(), Err(ConfigError::Json(_))));
    }

    // ── Library normalization ────────────────────────────────────

    #[tokio::test]
    async fn test_inline_json_library_normalizes_to_value() {
        let (store, _host, diagram) = setup(false);
        store.seed_document(
            &doc_uri(),
            keys::CUSTOM_LIBRARIES,
            json!([{"json": "[{\"title\": \"Shape\"}]"}]),
        );

        assert_eq!(
            diagram.custom_libraries().await.unwrap(),
            vec![LibraryData::Value { value: json!([{"title": "Shape"}]) }]
        );
    }

    #[tokio::test]
    async fn test_inline_xml_library_extracts_element_text() {
        let (store, _host, diagram) = setup(false);
        store.seed_document(
            &doc_uri(),
            keys::CUSTOM_LIBRARIES,
            json!([{"xml": "<mxlibrary>[1, 2]</mxlibrary>"}]),
        );

        assert_eq!(
            diagram.custom_libraries().await.unwrap(),
            vec![LibraryData::Value { value: json!([1, 2]) }]
        );
    }

    #[tokio::test]
    async fn test_url_library_passes_through() {
        let (store, _host, diagram) = setup(false);
        store.seed_document(
            &doc_uri(),
            keys::CUSTOM_LIBRARIES,
            json!([{"url": "https://example.org/shapes.xml"}]),
        );

        assert_eq!(
            diagram.custom_libraries().await.unwrap(),
            vec![LibraryData::Url { url: "https://example.org/shapes.xml".to_string() }]
        );
    }

    #[tokio::test]
    async fn test_elementless_xml_is_malformed() {
        let (store, _host, diagram) = setup(false);
        store.seed_document(&doc_uri(), keys::CUSTOM_LIBRARIES, json!([{"xml": "just text"}]));

        assert!(matches!(
            diagram.custom_libraries().await,
            Err(ConfigError::MalformedXml)
        ));
    }

    // ── xml_payload ──────────────────────────────────────────────

    #[test]
    fn test_xml_payload_unescapes_entities() {
        let payload = xml_payload("<mxlibrary>[{&quot;a&quot;: 1}]</mxlibrary>").unwrap();
        assert_eq!(payload, r#"[{"a": 1}]"#);
    }

    #[test]
    fn test_xml_payload_resolves_char_refs() {
        // Decimal and hex character references, mixed with plain text.
        let payload = xml_payload("<mxlibrary>&#91;1, 2&#x5D;</mxlibrary>").unwrap();
        assert_eq!(payload, "[1, 2]");
    }

    #[test]
    fn test_xml_payload_rejects_unknown_entity() {
        assert!(matches!(
            xml_payload("<mxlibrary>[&nbsp;]</mxlibrary>"),
            Err(ConfigError::MalformedXml)
        ));
    }

    #[test]
    fn test_xml_payload_reads_cdata() {
        let payload = xml_payload("<mxlibrary><![CDATA[[1]]]></mxlibrary>").unwrap();
        assert_eq!(payload, "[1]");
    }
}
