//! Global configuration: experimental-features mirror, feedback
//! bookkeeping, and plugin trust decisions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use easel_collab::NormalizedUri;

use crate::diagram::DiagramConfig;
use crate::error::ConfigError;
use crate::host::HostEnvironment;
use crate::store::{ListenerHandle, SettingTarget, SettingsStore};

/// Settings keys, namespaced under the extension identifier.
pub mod keys {
    pub const EXPERIMENTAL_FEATURES: &str = "easel.enableExperimentalFeatures";
    pub const VERSION_ASKED_FOR_FEEDBACK: &str = "easel.version-asked-for-feedback";
    pub const KNOWN_PLUGINS: &str = "easel.knownPlugins";
    pub const THEME: &str = "easel.theme";
    pub const OFFLINE: &str = "easel.offline";
    pub const ONLINE_URL: &str = "easel.online-url";
    pub const CODE_LINK_ACTIVATED: &str = "easel.codeLinkActivated";
    pub const LOCAL_STORAGE: &str = "easel.local-storage";
    pub const PLUGINS: &str = "easel.plugins";
    pub const CUSTOM_LIBRARIES: &str = "easel.customLibraries";
    pub const CUSTOM_FONTS: &str = "easel.customFonts";
}

/// Host context key mirroring the experimental-features flag.
pub const EXPERIMENTAL_CONTEXT_KEY: &str = "easel.experimentalFeaturesEnabled";

/// One persisted plugin trust decision, keyed by (pluginId, fingerprint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownPlugin {
    pub plugin_id: String,
    pub fingerprint: String,
    pub allowed: bool,
}

/// Global settings facade, one per store+host pair.
///
/// Holds the store subscription that keeps the host context flag in
/// sync, and the per-document [`DiagramConfig`] cache.
pub struct Config {
    store: Arc<dyn SettingsStore>,
    host: Arc<dyn HostEnvironment>,
    readable_local_storage: bool,
    diagrams: Mutex<HashMap<NormalizedUri, Arc<DiagramConfig>>>,
    _store_subscription: ListenerHandle,
}

impl Config {
    pub fn new(store: Arc<dyn SettingsStore>, host: Arc<dyn HostEnvironment>) -> Self {
        Self::with_options(store, host, false)
    }

    /// `readable_local_storage` is the development override: the
    /// local-storage blob is persisted as readable JSON instead of
    /// base64 (see [`DiagramConfig::set_local_storage`]).
    pub fn with_options(
        store: Arc<dyn SettingsStore>,
        host: Arc<dyn HostEnvironment>,
        readable_local_storage: bool,
    ) -> Self {
        mirror_experimental_flag(&*store, &*host);

        let subscription = store.subscribe(Box::new({
            let store = Arc::clone(&store);
            let host = Arc::clone(&host);
            move |change| {
                if change.key == keys::EXPERIMENTAL_FEATURES {
                    mirror_experimental_flag(&*store, &*host);
                }
            }
        }));

        Self {
            store,
            host,
            readable_local_storage,
            diagrams: Mutex::new(HashMap::new()),
            _store_subscription: subscription,
        }
    }

    pub fn experimental_features_enabled(&self) -> bool {
        read_bool(&*self.store, keys::EXPERIMENTAL_FEATURES, false)
    }

    // ---------------------------------------------------------------
    // Feedback prompt bookkeeping
    // ---------------------------------------------------------------

    /// True until [`Config::mark_feedback_asked`] ran for this version —
    /// the prompt fires exactly once per released version.
    pub fn should_ask_for_feedback(&self, current_version: &str) -> bool {
        let asked = self
            .store
            .read(keys::VERSION_ASKED_FOR_FEEDBACK, None)
            .and_then(|v| v.as_str().map(str::to_string));
        asked.as_deref() != Some(current_version)
    }

    pub async fn mark_feedback_asked(&self, version: &str) -> Result<(), ConfigError> {
        self.store
            .write(
                keys::VERSION_ASKED_FOR_FEEDBACK,
                Value::String(version.to_string()),
                SettingTarget::Global,
            )
            .await
    }

    // ---------------------------------------------------------------
    // Plugin trust
    // ---------------------------------------------------------------

    /// Look up a trust decision. `Ok(None)` means unknown — the caller
    /// must prompt. A fingerprint change invalidates an earlier decision
    /// for the same plugin id.
    pub fn plugin_decision(
        &self,
        plugin_id: &str,
        fingerprint: &str,
    ) -> Result<Option<bool>, ConfigError> {
        Ok(self
            .known_plugins()?
            .iter()
            .find(|p| p.plugin_id == plugin_id && p.fingerprint == fingerprint)
            .map(|p| p.allowed))
    }

    /// Persist a trust decision, replacing any earlier decision for the
    /// same (pluginId, fingerprint) key. Always written globally,
    /// regardless of which document triggered the prompt.
    pub async fn remember_plugin_decision(
        &self,
        plugin_id: &str,
        fingerprint: &str,
        allowed: bool,
    ) -> Result<(), ConfigError> {
        let mut list = self.known_plugins()?;
        list.retain(|p| !(p.plugin_id == plugin_id && p.fingerprint == fingerprint));
        list.push(KnownPlugin {
            plugin_id: plugin_id.to_string(),
            fingerprint: fingerprint.to_string(),
            allowed,
        });

        self.store
            .write(
                keys::KNOWN_PLUGINS,
                serde_json::to_value(list)?,
                SettingTarget::Global,
            )
            .await
    }

    fn known_plugins(&self) -> Result<Vec<KnownPlugin>, ConfigError> {
        match self.store.read(keys::KNOWN_PLUGINS, None) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    // ---------------------------------------------------------------
    // Per-document configuration
    // ---------------------------------------------------------------

    /// Per-document configuration, cached by URI. Instances are never
    /// shared across documents.
    pub fn diagram(&self, uri: &NormalizedUri) -> Arc<DiagramConfig> {
        let mut diagrams = self.diagrams.lock().unwrap();
        Arc::clone(diagrams.entry(uri.clone()).or_insert_with(|| {
            Arc::new(DiagramConfig::new(
                uri.clone(),
                Arc::clone(&self.store),
                Arc::clone(&self.host),
                self.readable_local_storage,
            ))
        }))
    }
}

pub(crate) fn read_bool(store: &dyn SettingsStore, key: &str, default: bool) -> bool {
    store
        .read(key, None)
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

fn mirror_experimental_flag(store: &dyn SettingsStore, host: &dyn HostEnvironment) {
    let enabled = read_bool(store, keys::EXPERIMENTAL_FEATURES, false);
    host.set_context(EXPERIMENTAL_CONTEXT_KEY, enabled);
}

// ===================================================================
// Tests
// ===================================================================
