//! # easel-config — Settings access for the Easel extension
//!
//! Typed read/write access to host-persisted settings: global flags
//! (experimental features, feedback bookkeeping, plugin trust) and
//! per-document diagram configuration (theme, offline mode, plugins,
//! libraries, fonts, local-storage blob).
//!
//! ## Architecture
//!
//! ```text
//!           Arc<dyn SettingsStore>      Arc<dyn HostEnvironment>
//!            (Memory / JsonFile)       (theme, workspace, files)
//!                    │                           │
//!                    └─────────┬─────────────────┘
//!                              ▼
//!                           Config ──── context-flag mirror
//!                              │
//!                    diagram(uri) cache
//!                              ▼
//!                        DiagramConfig
//!              (getters re-read the store per call)
//! ```
//!
//! Nothing here is ambient: consumers receive the store and host as
//! explicit dependencies, and change observation is a plain listener
//! registry over setting keys.
//!
//! ## Modules
//!
//! - [`store`] — [`SettingsStore`] trait, [`MemorySettings`],
//!   [`JsonFileSettings`], change listeners
//! - [`host`] — [`HostEnvironment`] trait, [`ThemeKind`], [`NativeHost`]
//! - [`config`] — global [`Config`]: experimental flag mirror, feedback
//!   bookkeeping, plugin trust decisions
//! - [`diagram`] — per-document [`DiagramConfig`] and library
//!   normalization
//! - [`template`] — `${workspaceFolder}` placeholder expansion

pub mod config;
pub mod diagram;
mod error;
pub mod host;
pub mod store;
pub mod template;

// Re-exports for convenience
pub use config::{Config, KnownPlugin, EXPERIMENTAL_CONTEXT_KEY};
pub use diagram::{DiagramConfig, DiagramMode, LibraryData, LibrarySource};
pub use error::ConfigError;
pub use host::{HostEnvironment, NativeHost, ThemeKind};
pub use store::{
    JsonFileSettings, ListenerHandle, MemorySettings, SettingChange, SettingTarget, SettingsStore,
};
pub use template::expand_placeholders;
