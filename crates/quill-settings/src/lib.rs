//! # quill-settings
//!
//! Engine settings for the Quill skill engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`QuillSettings::default()`]
//! 2. **User file**: `~/.quill/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `QUILL_*` overrides (highest priority)
//!
//! These are *engine* settings (where packages live, matcher weights, the
//! axis→key table). Per-project configuration that settles variant axes is
//! read by `quill-skills`' config store.
//!
//! The global singleton is replaceable: [`init_settings`] swaps the cached
//! value (the CLI does this for `--settings PATH`) so subsequent
//! [`get_settings`] calls return it while earlier `Arc` snapshots stay
//! unchanged.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::Arc;

use parking_lot::RwLock;

/// Global settings singleton.
static SETTINGS: RwLock<Option<Arc<QuillSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.quill/settings.json` with env var
/// overrides. On subsequent calls, returns the cached value. If loading
/// fails, returns compiled defaults.
pub fn get_settings() -> Arc<QuillSettings> {
    if let Some(s) = SETTINGS.read().as_ref() {
        return Arc::clone(s);
    }

    let mut guard = SETTINGS.write();
    // Another thread may have initialized while we waited
    if let Some(s) = guard.as_ref() {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            QuillSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Initialize the global settings with a specific value.
///
/// Replaces any previously cached settings.
pub fn init_settings(settings: QuillSettings) {
    *SETTINGS.write() = Some(Arc::new(settings));
}

/// Clear the cached value so the next [`get_settings`] call re-loads.
#[cfg(test)]
pub(crate) fn reset_settings() {
    *SETTINGS.write() = None;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
