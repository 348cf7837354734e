//! Project configuration store.
//!
//! Reads the flat `key: value` document at the project root and settles
//! variant axes from it. One [`AxisKeyMap`] decides which config key feeds
//! which axis; nothing else in the engine looks at config keys.
//!
//! The store caches one [`ProjectConfig`] snapshot. [`ConfigStore::refresh`]
//! swaps in a freshly read snapshot; sessions holding the previous `Arc`
//! keep seeing the values they started with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use quill_settings::ProjectSettings;
use tracing::{debug, warn};

use crate::types::VariantAxis;

/// Axis name → config key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AxisKeyMap(BTreeMap<String, String>);

impl AxisKeyMap {
    /// Build from `(axis, key)` pairs.
    pub fn new<I, A, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, K)>,
        A: Into<String>,
        K: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(a, k)| (a.into(), k.into()))
                .collect(),
        )
    }

    /// Config key that settles `axis`.
    pub fn key_for(&self, axis: &str) -> Option<&str> {
        self.0.get(axis).map(String::as_str)
    }

    /// Whether `key` feeds any axis.
    pub fn recognizes(&self, key: &str) -> bool {
        self.0.values().any(|k| k == key)
    }
}

impl From<&ProjectSettings> for AxisKeyMap {
    fn from(settings: &ProjectSettings) -> Self {
        Self::new(settings.axis_keys.clone())
    }
}

/// Why an axis could not be settled from config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The axis has no config key.
    Unmapped,
    /// The key is not set.
    Absent {
        /// Key consulted.
        key: String,
    },
    /// The value is not one the axis allows (an empty value included).
    Stale {
        /// Key consulted.
        key: String,
        /// Value found.
        value: String,
    },
}

/// Outcome of looking an axis up in project config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Canonical allowed value.
    Resolved(String),
    /// Must be asked.
    Unresolved(UnresolvedReason),
}

/// Parsed project configuration, restricted to recognized keys.
#[derive(Clone, Debug, Default)]
pub struct ProjectConfig {
    entries: BTreeMap<String, String>,
    keys: Arc<AxisKeyMap>,
    source: Option<PathBuf>,
}

impl ProjectConfig {
    /// Empty config using `keys`.
    pub fn empty(keys: Arc<AxisKeyMap>) -> Self {
        Self {
            entries: BTreeMap::new(),
            keys,
            source: None,
        }
    }

    /// Parse a config document.
    ///
    /// Accepts `key: value` and `- key: value` lines. Fenced code blocks and
    /// headings are skipped, surrounding quotes are stripped, the first
    /// occurrence of a key wins, and keys `keys` does not recognize are
    /// dropped. `key:` with nothing after it records an empty value.
    pub fn parse(content: &str, keys: Arc<AxisKeyMap>) -> Self {
        let mut entries = BTreeMap::new();
        let mut in_code_block = false;

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("```") {
                in_code_block = !in_code_block;
                continue;
            }
            if in_code_block || trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let item = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
                .unwrap_or(trimmed);
            let Some((key, value)) = item.split_once(':') else {
                continue;
            };
            let key = key.trim().trim_matches('`');
            if !keys.recognizes(key) || entries.contains_key(key) {
                continue;
            }
            let _ = entries.insert(key.to_string(), strip_quotes(value.trim()).to_string());
        }

        Self {
            entries,
            keys,
            source: None,
        }
    }

    /// Build directly from key/value pairs, ignoring unrecognized keys.
    pub fn from_entries<I, K, V>(entries: I, keys: Arc<AxisKeyMap>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (k, v) in entries {
            let k = k.into();
            if keys.recognizes(&k) && !map.contains_key(&k) {
                let _ = map.insert(k, v.into());
            }
        }
        Self {
            entries: map,
            keys,
            source: None,
        }
    }

    /// Raw value for a key. `Some("")` is an empty value, `None` is absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of recognized entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no recognized key is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File the snapshot was read from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Axis→key table in effect.
    pub fn keys(&self) -> &AxisKeyMap {
        &self.keys
    }

    /// Settle `axis` from this snapshot.
    pub fn resolve(&self, axis: &VariantAxis) -> Resolution {
        resolve(axis, self)
    }
}

/// Settle `axis` from `config`.
pub fn resolve(axis: &VariantAxis, config: &ProjectConfig) -> Resolution {
    let Some(key) = config.keys.key_for(&axis.name) else {
        return Resolution::Unresolved(UnresolvedReason::Unmapped);
    };
    let Some(value) = config.get(key) else {
        return Resolution::Unresolved(UnresolvedReason::Absent {
            key: key.to_string(),
        });
    };
    match axis.canonical(value) {
        Some(canonical) => Resolution::Resolved(canonical.to_string()),
        None => Resolution::Unresolved(UnresolvedReason::Stale {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn strip_quotes(value: &str) -> &str {
    for q in ['"', '\'', '`'] {
        if let Some(inner) = value
            .strip_prefix(q)
            .and_then(|v| v.strip_suffix(q))
        {
            return inner.trim();
        }
    }
    value
}

/// Process-wide holder of the current [`ProjectConfig`] snapshot.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    keys: Arc<AxisKeyMap>,
    snapshot: RwLock<Option<Arc<ProjectConfig>>>,
}

impl ConfigStore {
    /// Store reading `<project_root>/<config_file>`.
    pub fn new(project_root: &Path, settings: &ProjectSettings) -> Self {
        Self::with_path(
            project_root.join(&settings.config_file),
            AxisKeyMap::from(settings),
        )
    }

    /// Store reading a specific file.
    pub fn with_path(path: PathBuf, keys: AxisKeyMap) -> Self {
        Self {
            path: Some(path),
            keys: Arc::new(keys),
            snapshot: RwLock::new(None),
        }
    }

    /// Store whose snapshot never changes.
    pub fn fixed(config: ProjectConfig) -> Self {
        Self {
            path: None,
            keys: Arc::clone(&config.keys),
            snapshot: RwLock::new(Some(Arc::new(config))),
        }
    }

    /// Path of the config document, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current snapshot, loading it on first use.
    pub fn snapshot(&self) -> Arc<ProjectConfig> {
        if let Some(s) = self.snapshot.read().as_ref() {
            return Arc::clone(s);
        }

        let mut guard = self.snapshot.write();
        if let Some(s) = guard.as_ref() {
            return Arc::clone(s);
        }
        let loaded = Arc::new(self.read());
        *guard = Some(Arc::clone(&loaded));
        loaded
    }

    /// Re-read the document and swap the cached snapshot.
    pub fn refresh(&self) -> Arc<ProjectConfig> {
        if self.path.is_none() {
            return self.snapshot();
        }
        let fresh = Arc::new(self.read());
        *self.snapshot.write() = Some(Arc::clone(&fresh));
        fresh
    }

    fn read(&self) -> ProjectConfig {
        let Some(path) = &self.path else {
            return ProjectConfig::empty(Arc::clone(&self.keys));
        };
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut config = ProjectConfig::parse(&content, Arc::clone(&self.keys));
                config.source = Some(path.clone());
                debug!(path = %path.display(), entries = config.len(), "project config loaded");
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no project config");
                ProjectConfig::empty(Arc::clone(&self.keys))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read project config, treating as empty");
                ProjectConfig::empty(Arc::clone(&self.keys))
            }
        }
    }
}
