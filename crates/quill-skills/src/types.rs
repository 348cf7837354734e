//! Core types for the skills engine.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::ErrorKind;

/// Where a package was loaded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    /// From `~/.quill/skills/`.
    Global,
    /// From a project-local skills directory.
    Project,
}

impl fmt::Display for SkillSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// Raw header block of a `SKILL.md`, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkillFrontmatter {
    /// Package name.
    pub name: Option<String>,
    /// Natural-language description.
    pub description: Option<String>,
    /// Free-form version string.
    pub version: Option<String>,
    /// Extra trigger phrases.
    pub triggers: Option<Vec<String>>,
    /// `(axis, values)` in declared order.
    pub axes: Vec<(String, Vec<String>)>,
    /// References prepended to every variant.
    pub shared: Vec<String>,
    /// `(selector, ids)` entries; `None` selector for plain list items.
    pub references: Vec<(Option<String>, Vec<String>)>,
}

/// One trigger phrase with its tokenization cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerPhrase {
    /// Phrase as written.
    pub text: String,
    /// Every token, in order.
    pub tokens: Vec<String>,
    /// Tokens counted as overlap evidence.
    pub content_tokens: Vec<String>,
}

impl TriggerPhrase {
    /// Tokenize `text`. Returns `None` when it holds no tokens at all.
    pub fn new(text: &str) -> Option<Self> {
        let tokens = quill_core::text::tokenize(text);
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            text: text.trim().to_string(),
            content_tokens: quill_core::text::content_tokens(text),
            tokens,
        })
    }
}

/// A configurable dimension of a package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAxis {
    /// Axis name, e.g. `uiFramework`.
    pub name: String,
    /// Allowed values, canonical spelling, in declared order.
    pub values: Vec<String>,
}

impl VariantAxis {
    /// Map raw input onto an allowed value.
    ///
    /// Input is trimmed; an exact match wins, otherwise a case-insensitive
    /// match returns the canonical spelling. Empty input never matches.
    pub fn canonical(&self, raw: &str) -> Option<&str> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.values
            .iter()
            .find(|v| v.as_str() == raw)
            .or_else(|| self.values.iter().find(|v| v.eq_ignore_ascii_case(raw)))
            .map(String::as_str)
    }
}

/// One value per axis, in declared axis order. Empty for zero-axis packages.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantKey(pub Vec<String>);

impl VariantKey {
    /// The key of a package without axes.
    pub fn empty() -> Self {
        Self(Vec::new())
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Relative path of a reference document inside its package.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Wrap an already validated identifier.
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, immutable package.
#[derive(Clone, Debug)]
pub struct PackageDescriptor {
    /// Unique name.
    pub name: String,
    /// Natural-language cue.
    pub description: String,
    /// Version from the header, if any.
    pub version: Option<String>,
    /// De-duplicated trigger phrases in declaration order.
    pub trigger_phrases: Vec<TriggerPhrase>,
    /// Axes in declared (dependency) order.
    pub axes: Vec<VariantAxis>,
    /// Exactly one entry per combination of axis values.
    pub reference_map: BTreeMap<VariantKey, Vec<ReferenceId>>,
    /// Markdown body.
    pub instructions: String,
    /// Where the package came from.
    pub source: SkillSource,
    /// Package directory; reference ids resolve against it.
    pub root: PathBuf,
    /// Path of the `SKILL.md`.
    pub skill_md_path: PathBuf,
}

impl PackageDescriptor {
    /// Look up an axis by name.
    pub fn axis(&self, name: &str) -> Option<&VariantAxis> {
        self.axes.iter().find(|a| a.name == name)
    }

    /// References declared for a complete variant.
    pub fn references_for(&self, key: &VariantKey) -> Option<&[ReferenceId]> {
        self.reference_map.get(key).map(Vec::as_slice)
    }

    /// Number of variants (1 for zero-axis packages).
    pub fn variant_count(&self) -> usize {
        self.reference_map.len()
    }

    /// Summary for listings.
    pub fn info(&self) -> SkillInfo {
        SkillInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            source: self.source,
            axes: self.axes.clone(),
            variants: self.variant_count(),
            triggers: self.trigger_phrases.iter().map(|p| p.text.clone()).collect(),
        }
    }
}

/// Every combination of axis values, first axis varying slowest.
pub fn all_variant_keys(axes: &[VariantAxis]) -> Vec<VariantKey> {
    let mut keys = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(keys.len() * axis.values.len());
        for prefix in &keys {
            for value in &axis.values {
                let mut key = prefix.clone();
                key.push(value.clone());
                next.push(key);
            }
        }
        keys = next;
    }
    keys.into_iter().map(VariantKey).collect()
}

/// An axis with its chosen value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisValue {
    /// Axis name.
    pub axis: String,
    /// Chosen value.
    pub value: String,
}

/// Partial → complete assignment of axis values.
///
/// Monotonic: once an axis holds a value it never changes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedVariant {
    values: BTreeMap<String, String>,
}

impl ResolvedVariant {
    /// Value assigned to `axis`, if any.
    pub fn get(&self, axis: &str) -> Option<&str> {
        self.values.get(axis).map(String::as_str)
    }

    /// Assign `value` to `axis`.
    ///
    /// Returns `false`, keeping the existing value, if the axis already holds
    /// a different one.
    pub fn set(&mut self, axis: &str, value: &str) -> bool {
        match self.values.get(axis) {
            Some(existing) => existing == value,
            None => {
                let _ = self.values.insert(axis.to_string(), value.to_string());
                true
            }
        }
    }

    /// Number of assigned axes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is assigned.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every axis in `axes` is assigned.
    pub fn is_complete(&self, axes: &[VariantAxis]) -> bool {
        axes.iter().all(|a| self.values.contains_key(&a.name))
    }

    /// The reference map key, once complete.
    pub fn key(&self, axes: &[VariantAxis]) -> Option<VariantKey> {
        axes.iter()
            .map(|a| self.values.get(&a.name).cloned())
            .collect::<Option<Vec<_>>>()
            .map(VariantKey)
    }

    /// Assigned values in declared axis order.
    pub fn assignments(&self, axes: &[VariantAxis]) -> Vec<AxisValue> {
        axes.iter()
            .filter_map(|a| {
                self.values.get(&a.name).map(|v| AxisValue {
                    axis: a.name.clone(),
                    value: v.clone(),
                })
            })
            .collect()
    }
}

/// Non-fatal condition observed during a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// Several packages tied for the top score.
    #[serde(rename_all = "camelCase")]
    AmbiguousTie {
        /// Tied package names in registration order.
        candidates: Vec<String>,
    },
    /// An answer outside the allowed set.
    #[serde(rename_all = "camelCase")]
    InvalidAnswer {
        /// Axis name, or `package` for disambiguation.
        topic: String,
        /// Text as received.
        answer: String,
    },
    /// A configured value outside an axis's allowed set.
    #[serde(rename_all = "camelCase")]
    StaleConfig {
        /// Axis name.
        axis: String,
        /// Config key consulted.
        key: String,
        /// Value found.
        value: String,
    },
}

impl Diagnostic {
    /// Reporting kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AmbiguousTie { .. } => ErrorKind::AmbiguousTie,
            Self::InvalidAnswer { .. } => ErrorKind::InvalidAnswer,
            Self::StaleConfig { .. } => ErrorKind::StaleConfig,
        }
    }
}

/// Package summary for listings.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInfo {
    /// Package name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Origin.
    pub source: SkillSource,
    /// Declared axes.
    pub axes: Vec<VariantAxis>,
    /// Number of variants.
    pub variants: usize,
    /// Trigger phrases.
    pub triggers: Vec<String>,
}

/// Error encountered while scanning a package directory.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillScanError {
    /// Path of the package directory.
    pub path: String,
    /// What went wrong.
    pub message: String,
    /// Whether other packages can still load.
    pub recoverable: bool,
}

/// Result of scanning one or more directories.
#[derive(Debug, Default)]
pub struct SkillScanResult {
    /// Successfully loaded packages.
    pub packages: Vec<PackageDescriptor>,
    /// Per-package failures.
    pub errors: Vec<SkillScanError>,
}
