//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. Types marked `#[serde(default)]`
//! accept partial JSON; missing fields get their default during
//! deserialization.

mod project;
mod skills;

pub use project::*;
pub use skills::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the Quill engine.
///
/// Loaded from `~/.quill/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
///
/// # JSON Format
///
/// ```json
/// {
///   "matching": { "minScore": 2 },
///   "project": { "axisKeys": { "orm": "database.orm" } }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuillSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Package discovery and size limits.
    pub skills: SkillSettings,
    /// Trigger matcher weights and threshold.
    pub matching: MatchingSettings,
    /// Project configuration document and axis→key table.
    pub project: ProjectSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for QuillSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "quill".to_string(),
            skills: SkillSettings::default(),
            matching: MatchingSettings::default(),
            project: ProjectSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl QuillSettings {
    /// Correct values that would break engine invariants.
    ///
    /// Called automatically during loading. Out-of-range values are
    /// corrected with a warning rather than rejected.
    pub fn validate(&mut self) {
        if self.matching.min_score == 0 {
            tracing::warn!("matching.minScore must be at least 1, correcting");
            self.matching.min_score = 1;
        }
        if self.matching.mention_weight <= self.matching.phrase_weight {
            tracing::warn!(
                "matching.mentionWeight ({}) <= phraseWeight ({}), correcting",
                self.matching.mention_weight,
                self.matching.phrase_weight
            );
            self.matching.mention_weight = MatchingSettings::default()
                .mention_weight
                .max(self.matching.phrase_weight.saturating_add(1));
        }
        if self.skills.max_reference_size < self.skills.max_file_size {
            tracing::warn!(
                "skills.maxReferenceSize ({}) < maxFileSize ({}), correcting",
                self.skills.max_reference_size,
                self.skills.max_file_size
            );
            self.skills.max_reference_size = self.skills.max_file_size;
        }
        if self.skills.max_suspended == 0 {
            tracing::warn!("skills.maxSuspended must be at least 1, correcting");
            self.skills.max_suspended = SkillSettings::default().max_suspended;
        }
        let before = self.project.axis_keys.len();
        self.project
            .axis_keys
            .retain(|axis, key| !axis.trim().is_empty() && !key.trim().is_empty());
        if self.project.axis_keys.len() != before {
            tracing::warn!("dropped blank entries from project.axisKeys");
        }
    }
}

/// Trigger matcher scoring.
///
/// A candidate's score is the number of distinct trigger tokens found in the
/// utterance, plus `phrase_weight` per token of every trigger phrase found
/// verbatim, plus `mention_weight` when the package is named as `@name`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchingSettings {
    /// Minimum score for a package to become a candidate.
    pub min_score: u32,
    /// Bonus per token for a verbatim trigger phrase.
    pub phrase_weight: u32,
    /// Bonus for an explicit `@name` mention.
    pub mention_weight: u32,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            min_score: 1,
            phrase_weight: 2,
            mention_weight: 1000,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`RUST_LOG` still wins when set).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
