//! Project configuration settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default axis name → project config key table.
///
/// Every axis a package declares is looked up through this table; an axis
/// with no entry can only be settled by asking the user.
pub const DEFAULT_AXIS_KEYS: &[(&str, &str)] = &[
    ("language", "language"),
    ("stateManagement", "stateManagement"),
    ("structure", "structure"),
    ("testingStrictness", "testingStrictness"),
    ("uiFramework", "uiFramework"),
];

/// Where project configuration lives and which keys it may set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    /// Name of the well-known document at the project root.
    pub config_file: String,
    /// Axis name → config key. Keys outside this table are ignored when the
    /// document is parsed.
    pub axis_keys: BTreeMap<String, String>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            config_file: "QUILL.md".to_string(),
            axis_keys: DEFAULT_AXIS_KEYS
                .iter()
                .map(|(axis, key)| ((*axis).to_string(), (*key).to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_maps_ui_framework() {
        let s = ProjectSettings::default();
        assert_eq!(
            s.axis_keys.get("uiFramework").map(String::as_str),
            Some("uiFramework")
        );
        assert_eq!(s.axis_keys.len(), DEFAULT_AXIS_KEYS.len());
    }

    #[test]
    fn user_table_replaces_default() {
        let s: ProjectSettings =
            serde_json::from_str(r#"{"axisKeys": {"orm": "database.orm"}}"#).unwrap();
        assert_eq!(s.axis_keys.len(), 1);
        assert_eq!(s.config_file, "QUILL.md");
    }
}
