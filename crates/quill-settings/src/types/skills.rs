//! Package discovery settings.

use serde::{Deserialize, Serialize};

/// Where packages are discovered and how they are ordered.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillSettings {
    /// Global packages directory. `None` means `~/.quill/skills`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_dir: Option<String>,
    /// Project-local package directories, relative to the project root.
    pub project_dirs: Vec<String>,
    /// Explicit registration order. Listed names come first, in this order;
    /// every other package follows, sorted by name.
    pub registration_order: Vec<String>,
    /// Maximum size of a `SKILL.md` file in bytes.
    pub max_file_size: u64,
    /// Maximum size of a single reference document in bytes.
    pub max_reference_size: u64,
    /// Sessions allowed to wait on a question at once. The oldest is
    /// discarded when a new one would exceed it.
    pub max_suspended: usize,
}

impl Default for SkillSettings {
    fn default() -> Self {
        Self {
            global_dir: None,
            project_dirs: vec![".quill/skills".to_string(), ".claude/skills".to_string()],
            registration_order: Vec::new(),
            max_file_size: 100 * 1024,
            max_reference_size: 512 * 1024,
            max_suspended: 1024,
        }
    }
}

impl SkillSettings {
    /// Resolve the global packages directory.
    pub fn global_dir_path(&self) -> std::path::PathBuf {
        match &self.global_dir {
            Some(dir) => std::path::PathBuf::from(dir),
            None => {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                std::path::PathBuf::from(home).join(".quill").join("skills")
            }
        }
    }
}
