//! Filesystem package scanner.
//!
//! Discovers packages by scanning directories for folders containing
//! `SKILL.md`. Supports the global directory and project-local directories.

use std::path::{Path, PathBuf};

use quill_settings::SkillSettings;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::constants::SKILL_MD_FILENAME;
use crate::descriptor::build_descriptor;
use crate::errors::SkillError;
use crate::parser::parse_skill_md;
use crate::types::{PackageDescriptor, SkillScanError, SkillScanResult, SkillSource};

/// Project package directories for a project root.
pub fn project_skills_dirs(project_root: &Path, settings: &SkillSettings) -> Vec<PathBuf> {
    settings
        .project_dirs
        .iter()
        .map(|dir| project_root.join(dir))
        .collect()
}

/// Scan a single directory for package folders.
///
/// Non-existent directories return empty results (not errors). Each
/// immediate subdirectory containing a `SKILL.md` is loaded as a package;
/// folders are visited in name order.
pub fn scan_directory(dir: &Path, source: SkillSource, max_file_size: u64) -> SkillScanResult {
    let mut result = SkillScanResult::default();

    if !dir.is_dir() {
        return result;
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read skills directory entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let skill_md_path = path.join(SKILL_MD_FILENAME);
        if !skill_md_path.is_file() {
            continue;
        }

        match load_package(path, &skill_md_path, source, max_file_size) {
            Ok(package) => {
                debug!(package = %package.name, %source, "loaded package");
                result.packages.push(package);
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping package");
                result.errors.push(SkillScanError {
                    path: path.display().to_string(),
                    message: error.to_string(),
                    recoverable: true,
                });
            }
        }
    }

    result
}

/// Scan the global directory and every project directory.
///
/// Returns `(global_result, project_result)`. Project packages take
/// precedence when names conflict (handled by the registry, not here).
pub fn scan_all(
    project_root: Option<&Path>,
    settings: &SkillSettings,
) -> (SkillScanResult, SkillScanResult) {
    let global_result = scan_directory(
        &settings.global_dir_path(),
        SkillSource::Global,
        settings.max_file_size,
    );

    let mut project_result = SkillScanResult::default();
    if let Some(root) = project_root {
        for dir in project_skills_dirs(root, settings) {
            let scan = scan_directory(&dir, SkillSource::Project, settings.max_file_size);
            project_result.packages.extend(scan.packages);
            project_result.errors.extend(scan.errors);
        }
    }

    (global_result, project_result)
}

/// Load one package from its directory.
pub fn load_package(
    package_dir: &Path,
    skill_md_path: &Path,
    source: SkillSource,
    max_file_size: u64,
) -> Result<PackageDescriptor, SkillError> {
    let size = std::fs::metadata(skill_md_path)?.len();
    if size > max_file_size {
        return Err(SkillError::FileTooLarge {
            path: skill_md_path.display().to_string(),
            size,
            max: max_file_size,
        });
    }

    let content = std::fs::read_to_string(skill_md_path)?;
    build_descriptor(parse_skill_md(&content), package_dir, skill_md_path, source)
}
