//! Descriptor registry.
//!
//! Holds packages in explicit registration order. Project packages shadow
//! global packages with the same name. Once built the registry is shared
//! as `Arc<SkillRegistry>` and never mutated.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use quill_settings::SkillSettings;
use tracing::{debug, warn};

use crate::errors::SkillError;
use crate::loader;
use crate::types::{PackageDescriptor, SkillInfo, SkillScanError, SkillSource};

/// Ordered set of available packages.
#[derive(Debug, Default)]
pub struct SkillRegistry {
    packages: Vec<Arc<PackageDescriptor>>,
    index: HashMap<String, usize>,
    errors: Vec<SkillScanError>,
}

impl SkillRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from packages in the given order.
    pub fn from_packages(
        packages: impl IntoIterator<Item = PackageDescriptor>,
    ) -> Result<Self, SkillError> {
        let mut registry = Self::new();
        for package in packages {
            registry.register(package)?;
        }
        Ok(registry)
    }

    /// Scan global and project directories and order the result.
    ///
    /// Scan failures are recorded in [`errors`](Self::errors); they never
    /// prevent other packages from loading.
    pub fn load(project_root: Option<&Path>, settings: &SkillSettings) -> Self {
        let (global, project) = loader::scan_all(project_root, settings);

        let mut errors = project.errors;
        errors.extend(global.errors);

        let mut merged = dedupe(project.packages, SkillSource::Project, &mut errors);
        for package in dedupe(global.packages, SkillSource::Global, &mut errors) {
            if merged.iter().any(|p| p.name == package.name) {
                debug!(package = %package.name, "global package shadowed by project package");
            } else {
                merged.push(package);
            }
        }

        let ordered = order_packages(merged, &settings.registration_order);
        let mut registry = Self::new();
        for package in ordered {
            // Names are unique after the merge above.
            let _ = registry.register(package);
        }
        registry.errors = errors;

        debug!(
            count = registry.len(),
            errors = registry.errors.len(),
            "skill registry initialized"
        );
        registry
    }

    /// Append a package. Fails on a duplicate name.
    pub fn register(&mut self, package: PackageDescriptor) -> Result<(), SkillError> {
        if self.index.contains_key(&package.name) {
            return Err(SkillError::Duplicate { name: package.name });
        }
        let _ = self
            .index
            .insert(package.name.clone(), self.packages.len());
        self.packages.push(Arc::new(package));
        Ok(())
    }

    /// Get a package by name.
    pub fn get(&self, name: &str) -> Option<&Arc<PackageDescriptor>> {
        self.index.get(name).map(|&i| &self.packages[i])
    }

    /// Check if a package exists.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registration position of a package.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Packages in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PackageDescriptor>> {
        self.packages.iter()
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Errors recorded while scanning.
    pub fn errors(&self) -> &[SkillScanError] {
        &self.errors
    }

    /// Summaries in registration order, optionally filtered by source.
    pub fn list(&self, source: Option<SkillSource>) -> Vec<SkillInfo> {
        self.packages
            .iter()
            .filter(|p| source.is_none_or(|src| p.source == src))
            .map(|p| p.info())
            .collect()
    }
}

/// Keep the first package of each name within one source; record the rest.
fn dedupe(
    packages: Vec<PackageDescriptor>,
    source: SkillSource,
    errors: &mut Vec<SkillScanError>,
) -> Vec<PackageDescriptor> {
    let mut kept: Vec<PackageDescriptor> = Vec::with_capacity(packages.len());
    for package in packages {
        if let Some(first) = kept.iter().find(|p| p.name == package.name) {
            warn!(
                package = %package.name,
                %source,
                path = %package.root.display(),
                kept = %first.root.display(),
                "duplicate package name, keeping first"
            );
            errors.push(SkillScanError {
                path: package.root.display().to_string(),
                message: SkillError::Duplicate { name: package.name }.to_string(),
                recoverable: true,
            });
            continue;
        }
        kept.push(package);
    }
    kept
}

/// Apply the registration order rule.
///
/// Names listed in `explicit` come first, in that order; every other package
/// follows sorted by name. Unknown names in `explicit` are ignored.
pub fn order_packages(
    mut packages: Vec<PackageDescriptor>,
    explicit: &[String],
) -> Vec<PackageDescriptor> {
    let rank = |name: &str| explicit.iter().position(|n| n == name);
    packages.sort_by(|a, b| match (rank(&a.name), rank(&b.name)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
    packages
}
