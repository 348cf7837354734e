//! Reference loader.
//!
//! Materializes the reference documents of a resolved (package, variant).
//! Documents may require further documents through a `requires` header; the
//! loader walks that closure depth-first, emitting each dependency before
//! the document that needs it, and loads every identifier at most once per
//! session.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::descriptor::validate_reference_id;
use crate::errors::ActivationError;
use crate::parser::parse_reference_doc;
use crate::types::{PackageDescriptor, ReferenceId, VariantKey};

/// Where reference content comes from.
pub trait ReferenceSource: Send + Sync {
    /// Read one document of `package`.
    fn read(&self, package: &PackageDescriptor, id: &ReferenceId) -> io::Result<String>;
}

/// Reads documents from the package directory, size-capped.
#[derive(Clone, Debug)]
pub struct FsReferenceSource {
    max_bytes: u64,
}

impl FsReferenceSource {
    /// Source rejecting documents larger than `max_bytes`.
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl ReferenceSource for FsReferenceSource {
    fn read(&self, package: &PackageDescriptor, id: &ReferenceId) -> io::Result<String> {
        let path = package.root.join(id.as_str());
        let size = std::fs::metadata(&path)?.len();
        if size > self.max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("document too large: {size} bytes (max {} bytes)", self.max_bytes),
            ));
        }
        std::fs::read_to_string(&path)
    }
}

/// In-memory documents keyed by package name and identifier.
#[derive(Debug, Default)]
pub struct MemoryReferenceSource {
    docs: RwLock<HashMap<(String, String), String>>,
}

impl MemoryReferenceSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document.
    pub fn insert(&self, package: &str, id: &str, content: impl Into<String>) {
        let _ = self
            .docs
            .write()
            .insert((package.to_string(), id.to_string()), content.into());
    }

    /// Remove a document.
    pub fn remove(&self, package: &str, id: &str) -> bool {
        self.docs
            .write()
            .remove(&(package.to_string(), id.to_string()))
            .is_some()
    }
}

impl ReferenceSource for MemoryReferenceSource {
    fn read(&self, package: &PackageDescriptor, id: &ReferenceId) -> io::Result<String> {
        self.docs
            .read()
            .get(&(package.name.clone(), id.as_str().to_string()))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such document"))
    }
}

/// One delivered document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedReference {
    /// Identifier as declared.
    pub id: ReferenceId,
    /// Content, header stripped.
    pub content: String,
    /// Document whose `requires` pulled this one in, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_by: Option<ReferenceId>,
}

/// Identifiers already materialized in a session, in load order.
#[derive(Clone, Debug, Default)]
pub struct LoadedSet {
    order: Vec<ReferenceId>,
    seen: HashSet<ReferenceId>,
}

impl LoadedSet {
    /// Whether `id` was already loaded.
    pub fn contains(&self, id: &ReferenceId) -> bool {
        self.seen.contains(id)
    }

    /// Record `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: ReferenceId) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Identifiers in load order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceId> {
        self.order.iter()
    }

    /// Number of identifiers.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Resolves and reads reference closures.
#[derive(Clone)]
pub struct ReferenceLoader {
    source: Arc<dyn ReferenceSource>,
}

impl std::fmt::Debug for ReferenceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceLoader").finish_non_exhaustive()
    }
}

impl ReferenceLoader {
    /// Loader over any source.
    pub fn new(source: Arc<dyn ReferenceSource>) -> Self {
        Self { source }
    }

    /// Loader reading package directories, capped at `max_bytes` per document.
    pub fn filesystem(max_bytes: u64) -> Self {
        Self::new(Arc::new(FsReferenceSource::new(max_bytes)))
    }

    /// Load every document `key` needs that `loaded` does not already hold.
    ///
    /// On success the new identifiers are committed to `loaded`; on failure
    /// `loaded` is left untouched.
    pub fn load(
        &self,
        package: &PackageDescriptor,
        key: &VariantKey,
        loaded: &mut LoadedSet,
    ) -> Result<Vec<LoadedReference>, ActivationError> {
        let Some(ids) = package.references_for(key) else {
            return Err(ActivationError::UnknownVariant {
                package: package.name.clone(),
                variant: key.to_string(),
            });
        };

        let mut visited = HashSet::new();
        let mut out = Vec::new();
        for id in ids {
            self.visit(package, id, None, loaded, &mut visited, &mut out)?;
        }

        for doc in &out {
            let _ = loaded.insert(doc.id.clone());
        }
        debug!(package = %package.name, variant = %key, count = out.len(), "references loaded");
        Ok(out)
    }

    fn visit(
        &self,
        package: &PackageDescriptor,
        id: &ReferenceId,
        parent: Option<&ReferenceId>,
        loaded: &LoadedSet,
        visited: &mut HashSet<ReferenceId>,
        out: &mut Vec<LoadedReference>,
    ) -> Result<(), ActivationError> {
        if loaded.contains(id) || !visited.insert(id.clone()) {
            return Ok(());
        }

        let missing = |reason: String| ActivationError::MissingReference {
            package: package.name.clone(),
            reference: id.to_string(),
            reason,
        };

        let raw = self
            .source
            .read(package, id)
            .map_err(|e| missing(e.to_string()))?;
        let doc = parse_reference_doc(&raw);

        for required in &doc.requires {
            let required_id = validate_reference_id(required)
                .map_err(|e| missing(format!("invalid requirement `{required}`: {e}")))?;
            self.visit(package, &required_id, Some(id), loaded, visited, out)?;
        }

        debug!(package = %package.name, reference = %id, "reference read");
        out.push(LoadedReference {
            id: id.clone(),
            content: doc.body,
            required_by: parent.cloned(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::build_descriptor;
    use crate::parser::parse_skill_md;
    use crate::types::SkillSource;
    use assert_matches::assert_matches;
    use std::path::Path;
    use tempfile::TempDir;

    fn package_at(root: &Path, header: &str) -> PackageDescriptor {
        build_descriptor(
            parse_skill_md(&format!("---\nname: pkg\n{header}---\nBody")),
            root,
            &root.join("SKILL.md"),
            SkillSource::Project,
        )
        .unwrap()
    }

    fn ids(docs: &[LoadedReference]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    fn b_key() -> VariantKey {
        VariantKey(vec!["B".into()])
    }

    const AXIS_HEADER: &str = "axes:\n  - ui: [A, B]\nshared: [base.md]\nreferences:\n  - ui=A: [a.md]\n  - ui=B: [b.md]\n";

    #[test]
    fn loads_variant_list_in_order() {
        let pkg = package_at(Path::new("/p"), AXIS_HEADER);
        let source = MemoryReferenceSource::new();
        source.insert("pkg", "base.md", "base");
        source.insert("pkg", "b.md", "b");
        let loader = ReferenceLoader::new(Arc::new(source));

        let mut loaded = LoadedSet::default();
        let docs = loader.load(&pkg, &b_key(), &mut loaded).unwrap();
        assert_eq!(ids(&docs), vec!["base.md", "b.md"]);
        assert_eq!(docs[1].content, "b");
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn nested_requirements_come_first_and_once() {
        let pkg = package_at(Path::new("/p"), AXIS_HEADER);
        let source = MemoryReferenceSource::new();
        source.insert("pkg", "base.md", "---\nrequires: [tokens.md]\n---\nbase");
        source.insert("pkg", "b.md", "---\nrequires: [tokens.md, base.md]\n---\nb");
        source.insert("pkg", "tokens.md", "tokens");
        let loader = ReferenceLoader::new(Arc::new(source));

        let mut loaded = LoadedSet::default();
        let docs = loader.load(&pkg, &b_key(), &mut loaded).unwrap();
        assert_eq!(ids(&docs), vec!["tokens.md", "base.md", "b.md"]);
        assert_eq!(docs[0].required_by.as_ref().map(ReferenceId::as_str), Some("base.md"));
        assert_eq!(docs[1].content, "base");
        assert!(docs[2].required_by.is_none());
    }

    #[test]
    fn cycles_are_tolerated() {
        let pkg = package_at(Path::new("/p"), "references: [x.md]\n");
        let source = MemoryReferenceSource::new();
        source.insert("pkg", "x.md", "---\nrequires: [y.md]\n---\nx");
        source.insert("pkg", "y.md", "---\nrequires: [x.md]\n---\ny");
        let loader = ReferenceLoader::new(Arc::new(source));

        let docs = loader
            .load(&pkg, &VariantKey::empty(), &mut LoadedSet::default())
            .unwrap();
        assert_eq!(ids(&docs), vec!["y.md", "x.md"]);
    }

    #[test]
    fn second_load_adds_nothing() {
        let pkg = package_at(Path::new("/p"), AXIS_HEADER);
        let source = MemoryReferenceSource::new();
        source.insert("pkg", "base.md", "base");
        source.insert("pkg", "b.md", "b");
        let loader = ReferenceLoader::new(Arc::new(source));

        let mut loaded = LoadedSet::default();
        let _ = loader.load(&pkg, &b_key(), &mut loaded).unwrap();
        let again = loader.load(&pkg, &b_key(), &mut loaded).unwrap();
        assert!(again.is_empty());
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn missing_document_is_fatal_and_commits_nothing() {
        let pkg = package_at(Path::new("/p"), AXIS_HEADER);
        let source = MemoryReferenceSource::new();
        source.insert("pkg", "base.md", "base");
        let loader = ReferenceLoader::new(Arc::new(source));

        let mut loaded = LoadedSet::default();
        let err = loader.load(&pkg, &b_key(), &mut loaded).unwrap_err();
        assert_matches!(
            err,
            ActivationError::MissingReference { ref reference, ref package, .. }
                if reference == "b.md" && package == "pkg"
        );
        assert!(loaded.is_empty());
    }

    #[test]
    fn escaping_requirement_rejected() {
        let pkg = package_at(Path::new("/p"), "references: [x.md]\n");
        let source = MemoryReferenceSource::new();
        source.insert("pkg", "x.md", "---\nrequires: [../secret.md]\n---\nx");
        let loader = ReferenceLoader::new(Arc::new(source));

        let err = loader
            .load(&pkg, &VariantKey::empty(), &mut LoadedSet::default())
            .unwrap_err();
        assert_matches!(err, ActivationError::MissingReference { ref reason, .. } if reason.contains("../secret.md"));
    }

    #[test]
    fn unknown_variant() {
        let pkg = package_at(Path::new("/p"), AXIS_HEADER);
        let loader = ReferenceLoader::new(Arc::new(MemoryReferenceSource::new()));
        let err = loader
            .load(&pkg, &VariantKey(vec!["Z".into()]), &mut LoadedSet::default())
            .unwrap_err();
        assert_matches!(err, ActivationError::UnknownVariant { .. });
    }

    #[test]
    fn filesystem_source_reads_and_caps() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("refs")).unwrap();
        std::fs::write(tmp.path().join("refs/small.md"), "small").unwrap();
        std::fs::write(tmp.path().join("refs/big.md"), "x".repeat(64)).unwrap();
        let pkg = package_at(tmp.path(), "references: [refs/small.md]\n");

        let source = FsReferenceSource::new(32);
        let small = validate_reference_id("refs/small.md").unwrap();
        let big = validate_reference_id("refs/big.md").unwrap();
        let missing = validate_reference_id("refs/none.md").unwrap();

        assert_eq!(source.read(&pkg, &small).unwrap(), "small");
        assert_eq!(
            source.read(&pkg, &big).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
        assert_eq!(
            source.read(&pkg, &missing).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn filesystem_rejects_non_utf8() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bin.md"), [0xff, 0xfe, 0x00]).unwrap();
        let pkg = package_at(tmp.path(), "references: [bin.md]\n");
        let loader = ReferenceLoader::filesystem(1024);

        let err = loader
            .load(&pkg, &VariantKey::empty(), &mut LoadedSet::default())
            .unwrap_err();
        assert_matches!(err, ActivationError::MissingReference { .. });
    }
}
