//! Validation of a parsed `SKILL.md` into a [`PackageDescriptor`].
//!
//! Every combination of axis values must end up with exactly one reference
//! list, and no list may exist for a combination the axes cannot produce.
//! A package that breaks either rule fails to load on its own.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path};

use crate::constants::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_VARIANTS};
use crate::errors::SkillError;
use crate::parser::{ParsedSkillMd, extract_quoted_phrases};
use crate::types::{
    PackageDescriptor, ReferenceId, SkillSource, TriggerPhrase, VariantAxis, VariantKey,
    all_variant_keys,
};

/// Build a validated descriptor from a parsed `SKILL.md`.
pub fn build_descriptor(
    parsed: ParsedSkillMd,
    root: &Path,
    skill_md_path: &Path,
    source: SkillSource,
) -> Result<PackageDescriptor, SkillError> {
    let fm = parsed.frontmatter;
    let name = fm.name.ok_or_else(|| SkillError::MissingName {
        path: skill_md_path.display().to_string(),
    })?;
    validate_name(&name)?;

    let description = fm.description.unwrap_or(parsed.description);
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(SkillError::Parse {
            path: skill_md_path.display().to_string(),
            message: format!("description exceeds {MAX_DESCRIPTION_LEN} characters"),
        });
    }

    let mut phrases = extract_quoted_phrases(&description);
    phrases.extend(fm.triggers.unwrap_or_default());
    let trigger_phrases = dedupe_phrases(&phrases);

    let axes = build_axes(&name, fm.axes)?;
    let shared = fm
        .shared
        .iter()
        .map(|id| reference_id(&name, id))
        .collect::<Result<Vec<_>, _>>()?;
    let reference_map = build_reference_map(&name, &axes, &shared, fm.references)?;

    Ok(PackageDescriptor {
        name,
        description,
        version: fm.version,
        trigger_phrases,
        axes,
        reference_map,
        instructions: parsed.content,
        source,
        root: root.to_path_buf(),
        skill_md_path: skill_md_path.to_path_buf(),
    })
}

/// Check the package naming rules: lowercase letters, digits and hyphens,
/// not starting or ending with a hyphen, at most 64 characters.
pub fn validate_name(name: &str) -> Result<(), SkillError> {
    let invalid = |reason: &str| SkillError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name exceeds 64 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("only lowercase letters, digits and hyphens are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("name cannot start or end with a hyphen"));
    }
    Ok(())
}

/// Validate a reference identifier as a relative path inside the package.
///
/// Backslashes are normalized to `/`; `.` segments are dropped.
pub fn validate_reference_id(raw: &str) -> Result<ReferenceId, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty reference".to_string());
    }
    let normalized = raw.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err("absolute paths are not allowed".to_string());
    }

    let mut parts = Vec::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => return Err("`..` segments are not allowed".to_string()),
            Component::RootDir | Component::Prefix(_) => {
                return Err("absolute paths are not allowed".to_string());
            }
        }
    }
    if parts.is_empty() {
        return Err("reference names no file".to_string());
    }
    Ok(ReferenceId::new(parts.join("/")))
}

fn reference_id(package: &str, raw: &str) -> Result<ReferenceId, SkillError> {
    validate_reference_id(raw).map_err(|message| SkillError::InvalidReference {
        package: package.to_string(),
        reference: raw.to_string(),
        message,
    })
}

fn dedupe_phrases(phrases: &[String]) -> Vec<TriggerPhrase> {
    let mut seen = HashSet::new();
    phrases
        .iter()
        .filter_map(|p| TriggerPhrase::new(p))
        .filter(|p| seen.insert(p.tokens.clone()))
        .collect()
}

fn build_axes(
    package: &str,
    raw: Vec<(String, Vec<String>)>,
) -> Result<Vec<VariantAxis>, SkillError> {
    let invalid = |message: String| SkillError::InvalidVariantMap {
        package: package.to_string(),
        message,
    };

    let mut axes: Vec<VariantAxis> = Vec::with_capacity(raw.len());
    let mut combinations: usize = 1;
    for (name, values) in raw {
        if name.is_empty() {
            return Err(invalid("axis with empty name".to_string()));
        }
        if axes.iter().any(|a| a.name == name) {
            return Err(invalid(format!("axis `{name}` declared twice")));
        }
        if values.is_empty() {
            return Err(invalid(format!("axis `{name}` has no values")));
        }
        let mut lowered = HashSet::new();
        for value in &values {
            if !lowered.insert(value.to_lowercase()) {
                return Err(invalid(format!("axis `{name}` repeats value `{value}`")));
            }
        }
        combinations = combinations.saturating_mul(values.len());
        if combinations > MAX_VARIANTS {
            return Err(invalid(format!("more than {MAX_VARIANTS} variants")));
        }
        axes.push(VariantAxis { name, values });
    }
    Ok(axes)
}

fn build_reference_map(
    package: &str,
    axes: &[VariantAxis],
    shared: &[ReferenceId],
    entries: Vec<(Option<String>, Vec<String>)>,
) -> Result<BTreeMap<VariantKey, Vec<ReferenceId>>, SkillError> {
    let invalid = |message: String| SkillError::InvalidVariantMap {
        package: package.to_string(),
        message,
    };

    let mut map = BTreeMap::new();

    if axes.is_empty() {
        let mut list = shared.to_vec();
        for (selector, ids) in entries {
            if let Some(selector) = selector {
                return Err(invalid(format!(
                    "selector `{selector}` given but the package declares no axes"
                )));
            }
            for id in ids {
                push_unique(&mut list, reference_id(package, &id)?);
            }
        }
        let _ = map.insert(VariantKey::empty(), list);
        return Ok(map);
    }

    let mut per_variant = Vec::with_capacity(entries.len());
    for (selector, ids) in entries {
        let Some(selector) = selector else {
            return Err(invalid(format!(
                "plain reference `{}` in a package with axes, list it under `shared`",
                ids.join(", ")
            )));
        };
        per_variant.push((selector, ids));
    }

    if per_variant.is_empty() {
        for key in all_variant_keys(axes) {
            let _ = map.insert(key, shared.to_vec());
        }
        return Ok(map);
    }

    for (selector, ids) in per_variant {
        let key = parse_selector(&selector, axes).map_err(&invalid)?;
        let mut list = shared.to_vec();
        for id in ids {
            push_unique(&mut list, reference_id(package, &id)?);
        }
        if map.insert(key, list).is_some() {
            return Err(invalid(format!("selector `{selector}` listed twice")));
        }
    }

    if let Some(missing) = all_variant_keys(axes)
        .into_iter()
        .find(|k| !map.contains_key(k))
    {
        return Err(invalid(format!("no references for variant {missing}")));
    }
    Ok(map)
}

/// Parse `axis=value[, axis=value]` naming every axis exactly once.
fn parse_selector(selector: &str, axes: &[VariantAxis]) -> Result<VariantKey, String> {
    let mut values: Vec<Option<String>> = vec![None; axes.len()];
    for part in selector.split(',') {
        let Some((axis_name, value)) = part.split_once('=') else {
            return Err(format!("malformed selector `{selector}`"));
        };
        let axis_name = axis_name.trim();
        let Some(pos) = axes.iter().position(|a| a.name == axis_name) else {
            return Err(format!("selector `{selector}` names unknown axis `{axis_name}`"));
        };
        let Some(canonical) = axes[pos].canonical(value) else {
            return Err(format!(
                "selector `{selector}` uses value `{}` not allowed for `{axis_name}`",
                value.trim()
            ));
        };
        if values[pos].replace(canonical.to_string()).is_some() {
            return Err(format!("selector `{selector}` names `{axis_name}` twice"));
        }
    }
    values
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .map(VariantKey)
        .ok_or_else(|| format!("selector `{selector}` does not name every axis"))
}

fn push_unique(list: &mut Vec<ReferenceId>, id: ReferenceId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_skill_md;
    use assert_matches::assert_matches;

    fn build(content: &str) -> Result<PackageDescriptor, SkillError> {
        build_descriptor(
            parse_skill_md(content),
            Path::new("/skills/pkg"),
            Path::new("/skills/pkg/SKILL.md"),
            SkillSource::Global,
        )
    }

    fn ids(list: &[ReferenceId]) -> Vec<&str> {
        list.iter().map(ReferenceId::as_str).collect()
    }

    #[test]
    fn builds_single_axis_package() {
        let pkg = build(
            "---\nname: scaffold\ndescription: Use for \"scaffold a new project\".\naxes:\n  - uiFramework: [A, B]\nshared: [conventions.md]\nreferences:\n  - uiFramework=A: [a.md]\n  - uiFramework=B: [b.md]\n---\nBody",
        )
        .unwrap();
        assert_eq!(pkg.variant_count(), 2);
        let b = pkg.references_for(&VariantKey(vec!["B".into()])).unwrap();
        assert_eq!(ids(b), vec!["conventions.md", "b.md"]);
        assert_eq!(pkg.trigger_phrases[0].text, "scaffold a new project");
        assert_eq!(pkg.instructions, "Body");
    }

    #[test]
    fn zero_axis_package_has_single_variant() {
        let pkg = build("---\nname: review\nshared: [base.md]\nreferences: [checklist.md, base.md]\n---\n")
            .unwrap();
        let list = pkg.references_for(&VariantKey::empty()).unwrap();
        assert_eq!(ids(list), vec!["base.md", "checklist.md"]);
    }

    #[test]
    fn axes_without_selectors_share_everything() {
        let pkg = build("---\nname: x\naxes:\n  - a: [1, 2]\n  - b: [p, q]\nshared: [s.md]\n---\n")
            .unwrap();
        assert_eq!(pkg.variant_count(), 4);
        assert!(pkg.reference_map.values().all(|v| ids(v) == vec!["s.md"]));
    }

    #[test]
    fn missing_combination_rejected() {
        let err = build("---\nname: x\naxes:\n  - a: [1, 2]\nreferences:\n  - a=1: [one.md]\n---\n")
            .unwrap_err();
        assert_matches!(err, SkillError::InvalidVariantMap { ref message, .. } if message.contains("(2)"));
    }

    #[test]
    fn unreachable_value_rejected() {
        let err = build(
            "---\nname: x\naxes:\n  - a: [1]\nreferences:\n  - a=1: [one.md]\n  - a=9: [nine.md]\n---\n",
        )
        .unwrap_err();
        assert_matches!(err, SkillError::InvalidVariantMap { .. });
    }

    #[test]
    fn duplicate_selector_rejected() {
        let err = build(
            "---\nname: x\naxes:\n  - a: [1]\nreferences:\n  - a=1: [one.md]\n  - a=1: [two.md]\n---\n",
        )
        .unwrap_err();
        assert_matches!(err, SkillError::InvalidVariantMap { ref message, .. } if message.contains("twice"));
    }

    #[test]
    fn partial_selector_rejected() {
        let err = build(
            "---\nname: x\naxes:\n  - a: [1]\n  - b: [p]\nreferences:\n  - a=1: [one.md]\n---\n",
        )
        .unwrap_err();
        assert_matches!(err, SkillError::InvalidVariantMap { ref message, .. } if message.contains("every axis"));
    }

    #[test]
    fn selector_on_zero_axis_package_rejected() {
        let err = build("---\nname: x\nreferences:\n  - a=1: [one.md]\n---\n").unwrap_err();
        assert_matches!(err, SkillError::InvalidVariantMap { .. });
    }

    #[test]
    fn selector_values_are_canonicalized() {
        let pkg = build(
            "---\nname: x\naxes:\n  - ui: [React, Vue]\nreferences:\n  - ui=react: [r.md]\n  - ui=VUE: [v.md]\n---\n",
        )
        .unwrap();
        assert!(pkg.references_for(&VariantKey(vec!["React".into()])).is_some());
        assert!(pkg.references_for(&VariantKey(vec!["Vue".into()])).is_some());
    }

    #[test]
    fn missing_name_rejected() {
        let err = build("---\ndescription: nameless\n---\n").unwrap_err();
        assert_matches!(err, SkillError::MissingName { .. });
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("scaffold-project-2").is_ok());
        assert_matches!(validate_name(""), Err(SkillError::InvalidName { .. }));
        assert_matches!(validate_name("Scaffold"), Err(SkillError::InvalidName { .. }));
        assert_matches!(validate_name("-x"), Err(SkillError::InvalidName { .. }));
        assert_matches!(validate_name(&"a".repeat(65)), Err(SkillError::InvalidName { .. }));
    }

    #[test]
    fn reference_ids_must_stay_inside_package() {
        assert_eq!(validate_reference_id("./refs/a.md").unwrap().as_str(), "refs/a.md");
        assert_eq!(validate_reference_id("refs\\a.md").unwrap().as_str(), "refs/a.md");
        assert!(validate_reference_id("/etc/passwd").is_err());
        assert!(validate_reference_id("../other/a.md").is_err());
        assert!(validate_reference_id("refs/../../a.md").is_err());
        assert!(validate_reference_id("").is_err());
        assert!(validate_reference_id(".").is_err());
    }

    #[test]
    fn invalid_reference_fails_package() {
        let err = build("---\nname: x\nreferences: [../escape.md]\n---\n").unwrap_err();
        assert_matches!(err, SkillError::InvalidReference { ref reference, .. } if reference == "../escape.md");
    }

    #[test]
    fn duplicate_axis_values_rejected() {
        let err = build("---\nname: x\naxes:\n  - a: [One, one]\n---\n").unwrap_err();
        assert_matches!(err, SkillError::InvalidVariantMap { .. });
    }

    #[test]
    fn trigger_phrases_deduplicated() {
        let pkg = build(
            "---\nname: x\ndescription: Use for \"Scaffold Project\".\ntriggers: [scaffold project, scaffold]\n---\n",
        )
        .unwrap();
        let texts: Vec<_> = pkg.trigger_phrases.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Scaffold Project", "scaffold"]);
    }
}
