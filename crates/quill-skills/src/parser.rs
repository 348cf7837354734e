//! `SKILL.md` parser.
//!
//! Parses descriptors with a header block delimited by `---`, using a
//! hand-written YAML subset (no external YAML dependency):
//!
//! - key-value pairs: `name: value`
//! - inline arrays: `triggers: [a, b]`
//! - multi-line arrays: `shared:\n  - a.md\n  - b.md`
//! - mapping lists: `axes:\n  - uiFramework: [A, B]`
//! - quoted strings: `name: "value"`
//!
//! Reference documents use the same header syntax for `requires`.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::SkillFrontmatter;

/// Result of parsing a `SKILL.md` file.
#[derive(Debug, Clone)]
pub struct ParsedSkillMd {
    /// Parsed header (empty defaults if none present).
    pub frontmatter: SkillFrontmatter,
    /// Content after the header (the markdown body).
    pub content: String,
    /// First non-header, non-empty line of the body (up to 200 chars).
    pub description: String,
}

/// Parse a `SKILL.md` file's raw content into header, body, and description.
pub fn parse_skill_md(raw_content: &str) -> ParsedSkillMd {
    let (yaml, body) = extract_frontmatter(raw_content);
    let frontmatter = match yaml {
        Some(yaml_str) => parse_simple_yaml(&yaml_str),
        None => SkillFrontmatter::default(),
    };
    let description = extract_description(&body);

    ParsedSkillMd {
        frontmatter,
        content: body,
        description,
    }
}

/// A reference document split into its nested requirements and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    /// Identifiers from `requires`, in declared order.
    pub requires: Vec<String>,
    /// Content with the header stripped.
    pub body: String,
}

/// Split a reference document into `requires` and body.
///
/// Documents without a header are returned unchanged.
pub fn parse_reference_doc(raw_content: &str) -> ParsedReference {
    let (yaml, body) = extract_frontmatter(raw_content);
    let mut requires = Vec::new();
    if let Some(yaml) = yaml {
        let lines: Vec<&str> = yaml.lines().collect();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].trim();
            i += 1;
            if let Some(("requires", value)) = line.split_once(':').map(|(k, v)| (k.trim(), v.trim()))
            {
                requires = parse_array_value(value, &lines, &mut i);
            }
        }
    }
    ParsedReference { requires, body }
}

static QUOTED_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Straight or curly double quotes.
    Regex::new(r#""([^"\n]+)"|“([^”\n]+)”"#).expect("valid regex")
});

/// Quoted example phrases inside a description, in order of appearance.
pub fn extract_quoted_phrases(description: &str) -> Vec<String> {
    QUOTED_PHRASE_RE
        .captures_iter(description)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract the header block from content.
///
/// Looks for a `---` delimited block at the start of the content.
/// Returns `(yaml_string, body_after_header)`.
fn extract_frontmatter(content: &str) -> (Option<String>, String) {
    let trimmed = content.trim_start();
    if !trimmed.starts_with("---") {
        return (None, content.to_string());
    }

    let after_first = &trimmed[3..];
    let after_first = after_first
        .strip_prefix("\r\n")
        .or_else(|| after_first.strip_prefix('\n'))
        .unwrap_or(after_first);

    // Empty header: the closing delimiter is the very next line.
    if let Some(rest) = after_first.strip_prefix("---") {
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        return (Some(String::new()), rest.to_string());
    }

    if let Some(end_idx) = after_first.find("\n---") {
        let yaml = after_first[..end_idx].to_string();
        let body_start = end_idx + 4;
        let body = if body_start < after_first.len() {
            let rest = &after_first[body_start..];
            rest.strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest)
                .to_string()
        } else {
            String::new()
        };
        (Some(yaml), body)
    } else {
        (None, content.to_string())
    }
}

/// Parse the header YAML subset into a [`SkillFrontmatter`].
fn parse_simple_yaml(yaml: &str) -> SkillFrontmatter {
    let mut fm = SkillFrontmatter::default();
    let lines: Vec<&str> = yaml.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = key.trim();
        let value = value.trim();

        match key {
            "name" => fm.name = Some(unquote(value)),
            "description" => fm.description = Some(unquote(value)),
            "version" => fm.version = Some(unquote(value)),
            "triggers" => fm.triggers = Some(parse_array_value(value, &lines, &mut i)),
            "shared" => fm.shared = parse_array_value(value, &lines, &mut i),
            "axes" => fm.axes = parse_mapping_list(&lines, &mut i),
            "references" => fm.references = parse_reference_list(value, &lines, &mut i),
            _ => {}
        }
    }

    fm
}

/// Parse an array value, either inline `[a, b]` or multi-line `- item`.
fn parse_array_value(value: &str, lines: &[&str], i: &mut usize) -> Vec<String> {
    if value.starts_with('[') {
        return parse_inline_array(value);
    }

    if !value.is_empty() {
        return vec![unquote(value)];
    }

    let mut items = Vec::new();
    while let Some(item) = lines.get(*i).and_then(|l| list_item(l)) {
        items.push(unquote(item));
        *i += 1;
    }
    items
}

/// Parse `- key: [values]` lines into ordered pairs.
fn parse_mapping_list(lines: &[&str], i: &mut usize) -> Vec<(String, Vec<String>)> {
    let mut entries = Vec::new();
    while let Some(item) = lines.get(*i).and_then(|l| list_item(l)) {
        *i += 1;
        if let Some((key, value)) = split_mapping(item) {
            entries.push((unquote(key), parse_values(value)));
        }
    }
    entries
}

/// Parse the `references` value.
///
/// An inline array yields plain entries. A multi-line list mixes plain items
/// (`- refs/a.md`) and selector entries (`- axis=value: [ids]`); an item is a
/// selector when an `=` appears before its `:`.
fn parse_reference_list(
    value: &str,
    lines: &[&str],
    i: &mut usize,
) -> Vec<(Option<String>, Vec<String>)> {
    if !value.is_empty() {
        return parse_values(value).into_iter().map(|id| (None, vec![id])).collect();
    }

    let mut entries = Vec::new();
    while let Some(item) = lines.get(*i).and_then(|l| list_item(l)) {
        *i += 1;
        match split_mapping(item) {
            Some((selector, ids)) if selector.contains('=') => {
                entries.push((Some(selector.trim().to_string()), parse_values(ids)));
            }
            _ => entries.push((None, vec![unquote(item)])),
        }
    }
    entries
}

/// The text of a `- item` line, if it is one.
fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let item = trimmed.strip_prefix('-')?;
    let item = item.trim();
    (!item.is_empty()).then_some(item)
}

/// Split `key: value` at the first colon outside brackets.
fn split_mapping(item: &str) -> Option<(&str, &str)> {
    let bracket = item.find('[').unwrap_or(item.len());
    let colon = item.find(':')?;
    (colon < bracket).then(|| (item[..colon].trim(), item[colon + 1..].trim()))
}

/// Values of a mapping entry: an inline array or a single scalar.
fn parse_values(value: &str) -> Vec<String> {
    if value.starts_with('[') {
        parse_inline_array(value)
    } else if value.is_empty() {
        Vec::new()
    } else {
        vec![unquote(value)]
    }
}

/// Parse an inline array like `[item1, item2, item3]`.
fn parse_inline_array(value: &str) -> Vec<String> {
    let inner = value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();

    if inner.is_empty() {
        return Vec::new();
    }

    inner
        .split(',')
        .map(|s| unquote(s.trim()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Remove surrounding quotes from a string value.
///
/// Left alone when the quote character also appears inside, so a
/// description that starts and ends with two different quoted phrases keeps
/// both.
fn unquote(s: &str) -> String {
    let trimmed = s.trim();
    for q in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(q) && trimmed.ends_with(q) {
            let inner = &trimmed[1..trimmed.len() - 1];
            if !inner.contains(q) {
                return inner.to_string();
            }
        }
    }
    trimmed.to_string()
}

/// Extract a description from the content body.
///
/// Returns the first non-header, non-empty, non-horizontal-rule line,
/// truncated to 200 characters.
fn extract_description(content: &str) -> String {
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
        if is_horizontal_rule(trimmed) {
            continue;
        }

        return trimmed.chars().take(200).collect();
    }

    String::new()
}

/// Check if a line is a markdown horizontal rule.
fn is_horizontal_rule(line: &str) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    line.len() >= 3 && matches!(first, '-' | '*' | '_') && chars.all(|c| c == first)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAFFOLD: &str = r#"---
name: scaffold-project
description: Scaffold a new project. Use for "scaffold a new project" or "bootstrap an app".
triggers: [scaffold, project template]
axes:
  - uiFramework: [A, B, C]
shared: [references/conventions.md]
references:
  - uiFramework=A: [references/a.md]
  - uiFramework=B: [references/b.md, references/b-extra.md]
  - uiFramework=C: [references/c.md]
---
# Scaffold

Create the layout."#;

    #[test]
    fn parses_full_header() {
        let parsed = parse_skill_md(SCAFFOLD);
        let fm = &parsed.frontmatter;
        assert_eq!(fm.name.as_deref(), Some("scaffold-project"));
        assert_eq!(
            fm.triggers,
            Some(vec!["scaffold".to_string(), "project template".to_string()])
        );
        assert_eq!(
            fm.axes,
            vec![(
                "uiFramework".to_string(),
                vec!["A".to_string(), "B".to_string(), "C".to_string()]
            )]
        );
        assert_eq!(fm.shared, vec!["references/conventions.md"]);
        assert_eq!(fm.references.len(), 3);
        assert_eq!(fm.references[1].0.as_deref(), Some("uiFramework=B"));
        assert_eq!(
            fm.references[1].1,
            vec!["references/b.md", "references/b-extra.md"]
        );
        assert!(parsed.content.starts_with("# Scaffold"));
        assert_eq!(parsed.description, "Create the layout.");
    }

    #[test]
    fn parses_inline_reference_list() {
        let parsed = parse_skill_md("---\nname: x\nreferences: [a.md, b.md]\n---\nBody");
        assert_eq!(
            parsed.frontmatter.references,
            vec![(None, vec!["a.md".to_string()]), (None, vec!["b.md".to_string()])]
        );
    }

    #[test]
    fn parses_multiline_plain_references() {
        let parsed = parse_skill_md("---\nname: x\nreferences:\n  - a.md\n  - docs/b.md\n---\n");
        assert_eq!(parsed.frontmatter.references.len(), 2);
        assert!(parsed.frontmatter.references.iter().all(|(s, _)| s.is_none()));
    }

    #[test]
    fn multi_axis_selector_kept_raw() {
        let parsed = parse_skill_md(
            "---\nname: x\naxes:\n  - a: [1, 2]\n  - b: [x]\nreferences:\n  - a=1, b=x: [one.md]\n  - a=2, b=x: [two.md]\n---\n",
        );
        assert_eq!(parsed.frontmatter.axes.len(), 2);
        assert_eq!(
            parsed.frontmatter.references[0].0.as_deref(),
            Some("a=1, b=x")
        );
    }

    #[test]
    fn multiline_triggers() {
        let parsed = parse_skill_md("---\ntriggers:\n  - alpha\n  - \"beta gamma\"\n---\nBody");
        assert_eq!(
            parsed.frontmatter.triggers,
            Some(vec!["alpha".to_string(), "beta gamma".to_string()])
        );
    }

    #[test]
    fn no_header() {
        let content = "# My Skill\n\nJust a body.";
        let result = parse_skill_md(content);
        assert!(result.frontmatter.name.is_none());
        assert_eq!(result.content, content);
    }

    #[test]
    fn unclosed_header_is_body() {
        let content = "---\nname: incomplete\nSome content";
        let result = parse_skill_md(content);
        assert!(result.frontmatter.name.is_none());
        assert_eq!(result.content, content);
    }

    #[test]
    fn quoted_phrases_straight_and_curly() {
        let phrases = extract_quoted_phrases(
            "Use for \"scaffold a new project\" or “bootstrap an app”, not \"\".",
        );
        assert_eq!(phrases, vec!["scaffold a new project", "bootstrap an app"]);
    }

    #[test]
    fn unquote_keeps_inner_phrases() {
        assert_eq!(unquote("\"hello\""), "hello");
        assert_eq!(unquote("'world'"), "world");
        assert_eq!(unquote("  plain  "), "plain");
        assert_eq!(unquote("\"a\" or \"b\""), "\"a\" or \"b\"");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn description_header_keeps_both_quoted_phrases() {
        let parsed = parse_skill_md("---\ndescription: \"review code\" and \"audit\"\n---\n");
        let desc = parsed.frontmatter.description.unwrap();
        assert_eq!(extract_quoted_phrases(&desc), vec!["review code", "audit"]);
    }

    #[test]
    fn reference_doc_requires_and_body() {
        let doc = parse_reference_doc("---\nrequires: [base.md, style/tokens.md]\n---\n# B\nbody");
        assert_eq!(doc.requires, vec!["base.md", "style/tokens.md"]);
        assert_eq!(doc.body, "# B\nbody");
    }

    #[test]
    fn reference_doc_without_header() {
        let doc = parse_reference_doc("# Plain\ncontent");
        assert!(doc.requires.is_empty());
        assert_eq!(doc.body, "# Plain\ncontent");
    }

    #[test]
    fn reference_doc_multiline_requires() {
        let doc = parse_reference_doc("---\nrequires:\n  - a.md\n  - b.md\n---\nx");
        assert_eq!(doc.requires, vec!["a.md", "b.md"]);
    }

    #[test]
    fn description_skips_headers_rules_and_code() {
        let result = parse_skill_md("# Title\n---\n```\ncode\n```\n\nActual text.");
        assert_eq!(result.description, "Actual text.");
    }

    #[test]
    fn description_truncated() {
        let content = format!("# Header\n\n{}", "a".repeat(300));
        assert_eq!(parse_skill_md(&content).description.len(), 200);
    }
}
