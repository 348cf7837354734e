//! Trigger matcher.
//!
//! Scores every registered package against an utterance and returns the
//! candidates ranked highest first. Pure: the same utterance and registry
//! always give the same ranking.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

use quill_core::text::tokenize;
use quill_settings::MatchingSettings;
use regex::Regex;

use crate::registry::SkillRegistry;
use crate::types::PackageDescriptor;

static MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([a-zA-Z][a-zA-Z0-9_-]*)").unwrap());

/// Matcher weights and threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchOptions {
    /// Minimum total score for a candidate.
    pub min_score: u32,
    /// Bonus per token of a phrase found contiguously in the utterance.
    pub phrase_weight: u32,
    /// Bonus for an explicit `@name` mention.
    pub mention_weight: u32,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::from(&MatchingSettings::default())
    }
}

impl From<&MatchingSettings> for MatchOptions {
    fn from(s: &MatchingSettings) -> Self {
        Self {
            min_score: s.min_score,
            phrase_weight: s.phrase_weight,
            mention_weight: s.mention_weight,
        }
    }
}

/// A package that matched an utterance.
#[derive(Clone, Debug)]
pub struct Candidate {
    /// The matched package.
    pub package: Arc<PackageDescriptor>,
    /// Total score.
    pub score: u32,
    /// Registration position, the tie-breaker.
    pub position: usize,
    /// Trigger phrases found verbatim in the utterance.
    pub matched_phrases: Vec<String>,
    /// Whether the utterance named the package with `@name`.
    pub mentioned: bool,
}

impl Candidate {
    /// Package name.
    pub fn name(&self) -> &str {
        &self.package.name
    }
}

/// Rank the registry's packages against `utterance`.
///
/// Sorted by score descending, ties broken by registration order.
pub fn match_utterance(
    utterance: &str,
    registry: &SkillRegistry,
    options: &MatchOptions,
) -> Vec<Candidate> {
    let tokens = tokenize(utterance);
    let token_set: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    let mentions: HashSet<String> = extract_mentions(utterance).into_iter().collect();

    let mut candidates: Vec<Candidate> = registry
        .iter()
        .enumerate()
        .filter_map(|(position, package)| {
            score_package(package, &tokens, &token_set, &mentions, options).map(
                |(score, matched_phrases, mentioned)| Candidate {
                    package: Arc::clone(package),
                    score,
                    position,
                    matched_phrases,
                    mentioned,
                },
            )
        })
        .collect();

    candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.position.cmp(&b.position)));
    candidates
}

/// The leading run of candidates sharing the top score.
pub fn top_candidates(candidates: &[Candidate]) -> &[Candidate] {
    let Some(first) = candidates.first() else {
        return candidates;
    };
    let end = candidates
        .iter()
        .position(|c| c.score != first.score)
        .unwrap_or(candidates.len());
    &candidates[..end]
}

fn score_package(
    package: &PackageDescriptor,
    tokens: &[String],
    token_set: &HashSet<&str>,
    mentions: &HashSet<String>,
    options: &MatchOptions,
) -> Option<(u32, Vec<String>, bool)> {
    let mut trigger_tokens: BTreeSet<&str> = BTreeSet::new();
    let mut exact: u32 = 0;
    let mut matched = Vec::new();

    for phrase in &package.trigger_phrases {
        trigger_tokens.extend(phrase.content_tokens.iter().map(String::as_str));
        if quill_core::text::contains_sequence(tokens, &phrase.tokens) {
            let len = u32::try_from(phrase.content_tokens.len()).unwrap_or(u32::MAX);
            exact = exact.saturating_add(options.phrase_weight.saturating_mul(len));
            matched.push(phrase.text.clone());
        }
    }

    let overlap = trigger_tokens
        .iter()
        .filter(|t| token_set.contains(*t))
        .count();
    let overlap = u32::try_from(overlap).unwrap_or(u32::MAX);
    let mentioned = mentions.contains(&package.name);

    if overlap == 0 && !mentioned {
        return None;
    }

    let score = overlap
        .saturating_add(exact)
        .saturating_add(if mentioned { options.mention_weight } else { 0 });
    (score >= options.min_score).then_some((score, matched, mentioned))
}

/// Extract `@name` mentions from an utterance.
///
/// Ignores fenced code blocks and inline code. A word character or backtick
/// right before `@` disqualifies a match, so `user@example.com` is not a
/// mention. Names are lowercased; each appears once, in order.
pub fn extract_mentions(utterance: &str) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();
    let mut in_code_block = false;

    for line in utterance.split('\n') {
        if line.trim().starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            continue;
        }

        for cap in MENTION_PATTERN.captures_iter(line) {
            let (Some(full), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            if let Some(prev) = line[..full.start()].chars().next_back() {
                if prev.is_alphanumeric() || prev == '_' || prev == '`' {
                    continue;
                }
            }
            let backticks = line[..full.start()].chars().filter(|&c| c == '`').count();
            if backticks % 2 != 0 {
                continue;
            }
            let name = name.as_str().to_lowercase();
            if !mentions.contains(&name) {
                mentions.push(name);
            }
        }
    }

    mentions
}
