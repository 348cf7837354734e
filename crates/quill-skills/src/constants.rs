//! Shared constants for the skills engine.

/// Expected filename for package descriptors.
pub const SKILL_MD_FILENAME: &str = "SKILL.md";

/// Maximum length of a package name.
pub const MAX_NAME_LEN: usize = 64;

/// Maximum length of a package description.
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Upper bound on the number of variants (product of axis sizes) a single
/// package may declare.
pub const MAX_VARIANTS: usize = 4096;

/// Bytes of the utterance echoed into log fields.
pub const LOG_UTTERANCE_BYTES: usize = 120;

/// Suspended sessions an engine keeps before discarding the oldest.
pub const DEFAULT_MAX_SUSPENDED: usize = 1024;
