//! Error types for the skills engine.
//!
//! [`SkillError`] covers package loading; a failure there drops one package
//! and never aborts a scan. [`ActivationError`] covers one session and never
//! touches the registry or a config snapshot.

use quill_core::ids::SessionId;
use serde::Serialize;

use crate::session::SessionState;

/// Errors that can occur while loading a package descriptor.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    /// I/O error during filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor file exceeds maximum size.
    #[error("Skill file too large: {path} ({size} bytes > {max} bytes)")]
    FileTooLarge {
        /// Path to the oversized file.
        path: String,
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Error parsing the header block.
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Path to the problematic file.
        path: String,
        /// Description of the parse error.
        message: String,
    },

    /// Header block has no `name`.
    #[error("Missing required `name` in {path}")]
    MissingName {
        /// Path to the descriptor.
        path: String,
    },

    /// `name` does not satisfy the naming rules.
    #[error("Invalid package name `{name}`: {reason}")]
    InvalidName {
        /// Offending name.
        name: String,
        /// Which rule it broke.
        reason: String,
    },

    /// Axes and reference map do not line up.
    #[error("Invalid variant map in package `{package}`: {message}")]
    InvalidVariantMap {
        /// Package name.
        package: String,
        /// What is wrong.
        message: String,
    },

    /// A declared reference identifier is not a safe relative path.
    #[error("Invalid reference `{reference}` in package `{package}`: {message}")]
    InvalidReference {
        /// Package name.
        package: String,
        /// Offending identifier.
        reference: String,
        /// Why it was rejected.
        message: String,
    },

    /// Two packages registered under the same name.
    #[error("Duplicate package name: {name}")]
    Duplicate {
        /// Name registered twice.
        name: String,
    },
}

/// Terminal failures of one activation session.
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    /// No package scored above the match threshold.
    #[error("no applicable package for \"{utterance}\", please rephrase or specify")]
    Unmatched {
        /// The request as received.
        utterance: String,
    },

    /// A declared reference document could not be loaded.
    #[error("missing reference `{reference}` in package `{package}`: {reason}")]
    MissingReference {
        /// Package that declares the reference.
        package: String,
        /// Identifier exactly as declared.
        reference: String,
        /// Underlying cause.
        reason: String,
    },

    /// A resolved variant has no reference map entry.
    #[error("package `{package}` has no references for variant {variant}")]
    UnknownVariant {
        /// Package name.
        package: String,
        /// Rendered variant.
        variant: String,
    },

    /// No suspended session with this handle.
    #[error("unknown or expired session: {0}")]
    UnknownSession(SessionId),

    /// An operation was attempted in a state that does not allow it.
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        /// State the session was in.
        state: SessionState,
        /// Attempted operation.
        action: &'static str,
    },
}

impl ActivationError {
    /// The reporting kind, for errors that correspond to one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Unmatched { .. } => Some(ErrorKind::Unmatched),
            Self::MissingReference { .. } => Some(ErrorKind::MissingReference),
            Self::UnknownVariant { .. }
            | Self::UnknownSession(_)
            | Self::InvalidTransition { .. } => None,
        }
    }
}

/// Every condition the engine reports, fatal or not.
///
/// `Unmatched` and `MissingReference` end a session. The others are
/// recovered inside the session and surface as diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// No package matched.
    Unmatched,
    /// Several packages tied for the top score.
    AmbiguousTie,
    /// A clarification answer outside the allowed set.
    InvalidAnswer,
    /// A configured value outside an axis's allowed set.
    StaleConfig,
    /// A reference document could not be loaded.
    MissingReference,
}

impl ErrorKind {
    /// Whether this condition ends the session.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Unmatched | Self::MissingReference)
    }
}
