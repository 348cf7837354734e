//! # quill-skills
//!
//! Skill resolution and lazy context loading.
//!
//! A package is a directory holding a `SKILL.md` (header block + markdown
//! body) and the reference documents it points at. Given a free-text request
//! the engine picks a package, settles the package's variant axes from
//! project config or by asking, and loads only the reference documents that
//! variant needs.
//!
//! ## Module Overview
//!
//! - [`parser`]: Parse `SKILL.md` header blocks and reference `requires`
//! - [`descriptor`]: Validate a parsed package into a [`PackageDescriptor`]
//! - [`loader`]: Filesystem discovery and scanning
//! - [`registry`]: Packages in explicit registration order
//! - [`matcher`]: Score and rank packages against an utterance
//! - [`config_store`]: Project config snapshot and axis resolution
//! - [`clarification`]: One question per unresolved axis
//! - [`references`]: Depth-first, at-most-once reference loading
//! - [`session`]: The per-request state machine
//! - [`engine`]: `activate` / `resume` / `cancel`
//! - [`bundle`]: Delivered content and its `<skills>` rendering
//!
//! ## Usage
//!
//! ```rust,no_run
//! use quill_skills::engine::{Activation, ActivationEngine};
//!
//! let settings = quill_settings::get_settings();
//! let engine = ActivationEngine::from_settings(std::path::Path::new("."), &settings);
//! match engine.activate("scaffold a new project")? {
//!     Activation::Loaded(bundle) => println!("{}", bundle.render()),
//!     Activation::Pending(p) => {
//!         let next = engine.resume(&p.session, &p.question.options[0])?;
//!         # let _ = next;
//!     }
//! }
//! # Ok::<(), quill_skills::errors::ActivationError>(())
//! ```
//!
//! ## Crate Position
//!
//! Depends on: quill-core, quill-settings.
//! Depended on by: quill-agent.

#![deny(unsafe_code)]

pub mod bundle;
pub mod clarification;
pub mod config_store;
pub mod constants;
pub mod descriptor;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod matcher;
pub mod parser;
pub mod references;
pub mod registry;
pub mod session;
pub mod types;

pub use bundle::ContentBundle;
pub use clarification::{ClarificationQuestion, QuestionTopic};
pub use config_store::{AxisKeyMap, ConfigStore, ProjectConfig, Resolution};
pub use engine::{Activation, ActivationEngine, PendingQuestion};
pub use errors::{ActivationError, ErrorKind, SkillError};
pub use matcher::{Candidate, MatchOptions, match_utterance};
pub use references::{
    FsReferenceSource, LoadedReference, MemoryReferenceSource, ReferenceLoader, ReferenceSource,
};
pub use registry::SkillRegistry;
pub use session::{ActivationSession, SessionState, Step};
pub use types::{Diagnostic, PackageDescriptor, SkillInfo, SkillSource, VariantAxis};
