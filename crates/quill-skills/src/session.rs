//! Activation session.
//!
//! One request from utterance to delivered content:
//!
//! ```text
//! Matching → (AwaitingClarification)* → Resolved → Loaded → Done
//! ```
//!
//! `Aborted` is reachable from every non-terminal state. A session never
//! regresses once `Loaded`. Whoever drives the session owns it; nothing is
//! shared except the registry and the config snapshot, both read-only.

use std::fmt;
use std::sync::Arc;

use quill_core::ids::SessionId;
use quill_core::text::truncate_str;
use serde::Serialize;
use tracing::{debug, warn};

use crate::bundle::ContentBundle;
use crate::clarification::{AnswerOutcome, ClarificationQuestion, Clarifier, PackageChoice};
use crate::config_store::{ProjectConfig, Resolution, UnresolvedReason};
use crate::constants::LOG_UTTERANCE_BYTES;
use crate::errors::ActivationError;
use crate::matcher::{Candidate, MatchOptions, match_utterance, top_candidates};
use crate::references::{LoadedReference, LoadedSet, ReferenceLoader};
use crate::registry::SkillRegistry;
use crate::types::{Diagnostic, PackageDescriptor, ResolvedVariant};

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Scoring packages.
    Matching,
    /// Suspended on a question.
    AwaitingClarification,
    /// Package and every axis settled.
    Resolved,
    /// References materialized.
    Loaded,
    /// Content delivered.
    Done,
    /// Ended without content.
    Aborted,
}

impl SessionState {
    /// Whether the session has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Matching => "matching",
            Self::AwaitingClarification => "awaiting clarification",
            Self::Resolved => "resolved",
            Self::Loaded => "loaded",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// What the driver must do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Put this question to the user and call [`ActivationSession::answer`].
    Question(ClarificationQuestion),
    /// Call [`ActivationSession::load`].
    Resolved,
}

#[derive(Clone, Debug)]
enum Pending {
    Package(PackageChoice),
    Axes(Clarifier),
}

/// State of one activation request.
#[derive(Debug)]
pub struct ActivationSession {
    id: SessionId,
    utterance: String,
    state: SessionState,
    config: Arc<ProjectConfig>,
    candidates: Vec<Candidate>,
    selected: Option<Arc<PackageDescriptor>>,
    variant: ResolvedVariant,
    loaded: LoadedSet,
    documents: Vec<LoadedReference>,
    pending: Option<Pending>,
    diagnostics: Vec<Diagnostic>,
    questions_asked: u32,
}

impl ActivationSession {
    /// New session in `Matching`, reading config from `config`.
    pub fn new(utterance: impl Into<String>, config: Arc<ProjectConfig>) -> Self {
        Self {
            id: SessionId::new(),
            utterance: utterance.into(),
            state: SessionState::Matching,
            config,
            candidates: Vec::new(),
            selected: None,
            variant: ResolvedVariant::default(),
            loaded: LoadedSet::default(),
            documents: Vec::new(),
            pending: None,
            diagnostics: Vec::new(),
            questions_asked: 0,
        }
    }

    /// Session handle.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Request as received.
    pub fn utterance(&self) -> &str {
        &self.utterance
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Ranked candidates, highest first.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Package chosen, once known.
    pub fn selected_package(&self) -> Option<&Arc<PackageDescriptor>> {
        self.selected.as_ref()
    }

    /// Axis values settled so far.
    pub fn resolved_variant(&self) -> &ResolvedVariant {
        &self.variant
    }

    /// Identifiers materialized in this session.
    pub fn loaded_references(&self) -> &LoadedSet {
        &self.loaded
    }

    /// Non-fatal conditions observed so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Distinct questions asked so far.
    pub fn questions_asked(&self) -> u32 {
        self.questions_asked
    }

    /// The outstanding question, if suspended.
    pub fn pending_question(&self) -> Option<ClarificationQuestion> {
        match &self.pending {
            Some(Pending::Package(choice)) => Some(choice.question()),
            Some(Pending::Axes(clarifier)) => clarifier.clone().next_question(),
            None => None,
        }
    }

    /// Match the utterance and select a package, or ask which one.
    pub fn begin(
        &mut self,
        registry: &SkillRegistry,
        options: &MatchOptions,
    ) -> Result<Step, ActivationError> {
        self.expect_state(SessionState::Matching, "begin")?;

        self.candidates = match_utterance(&self.utterance, registry, options);
        let top: Vec<Arc<PackageDescriptor>> = top_candidates(&self.candidates)
            .iter()
            .map(|c| Arc::clone(&c.package))
            .collect();

        debug!(
            session = %self.id,
            utterance = truncate_str(&self.utterance, LOG_UTTERANCE_BYTES),
            candidates = self.candidates.len(),
            top = top.len(),
            "matched utterance"
        );

        match top.as_slice() {
            [] => {
                self.state = SessionState::Aborted;
                Err(ActivationError::Unmatched {
                    utterance: self.utterance.clone(),
                })
            }
            [only] => Ok(self.select(Arc::clone(only))),
            tied => {
                let names: Vec<String> = tied.iter().map(|p| p.name.clone()).collect();
                debug!(session = %self.id, candidates = ?names, "ambiguous match, asking");
                self.diagnostics.push(Diagnostic::AmbiguousTie {
                    candidates: names.clone(),
                });
                let choice = PackageChoice::new(names);
                let question = choice.question();
                self.pending = Some(Pending::Package(choice));
                self.state = SessionState::AwaitingClarification;
                self.questions_asked += 1;
                Ok(Step::Question(question))
            }
        }
    }

    /// Answer the outstanding question.
    ///
    /// An answer outside the allowed set is recorded as a diagnostic and the
    /// same question comes back.
    pub fn answer(&mut self, raw: &str) -> Result<Step, ActivationError> {
        self.expect_state(SessionState::AwaitingClarification, "answer")?;
        let Some(pending) = self.pending.take() else {
            return Err(ActivationError::InvalidTransition {
                state: self.state,
                action: "answer",
            });
        };

        match pending {
            Pending::Package(mut choice) => match choice.answer(raw) {
                AnswerOutcome::Accepted(name) => {
                    let package = self
                        .candidates
                        .iter()
                        .find(|c| c.package.name == name)
                        .map(|c| Arc::clone(&c.package));
                    match package {
                        Some(package) => Ok(self.select(package)),
                        None => {
                            self.pending = Some(Pending::Package(choice));
                            Err(ActivationError::InvalidTransition {
                                state: self.state,
                                action: "select an unmatched package",
                            })
                        }
                    }
                }
                AnswerOutcome::Rejected(question) => {
                    self.reject(&question, raw);
                    self.pending = Some(Pending::Package(choice));
                    Ok(Step::Question(question))
                }
            },
            Pending::Axes(mut clarifier) => match clarifier.answer(raw) {
                Some((axis, AnswerOutcome::Accepted(value))) => {
                    debug!(session = %self.id, %axis, %value, "axis answered");
                    if !self.variant.set(&axis, &value) {
                        warn!(session = %self.id, %axis, "axis already settled, keeping earlier value");
                    }
                    Ok(self.advance(clarifier))
                }
                Some((_, AnswerOutcome::Rejected(question))) => {
                    self.reject(&question, raw);
                    self.pending = Some(Pending::Axes(clarifier));
                    Ok(Step::Question(question))
                }
                None => Ok(self.advance(clarifier)),
            },
        }
    }

    /// Load the resolved variant's references and deliver the bundle.
    ///
    /// Passes through `Loaded` and ends in `Done`. A document that cannot be
    /// read aborts the session.
    pub fn load(&mut self, loader: &ReferenceLoader) -> Result<ContentBundle, ActivationError> {
        self.expect_state(SessionState::Resolved, "load")?;
        let package = self
            .selected
            .clone()
            .ok_or(ActivationError::InvalidTransition {
                state: self.state,
                action: "load without a package",
            })?;
        let Some(key) = self.variant.key(&package.axes) else {
            return Err(ActivationError::InvalidTransition {
                state: self.state,
                action: "load an incomplete variant",
            });
        };

        match loader.load(&package, &key, &mut self.loaded) {
            Ok(documents) => {
                self.documents.extend(documents);
                self.state = SessionState::Loaded;
            }
            Err(e) => {
                warn!(session = %self.id, package = %package.name, error = %e, "reference loading failed");
                self.state = SessionState::Aborted;
                return Err(e);
            }
        }

        let bundle = ContentBundle {
            session: self.id.clone(),
            package: package.name.clone(),
            variant: self.variant.assignments(&package.axes),
            instructions: package.instructions.clone(),
            references: std::mem::take(&mut self.documents),
            diagnostics: self.diagnostics.clone(),
            questions_asked: self.questions_asked,
        };
        self.state = SessionState::Done;
        debug!(
            session = %self.id,
            package = %package.name,
            references = bundle.references.len(),
            "content delivered"
        );
        Ok(bundle)
    }

    /// Abort the session. Returns `false` if it had already ended.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        debug!(session = %self.id, state = %self.state, "session cancelled");
        self.state = SessionState::Aborted;
        self.pending = None;
        true
    }

    fn expect_state(&self, expected: SessionState, action: &'static str) -> Result<(), ActivationError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ActivationError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn select(&mut self, package: Arc<PackageDescriptor>) -> Step {
        debug!(session = %self.id, package = %package.name, "package selected");

        for axis in &package.axes {
            match self.config.resolve(axis) {
                Resolution::Resolved(value) => {
                    debug!(session = %self.id, axis = %axis.name, %value, "axis from config");
                    let _ = self.variant.set(&axis.name, &value);
                }
                Resolution::Unresolved(UnresolvedReason::Stale { key, value }) => {
                    warn!(
                        session = %self.id,
                        axis = %axis.name,
                        %key,
                        %value,
                        "configured value not allowed for axis, asking instead"
                    );
                    self.diagnostics.push(Diagnostic::StaleConfig {
                        axis: axis.name.clone(),
                        key,
                        value,
                    });
                }
                Resolution::Unresolved(_) => {}
            }
        }

        let clarifier = Clarifier::new(&package, &self.variant);
        self.selected = Some(package);
        self.advance(clarifier)
    }

    fn advance(&mut self, mut clarifier: Clarifier) -> Step {
        let before = clarifier.questions_asked();
        match clarifier.next_question() {
            Some(question) => {
                self.questions_asked += clarifier.questions_asked() - before;
                self.state = SessionState::AwaitingClarification;
                self.pending = Some(Pending::Axes(clarifier));
                Step::Question(question)
            }
            None => {
                self.state = SessionState::Resolved;
                self.pending = None;
                Step::Resolved
            }
        }
    }

    fn reject(&mut self, question: &ClarificationQuestion, raw: &str) {
        debug!(session = %self.id, topic = question.topic.label(), attempt = question.attempt, "answer rejected");
        self.diagnostics.push(Diagnostic::InvalidAnswer {
            topic: question.topic.label().to_string(),
            answer: raw.to_string(),
        });
    }
}
