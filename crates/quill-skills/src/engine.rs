//! Invocation surface.
//!
//! [`ActivationEngine`] runs sessions for a host: `activate` starts one,
//! `resume` feeds an answer to a suspended one, `cancel` discards it.
//! Suspended sessions wait in a concurrent map; a session is taken out of
//! the map while it runs so one handle is never driven twice at once. The map
//! is bounded: when it is full the oldest suspended session is discarded, so
//! handles a host abandons without `cancel` do not accumulate.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use quill_core::ids::SessionId;
use quill_core::text::truncate_str;
use quill_settings::QuillSettings;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bundle::ContentBundle;
use crate::clarification::ClarificationQuestion;
use crate::config_store::ConfigStore;
use crate::constants::{DEFAULT_MAX_SUSPENDED, LOG_UTTERANCE_BYTES};
use crate::errors::ActivationError;
use crate::matcher::MatchOptions;
use crate::references::ReferenceLoader;
use crate::registry::SkillRegistry;
use crate::session::{ActivationSession, Step};

/// A question the host must put to the user.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuestion {
    /// Handle to pass back to [`ActivationEngine::resume`].
    pub session: SessionId,
    /// The question.
    pub question: ClarificationQuestion,
}

/// Outcome of driving a session as far as it can go.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Activation {
    /// Content ready.
    Loaded(ContentBundle),
    /// Suspended on a question.
    Pending(PendingQuestion),
}

/// Runs activation sessions over a shared registry and config store.
#[derive(Debug)]
pub struct ActivationEngine {
    registry: Arc<SkillRegistry>,
    config: Arc<ConfigStore>,
    loader: ReferenceLoader,
    options: MatchOptions,
    suspended: DashMap<SessionId, ActivationSession>,
    max_suspended: usize,
}

impl ActivationEngine {
    /// Engine over explicit components.
    pub fn new(
        registry: Arc<SkillRegistry>,
        config: Arc<ConfigStore>,
        loader: ReferenceLoader,
        options: MatchOptions,
    ) -> Self {
        Self {
            registry,
            config,
            loader,
            options,
            suspended: DashMap::new(),
            max_suspended: DEFAULT_MAX_SUSPENDED,
        }
    }

    /// Bound the number of suspended sessions (at least one).
    #[must_use]
    pub fn with_max_suspended(mut self, max: usize) -> Self {
        self.max_suspended = max.max(1);
        self
    }

    /// Engine for a project: scans packages, reads `<root>/<configFile>`,
    /// and loads references from disk.
    pub fn from_settings(project_root: &Path, settings: &QuillSettings) -> Self {
        let registry = SkillRegistry::load(Some(project_root), &settings.skills);
        Self::new(
            Arc::new(registry),
            Arc::new(ConfigStore::new(project_root, &settings.project)),
            ReferenceLoader::filesystem(settings.skills.max_reference_size),
            MatchOptions::from(&settings.matching),
        )
        .with_max_suspended(settings.skills.max_suspended)
    }

    /// The registry sessions match against.
    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// The project config store.
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Number of suspended sessions.
    pub fn pending_count(&self) -> usize {
        self.suspended.len()
    }

    /// Start a session for `utterance` with a fresh config snapshot.
    pub fn activate(&self, utterance: &str) -> Result<Activation, ActivationError> {
        let mut session = ActivationSession::new(utterance, self.config.refresh());
        debug!(
            session = %session.id(),
            utterance = truncate_str(utterance, LOG_UTTERANCE_BYTES),
            "activation started"
        );
        let step = session.begin(&self.registry, &self.options)?;
        self.drive(session, step)
    }

    /// Answer a suspended session's question.
    pub fn resume(&self, id: &SessionId, answer: &str) -> Result<Activation, ActivationError> {
        let Some((_, mut session)) = self.suspended.remove(id) else {
            return Err(ActivationError::UnknownSession(id.clone()));
        };
        let step = session.answer(answer)?;
        self.drive(session, step)
    }

    /// Discard a suspended session. Returns `false` for unknown handles.
    pub fn cancel(&self, session: &SessionId) -> bool {
        match self.suspended.remove(session) {
            Some((_, mut s)) => s.cancel(),
            None => false,
        }
    }

    fn drive(&self, mut session: ActivationSession, step: Step) -> Result<Activation, ActivationError> {
        match step {
            Step::Question(question) => {
                let id = session.id().clone();
                debug!(session = %id, topic = question.topic.label(), "session suspended");
                self.make_room();
                let _ = self.suspended.insert(id.clone(), session);
                Ok(Activation::Pending(PendingQuestion {
                    session: id,
                    question,
                }))
            }
            Step::Resolved => {
                let bundle = session.load(&self.loader)?;
                info!(
                    session = %bundle.session,
                    package = %bundle.package,
                    references = bundle.references.len(),
                    questions = bundle.questions_asked,
                    diagnostics = bundle.diagnostics.len(),
                    "activation complete"
                );
                Ok(Activation::Loaded(bundle))
            }
        }
    }

    /// Discard the oldest suspended sessions until one more fits.
    /// Session ids are UUID v7, so the smallest id is the oldest.
    fn make_room(&self) {
        while self.suspended.len() >= self.max_suspended {
            let Some(oldest) = self.suspended.iter().map(|e| e.key().clone()).min() else {
                return;
            };
            if let Some((id, mut session)) = self.suspended.remove(&oldest) {
                let _ = session.cancel();
                warn!(
                    session = %id,
                    limit = self.max_suspended,
                    "suspended session limit reached, discarding oldest"
                );
            }
        }
    }
}
