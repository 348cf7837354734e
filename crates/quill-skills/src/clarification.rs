//! Clarification engine.
//!
//! Settles what config could not: one question per unresolved axis, asked in
//! declared axis order. Each axis moves `Pending → Asked → Answered`; axes
//! settled by config start out `Configured` and are never asked. A rejected
//! answer keeps the axis `Asked` and re-emits the same question.
//!
//! Package disambiguation after a tied match uses the same question shape
//! through [`PackageChoice`].

use serde::Serialize;

use crate::types::{PackageDescriptor, ResolvedVariant, VariantAxis};

/// Where an axis stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AxisState {
    /// Not yet asked.
    Pending,
    /// Question outstanding.
    Asked {
        /// Rejected answers so far.
        attempts: u32,
    },
    /// Settled by the user.
    Answered(String),
    /// Settled by project config.
    Configured(String),
}

/// What a question is about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QuestionTopic {
    /// Which of several tied packages to use.
    Package,
    /// Which value an axis takes.
    #[serde(rename_all = "camelCase")]
    Axis {
        /// Package being resolved.
        package: String,
        /// Axis name.
        axis: String,
    },
}

impl QuestionTopic {
    /// Short label for diagnostics: the axis name, or `package`.
    pub fn label(&self) -> &str {
        match self {
            Self::Package => "package",
            Self::Axis { axis, .. } => axis,
        }
    }
}

/// A question for the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarificationQuestion {
    /// What is being decided.
    pub topic: QuestionTopic,
    /// Human-readable prompt.
    pub prompt: String,
    /// Allowed answers, in declared order.
    pub options: Vec<String>,
    /// Rejected answers so far for this topic.
    pub attempt: u32,
    /// The answer just rejected, when re-asking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

/// Outcome of submitting an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Answer accepted; canonical value.
    Accepted(String),
    /// Answer outside the allowed set; ask again.
    Rejected(ClarificationQuestion),
}

/// Map raw input onto one of `options`.
///
/// Trimmed; exact match first, then case-insensitive.
pub fn choose<'a>(options: &'a [String], raw: &str) -> Option<&'a str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    options
        .iter()
        .find(|o| o.as_str() == raw)
        .or_else(|| options.iter().find(|o| o.eq_ignore_ascii_case(raw)))
        .map(String::as_str)
}

#[derive(Clone, Debug)]
struct AxisSlot {
    axis: VariantAxis,
    state: AxisState,
}

/// Per-package variant clarification.
#[derive(Clone, Debug)]
pub struct Clarifier {
    package: String,
    slots: Vec<AxisSlot>,
    asked: u32,
}

impl Clarifier {
    /// Start clarification for `package`; axes already in `seeded` count as
    /// configured.
    pub fn new(package: &PackageDescriptor, seeded: &ResolvedVariant) -> Self {
        let slots = package
            .axes
            .iter()
            .map(|axis| AxisSlot {
                state: match seeded.get(&axis.name) {
                    Some(v) => AxisState::Configured(v.to_string()),
                    None => AxisState::Pending,
                },
                axis: axis.clone(),
            })
            .collect();
        Self {
            package: package.name.clone(),
            slots,
            asked: 0,
        }
    }

    /// Question for the first unsettled axis, moving it to `Asked`.
    ///
    /// Returns the outstanding question again if one is already asked, and
    /// `None` once every axis is settled.
    pub fn next_question(&mut self) -> Option<ClarificationQuestion> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| matches!(s.state, AxisState::Pending | AxisState::Asked { .. }))?;
        if slot.state == AxisState::Pending {
            slot.state = AxisState::Asked { attempts: 0 };
            self.asked += 1;
        }
        let attempts = match slot.state {
            AxisState::Asked { attempts } => attempts,
            _ => 0,
        };
        Some(axis_question(&self.package, &slot.axis, attempts, None))
    }

    /// Submit an answer for the outstanding question.
    ///
    /// Returns the axis name with the outcome, or `None` when no question is
    /// outstanding.
    pub fn answer(&mut self, raw: &str) -> Option<(String, AnswerOutcome)> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| matches!(s.state, AxisState::Asked { .. }))?;
        let axis_name = slot.axis.name.clone();

        if let Some(value) = slot.axis.canonical(raw) {
            let value = value.to_string();
            slot.state = AxisState::Answered(value.clone());
            return Some((axis_name, AnswerOutcome::Accepted(value)));
        }

        let attempts = match &mut slot.state {
            AxisState::Asked { attempts } => {
                *attempts += 1;
                *attempts
            }
            _ => 0,
        };
        let question = axis_question(&self.package, &slot.axis, attempts, Some(raw.to_string()));
        Some((axis_name, AnswerOutcome::Rejected(question)))
    }

    /// Axis with an outstanding question.
    pub fn current_axis(&self) -> Option<&VariantAxis> {
        self.slots
            .iter()
            .find(|s| matches!(s.state, AxisState::Asked { .. }))
            .map(|s| &s.axis)
    }

    /// State of one axis.
    pub fn state(&self, axis: &str) -> Option<&AxisState> {
        self.slots
            .iter()
            .find(|s| s.axis.name == axis)
            .map(|s| &s.state)
    }

    /// Whether every axis is answered or configured.
    pub fn is_complete(&self) -> bool {
        self.slots
            .iter()
            .all(|s| matches!(s.state, AxisState::Answered(_) | AxisState::Configured(_)))
    }

    /// Distinct axes asked so far.
    pub fn questions_asked(&self) -> u32 {
        self.asked
    }
}

fn axis_question(
    package: &str,
    axis: &VariantAxis,
    attempt: u32,
    rejected: Option<String>,
) -> ClarificationQuestion {
    let prompt = match &rejected {
        Some(r) => format!(
            "\"{}\" is not a valid {} for {package}. Choose one of: {}",
            r.trim(),
            axis.name,
            axis.values.join(", ")
        ),
        None => format!(
            "Which {} should {package} use? Choose one of: {}",
            axis.name,
            axis.values.join(", ")
        ),
    };
    ClarificationQuestion {
        topic: QuestionTopic::Axis {
            package: package.to_string(),
            axis: axis.name.clone(),
        },
        prompt,
        options: axis.values.clone(),
        attempt,
        rejected,
    }
}

/// Disambiguation between packages tied at the top score.
#[derive(Clone, Debug)]
pub struct PackageChoice {
    candidates: Vec<String>,
    attempts: u32,
}

impl PackageChoice {
    /// Choice among `candidates`, in registration order.
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            attempts: 0,
        }
    }

    /// Tied package names.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// The question to ask.
    pub fn question(&self) -> ClarificationQuestion {
        self.build_question(None)
    }

    /// Submit an answer.
    pub fn answer(&mut self, raw: &str) -> AnswerOutcome {
        if let Some(name) = choose(&self.candidates, raw) {
            return AnswerOutcome::Accepted(name.to_string());
        }
        self.attempts += 1;
        AnswerOutcome::Rejected(self.build_question(Some(raw.to_string())))
    }

    fn build_question(&self, rejected: Option<String>) -> ClarificationQuestion {
        let listed = self.candidates.join(", ");
        let prompt = match &rejected {
            Some(r) => format!("\"{}\" is not one of the matching skills. Choose one of: {listed}", r.trim()),
            None => format!("Several skills match this request. Which one? Choose one of: {listed}"),
        };
        ClarificationQuestion {
            topic: QuestionTopic::Package,
            prompt,
            options: self.candidates.clone(),
            attempt: self.attempts,
            rejected,
        }
    }
}
