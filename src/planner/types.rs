use serde::{Deserialize, Serialize};

use crate::kernel::time::Millis;

pub const QUIZ_OPTION_COUNT: usize = 4;

/// Content-free label of an intervention, used for outcomes and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    Message,
    Quiz,
    Break,
    #[serde(alias = "show_relevance_warning")]
    RelevanceWarning,
}

impl InterventionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionKind::Message => "message",
            InterventionKind::Quiz => "quiz",
            InterventionKind::Break => "break",
            InterventionKind::RelevanceWarning => "relevance_warning",
        }
    }
}

/// A validated four-option quiz. The option count is part of the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    question: String,
    options: [String; QUIZ_OPTION_COUNT],
    correct_index: u8,
    explanation: String,
}

impl Quiz {
    /// Caller guarantees `correct_index < 4`.
    pub(crate) fn new(question: String, options: [String; QUIZ_OPTION_COUNT], correct_index: u8, explanation: String) -> Self {
        Self {
            question,
            options,
            correct_index,
            explanation,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String; QUIZ_OPTION_COUNT] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index as usize
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

/// One case per allowed action. Serializes to the closed wire schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum InterventionAction {
    #[serde(rename = "message")]
    Message { message: String },
    #[serde(rename = "quiz")]
    Quiz { quiz: Quiz },
    #[serde(rename = "break")]
    Break { message: String },
    #[serde(rename = "show_relevance_warning")]
    RelevanceWarning { reason: String },
}

impl InterventionAction {
    pub fn kind(&self) -> InterventionKind {
        match self {
            InterventionAction::Message { .. } => InterventionKind::Message,
            InterventionAction::Quiz { .. } => InterventionKind::Quiz,
            InterventionAction::Break { .. } => InterventionKind::Break,
            InterventionAction::RelevanceWarning { .. } => InterventionKind::RelevanceWarning,
        }
    }
}

/// A nudge that passed every structural check.
/// Built only inside the crate (validator or local break); never deserialized.
/// Outcomes refer back to it by kind and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionRecord {
    #[serde(flatten)]
    action: InterventionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
    created_at: Millis,
}

#[derive(Serialize)]
struct WireRecord<'a> {
    #[serde(flatten)]
    action: &'a InterventionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<&'a str>,
}

impl InterventionRecord {
    pub(crate) fn new(action: InterventionAction, reasoning: Option<String>, created_at: Millis) -> Self {
        Self {
            action,
            reasoning,
            created_at,
        }
    }

    pub fn action(&self) -> &InterventionAction {
        &self.action
    }

    pub fn kind(&self) -> InterventionKind {
        self.action.kind()
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    pub fn created_at(&self) -> Millis {
        self.created_at
    }

    /// Canonical reply text for this record. Validating it yields the same
    /// action and reasoning.
    pub fn to_wire(&self) -> String {
        let wire = WireRecord {
            action: &self.action,
            reasoning: self.reasoning.as_deref(),
        };
        serde_json::to_string(&wire).unwrap_or_default()
    }
}
