use serde::{Deserialize, Serialize};

use crate::kernel::time::Millis;
use crate::planner::types::InterventionKind;

/// Page context supplied by the content-extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentAnalysis {
    pub text: String,
    pub content_type: String,
    pub title: String,
    /// Never forwarded to the reasoning service.
    pub url: String,
    pub scroll_position: f64,
    pub time_on_page_seconds: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityCounters {
    pub tab_switches: u32,
    pub scroll_events: u32,
    pub idle_seconds: u64,
}

/// One decision cycle's worth of orchestrator input. Scores are 0 - 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalInput {
    /// Absent: fall back to the session's rolling camera average.
    #[serde(default)]
    pub attention_score: Option<f64>,
    #[serde(default)]
    pub distraction_score: f64,
    #[serde(default)]
    pub sleepiness_score: Option<f64>,
    #[serde(default)]
    pub content_analysis: ContentAnalysis,
    #[serde(default)]
    pub session_time_seconds: u64,
    #[serde(default)]
    pub activity: ActivityCounters,
}

/// Immutable per-cycle view of every signal, on the percent scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSnapshot {
    pub attention: f64,
    pub distraction: f64,
    pub sleepiness: Option<f64>,
    pub session_seconds: u64,
    pub content_excerpt: String,
    pub content_type: String,
    pub title: String,
    pub tab_switches: u32,
    pub scroll_events: u32,
    pub idle_seconds: u64,
    pub taken_at: Millis,
}

impl SignalSnapshot {
    /// Clamps scores to 0 - 100. Returns `None` if any supplied score is not a
    /// finite number; the cycle is then skipped.
    pub fn build(input: &SignalInput, fallback_attention: f64, excerpt_chars: usize, now: Millis) -> Option<Self> {
        let attention = percent(input.attention_score.unwrap_or(fallback_attention))?;
        let distraction = percent(input.distraction_score)?;
        let sleepiness = match input.sleepiness_score {
            Some(raw) => Some(percent(raw)?),
            None => None,
        };
        let content = &input.content_analysis;

        Some(Self {
            attention,
            distraction,
            sleepiness,
            session_seconds: input.session_time_seconds,
            content_excerpt: content.text.chars().take(excerpt_chars).collect(),
            content_type: content.content_type.clone(),
            title: content.title.clone(),
            tab_switches: input.activity.tab_switches,
            scroll_events: input.activity.scroll_events,
            idle_seconds: input.activity.idle_seconds,
            taken_at: now,
        })
    }
}

fn percent(raw: f64) -> Option<f64> {
    if raw.is_finite() {
        Some(raw.clamp(0.0, 100.0))
    } else {
        None
    }
}

/// What the user did with a presented intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Dismissed,
    Completed,
    Snoozed,
    AnsweredCorrectly,
    AnsweredIncorrectly,
    Ignored,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport {
    pub intervention_type: InterventionKind,
    pub user_action: UserAction,
}
