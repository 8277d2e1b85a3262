use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MIN_INTERVAL_MS;
use crate::kernel::classifier::{Classification, UserState};
use crate::kernel::session::SessionCounters;
use crate::kernel::time::Millis;

/// At or above this attention (percent) nothing is done.
pub const HIGH_ATTENTION: f64 = 75.0;
/// Below this attention (percent) a break is issued without consulting the service.
pub const DIRECT_BREAK_ATTENTION: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownPolicy {
    pub min_interval_ms: u64,
    /// Critical intensity ignores the cooldown when set.
    pub critical_bypass: bool,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            critical_bypass: true,
        }
    }
}

impl CooldownPolicy {
    pub fn is_cooling(&self, counters: &SessionCounters, now: Millis) -> bool {
        match counters.last_intervention_at() {
            Some(last) => now.since(last) < self.min_interval_ms,
            None => false,
        }
    }
}

/// Diagnostic reason for a negative decision. Log-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRejection {
    Cooldown,
    ScoreHigh,
    SessionCap,
    Focused,
}

impl GateRejection {
    pub fn code(&self) -> &'static str {
        match self {
            GateRejection::Cooldown => "cooldown",
            GateRejection::ScoreHigh => "score_high",
            GateRejection::SessionCap => "session_cap",
            GateRejection::Focused => "focused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Reject(GateRejection),
    /// Attention is low enough to issue a break locally.
    EscalateDirect,
    /// Ambiguous band: ask the reasoning service.
    Consult,
}

/// Wire shape of a gate decision: `{ "shouldIntervene": false, "reason": "cooldown" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateVerdict {
    pub should_intervene: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<GateRejection>,
}

impl GateDecision {
    pub fn should_intervene(&self) -> bool {
        !matches!(self, GateDecision::Reject(_))
    }

    pub fn reason(&self) -> Option<GateRejection> {
        match self {
            GateDecision::Reject(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn verdict(&self) -> GateVerdict {
        GateVerdict {
            should_intervene: self.should_intervene(),
            reason: self.reason(),
        }
    }
}

/// PURE FUNCTION: decides whether this cycle may produce an intervention.
/// No side effects. `attention` is on the percent scale.
pub fn evaluate(
    classification: &Classification,
    attention: f64,
    counters: &SessionCounters,
    policy: &CooldownPolicy,
    now: Millis,
) -> GateDecision {
    // 1. Fast local heuristics
    if attention >= HIGH_ATTENTION {
        return GateDecision::Reject(GateRejection::ScoreHigh);
    }
    if classification.state == UserState::Focused {
        return GateDecision::Reject(GateRejection::Focused);
    }

    // 2. Rate limiting
    let bypass = policy.critical_bypass && classification.is_critical();
    if policy.is_cooling(counters, now) && !bypass {
        return GateDecision::Reject(GateRejection::Cooldown);
    }
    if counters.cap_reached() {
        return GateDecision::Reject(GateRejection::SessionCap);
    }

    // 3. Route
    if attention < DIRECT_BREAK_ATTENTION {
        GateDecision::EscalateDirect
    } else {
        GateDecision::Consult
    }
}
