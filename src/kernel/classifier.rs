use serde::{Deserialize, Serialize};

use crate::kernel::event::SignalSnapshot;

// All thresholds are on the percent scale (0 - 100).
pub const FATIGUE_THRESHOLD: f64 = 60.0;
pub const FATIGUE_CRITICAL: f64 = 80.0;
pub const DISTRACTION_THRESHOLD: f64 = 60.0;
pub const DISTRACTION_CRITICAL: f64 = 80.0;
pub const WANDERING_THRESHOLD: f64 = 40.0;
pub const WANDERING_CRITICAL: f64 = 20.0;
pub const LONG_SESSION_MINUTES: f64 = 45.0;
pub const LONG_SESSION_ATTENTION: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    Focused,
    Distracted,
    Fatigued,
    Wandering,
}

/// Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub state: UserState,
    pub intensity: Intensity,
    /// True when the long-session override changed the table's answer.
    pub session_override: bool,
}

impl Classification {
    pub fn is_critical(&self) -> bool {
        self.intensity == Intensity::Critical
    }
}

/// Scores the classifier reads, already on the percent scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateInputs {
    pub attention: f64,
    pub distraction: f64,
    pub sleepiness: Option<f64>,
    pub session_seconds: u64,
}

impl From<&SignalSnapshot> for StateInputs {
    fn from(snapshot: &SignalSnapshot) -> Self {
        Self {
            attention: snapshot.attention,
            distraction: snapshot.distraction,
            sleepiness: snapshot.sleepiness,
            session_seconds: snapshot.session_seconds,
        }
    }
}

/// PURE FUNCTION: scores -> (state, intensity).
///
/// Rule priority is fatigue, then distraction, then wandering, then focus.
/// Downstream gating depends on this ordering.
pub fn classify(inputs: &StateInputs) -> Classification {
    let (state, intensity) = base_rule(inputs);

    let session_minutes = inputs.session_seconds as f64 / 60.0;
    let long_session = session_minutes > LONG_SESSION_MINUTES && inputs.attention < LONG_SESSION_ATTENTION;
    if !long_session {
        return Classification { state, intensity, session_override: false };
    }

    // Long-session override: at least High. Low attention late in a session is
    // read as wandering unless fatigue already explains it.
    let (new_state, new_intensity) = if inputs.attention < WANDERING_THRESHOLD && state != UserState::Fatigued {
        (UserState::Wandering, wandering_intensity(inputs.attention).max(Intensity::High))
    } else {
        (state, intensity.max(Intensity::High))
    };

    Classification {
        state: new_state,
        intensity: new_intensity,
        session_override: new_state != state || new_intensity != intensity,
    }
}

fn base_rule(inputs: &StateInputs) -> (UserState, Intensity) {
    if let Some(sleepiness) = inputs.sleepiness {
        if sleepiness > FATIGUE_THRESHOLD {
            let intensity = if sleepiness > FATIGUE_CRITICAL { Intensity::Critical } else { Intensity::High };
            return (UserState::Fatigued, intensity);
        }
    }

    if inputs.distraction > DISTRACTION_THRESHOLD {
        let intensity = if inputs.distraction > DISTRACTION_CRITICAL { Intensity::Critical } else { Intensity::High };
        return (UserState::Distracted, intensity);
    }

    if inputs.attention < WANDERING_THRESHOLD {
        return (UserState::Wandering, wandering_intensity(inputs.attention));
    }

    (UserState::Focused, Intensity::Low)
}

fn wandering_intensity(attention: f64) -> Intensity {
    if attention < WANDERING_CRITICAL {
        Intensity::Critical
    } else {
        Intensity::Medium
    }
}
