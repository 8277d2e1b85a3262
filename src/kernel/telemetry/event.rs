use serde::{Deserialize, Serialize};

use crate::kernel::classifier::{Intensity, UserState};
use crate::kernel::event::UserAction;
use crate::kernel::gate::GateRejection;
use crate::kernel::session::SessionId;
use crate::planner::types::InterventionKind;

// Allowed: IDs, reason codes, enums, counts, durations
// Forbidden: page text, prompts, replies, intervention content

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    Classified {
        session: SessionId,
        state: UserState,
        intensity: Intensity,
        session_override: bool,
    },

    CycleRejected {
        session: SessionId,
        reason: GateRejection,
    },

    /// A cycle arrived while the session's call was still outstanding.
    Coalesced {
        session: SessionId,
    },

    Escalated {
        session: SessionId,
        path: EscalationPath,
    },

    ServiceFailed {
        session: SessionId,
        kind: String,
        latency_ms: u64,
    },

    ResponseRejected {
        session: SessionId,
        kind: String,
    },

    /// Service answered with `none`.
    Declined {
        session: SessionId,
    },

    Dispatched {
        session: SessionId,
        kind: InterventionKind,
    },

    /// Result arrived for a session that had since been reset or closed.
    StaleResult {
        session: SessionId,
    },

    Outcome {
        session: SessionId,
        kind: InterventionKind,
        action: UserAction,
    },

    InvalidSignal {
        session: SessionId,
    },

    SessionLifecycle {
        session: SessionId,
        event: SessionEventKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationPath {
    Direct,
    Consult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEventKind {
    Started,
    Reset,
    Stopped,
}
