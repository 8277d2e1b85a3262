use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use super::event::{EscalationPath, SessionEventKind, TelemetryEvent};
use crate::kernel::classifier::UserState;
use crate::kernel::event::UserAction;
use crate::kernel::gate::GateRejection;
use crate::planner::types::InterventionKind;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub cycle_stats: CycleStats,
    pub service_stats: ServiceStats,
    pub dispatch_stats: DispatchStats,
    pub outcome_stats: OutcomeStats,
    pub session_stats: SessionStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleStats {
    pub classified: u64,
    pub session_overrides: u64,
    pub by_state: HashMap<UserState, u64>,
    pub rejected_cooldown: u64,
    pub rejected_score_high: u64,
    pub rejected_session_cap: u64,
    pub rejected_focused: u64,
    pub coalesced: u64,
    pub invalid_signals: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceStats {
    pub direct_escalations: u64,
    pub consultations: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub total_failure_latency_ms: u64,
    pub avg_failure_latency_ms: f64,
    pub rejected_responses: u64,
    pub rejected_by_kind: HashMap<String, u64>,
    pub declined: u64,
    pub stale_results: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchStats {
    pub total: u64,
    pub by_kind: HashMap<InterventionKind, u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeStats {
    pub total: u64,
    pub by_action: HashMap<UserAction, u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub started: u64,
    pub reset: u64,
    pub stopped: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::Classified { state, session_override, .. } => {
                snap.cycle_stats.classified += 1;
                if *session_override {
                    snap.cycle_stats.session_overrides += 1;
                }
                *snap.cycle_stats.by_state.entry(*state).or_insert(0) += 1;
            }
            TelemetryEvent::CycleRejected { reason, .. } => match reason {
                GateRejection::Cooldown => snap.cycle_stats.rejected_cooldown += 1,
                GateRejection::ScoreHigh => snap.cycle_stats.rejected_score_high += 1,
                GateRejection::SessionCap => snap.cycle_stats.rejected_session_cap += 1,
                GateRejection::Focused => snap.cycle_stats.rejected_focused += 1,
            },
            TelemetryEvent::Coalesced { .. } => snap.cycle_stats.coalesced += 1,
            TelemetryEvent::InvalidSignal { .. } => snap.cycle_stats.invalid_signals += 1,
            TelemetryEvent::Escalated { path, .. } => match path {
                EscalationPath::Direct => snap.service_stats.direct_escalations += 1,
                EscalationPath::Consult => snap.service_stats.consultations += 1,
            },
            TelemetryEvent::ServiceFailed { kind, latency_ms, .. } => {
                snap.service_stats.failures += 1;
                snap.service_stats.total_failure_latency_ms += latency_ms;
                if kind == "timeout" {
                    snap.service_stats.timeouts += 1;
                }
            }
            TelemetryEvent::ResponseRejected { kind, .. } => {
                snap.service_stats.rejected_responses += 1;
                *snap.service_stats.rejected_by_kind.entry(kind.clone()).or_insert(0) += 1;
            }
            TelemetryEvent::Declined { .. } => snap.service_stats.declined += 1,
            TelemetryEvent::StaleResult { .. } => snap.service_stats.stale_results += 1,
            TelemetryEvent::Dispatched { kind, .. } => {
                snap.dispatch_stats.total += 1;
                *snap.dispatch_stats.by_kind.entry(*kind).or_insert(0) += 1;
            }
            TelemetryEvent::Outcome { action, .. } => {
                snap.outcome_stats.total += 1;
                *snap.outcome_stats.by_action.entry(*action).or_insert(0) += 1;
            }
            TelemetryEvent::SessionLifecycle { event, .. } => match event {
                SessionEventKind::Started => snap.session_stats.started += 1,
                SessionEventKind::Reset => snap.session_stats.reset += 1,
                SessionEventKind::Stopped => snap.session_stats.stopped += 1,
            },
        }
    }

    if snap.service_stats.failures > 0 {
        snap.service_stats.avg_failure_latency_ms =
            snap.service_stats.total_failure_latency_ms as f64 / snap.service_stats.failures as f64;
    }

    snap
}
