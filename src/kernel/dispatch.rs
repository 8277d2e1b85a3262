use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::kernel::event::{OutcomeReport, UserAction};
use crate::kernel::session::SessionCounters;
use crate::kernel::time::Millis;
use crate::outputs::presenter::Presenter;
use crate::planner::types::{InterventionKind, InterventionRecord};

const MAX_OUTCOMES: usize = 1_000;

/// Commits a validated record: cooldown starts now, not when the UI renders.
/// Returns false, and presents nothing, if the session cap is already reached.
pub fn dispatch<P: Presenter + ?Sized>(
    record: &InterventionRecord,
    counters: &mut SessionCounters,
    presenter: &P,
    now: Millis,
) -> bool {
    if !counters.record_dispatch(now) {
        debug!("Dispatch refused: session cap reached");
        return false;
    }
    info!(
        kind = record.kind().as_str(),
        count = counters.intervention_count(),
        "Intervention dispatched"
    );
    presenter.present(record);
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeEntry {
    pub kind: InterventionKind,
    pub action: UserAction,
    pub recorded_at: Millis,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub total: u64,
    pub by_action: HashMap<UserAction, u64>,
}

/// Diagnostic record of what users did with interventions.
/// Never read by the gate; cooldown is unaffected by outcomes.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLog {
    entries: BTreeMap<(InterventionKind, Millis, u32), OutcomeEntry>,
    seq: u32,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: OutcomeReport, now: Millis) {
        if self.entries.len() >= MAX_OUTCOMES {
            // Evict the oldest entry across all kinds.
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(key, _)| (key.1, key.2))
                .map(|(key, _)| *key);
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }

        self.seq = self.seq.wrapping_add(1);
        self.entries.insert(
            (report.intervention_type, now, self.seq),
            OutcomeEntry {
                kind: report.intervention_type,
                action: report.user_action,
                recorded_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one kind, oldest first.
    pub fn for_kind(&self, kind: InterventionKind) -> Vec<OutcomeEntry> {
        self.entries
            .range((kind, Millis::ZERO, 0)..)
            .take_while(|(key, _)| key.0 == kind)
            .map(|(_, entry)| *entry)
            .collect()
    }

    pub fn summary(&self, kind: InterventionKind) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for entry in self.for_kind(kind) {
            summary.total += 1;
            *summary.by_action.entry(entry.action).or_insert(0) += 1;
        }
        summary
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seq = 0;
    }
}
