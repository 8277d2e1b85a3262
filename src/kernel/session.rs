use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex as StdMutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::kernel::dispatch::OutcomeLog;
use crate::kernel::signal::SignalAggregator;
use crate::kernel::time::{Clock, Millis};

pub type SessionId = Uuid;

/// Rate-limit bookkeeping for one focus session.
/// Only dispatch advances it; only a session reset clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    last_intervention_at: Option<Millis>,
    intervention_count: u32,
    session_start: Millis,
    max_per_session: u32,
}

impl SessionCounters {
    pub fn new(max_per_session: u32, session_start: Millis) -> Self {
        Self {
            last_intervention_at: None,
            intervention_count: 0,
            session_start,
            max_per_session,
        }
    }

    /// Rebuild counters from known values. `count` is clamped to the cap.
    pub fn restore(max_per_session: u32, session_start: Millis, last_intervention_at: Option<Millis>, count: u32) -> Self {
        Self {
            last_intervention_at,
            intervention_count: count.min(max_per_session),
            session_start,
            max_per_session,
        }
    }

    pub fn last_intervention_at(&self) -> Option<Millis> {
        self.last_intervention_at
    }

    pub fn intervention_count(&self) -> u32 {
        self.intervention_count
    }

    pub fn session_start(&self) -> Millis {
        self.session_start
    }

    pub fn max_per_session(&self) -> u32 {
        self.max_per_session
    }

    pub fn cap_reached(&self) -> bool {
        self.intervention_count >= self.max_per_session
    }

    /// Returns false, changing nothing, once the cap is reached.
    pub(crate) fn record_dispatch(&mut self, now: Millis) -> bool {
        if self.cap_reached() {
            return false;
        }
        self.last_intervention_at = Some(now);
        self.intervention_count += 1;
        true
    }

    pub(crate) fn reset(&mut self, now: Millis) {
        self.last_intervention_at = None;
        self.intervention_count = 0;
        self.session_start = now;
    }
}

/// Per-session context supplied by the orchestrator at session start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionProfile {
    /// What the user said they are working on. Enables relevance warnings.
    pub goal: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Aggregating,
    Classifying,
    Gating,
    Escalating,
    Validating,
}

/// Identifies one outstanding reasoning-service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTicket {
    pub id: Uuid,
    /// Session epoch at claim time. A reset moves the session past it.
    pub epoch: u64,
    pub started_at: Millis,
}

type CallSlot = Arc<StdMutex<Option<CallTicket>>>;

/// Ownership of the session's single call slot.
///
/// Dropping the guard without `Session::finish_call` (the cycle future was
/// dropped mid-call) frees the slot, so the next cycle can consult again.
#[derive(Debug)]
pub struct CallGuard {
    slot: CallSlot,
    ticket: CallTicket,
}

impl CallGuard {
    pub fn ticket(&self) -> &CallTicket {
        &self.ticket
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if release(&self.slot, &self.ticket) {
            debug!(call = %self.ticket.id, "Abandoned call released its slot");
        }
    }
}

/// Clears the slot if it still holds `ticket`.
fn release(slot: &StdMutex<Option<CallTicket>>, ticket: &CallTicket) -> bool {
    let Ok(mut current) = slot.lock() else {
        return false;
    };
    if current.as_ref().is_some_and(|c| c.id == ticket.id) {
        *current = None;
        true
    } else {
        false
    }
}

/// Everything the engine knows about one focus session.
pub struct Session {
    id: SessionId,
    profile: SessionProfile,
    clock: Arc<dyn Clock>,
    aggregator: SignalAggregator,
    counters: SessionCounters,
    outcomes: OutcomeLog,
    in_flight: CallSlot,
    epoch: u64,
    /// Cancelled on every reset; guards in-flight calls.
    cancel: CancellationToken,
    /// Cancelled only when the session is closed; guards scheduled cycles.
    lifetime: CancellationToken,
    phase: CyclePhase,
}

impl Session {
    pub fn new(id: SessionId, profile: SessionProfile, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        let now = clock.now();
        Self {
            id,
            profile,
            aggregator: SignalAggregator::new(config.window_ms()),
            counters: SessionCounters::new(config.max_per_session, now),
            outcomes: OutcomeLog::new(),
            clock,
            in_flight: Arc::new(StdMutex::new(None)),
            epoch: 0,
            cancel: CancellationToken::new(),
            lifetime: CancellationToken::new(),
            phase: CyclePhase::Idle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    pub fn profile(&self) -> &SessionProfile {
        &self.profile
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub(crate) fn counters_mut(&mut self) -> &mut SessionCounters {
        &mut self.counters
    }

    pub fn aggregator(&self) -> &SignalAggregator {
        &self.aggregator
    }

    pub(crate) fn aggregator_mut(&mut self) -> &mut SignalAggregator {
        &mut self.aggregator
    }

    pub fn outcomes(&self) -> &OutcomeLog {
        &self.outcomes
    }

    pub(crate) fn outcomes_mut(&mut self) -> &mut OutcomeLog {
        &mut self.outcomes
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: CyclePhase) {
        self.phase = phase;
    }

    /// Child token: cancelled on the next reset.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn lifetime(&self) -> CancellationToken {
        self.lifetime.child_token()
    }

    pub fn is_closed(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    pub fn call_in_flight(&self) -> bool {
        self.in_flight.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Claims the session's only call slot. `None` if a call is already out.
    pub(crate) fn begin_call(&mut self) -> Option<CallGuard> {
        let mut slot = self.in_flight.lock().ok()?;
        if slot.is_some() {
            return None;
        }
        let ticket = CallTicket {
            id: Uuid::new_v4(),
            epoch: self.epoch,
            started_at: self.clock.now(),
        };
        *slot = Some(ticket.clone());
        drop(slot);

        Some(CallGuard {
            slot: self.in_flight.clone(),
            ticket,
        })
    }

    /// Releases the slot. False if a reset moved the session past the
    /// guard's epoch; the call's result must then be discarded.
    pub(crate) fn finish_call(&mut self, guard: CallGuard) -> bool {
        let released = release(&self.in_flight, guard.ticket());
        released && guard.ticket().epoch == self.epoch
    }

    /// Session boundary: clears counters, cooldown, samples and outcomes,
    /// and orphans any in-flight call.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = None;
        }
        self.phase = CyclePhase::Idle;

        let now = self.now();
        self.counters.reset(now);
        self.aggregator.clear();
        self.outcomes.clear();
    }

    /// Final shutdown. Cancels everything without re-arming.
    pub(crate) fn close(&mut self) {
        self.reset();
        self.cancel.cancel();
        self.lifetime.cancel();
    }
}
