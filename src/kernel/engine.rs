use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::classifier::{classify, Classification, StateInputs};
use super::dispatch::{dispatch, OutcomeSummary};
use super::event::{OutcomeReport, SignalInput, SignalSnapshot};
use super::gate::{self, GateDecision, GateRejection};
use super::session::{CallGuard, CyclePhase, Session, SessionCounters, SessionId, SessionProfile};
use super::telemetry::event::{EscalationPath, SessionEventKind, TelemetryEvent};
use super::telemetry::metrics::TelemetrySnapshot;
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{Clock, Millis, MonotonicClock};
use crate::config::EngineConfig;
use crate::error::TransportError;
use crate::outputs::presenter::Presenter;
use crate::planner::prompt::{build_prompt, Prompt};
use crate::planner::types::{InterventionKind, InterventionRecord};
use crate::planner::validator;
use crate::services::llm::client::ReasoningService;

/// Why a cycle ended without showing anything. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoInterventionReason {
    Gate(GateRejection),
    /// A call for this session was already outstanding.
    Coalesced,
    InvalidSignal,
    ServiceFailed,
    Timeout,
    InvalidResponse,
    /// The service chose `none`.
    Declined,
    /// The session was reset or stopped while the call was out.
    SessionEnded,
    UnknownSession,
}

impl NoInterventionReason {
    pub fn code(&self) -> &'static str {
        match self {
            NoInterventionReason::Gate(reason) => reason.code(),
            NoInterventionReason::Coalesced => "coalesced",
            NoInterventionReason::InvalidSignal => "invalid_signal",
            NoInterventionReason::ServiceFailed => "service_failed",
            NoInterventionReason::Timeout => "timeout",
            NoInterventionReason::InvalidResponse => "invalid_response",
            NoInterventionReason::Declined => "declined",
            NoInterventionReason::SessionEnded => "session_ended",
            NoInterventionReason::UnknownSession => "unknown_session",
        }
    }
}

/// Result of one decision cycle. Always well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Dispatched(InterventionRecord),
    NoIntervention(NoInterventionReason),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleVerdict<'a> {
    pub should_intervene: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervention: Option<&'a InterventionRecord>,
}

impl CycleOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, CycleOutcome::Dispatched(_))
    }

    pub fn record(&self) -> Option<&InterventionRecord> {
        match self {
            CycleOutcome::Dispatched(record) => Some(record),
            CycleOutcome::NoIntervention(_) => None,
        }
    }

    pub fn reason(&self) -> Option<NoInterventionReason> {
        match self {
            CycleOutcome::Dispatched(_) => None,
            CycleOutcome::NoIntervention(reason) => Some(*reason),
        }
    }

    /// `{ "shouldIntervene": false, "reason": "score_high" }`
    pub fn verdict(&self) -> CycleVerdict<'_> {
        CycleVerdict {
            should_intervene: self.is_dispatched(),
            reason: self.reason().map(|r| r.code()),
            intervention: self.record(),
        }
    }
}

type SessionHandle = Arc<Mutex<Session>>;

/// Multi-session decision engine.
///
/// Each session's state sits behind its own mutex. The lock is released for
/// the duration of the reasoning-service call; the session's call slot is
/// what keeps a second call from starting meanwhile.
pub struct InterventionEngine<S, P> {
    config: EngineConfig,
    service: Arc<S>,
    presenter: Arc<P>,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    telemetry: StdMutex<TelemetryRecorder>,
}

/// What phase 1 of a cycle hands to the suspending phase.
struct PendingCall {
    guard: CallGuard,
    prompt: Prompt,
    cancel: CancellationToken,
}

enum LocalStep {
    Done(CycleOutcome),
    Call(PendingCall),
}

impl<S: ReasoningService, P: Presenter> InterventionEngine<S, P> {
    pub fn new(config: EngineConfig, service: Arc<S>, presenter: Arc<P>) -> Self {
        let telemetry = TelemetryRecorder::with_capacity(config.telemetry_events);
        Self {
            config,
            service,
            presenter,
            sessions: RwLock::new(HashMap::new()),
            telemetry: StdMutex::new(telemetry),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // === Session lifecycle ===

    pub async fn start_session(&self, profile: SessionProfile) -> SessionId {
        self.start_session_with_clock(profile, Arc::new(MonotonicClock::new())).await
    }

    /// Starts a session driven by `clock`. All of the session's time
    /// comparisons read this one clock.
    pub async fn start_session_with_clock(&self, profile: SessionProfile, clock: Arc<dyn Clock>) -> SessionId {
        let id = Uuid::new_v4();
        let session = Session::new(id, profile, clock, &self.config);
        self.sessions.write().await.insert(id, Arc::new(Mutex::new(session)));
        self.emit(TelemetryEvent::SessionLifecycle { session: id, event: SessionEventKind::Started });
        info!(session = %id, "Session started");
        id
    }

    /// Clears counters and cooldown. An outstanding call's result is dropped.
    pub async fn reset_session(&self, id: SessionId) -> bool {
        let Some(handle) = self.session(id).await else {
            return false;
        };
        handle.lock().await.reset();
        self.emit(TelemetryEvent::SessionLifecycle { session: id, event: SessionEventKind::Reset });
        info!(session = %id, "Session reset");
        true
    }

    pub async fn stop_session(&self, id: SessionId) -> bool {
        let Some(handle) = self.sessions.write().await.remove(&id) else {
            return false;
        };
        handle.lock().await.close();
        self.emit(TelemetryEvent::SessionLifecycle { session: id, event: SessionEventKind::Stopped });
        info!(session = %id, "Session stopped");
        true
    }

    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }

    // === Inbound: camera samples ===

    /// Ingest a 0-1 attention score stamped with the session clock.
    /// Malformed scores are dropped and logged; returns whether it was kept.
    pub async fn record_attention_score(&self, id: SessionId, value: f64) -> bool {
        let Some(handle) = self.session(id).await else {
            return false;
        };
        let mut session = handle.lock().await;
        let now = session.now();
        Self::ingest(&mut session, value, now)
    }

    /// Same as `record_attention_score` with an explicit session-clock time.
    pub async fn record_attention_score_at(&self, id: SessionId, value: f64, at: Millis) -> bool {
        let Some(handle) = self.session(id).await else {
            return false;
        };
        let mut session = handle.lock().await;
        Self::ingest(&mut session, value, at)
    }

    fn ingest(session: &mut Session, value: f64, at: Millis) -> bool {
        match session.aggregator_mut().record_sample(value, at) {
            Ok(()) => true,
            Err(e) => {
                debug!(session = %session.id(), "Sample rejected: {}", e);
                false
            }
        }
    }

    // === Inbound: decision cycle ===

    /// Runs one full decision cycle. Never fails: every internal problem
    /// resolves to `NoIntervention`.
    pub async fn process_signals(&self, id: SessionId, input: SignalInput) -> CycleOutcome {
        let Some(handle) = self.session(id).await else {
            return CycleOutcome::NoIntervention(NoInterventionReason::UnknownSession);
        };

        // 1. Local decision, under the session lock
        let pending = {
            let mut session = handle.lock().await;
            match self.decide_locally(&mut session, &input) {
                LocalStep::Done(outcome) => return outcome,
                LocalStep::Call(pending) => pending,
            }
        };

        // 2. External call: bounded, cancellable, never retried
        let started = tokio::time::Instant::now();
        let result = self.call_service(&pending).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        // 3. Validate and dispatch, under the lock again
        let mut session = handle.lock().await;
        self.complete_call(&mut session, pending, result, latency_ms)
    }

    fn decide_locally(&self, session: &mut Session, input: &SignalInput) -> LocalStep {
        let id = session.id();

        if session.call_in_flight() {
            debug!(session = %id, "Cycle coalesced: call already in flight");
            self.emit(TelemetryEvent::Coalesced { session: id });
            return LocalStep::Done(CycleOutcome::NoIntervention(NoInterventionReason::Coalesced));
        }

        let now = session.now();

        session.set_phase(CyclePhase::Aggregating);
        session.aggregator_mut().prune(now);
        let fallback = session.aggregator().rolling_average(self.config.window_secs, now) * 100.0;
        let Some(snapshot) = SignalSnapshot::build(input, fallback, self.config.excerpt_chars, now) else {
            debug!(session = %id, "Cycle skipped: non-numeric signal");
            self.emit(TelemetryEvent::InvalidSignal { session: id });
            session.set_phase(CyclePhase::Idle);
            return LocalStep::Done(CycleOutcome::NoIntervention(NoInterventionReason::InvalidSignal));
        };

        session.set_phase(CyclePhase::Classifying);
        let classification = classify(&StateInputs::from(&snapshot));
        self.emit(TelemetryEvent::Classified {
            session: id,
            state: classification.state,
            intensity: classification.intensity,
            session_override: classification.session_override,
        });
        debug!(session = %id, state = ?classification.state, intensity = ?classification.intensity, "Classified");

        session.set_phase(CyclePhase::Gating);
        let decision = gate::evaluate(&classification, snapshot.attention, session.counters(), &self.config.cooldown, now);

        match decision {
            GateDecision::Reject(reason) => {
                debug!(session = %id, reason = reason.code(), "Gate rejected cycle");
                self.emit(TelemetryEvent::CycleRejected { session: id, reason });
                session.set_phase(CyclePhase::Idle);
                LocalStep::Done(CycleOutcome::NoIntervention(NoInterventionReason::Gate(reason)))
            }
            GateDecision::EscalateDirect => {
                self.emit(TelemetryEvent::Escalated { session: id, path: EscalationPath::Direct });
                let record = validator::local_break(now);
                let outcome = self.commit(session, record, now);
                session.set_phase(CyclePhase::Idle);
                LocalStep::Done(outcome)
            }
            GateDecision::Consult => self.prepare_call(session, &snapshot, &classification),
        }
    }

    fn prepare_call(&self, session: &mut Session, snapshot: &SignalSnapshot, classification: &Classification) -> LocalStep {
        let id = session.id();
        let Some(guard) = session.begin_call() else {
            self.emit(TelemetryEvent::Coalesced { session: id });
            return LocalStep::Done(CycleOutcome::NoIntervention(NoInterventionReason::Coalesced));
        };

        self.emit(TelemetryEvent::Escalated { session: id, path: EscalationPath::Consult });
        session.set_phase(CyclePhase::Escalating);

        let prompt = build_prompt(snapshot, classification, session.profile(), self.config.excerpt_chars);
        LocalStep::Call(PendingCall {
            guard,
            prompt,
            cancel: session.cancellation(),
        })
    }

    async fn call_service(&self, pending: &PendingCall) -> Result<String, TransportError> {
        let timeout = self.config.call_timeout();
        tokio::select! {
            _ = pending.cancel.cancelled() => Err(TransportError::Cancelled),
            result = tokio::time::timeout(timeout, self.service.generate(&pending.prompt)) => match result {
                Ok(reply) => reply,
                Err(_) => Err(TransportError::Timeout(self.config.call_timeout_ms)),
            },
        }
    }

    fn complete_call(
        &self,
        session: &mut Session,
        pending: PendingCall,
        result: Result<String, TransportError>,
        latency_ms: u64,
    ) -> CycleOutcome {
        let id = session.id();

        if !session.finish_call(pending.guard) {
            debug!(session = %id, "Discarding result for a reset session");
            self.emit(TelemetryEvent::StaleResult { session: id });
            return CycleOutcome::NoIntervention(NoInterventionReason::SessionEnded);
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session = %id, latency_ms, "Reasoning service failed: {}", e);
                self.emit(TelemetryEvent::ServiceFailed {
                    session: id,
                    kind: e.kind().to_string(),
                    latency_ms,
                });
                session.set_phase(CyclePhase::Idle);
                let reason = match e {
                    TransportError::Timeout(_) => NoInterventionReason::Timeout,
                    TransportError::Cancelled => NoInterventionReason::SessionEnded,
                    _ => NoInterventionReason::ServiceFailed,
                };
                return CycleOutcome::NoIntervention(reason);
            }
        };

        session.set_phase(CyclePhase::Validating);
        let now = session.now();
        let outcome = match validator::validate(&reply, now) {
            Ok(Some(record)) => self.commit(session, record, now),
            Ok(None) => {
                debug!(session = %id, "Service chose no intervention");
                self.emit(TelemetryEvent::Declined { session: id });
                CycleOutcome::NoIntervention(NoInterventionReason::Declined)
            }
            Err(e) => {
                warn!(session = %id, kind = e.kind(), "Discarding invalid service reply: {}", e);
                tracing::trace!(session = %id, reply = %reply, "Rejected reply");
                self.emit(TelemetryEvent::ResponseRejected {
                    session: id,
                    kind: e.kind().to_string(),
                });
                CycleOutcome::NoIntervention(NoInterventionReason::InvalidResponse)
            }
        };
        session.set_phase(CyclePhase::Idle);
        outcome
    }

    fn commit(&self, session: &mut Session, record: InterventionRecord, now: Millis) -> CycleOutcome {
        let id = session.id();
        if dispatch(&record, session.counters_mut(), self.presenter.as_ref(), now) {
            self.emit(TelemetryEvent::Dispatched { session: id, kind: record.kind() });
            CycleOutcome::Dispatched(record)
        } else {
            self.emit(TelemetryEvent::CycleRejected { session: id, reason: GateRejection::SessionCap });
            CycleOutcome::NoIntervention(NoInterventionReason::Gate(GateRejection::SessionCap))
        }
    }

    // === Inbound: outcomes ===

    /// Diagnostic only: cooldown and counters are never touched.
    pub async fn handle_outcome(&self, id: SessionId, report: OutcomeReport) -> bool {
        let Some(handle) = self.session(id).await else {
            return false;
        };
        let mut session = handle.lock().await;
        let now = session.now();
        session.outcomes_mut().record(report, now);
        self.emit(TelemetryEvent::Outcome {
            session: id,
            kind: report.intervention_type,
            action: report.user_action,
        });
        debug!(session = %id, kind = report.intervention_type.as_str(), action = ?report.user_action, "Outcome recorded");
        true
    }

    // === Read-only accessors ===

    pub async fn counters(&self, id: SessionId) -> Option<SessionCounters> {
        let handle = self.session(id).await?;
        let session = handle.lock().await;
        Some(session.counters().clone())
    }

    /// Rolling camera attention on the percent scale.
    pub async fn rolling_attention(&self, id: SessionId) -> Option<f64> {
        let handle = self.session(id).await?;
        let session = handle.lock().await;
        let now = session.now();
        Some(session.aggregator().rolling_average(self.config.window_secs, now) * 100.0)
    }

    pub async fn outcome_summary(&self, id: SessionId, kind: InterventionKind) -> Option<OutcomeSummary> {
        let handle = self.session(id).await?;
        let session = handle.lock().await;
        Some(session.outcomes().summary(kind))
    }

    pub async fn call_in_flight(&self, id: SessionId) -> bool {
        match self.session(id).await {
            Some(handle) => handle.lock().await.call_in_flight(),
            None => false,
        }
    }

    /// Cancelled when the session stops. `None` for unknown sessions.
    pub async fn session_lifetime(&self, id: SessionId) -> Option<CancellationToken> {
        let handle = self.session(id).await?;
        let session = handle.lock().await;
        Some(session.lifetime())
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.lock().map(|t| t.snapshot()).unwrap_or_default()
    }

    /// Diagnostic events dropped because the buffer was full.
    pub fn telemetry_evicted(&self) -> u64 {
        self.telemetry.lock().map(|t| t.evicted()).unwrap_or(0)
    }

    async fn session(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    fn emit(&self, event: TelemetryEvent) {
        if let Ok(mut telemetry) = self.telemetry.lock() {
            telemetry.record(event);
        }
    }
}
