use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::engine::InterventionEngine;
use super::event::SignalInput;
use super::session::SessionId;
use crate::outputs::presenter::Presenter;
use crate::services::llm::client::ReasoningService;

/// Supplies the orchestrator's view of the signals at each scheduled cycle.
/// `None` skips the cycle.
pub trait SignalSource: Send + Sync + 'static {
    fn current(&self) -> Option<SignalInput>;
}

/// Holds whatever signals were pushed last.
#[derive(Debug, Default)]
pub struct LatestSignals {
    latest: Mutex<Option<SignalInput>>,
}

impl LatestSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, input: SignalInput) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(input);
        }
    }
}

impl SignalSource for LatestSignals {
    fn current(&self) -> Option<SignalInput> {
        self.latest.lock().ok().and_then(|l| l.clone())
    }
}

/// Handle to a periodic decision cycle.
pub struct ScheduledCycle {
    token: CancellationToken,
    handle: JoinHandle<u64>,
}

impl ScheduledCycle {
    /// Spawns the periodic cycle for `session`. The task ends when cancelled
    /// or when the session is stopped. Returns `None` for unknown sessions.
    pub async fn spawn<S, P, Src>(
        engine: Arc<InterventionEngine<S, P>>,
        session: SessionId,
        source: Arc<Src>,
    ) -> Option<Self>
    where
        S: ReasoningService,
        P: Presenter,
        Src: SignalSource,
    {
        let period = engine.config().cycle_interval();
        Self::spawn_every(engine, session, source, period).await
    }

    pub async fn spawn_every<S, P, Src>(
        engine: Arc<InterventionEngine<S, P>>,
        session: SessionId,
        source: Arc<Src>,
        period: Duration,
    ) -> Option<Self>
    where
        S: ReasoningService,
        P: Presenter,
        Src: SignalSource,
    {
        let token = engine.session_lifetime(session).await?;
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            info!(session = %session, period_ms = period.as_millis() as u64, "Decision cycle scheduled");

            let mut cadence = interval(period);
            cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
            cadence.tick().await; // first tick fires immediately

            let mut cycles = 0u64;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = cadence.tick() => {}
                }

                let Some(input) = source.current() else {
                    debug!(session = %session, "No signals yet; cycle skipped");
                    continue;
                };

                tokio::select! {
                    _ = task_token.cancelled() => break,
                    outcome = engine.process_signals(session, input) => {
                        cycles += 1;
                        debug!(session = %session, verdict = ?outcome.verdict(), "Scheduled cycle finished");
                    }
                }
            }

            info!(session = %session, cycles, "Decision cycle stopped");
            cycles
        });

        Some(Self { token, handle })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the task to stop. Returns the number of cycles it ran.
    pub async fn join(self) -> u64 {
        self.handle.await.unwrap_or(0)
    }
}
