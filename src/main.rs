use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nudge::kernel::scheduler::{LatestSignals, ScheduledCycle};
use nudge::outputs::presenter::ConsolePresenter;
use nudge::services::llm::{CannedService, LlmService, ReasoningService};
use nudge::{EngineConfig, InterventionEngine, OutcomeReport, ServiceConfig, SessionProfile, SignalInput};

/// One line of stdin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Command {
    /// Camera attention score, 0 - 1.
    Sample(f64),
    /// Latest orchestrator signals; picked up by the next scheduled cycle.
    Signals(SignalInput),
    /// Run a cycle now with the given signals.
    Cycle(SignalInput),
    Outcome(OutcomeReport),
    Reset,
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    tracing::info!("Nudge engine booting...");

    // Configuration errors surface once, here, and stop the process.
    let config = EngineConfig::from_env().context("invalid engine configuration")?;

    if std::env::var("NUDGE_OFFLINE").map(|v| v == "1").unwrap_or(false) {
        tracing::warn!("Offline mode: using canned reasoning service");
        run(config, CannedService::offline()).await
    } else {
        let service_config = ServiceConfig::from_env().context("invalid service configuration")?;
        let service = LlmService::from_config(&service_config, config.call_timeout())?;
        tracing::info!(url = service.base_url(), "Reasoning service configured");
        run(config, service).await
    }
}

async fn run<S: ReasoningService>(config: EngineConfig, service: S) -> Result<()> {
    let engine = Arc::new(InterventionEngine::new(config, Arc::new(service), Arc::new(ConsolePresenter)));

    let profile = SessionProfile {
        goal: std::env::var("NUDGE_GOAL").ok().filter(|g| !g.trim().is_empty()),
    };
    let session = engine.start_session(profile).await;

    let signals = Arc::new(LatestSignals::new());
    let cycle = ScheduledCycle::spawn(engine.clone(), session, signals.clone())
        .await
        .context("session vanished before scheduling")?;

    println!("Send JSON lines: {{\"sample\":0.7}}, {{\"signals\":{{...}}}}, {{\"cycle\":{{...}}}}, {{\"outcome\":{{...}}}}, \"reset\", \"stats\".");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Command>(&line) {
                    Ok(command) => handle(&engine, session, &signals, command).await,
                    Err(e) => tracing::warn!("Ignoring malformed command: {}", e),
                }
            }
        }
    }

    cycle.cancel();
    engine.stop_session(session).await;
    let cycles = cycle.join().await;
    tracing::info!(cycles, "Nudge engine stopped");
    Ok(())
}

async fn handle<S: ReasoningService, P: nudge::outputs::presenter::Presenter>(
    engine: &InterventionEngine<S, P>,
    session: nudge::SessionId,
    signals: &LatestSignals,
    command: Command,
) {
    match command {
        Command::Sample(score) => {
            if !engine.record_attention_score(session, score).await {
                tracing::debug!("Sample dropped");
            }
        }
        Command::Signals(input) => signals.update(input),
        Command::Cycle(input) => {
            signals.update(input.clone());
            let outcome = engine.process_signals(session, input).await;
            println!("{}", serde_json::to_string(&outcome.verdict()).unwrap_or_default());
        }
        Command::Outcome(report) => {
            engine.handle_outcome(session, report).await;
        }
        Command::Reset => {
            engine.reset_session(session).await;
        }
        Command::Stats => {
            let snapshot = engine.telemetry_snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot).unwrap_or_default());
        }
    }
}
