use std::sync::Arc;

use nudge::kernel::classifier::{Intensity, UserState};
use nudge::kernel::gate::GateRejection;
use nudge::kernel::telemetry::event::{EscalationPath, SessionEventKind, TelemetryEvent};
use nudge::kernel::telemetry::recorder::TelemetryRecorder;
use nudge::kernel::event::ContentAnalysis;
use nudge::outputs::presenter::RecordingPresenter;
use nudge::services::llm::{CannedReply, CannedService};
use nudge::{EngineConfig, InterventionEngine, InterventionKind, SessionId, SessionProfile, SignalInput, UserAction};

#[test]
fn test_snapshot_aggregates_events() {
    let session = SessionId::new_v4();
    let mut recorder = TelemetryRecorder::new();

    // 1. One full consult cycle
    recorder.record(TelemetryEvent::SessionLifecycle { session, event: SessionEventKind::Started });
    recorder.record(TelemetryEvent::Classified {
        session,
        state: UserState::Distracted,
        intensity: Intensity::High,
        session_override: false,
    });
    recorder.record(TelemetryEvent::Escalated { session, path: EscalationPath::Consult });
    recorder.record(TelemetryEvent::Dispatched { session, kind: InterventionKind::Quiz });
    recorder.record(TelemetryEvent::Outcome { session, kind: InterventionKind::Quiz, action: UserAction::AnsweredCorrectly });

    // 2. Failures
    recorder.record(TelemetryEvent::ServiceFailed { session, kind: "timeout".to_string(), latency_ms: 10_000 });
    recorder.record(TelemetryEvent::ServiceFailed { session, kind: "status".to_string(), latency_ms: 200 });
    recorder.record(TelemetryEvent::ResponseRejected { session, kind: "option_count".to_string() });
    recorder.record(TelemetryEvent::CycleRejected { session, reason: GateRejection::Cooldown });

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.session_stats.started, 1);
    assert_eq!(snapshot.cycle_stats.classified, 1);
    assert_eq!(snapshot.cycle_stats.by_state.get(&UserState::Distracted), Some(&1));
    assert_eq!(snapshot.cycle_stats.rejected_cooldown, 1);
    assert_eq!(snapshot.service_stats.consultations, 1);
    assert_eq!(snapshot.service_stats.failures, 2);
    assert_eq!(snapshot.service_stats.timeouts, 1);
    assert_eq!(snapshot.service_stats.avg_failure_latency_ms, 5_100.0);
    assert_eq!(snapshot.service_stats.rejected_by_kind.get("option_count"), Some(&1));
    assert_eq!(snapshot.dispatch_stats.by_kind.get(&InterventionKind::Quiz), Some(&1));
    assert_eq!(snapshot.outcome_stats.by_action.get(&UserAction::AnsweredCorrectly), Some(&1));
}

#[test]
fn test_recorder_is_bounded() {
    let session = SessionId::new_v4();
    let mut recorder = TelemetryRecorder::new();

    for _ in 0..10_050 {
        recorder.record(TelemetryEvent::Coalesced { session });
    }

    assert_eq!(recorder.len(), 10_000);
    assert_eq!(recorder.snapshot().cycle_stats.coalesced, 10_000);

    assert_eq!(recorder.capacity(), 10_000);
    assert_eq!(recorder.evicted(), 50);

    recorder.clear();
    assert!(recorder.is_empty());
    assert_eq!(recorder.evicted(), 0);
}

#[test]
fn test_recorder_keeps_newest_events_within_capacity() {
    let session = SessionId::new_v4();
    let mut recorder = TelemetryRecorder::with_capacity(2);

    recorder.record(TelemetryEvent::Coalesced { session });
    recorder.record(TelemetryEvent::InvalidSignal { session });
    recorder.record(TelemetryEvent::Declined { session });

    assert_eq!(recorder.len(), 2);
    assert_eq!(recorder.evicted(), 1);
    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.cycle_stats.coalesced, 0);
    assert_eq!(snapshot.cycle_stats.invalid_signals, 1);
    assert_eq!(snapshot.service_stats.declined, 1);

    // Zero is raised to one.
    assert_eq!(TelemetryRecorder::with_capacity(0).capacity(), 1);
}

#[tokio::test]
async fn test_engine_telemetry_bound_follows_config() {
    let service = Arc::new(CannedService::sequence(vec![], CannedReply::Text("{}".to_string())));
    let presenter = Arc::new(RecordingPresenter::new());
    let config = EngineConfig { telemetry_events: 3, ..EngineConfig::default() };
    let engine = InterventionEngine::new(config, service, presenter);

    // 1. Start plus four resets is five lifecycle events
    let session = engine.start_session(SessionProfile::default()).await;
    for _ in 0..4 {
        assert!(engine.reset_session(session).await);
    }

    // 2. Only the newest three survive
    let snapshot = engine.telemetry_snapshot();
    assert_eq!(snapshot.session_stats.started, 0);
    assert_eq!(snapshot.session_stats.reset, 3);
    assert_eq!(engine.telemetry_evicted(), 2);
}

#[tokio::test]
async fn test_engine_telemetry_carries_no_content() {
    let service = Arc::new(CannedService::sequence(
        vec![CannedReply::Text(r#"{"type":"message","message":"SECRET-NUDGE-TEXT"}"#.to_string())],
        CannedReply::Text("not json at all SECRET-REPLY".to_string()),
    ));
    let presenter = Arc::new(RecordingPresenter::new());
    let config = EngineConfig {
        cooldown: nudge::kernel::gate::CooldownPolicy { min_interval_ms: 0, critical_bypass: true },
        ..EngineConfig::default()
    };
    let engine = InterventionEngine::new(config, service, presenter);
    let session = engine.start_session(SessionProfile { goal: Some("SECRET-GOAL".to_string()) }).await;

    let input = SignalInput {
        attention_score: Some(50.0),
        distraction_score: 70.0,
        content_analysis: ContentAnalysis {
            text: "SECRET-PAGE-TEXT".to_string(),
            url: "https://secret.example.com".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(engine.process_signals(session, input.clone()).await.is_dispatched());
    assert!(!engine.process_signals(session, input).await.is_dispatched());

    let snapshot = engine.telemetry_snapshot();
    assert_eq!(snapshot.dispatch_stats.total, 1);
    assert_eq!(snapshot.service_stats.rejected_responses, 1);
    assert_eq!(snapshot.service_stats.rejected_by_kind.get("unparseable"), Some(&1));

    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(!json.contains("SECRET"));
}
