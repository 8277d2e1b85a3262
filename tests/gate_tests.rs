use nudge::kernel::classifier::{classify, Classification, Intensity, StateInputs, UserState};
use nudge::kernel::gate::{evaluate, CooldownPolicy, GateDecision, GateRejection};
use nudge::kernel::session::SessionCounters;
use nudge::kernel::time::Millis;

fn classification(state: UserState, intensity: Intensity) -> Classification {
    Classification { state, intensity, session_override: false }
}

fn policy() -> CooldownPolicy {
    CooldownPolicy { min_interval_ms: 120_000, critical_bypass: true }
}

fn fresh() -> SessionCounters {
    SessionCounters::new(6, Millis::ZERO)
}

/// Last intervention at `last`, `count` so far.
fn cooling(last: Millis, count: u32) -> SessionCounters {
    SessionCounters::restore(6, Millis::ZERO, Some(last), count)
}

#[test]
fn test_high_attention_short_circuits() {
    // attention=85, distraction=10, 5 minutes
    let c = classify(&StateInputs { attention: 85.0, distraction: 10.0, sleepiness: None, session_seconds: 300 });
    assert_eq!((c.state, c.intensity), (UserState::Focused, Intensity::Low));

    let decision = evaluate(&c, 85.0, &fresh(), &policy(), Millis::from_secs(300));
    assert_eq!(decision, GateDecision::Reject(GateRejection::ScoreHigh));

    let verdict = serde_json::to_value(decision.verdict()).unwrap();
    assert_eq!(verdict, serde_json::json!({ "shouldIntervene": false, "reason": "score_high" }));
}

#[test]
fn test_high_attention_wins_even_when_fatigued() {
    let c = classification(UserState::Fatigued, Intensity::Critical);
    assert_eq!(evaluate(&c, 80.0, &fresh(), &policy(), Millis(0)), GateDecision::Reject(GateRejection::ScoreHigh));
}

#[test]
fn test_focused_is_rejected() {
    let c = classification(UserState::Focused, Intensity::High);
    assert_eq!(evaluate(&c, 55.0, &fresh(), &policy(), Millis(0)), GateDecision::Reject(GateRejection::Focused));
}

#[test]
fn test_ambiguous_band_consults() {
    let c = classification(UserState::Distracted, Intensity::High);
    let decision = evaluate(&c, 50.0, &fresh(), &policy(), Millis(0));
    assert_eq!(decision, GateDecision::Consult);
    assert!(decision.should_intervene());
    assert_eq!(decision.reason(), None);
}

#[test]
fn test_very_low_attention_escalates_directly() {
    let c = classification(UserState::Wandering, Intensity::Critical);
    assert_eq!(evaluate(&c, 12.0, &fresh(), &policy(), Millis(0)), GateDecision::EscalateDirect);
}

#[test]
fn test_cooldown_rejects_non_critical() {
    let now = Millis::from_secs(1_000);
    let counters = cooling(now.saturating_sub(5_000), 1);

    for intensity in [Intensity::Low, Intensity::Medium, Intensity::High] {
        let c = classification(UserState::Distracted, intensity);
        assert_eq!(
            evaluate(&c, 50.0, &counters, &policy(), now),
            GateDecision::Reject(GateRejection::Cooldown),
            "{:?} must respect cooldown",
            intensity
        );
    }
}

#[test]
fn test_critical_bypasses_cooldown_regardless_of_elapsed_time() {
    let now = Millis::from_secs(1_000);
    let c = classification(UserState::Distracted, Intensity::Critical);

    for elapsed in [0u64, 1, 5_000, 119_999] {
        let counters = cooling(now.saturating_sub(elapsed), 1);
        assert_eq!(evaluate(&c, 50.0, &counters, &policy(), now), GateDecision::Consult, "elapsed {}ms", elapsed);
    }
}

#[test]
fn test_critical_bypass_can_be_disabled() {
    let now = Millis::from_secs(1_000);
    let strict = CooldownPolicy { min_interval_ms: 120_000, critical_bypass: false };
    let c = classification(UserState::Distracted, Intensity::Critical);
    let counters = cooling(now.saturating_sub(1_000), 1);

    assert_eq!(evaluate(&c, 50.0, &counters, &strict, now), GateDecision::Reject(GateRejection::Cooldown));
}

#[test]
fn test_cooldown_expires() {
    let now = Millis::from_secs(1_000);
    let c = classification(UserState::Distracted, Intensity::High);

    let just_expired = cooling(now.saturating_sub(120_000), 1);
    assert_eq!(evaluate(&c, 50.0, &just_expired, &policy(), now), GateDecision::Consult);
}

#[test]
fn test_session_cap_rejects_even_critical() {
    let c = classification(UserState::Wandering, Intensity::Critical);
    let capped = SessionCounters::restore(3, Millis::ZERO, Some(Millis(0)), 3);

    assert_eq!(
        evaluate(&c, 10.0, &capped, &policy(), Millis::from_secs(10_000)),
        GateDecision::Reject(GateRejection::SessionCap)
    );
}

#[test]
fn test_late_session_wandering_bypasses_cooldown_and_escalates() {
    let c = classify(&StateInputs { attention: 15.0, distraction: 70.0, sleepiness: None, session_seconds: 50 * 60 });
    assert_eq!((c.state, c.intensity), (UserState::Wandering, Intensity::Critical));

    let now = Millis::from_secs(3_000);
    let counters = cooling(now.saturating_sub(10_000), 2);
    assert_eq!(evaluate(&c, 15.0, &counters, &policy(), now), GateDecision::EscalateDirect);
}

#[test]
fn test_evaluate_has_no_side_effects() {
    let c = classification(UserState::Distracted, Intensity::High);
    let counters = fresh();
    let before = counters.clone();
    let first = evaluate(&c, 50.0, &counters, &policy(), Millis(42));
    let second = evaluate(&c, 50.0, &counters, &policy(), Millis(42));

    assert_eq!(first, second);
    assert_eq!(counters, before);
}

#[test]
fn test_rejection_codes() {
    assert_eq!(GateRejection::Cooldown.code(), "cooldown");
    assert_eq!(GateRejection::ScoreHigh.code(), "score_high");
    assert_eq!(GateRejection::SessionCap.code(), "session_cap");
    assert_eq!(GateRejection::Focused.code(), "focused");
}
