use nudge::kernel::classifier::{classify, Classification, Intensity, StateInputs, UserState};

fn inputs(attention: f64, distraction: f64, sleepiness: Option<f64>, minutes: u64) -> StateInputs {
    StateInputs {
        attention,
        distraction,
        sleepiness,
        session_seconds: minutes * 60,
    }
}

fn pair(c: Classification) -> (UserState, Intensity) {
    (c.state, c.intensity)
}

#[test]
fn test_rule_table() {
    // Fatigue
    assert_eq!(pair(classify(&inputs(70.0, 10.0, Some(65.0), 5))), (UserState::Fatigued, Intensity::High));
    assert_eq!(pair(classify(&inputs(70.0, 10.0, Some(85.0), 5))), (UserState::Fatigued, Intensity::Critical));
    // Distraction
    assert_eq!(pair(classify(&inputs(70.0, 65.0, None, 5))), (UserState::Distracted, Intensity::High));
    assert_eq!(pair(classify(&inputs(70.0, 90.0, None, 5))), (UserState::Distracted, Intensity::Critical));
    // Wandering
    assert_eq!(pair(classify(&inputs(30.0, 10.0, None, 5))), (UserState::Wandering, Intensity::Medium));
    assert_eq!(pair(classify(&inputs(10.0, 10.0, None, 5))), (UserState::Wandering, Intensity::Critical));
    // Focus
    assert_eq!(pair(classify(&inputs(85.0, 10.0, None, 5))), (UserState::Focused, Intensity::Low));
}

#[test]
fn test_thresholds_are_strict() {
    // Exactly on a threshold does not trigger the rule
    assert_eq!(classify(&inputs(70.0, 10.0, Some(60.0), 5)).state, UserState::Focused);
    assert_eq!(classify(&inputs(70.0, 60.0, None, 5)).state, UserState::Focused);
    assert_eq!(classify(&inputs(40.0, 10.0, None, 5)).state, UserState::Focused);
    assert_eq!(pair(classify(&inputs(20.0, 10.0, None, 5))), (UserState::Wandering, Intensity::Medium));
    assert_eq!(pair(classify(&inputs(70.0, 10.0, Some(80.0), 5))), (UserState::Fatigued, Intensity::High));
    assert_eq!(pair(classify(&inputs(70.0, 80.0, None, 5))), (UserState::Distracted, Intensity::High));
}

#[test]
fn test_priority_sleepiness_over_distraction_over_wandering() {
    // All three fire: fatigue wins
    let c = classify(&inputs(10.0, 90.0, Some(70.0), 5));
    assert_eq!(pair(c), (UserState::Fatigued, Intensity::High));

    // Distraction and wandering fire: distraction wins
    let c = classify(&inputs(10.0, 70.0, None, 5));
    assert_eq!(pair(c), (UserState::Distracted, Intensity::High));

    // Low sleepiness is ignored
    let c = classify(&inputs(30.0, 10.0, Some(50.0), 5));
    assert_eq!(c.state, UserState::Wandering);
}

#[test]
fn test_long_session_raises_intensity() {
    // Focused-looking but moderate attention late in a session
    let c = classify(&inputs(55.0, 10.0, None, 50));
    assert_eq!(pair(c), (UserState::Focused, Intensity::High));
    assert!(c.session_override);

    // Distracted keeps its branch, already High
    let c = classify(&inputs(50.0, 70.0, None, 50));
    assert_eq!(pair(c), (UserState::Distracted, Intensity::High));
    assert!(!c.session_override);

    // Wandering Medium becomes High
    let c = classify(&inputs(30.0, 10.0, None, 50));
    assert_eq!(pair(c), (UserState::Wandering, Intensity::High));

    // Critical is never lowered
    let c = classify(&inputs(50.0, 95.0, None, 50));
    assert_eq!(pair(c), (UserState::Distracted, Intensity::Critical));
}

#[test]
fn test_long_session_override_needs_both_conditions() {
    // Attention fine: no override
    assert_eq!(pair(classify(&inputs(65.0, 10.0, None, 50))), (UserState::Focused, Intensity::Low));
    // Exactly 45 minutes: no override
    assert_eq!(pair(classify(&inputs(55.0, 10.0, None, 45))), (UserState::Focused, Intensity::Low));
}

#[test]
fn test_long_session_low_attention_reads_as_wandering() {
    // attention=15, distraction=70, 50 minutes
    let c = classify(&inputs(15.0, 70.0, None, 50));
    assert_eq!(pair(c), (UserState::Wandering, Intensity::Critical));
    assert!(c.session_override);

    // Fatigue still dominates
    let c = classify(&inputs(15.0, 70.0, Some(70.0), 50));
    assert_eq!(pair(c), (UserState::Fatigued, Intensity::High));
}

#[test]
fn test_classify_is_pure() {
    let samples = [
        inputs(85.0, 10.0, None, 5),
        inputs(15.0, 70.0, None, 50),
        inputs(45.0, 30.0, Some(75.0), 20),
        inputs(0.0, 100.0, Some(100.0), 600),
    ];
    for s in samples {
        let first = classify(&s);
        for _ in 0..100 {
            assert_eq!(classify(&s), first, "classify must be deterministic for {:?}", s);
        }
    }
}

#[test]
fn test_intensity_ordering() {
    assert!(Intensity::Low < Intensity::Medium);
    assert!(Intensity::Medium < Intensity::High);
    assert!(Intensity::High < Intensity::Critical);
}
