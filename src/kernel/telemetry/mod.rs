//! Diagnostic telemetry for the decision engine.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (Classifier, Gate, Validator).
//!
//! # PRIVACY INVARIANT
//! Events carry reason codes, kinds and counts only. Never page text, prompts,
//! service replies or intervention content.

pub mod event;
pub mod metrics;
pub mod recorder;
