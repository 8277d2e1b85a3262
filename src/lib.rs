pub mod config;
pub mod error;
pub mod kernel;
pub mod outputs;
pub mod planner;
pub mod services;

// Re-export the pieces an orchestrator wires together
pub use config::{EngineConfig, ServiceConfig};
pub use kernel::engine::{CycleOutcome, InterventionEngine, NoInterventionReason};
pub use kernel::event::{OutcomeReport, SignalInput, UserAction};
pub use kernel::session::{SessionId, SessionProfile};
pub use planner::types::{InterventionAction, InterventionKind, InterventionRecord};
