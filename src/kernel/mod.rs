pub mod classifier;
pub mod dispatch;
pub mod engine;
pub mod event;
pub mod gate;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod telemetry;
pub mod time;
