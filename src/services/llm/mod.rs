pub mod client;
pub mod stub;

pub use client::{LlmService, ReasoningService};
pub use stub::{CannedReply, CannedService};
