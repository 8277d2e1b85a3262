use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::planner::types::{InterventionAction, InterventionRecord};

/// Presentation collaborator. Fire-and-forget: the engine never waits for a
/// render confirmation and never learns whether one happened.
pub trait Presenter: Send + Sync + 'static {
    fn present(&self, record: &InterventionRecord);
}

/// Forwards records over an unbounded channel to the UI side.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<InterventionRecord>,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<InterventionRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Presenter for ChannelPresenter {
    fn present(&self, record: &InterventionRecord) {
        if self.tx.send(record.clone()).is_err() {
            warn!("Presenter channel closed; intervention dropped");
        }
    }
}

/// Prints records to stdout. Used by the console driver.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn present(&self, record: &InterventionRecord) {
        info!(kind = record.kind().as_str(), "Presenting intervention");
        match record.action() {
            InterventionAction::Message { message } => println!("[NUDGE] {}", message),
            InterventionAction::Break { message } => println!("[BREAK] {}", message),
            InterventionAction::RelevanceWarning { reason } => println!("[OFF-TOPIC] {}", reason),
            InterventionAction::Quiz { quiz } => {
                println!("[QUIZ] {}", quiz.question());
                for (i, option) in quiz.options().iter().enumerate() {
                    println!("   {}. {}", i + 1, option);
                }
            }
        }
    }
}

/// Keeps every presented record in memory.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    records: Mutex<Vec<InterventionRecord>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<InterventionRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, record: &InterventionRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}
