use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::client::ReasoningService;
use crate::error::TransportError;
use crate::planner::prompt::Prompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CannedReply {
    Text(String),
    Status(u16),
    /// Never answers.
    Hang,
}

/// Scripted reasoning service for offline runs and tests.
/// Plays queued replies in order, then repeats the fallback.
#[derive(Debug)]
pub struct CannedService {
    queue: Mutex<VecDeque<CannedReply>>,
    fallback: CannedReply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<Prompt>>,
}

impl CannedService {
    pub fn always(reply: CannedReply) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: reply,
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn always_text(text: &str) -> Self {
        Self::always(CannedReply::Text(text.to_string()))
    }

    pub fn sequence(replies: Vec<CannedReply>, fallback: CannedReply) -> Self {
        let service = Self::always(fallback);
        if let Ok(mut queue) = service.queue.lock() {
            queue.extend(replies);
        }
        service
    }

    /// Offline default: a short encouraging message.
    pub fn offline() -> Self {
        Self::always_text(r#"{"type":"message","message":"Quick check-in: what is the one thing you want to finish next?"}"#)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }

    fn next_reply(&self) -> CannedReply {
        self.queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl ReasoningService for CannedService {
    async fn generate(&self, prompt: &Prompt) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.clone());
        }
        let reply = self.next_reply();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            CannedReply::Text(text) => Ok(text),
            CannedReply::Status(code) => Err(TransportError::Status(code)),
            CannedReply::Hang => std::future::pending().await,
        }
    }
}
