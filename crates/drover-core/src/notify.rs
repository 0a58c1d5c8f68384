use crate::error::{DroverError, Result};
use crate::talk::{Talk, Verdict};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Outcome reporting seam. Fire-and-forget: the pipeline logs a failed
/// delivery and moves on; retries belong to the collaborator behind this
/// trait (an issue-tracker client, a chat hook).
pub trait Notifier: Send + Sync {
    fn notify(&self, talk: &Talk, verdict: &Verdict) -> Result<()>;
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Writes verdicts to the log and nothing else.
#[derive(Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, talk: &Talk, verdict: &Verdict) -> Result<()> {
        if verdict.success {
            tracing::info!(talk = %talk.name, code = verdict.code, "build succeeded");
        } else {
            tracing::warn!(talk = %talk.name, code = verdict.code, tail = %verdict.tail, "build failed");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryNotifier
// ---------------------------------------------------------------------------

/// Records deliveries for assertions in tests.
#[derive(Default)]
pub struct MemoryNotifier {
    seen: Mutex<Vec<(String, bool)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<(String, bool)> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, talk: &Talk, verdict: &Verdict) -> Result<()> {
        self.seen
            .lock()
            .map_err(|_| DroverError::Storage("notifier lock poisoned".into()))?
            .push((talk.name.clone(), verdict.success));
        Ok(())
    }
}
