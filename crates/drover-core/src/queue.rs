use crate::error::{DroverError, Result};
use crate::talk::Request;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Intake of pending build requests. The starter phase consumes it: items
/// stay queued until acknowledged, so a crashed pass re-reads them.
pub trait Queue: Send + Sync {
    /// Pending requests, oldest first.
    fn pending(&self) -> Result<Vec<Request>>;

    /// Acknowledge a consumed request. Unknown ids are a no-op.
    fn ack(&self, id: Uuid) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryQueue
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<Vec<Request>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Request>>> {
        self.items
            .lock()
            .map_err(|_| DroverError::Storage("queue lock poisoned".into()))
    }

    pub fn push(&self, request: Request) -> Result<()> {
        self.lock()?.push(request);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }
}

impl Queue for MemoryQueue {
    fn pending(&self) -> Result<Vec<Request>> {
        Ok(self.lock()?.clone())
    }

    fn ack(&self, id: Uuid) -> Result<()> {
        self.lock()?.retain(|r| r.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
