use crate::error::{DroverError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// Immutable record of one scheduler pass: when it started, how long it took
/// and how many talks it processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub start: DateTime<Utc>,
    pub msec: u64,
    pub talks: usize,
}

impl Tick {
    pub fn new(start: DateTime<Utc>, msec: u64, talks: usize) -> Self {
        Self { start, msec, talks }
    }
}

// ---------------------------------------------------------------------------
// Pulse
// ---------------------------------------------------------------------------

/// Bounded, append-only tick history — the only externally observable
/// evidence of the scheduler's liveness and throughput. A rejected append is
/// an invariant violation, not a transient condition.
pub struct Pulse {
    ticks: Mutex<VecDeque<Tick>>,
    capacity: usize,
}

impl Pulse {
    pub fn new(capacity: usize) -> Self {
        Self {
            ticks: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn add(&self, tick: Tick) -> Result<()> {
        let mut ticks = self
            .ticks
            .lock()
            .map_err(|_| DroverError::Pulse("tick history lock poisoned".into()))?;
        if ticks.len() == self.capacity {
            ticks.pop_front();
        }
        ticks.push_back(tick);
        Ok(())
    }

    /// Recorded ticks, oldest first.
    pub fn ticks(&self) -> Vec<Tick> {
        self.ticks
            .lock()
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.ticks.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
