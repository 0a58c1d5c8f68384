//! The fixed-interval scheduler driving the agent pipeline.
//!
//! One pass runs Starter → per-talk stage agents → Closer over the talk
//! store, then records a tick. Passes never overlap: the next one starts a
//! full interval after the previous one finished. A failure local to one
//! talk is logged and never aborts the rest of the pass.

use crate::agents::{Agent, Agents, Outcome, SuperAgent};
use crate::error::{DroverError, Result};
use crate::profile::Profiles;
use crate::pulse::{Pulse, Tick};
use crate::store::Talks;
use crate::toggles::Toggles;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// RoutineState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineState {
    Idle,
    Running,
    ShuttingDown,
}

impl RoutineState {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutineState::Idle => "idle",
            RoutineState::Running => "running",
            RoutineState::ShuttingDown => "shutting_down",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => RoutineState::Running,
            2 => RoutineState::ShuttingDown,
            _ => RoutineState::Idle,
        }
    }
}

impl fmt::Display for RoutineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Routine
// ---------------------------------------------------------------------------

pub struct Routine {
    talks: Arc<dyn Talks>,
    agents: Agents,
    profiles: Arc<Profiles>,
    pulse: Arc<Pulse>,
    toggles: Arc<Toggles>,
    interval: Duration,
    backoff: Duration,
    ceiling: Duration,
    down: AtomicBool,
    state: AtomicU8,
}

impl Routine {
    pub fn new(
        talks: Arc<dyn Talks>,
        agents: Agents,
        profiles: Arc<Profiles>,
        pulse: Arc<Pulse>,
        toggles: Arc<Toggles>,
        interval: Duration,
    ) -> Self {
        Self {
            talks,
            agents,
            profiles,
            pulse,
            toggles,
            interval,
            backoff: Duration::from_secs(5),
            ceiling: Duration::from_secs(300),
            down: AtomicBool::new(false),
            state: AtomicU8::new(RoutineState::Idle as u8),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn state(&self) -> RoutineState {
        RoutineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Request shutdown. Cooperative: an in-flight pass completes first.
    pub fn close(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    /// Run passes at a fixed delay until `close()` is observed. Blocks the
    /// calling thread.
    pub fn run(&self) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "routine started");
        while !self.down.load(Ordering::SeqCst) {
            self.state.store(RoutineState::Running as u8, Ordering::SeqCst);
            match self.pass() {
                Ok(tick) => {
                    tracing::debug!(msec = tick.msec, talks = tick.talks, "pass complete");
                }
                Err(e @ DroverError::Pulse(_)) => {
                    tracing::error!(error = %e, "cannot record ticks, stopping routine");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "pass failed");
                    self.nap(self.backoff);
                }
            }
            self.state.store(RoutineState::Idle as u8, Ordering::SeqCst);
            self.nap(self.interval);
        }
        self.state
            .store(RoutineState::ShuttingDown as u8, Ordering::SeqCst);
        tracing::info!("routine stopped");
    }

    /// One scheduler pass. The returned error is either the tick history
    /// refusing an append (fatal to the routine) or a collection-level store
    /// fault; in both cases no tick is recorded.
    pub fn pass(&self) -> Result<Tick> {
        let start = Utc::now();
        let clock = Instant::now();
        let total = if self.toggles.read_only() {
            tracing::info!("read-only mode");
            0
        } else {
            self.process()?
        };
        let elapsed = clock.elapsed();
        if elapsed > self.ceiling {
            tracing::warn!(msec = elapsed.as_millis() as u64, "pass exceeded its duration ceiling");
        }
        let tick = Tick::new(start, elapsed.as_millis() as u64, total);
        self.pulse.add(tick.clone())?;
        Ok(tick)
    }

    /// Starter → stage agents → closer. The snapshot of active talks is
    /// taken before the starter runs, so talks created in this pass are
    /// first staged on the next one.
    fn process(&self) -> Result<usize> {
        let snapshot = self.talks.active()?;
        if let Err(e) = self.agents.starter().execute(self.talks.as_ref()) {
            tracing::warn!(error = %e, "starter phase failed");
        }
        let stage_agents = self.agents.each();
        let mut total = 0;
        for name in &snapshot {
            total += 1;
            if let Err(e) = self.process_talk(name, &stage_agents) {
                tracing::warn!(talk = %name, error = %e, "talk processing failed");
            }
        }
        if let Err(e) = self.agents.closer().execute(self.talks.as_ref()) {
            tracing::warn!(error = %e, "closer phase failed");
        }
        Ok(total)
    }

    fn process_talk(&self, name: &str, agents: &[Box<dyn Agent>]) -> Result<()> {
        let talk = self.talks.get(name)?;
        if !talk.active {
            return Ok(());
        }
        let profile = self.profiles.fetch(&talk.project)?;
        for agent in agents {
            match agent.execute(self.talks.as_ref(), name, &profile)? {
                Outcome::Applied => {
                    tracing::debug!(talk = %name, agent = agent.name(), "applied");
                }
                Outcome::Skipped => {}
                Outcome::Failed(reason) => {
                    tracing::warn!(talk = %name, agent = agent.name(), %reason, "agent gave up");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Sleep in slices so a close() during the nap is honored promptly.
    fn nap(&self, total: Duration) {
        let slice = Duration::from_millis(50);
        let deadline = Instant::now() + total;
        while Instant::now() < deadline && !self.down.load(Ordering::SeqCst) {
            std::thread::sleep(slice.min(deadline.saturating_duration_since(Instant::now())));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
