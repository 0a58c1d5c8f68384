//! Stage-transition agents.
//!
//! Each agent matches exactly one talk stage and either advances the talk or
//! reports that the stage is not its concern. The three phases of a pass —
//! starter, per-talk stage agents, closer — are composed here.

pub mod closer;
pub mod daemon;
pub mod report;
pub mod request;
pub mod starter;

pub use closer::DeactivatesTalks;
pub use daemon::{EndsDaemon, StartsDaemon};
pub use report::Reports;
pub use request::StartsRequest;
pub use starter::StartsTalks;

use crate::containers::Containers;
use crate::error::Result;
use crate::notify::Notifier;
use crate::profile::Profile;
use crate::queue::Queue;
use crate::store::Talks;
use std::sync::Arc;

/// Image used when neither the profile nor the daemon config names one.
pub const DEFAULT_IMAGE: &str = "ubuntu:24.04";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What an agent did with a talk. A no-op is an explicit `Skipped`, never a
/// caught exception; `Failed` is a talk-local defect that stops this talk's
/// processing for the pass without touching its stored state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped,
    Failed(String),
}

// ---------------------------------------------------------------------------
// Agent / SuperAgent
// ---------------------------------------------------------------------------

/// A per-talk stage transition. Mutations go through the store's atomic
/// update, so an agent crash never leaves a half-written record.
pub trait Agent: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    fn execute(&self, talks: &dyn Talks, name: &str, profile: &Profile) -> Result<Outcome>;
}

/// A whole-collection phase (starter, closer). Returns how many talks it
/// affected.
pub trait SuperAgent: Send + Sync {
    fn execute(&self, talks: &dyn Talks) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Factory for the three phases, holding the external collaborators.
pub struct Agents {
    queue: Arc<dyn Queue>,
    containers: Arc<dyn Containers>,
    notifier: Arc<dyn Notifier>,
    default_image: String,
}

impl Agents {
    pub fn new(
        queue: Arc<dyn Queue>,
        containers: Arc<dyn Containers>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            queue,
            containers,
            notifier,
            default_image: DEFAULT_IMAGE.to_string(),
        }
    }

    pub fn with_default_image(mut self, image: impl Into<String>) -> Self {
        self.default_image = image.into();
        self
    }

    pub fn starter(&self) -> StartsTalks {
        StartsTalks::new(Arc::clone(&self.queue))
    }

    /// Stage agents in pipeline order. A talk may cascade through several of
    /// them in one pass, each observing the talk's own prior transitions.
    pub fn each(&self) -> Vec<Box<dyn Agent>> {
        vec![
            Box::new(StartsRequest::new(self.default_image.clone())),
            Box::new(StartsDaemon::new(Arc::clone(&self.containers))),
            Box::new(EndsDaemon::new(Arc::clone(&self.containers))),
            Box::new(Reports::new(Arc::clone(&self.notifier))),
        ]
    }

    pub fn closer(&self) -> DeactivatesTalks {
        DeactivatesTalks::new()
    }
}
