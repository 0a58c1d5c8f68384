use drover_core::pulse::Pulse;
use drover_core::queue::MemoryQueue;
use drover_core::routine::Routine;
use drover_core::store::Talks;
use drover_core::toggles::Toggles;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
///
/// The queue is the concrete in-memory intake: the engine consumes it
/// through the `Queue` trait while the intake route pushes into it.
#[derive(Clone)]
pub struct AppState {
    pub talks: Arc<dyn Talks>,
    pub queue: Arc<MemoryQueue>,
    pub pulse: Arc<Pulse>,
    pub toggles: Arc<Toggles>,
    pub routine: Arc<Routine>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(
        talks: Arc<dyn Talks>,
        queue: Arc<MemoryQueue>,
        pulse: Arc<Pulse>,
        toggles: Arc<Toggles>,
        routine: Arc<Routine>,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            talks,
            queue,
            pulse,
            toggles,
            routine,
            admin_token,
        }
    }
}
