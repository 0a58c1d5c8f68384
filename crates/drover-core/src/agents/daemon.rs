use crate::agents::{Agent, Outcome};
use crate::containers::{ContainerStatus, Containers};
use crate::error::{DroverError, Result};
use crate::profile::Profile;
use crate::store::Talks;
use crate::talk::{Stage, Verdict};
use chrono::Utc;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// StartsDaemon
// ---------------------------------------------------------------------------

/// Prepared → Running: hand the built invocation to the container runtime.
/// A launch failure becomes a failed verdict on the talk, not a process
/// error.
pub struct StartsDaemon {
    containers: Arc<dyn Containers>,
}

impl StartsDaemon {
    pub fn new(containers: Arc<dyn Containers>) -> Self {
        Self { containers }
    }
}

impl Agent for StartsDaemon {
    fn name(&self) -> &'static str {
        "starts-daemon"
    }

    fn execute(&self, talks: &dyn Talks, name: &str, _profile: &Profile) -> Result<Outcome> {
        let talk = talks.get(name)?;
        let (request, daemon) = match &talk.stage {
            Stage::Prepared { request, daemon } => (request.clone(), daemon.clone()),
            _ => return Ok(Outcome::Skipped),
        };
        match self.containers.launch(&talk.container_name(), &daemon) {
            Ok(handle) => {
                tracing::info!(talk = %name, container = %handle, image = %daemon.image, "container launched");
                talks.update(name, &|t| {
                    let mut daemon = daemon.clone();
                    daemon.container = Some(handle.clone());
                    daemon.started = Some(Utc::now());
                    t.advance(Stage::Running {
                        request: request.clone(),
                        daemon,
                    });
                    Ok(())
                })?;
            }
            Err(DroverError::Runtime(reason)) => {
                let verdict = Verdict::aborted(format!("container launch failed: {reason}"));
                talks.update(name, &|t| {
                    t.advance(Stage::Ended {
                        request: request.clone(),
                        verdict: verdict.clone(),
                    });
                    Ok(())
                })?;
            }
            Err(other) => return Err(other),
        }
        Ok(Outcome::Applied)
    }
}

// ---------------------------------------------------------------------------
// EndsDaemon
// ---------------------------------------------------------------------------

/// Running → Ended once the container has exited; a still-running container
/// is revisited next pass.
pub struct EndsDaemon {
    containers: Arc<dyn Containers>,
}

impl EndsDaemon {
    pub fn new(containers: Arc<dyn Containers>) -> Self {
        Self { containers }
    }
}

impl Agent for EndsDaemon {
    fn name(&self) -> &'static str {
        "ends-daemon"
    }

    fn execute(&self, talks: &dyn Talks, name: &str, _profile: &Profile) -> Result<Outcome> {
        let talk = talks.get(name)?;
        let (request, daemon) = match &talk.stage {
            Stage::Running { request, daemon } => (request.clone(), daemon.clone()),
            _ => return Ok(Outcome::Skipped),
        };
        let Some(handle) = daemon.container else {
            return Ok(Outcome::Failed(
                "running daemon has no container handle".into(),
            ));
        };
        // A failing status probe may be transient; surface it and retry on
        // the next pass rather than condemning the talk.
        match self.containers.status(&handle)? {
            ContainerStatus::Running => Ok(Outcome::Skipped),
            ContainerStatus::Exited(code) => {
                let tail = self.containers.tail(&handle).unwrap_or_else(|e| {
                    tracing::warn!(talk = %name, container = %handle, error = %e, "could not read logs");
                    String::new()
                });
                let verdict = Verdict::exited(code, tail);
                tracing::info!(talk = %name, code, success = verdict.success, "container exited");
                talks.update(name, &|t| {
                    t.advance(Stage::Ended {
                        request: request.clone(),
                        verdict: verdict.clone(),
                    });
                    Ok(())
                })?;
                Ok(Outcome::Applied)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
