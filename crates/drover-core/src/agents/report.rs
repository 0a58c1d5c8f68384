use crate::agents::{Agent, Outcome};
use crate::error::Result;
use crate::notify::Notifier;
use crate::profile::Profile;
use crate::store::Talks;
use crate::talk::Stage;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Ended → Reported: deliver the verdict. Delivery is fire-and-forget; a
/// failing notifier is logged and the talk still reaches its terminal stage.
pub struct Reports {
    notifier: Arc<dyn Notifier>,
}

impl Reports {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

impl Agent for Reports {
    fn name(&self) -> &'static str {
        "reports"
    }

    fn execute(&self, talks: &dyn Talks, name: &str, _profile: &Profile) -> Result<Outcome> {
        let talk = talks.get(name)?;
        let verdict = match &talk.stage {
            Stage::Ended { verdict, .. } => verdict.clone(),
            _ => return Ok(Outcome::Skipped),
        };
        if let Err(e) = self.notifier.notify(&talk, &verdict) {
            tracing::warn!(talk = %name, error = %e, "verdict delivery failed");
        }
        talks.update(name, &|t| {
            t.advance(Stage::Reported {
                verdict: verdict.clone(),
            });
            Ok(())
        })?;
        Ok(Outcome::Applied)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use crate::store::MemoryTalks;
    use crate::talk::{ReqKind, Request, Verdict};

    #[test]
    fn delivers_and_reaches_terminal_stage() {
        let request = Request::new("acme/widget", 1, ReqKind::Merge, "jeff");
        let talks = MemoryTalks::new();
        talks.create("acme/widget#1", request.clone()).unwrap();
        talks
            .update("acme/widget#1", &|t| {
                t.advance(Stage::Ended {
                    request: request.clone(),
                    verdict: Verdict::exited(0, "done"),
                });
                Ok(())
            })
            .unwrap();

        let notifier = Arc::new(MemoryNotifier::new());
        let agent = Reports::new(Arc::clone(&notifier) as Arc<dyn Notifier>);
        let profile = Profile::parse("{}").unwrap();
        assert_eq!(
            agent.execute(&talks, "acme/widget#1", &profile).unwrap(),
            Outcome::Applied
        );
        assert!(talks.get("acme/widget#1").unwrap().stage.is_terminal());
        assert_eq!(notifier.seen(), vec![("acme/widget#1".to_string(), true)]);
    }

    #[test]
    fn skips_non_ended_talks() {
        let talks = MemoryTalks::new();
        talks
            .create(
                "acme/widget#1",
                Request::new("acme/widget", 1, ReqKind::Merge, "jeff"),
            )
            .unwrap();
        let agent = Reports::new(Arc::new(MemoryNotifier::new()));
        let profile = Profile::parse("{}").unwrap();
        assert_eq!(
            agent.execute(&talks, "acme/widget#1", &profile).unwrap(),
            Outcome::Skipped
        );
    }
}
