use crate::agents::SuperAgent;
use crate::error::Result;
use crate::store::Talks;

// ---------------------------------------------------------------------------
// DeactivatesTalks
// ---------------------------------------------------------------------------

/// Closer phase: archive every active talk that reached its terminal stage.
/// Records stay in the store; removal is an external concern.
#[derive(Default)]
pub struct DeactivatesTalks;

impl DeactivatesTalks {
    pub fn new() -> Self {
        Self
    }
}

impl SuperAgent for DeactivatesTalks {
    fn execute(&self, talks: &dyn Talks) -> Result<usize> {
        let mut closed = 0;
        for name in talks.active()? {
            let terminal = match talks.get(&name) {
                Ok(talk) => talk.stage.is_terminal(),
                Err(e) => {
                    tracing::warn!(talk = %name, error = %e, "closer skipped a talk");
                    continue;
                }
            };
            if !terminal {
                continue;
            }
            match talks.update(&name, &|t| {
                t.deactivate();
                Ok(())
            }) {
                Ok(_) => {
                    tracing::info!(talk = %name, "talk closed");
                    closed += 1;
                }
                Err(e) => tracing::warn!(talk = %name, error = %e, "closer skipped a talk"),
            }
        }
        Ok(closed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTalks;
    use crate::talk::{ReqKind, Request, Stage, Verdict};

    #[test]
    fn closes_only_terminal_talks() {
        let talks = MemoryTalks::new();
        talks
            .create("a#1", Request::new("a", 1, ReqKind::Merge, "jeff"))
            .unwrap();
        talks
            .create("b#2", Request::new("b", 2, ReqKind::Merge, "jeff"))
            .unwrap();
        talks
            .update("b#2", &|t| {
                t.advance(Stage::Reported {
                    verdict: Verdict::exited(0, ""),
                });
                Ok(())
            })
            .unwrap();

        let closed = DeactivatesTalks::new().execute(&talks).unwrap();
        assert_eq!(closed, 1);
        assert_eq!(talks.active().unwrap(), vec!["a#1"]);
        assert!(!talks.get("b#2").unwrap().active);
    }

    #[test]
    fn nothing_terminal_means_nothing_closed() {
        let talks = MemoryTalks::new();
        talks
            .create("a#1", Request::new("a", 1, ReqKind::Merge, "jeff"))
            .unwrap();
        assert_eq!(DeactivatesTalks::new().execute(&talks).unwrap(), 0);
        assert_eq!(talks.active().unwrap().len(), 1);
    }
}
