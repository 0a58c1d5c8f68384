use crate::agents::SuperAgent;
use crate::error::Result;
use crate::queue::Queue;
use crate::store::Talks;
use crate::talk::Stage;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// StartsTalks
// ---------------------------------------------------------------------------

/// Starter phase: drains the request queue into the talk store.
///
/// Idempotent by construction — a request whose talk already exists and is
/// active is a duplicate and only gets consumed; an inactive talk with the
/// same name is revived with the new request.
pub struct StartsTalks {
    queue: Arc<dyn Queue>,
}

impl StartsTalks {
    pub fn new(queue: Arc<dyn Queue>) -> Self {
        Self { queue }
    }
}

impl SuperAgent for StartsTalks {
    fn execute(&self, talks: &dyn Talks) -> Result<usize> {
        let mut started = 0;
        for request in self.queue.pending()? {
            let name = request.talk_name();
            let id = request.id;
            let accepted = if talks.exists(&name)? {
                let talk = talks.get(&name)?;
                if talk.active {
                    tracing::debug!(talk = %name, "request is already tracked");
                    Ok(false)
                } else {
                    talks
                        .update(&name, &|t| {
                            t.active = true;
                            t.advance(Stage::Requested {
                                request: request.clone(),
                            });
                            Ok(())
                        })
                        .map(|_| true)
                }
            } else {
                talks.create(&name, request.clone()).map(|_| true)
            };
            // A request that could not be stored stays queued for the next
            // pass; everything else is acknowledged.
            match accepted {
                Ok(created) => {
                    if created {
                        tracing::info!(talk = %name, kind = %request.kind, "talk started");
                        started += 1;
                    }
                    self.queue.ack(id)?;
                }
                Err(e) => {
                    tracing::warn!(talk = %name, error = %e, "request left queued");
                }
            }
        }
        Ok(started)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueue;
    use crate::store::MemoryTalks;
    use crate::talk::{ReqKind, Request, Verdict};

    fn fixture() -> (Arc<MemoryQueue>, MemoryTalks, StartsTalks) {
        let queue = Arc::new(MemoryQueue::new());
        let talks = MemoryTalks::new();
        let starter = StartsTalks::new(Arc::clone(&queue) as Arc<dyn Queue>);
        (queue, talks, starter)
    }

    #[test]
    fn creates_a_talk_per_request() {
        let (queue, talks, starter) = fixture();
        queue
            .push(Request::new("acme/widget", 1, ReqKind::Merge, "jeff"))
            .unwrap();
        assert_eq!(starter.execute(&talks).unwrap(), 1);
        assert_eq!(talks.active().unwrap(), vec!["acme/widget#1"]);
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn running_twice_never_duplicates() {
        let (queue, talks, starter) = fixture();
        queue
            .push(Request::new("acme/widget", 1, ReqKind::Merge, "jeff"))
            .unwrap();
        starter.execute(&talks).unwrap();
        // Same coordinates arrive again before the first talk finished.
        queue
            .push(Request::new("acme/widget", 1, ReqKind::Merge, "jeff"))
            .unwrap();
        assert_eq!(starter.execute(&talks).unwrap(), 0);
        assert_eq!(talks.active().unwrap().len(), 1);
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn revives_an_inactive_talk() {
        let (queue, talks, starter) = fixture();
        queue
            .push(Request::new("acme/widget", 1, ReqKind::Merge, "jeff"))
            .unwrap();
        starter.execute(&talks).unwrap();
        talks
            .update("acme/widget#1", &|t| {
                t.advance(Stage::Reported {
                    verdict: Verdict::exited(0, ""),
                });
                t.deactivate();
                Ok(())
            })
            .unwrap();

        queue
            .push(Request::new("acme/widget", 1, ReqKind::Deploy, "jeff"))
            .unwrap();
        assert_eq!(starter.execute(&talks).unwrap(), 1);
        let talk = talks.get("acme/widget#1").unwrap();
        assert!(talk.active);
        assert_eq!(talk.stage.marker(), "requested");
    }
}
