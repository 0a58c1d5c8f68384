use crate::agents::{Agent, Outcome};
use crate::docker::{self, DockerRun};
use crate::error::Result;
use crate::profile::Profile;
use crate::store::Talks;
use crate::talk::{Daemon, Stage, Verdict};

// ---------------------------------------------------------------------------
// StartsRequest
// ---------------------------------------------------------------------------

/// Requested → Prepared: pre-flight the profile and build the container
/// invocation. A profile that cannot run this kind of request produces a
/// failed verdict on the talk itself, never a process error.
pub struct StartsRequest {
    default_image: String,
}

impl StartsRequest {
    pub fn new(default_image: impl Into<String>) -> Self {
        Self {
            default_image: default_image.into(),
        }
    }
}

impl Agent for StartsRequest {
    fn name(&self) -> &'static str {
        "starts-request"
    }

    fn execute(&self, talks: &dyn Talks, name: &str, profile: &Profile) -> Result<Outcome> {
        let talk = talks.get(name)?;
        let request = match &talk.stage {
            Stage::Requested { request } => request.clone(),
            _ => return Ok(Outcome::Skipped),
        };
        let kind = request.kind.as_str();

        if profile.node(&[kind]).is_none() {
            let verdict = Verdict::aborted(format!("profile has no '{kind}' section"));
            talks.update(name, &|t| {
                t.advance(Stage::Ended {
                    request: request.clone(),
                    verdict: verdict.clone(),
                });
                Ok(())
            })?;
            return Ok(Outcome::Applied);
        }

        let run = DockerRun::new(profile, &[kind]);
        let mut extra = vec![
            ("DROVER_PROJECT".to_string(), request.project.clone()),
            ("DROVER_TALK".to_string(), name.to_string()),
            ("DROVER_KIND".to_string(), kind.to_string()),
            ("DROVER_AUTHOR".to_string(), request.author.clone()),
        ];
        for (key, value) in &request.args {
            extra.push((key.clone(), value.clone()));
        }
        let envs = run.envs(&extra)?;
        let script = run.script()?;

        if script == docker::EMPTY_GROUP {
            let verdict = Verdict::aborted(format!("no script configured for '{kind}'"));
            talks.update(name, &|t| {
                t.advance(Stage::Ended {
                    request: request.clone(),
                    verdict: verdict.clone(),
                });
                Ok(())
            })?;
            return Ok(Outcome::Applied);
        }

        let image = profile
            .lookup(&[kind], "image")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.default_image)
            .to_string();
        let daemon = Daemon {
            image,
            envs,
            script,
            container: None,
            started: None,
        };
        talks.update(name, &|t| {
            t.advance(Stage::Prepared {
                request: request.clone(),
                daemon: daemon.clone(),
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
    use crate::store::MemoryTalks;
    use crate::talk::{ReqKind, Request};

    fn talks_with(request: Request) -> MemoryTalks {
        let talks = MemoryTalks::new();
        talks.create(&request.talk_name(), request).unwrap();
        talks
    }

    fn agent() -> StartsRequest {
        StartsRequest::new("ubuntu:24.04")
    }

    #[test]
    fn builds_the_daemon_from_the_profile() {
        let talks = talks_with(Request::new("acme/widget", 1, ReqKind::Merge, "jeff"));
        let profile =
            Profile::parse("merge:\n  image: alpine\n  script: make test\n  env: CI=true\n")
                .unwrap();
        let outcome = agent()
            .execute(&talks, "acme/widget#1", &profile)
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);

        let talk = talks.get("acme/widget#1").unwrap();
        match &talk.stage {
            Stage::Prepared { daemon, .. } => {
                assert_eq!(daemon.image, "alpine");
                assert_eq!(daemon.script, "( 'make test' )");
                assert!(daemon.envs.contains("'--env=CI=true'"));
                assert!(daemon.envs.contains("'--env=DROVER_PROJECT=acme/widget'"));
                assert!(daemon.envs.contains("'--env=DROVER_KIND=merge'"));
            }
            other => panic!("expected prepared, got {}", other.marker()),
        }
    }

    #[test]
    fn skips_talks_in_other_stages() {
        let talks = talks_with(Request::new("acme/widget", 1, ReqKind::Merge, "jeff"));
        let profile = Profile::parse("merge:\n  script: make\n").unwrap();
        agent().execute(&talks, "acme/widget#1", &profile).unwrap();
        // Second run: the talk is Prepared now.
        let outcome = agent()
            .execute(&talks, "acme/widget#1", &profile)
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
    }

    #[test]
    fn missing_kind_section_fails_the_talk() {
        let talks = talks_with(Request::new("acme/widget", 1, ReqKind::Release, "jeff"));
        let profile = Profile::parse("merge:\n  script: make\n").unwrap();
        agent().execute(&talks, "acme/widget#1", &profile).unwrap();
        let talk = talks.get("acme/widget#1").unwrap();
        match &talk.stage {
            Stage::Ended { verdict, .. } => {
                assert!(!verdict.success);
                assert!(verdict.tail.contains("release"));
            }
            other => panic!("expected ended, got {}", other.marker()),
        }
    }

    #[test]
    fn missing_script_fails_the_talk() {
        let talks = talks_with(Request::new("acme/widget", 1, ReqKind::Merge, "jeff"));
        let profile = Profile::parse("merge:\n  env: CI=true\n").unwrap();
        agent().execute(&talks, "acme/widget#1", &profile).unwrap();
        let talk = talks.get("acme/widget#1").unwrap();
        match &talk.stage {
            Stage::Ended { verdict, .. } => assert!(verdict.tail.contains("no script")),
            other => panic!("expected ended, got {}", other.marker()),
        }
    }

    #[test]
    fn request_args_reach_the_environment() {
        let mut request = Request::new("acme/widget", 1, ReqKind::Deploy, "jeff");
        request
            .args
            .insert("DROVER_TAG".to_string(), "v1.2".to_string());
        let talks = talks_with(request);
        let profile = Profile::parse("deploy:\n  script: ship\n").unwrap();
        agent().execute(&talks, "acme/widget#1", &profile).unwrap();
        let talk = talks.get("acme/widget#1").unwrap();
        match &talk.stage {
            Stage::Prepared { daemon, .. } => {
                assert!(daemon.envs.contains("'--env=DROVER_TAG=v1.2'"));
            }
            other => panic!("expected prepared, got {}", other.marker()),
        }
    }

    #[test]
    fn root_image_applies_through_ancestor_fallback() {
        let talks = talks_with(Request::new("acme/widget", 1, ReqKind::Merge, "jeff"));
        let profile = Profile::parse("image: fedora\nmerge:\n  script: make\n").unwrap();
        agent().execute(&talks, "acme/widget#1", &profile).unwrap();
        match &talks.get("acme/widget#1").unwrap().stage {
            Stage::Prepared { daemon, .. } => assert_eq!(daemon.image, "fedora"),
            other => panic!("expected prepared, got {}", other.marker()),
        }
    }
}
