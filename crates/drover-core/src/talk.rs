use crate::error::DroverError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ReqKind
// ---------------------------------------------------------------------------

/// What a build request asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReqKind {
    Merge,
    Deploy,
    Release,
}

impl ReqKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReqKind::Merge => "merge",
            ReqKind::Deploy => "deploy",
            ReqKind::Release => "release",
        }
    }
}

impl fmt::Display for ReqKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReqKind {
    type Err = DroverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(ReqKind::Merge),
            "deploy" => Ok(ReqKind::Deploy),
            "release" => Ok(ReqKind::Release),
            _ => Err(DroverError::InvalidKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A queued build request, before and after it becomes a talk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    /// Project coordinates, e.g. "acme/widget".
    pub project: String,
    /// Issue or pull-request number the request refers to.
    pub issue: u64,
    pub kind: ReqKind,
    /// Free-form arguments, passed into the container environment.
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    pub author: String,
}

impl Request {
    pub fn new(
        project: impl Into<String>,
        issue: u64,
        kind: ReqKind,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project: project.into(),
            issue,
            kind,
            args: BTreeMap::new(),
            author: author.into(),
        }
    }

    /// The unique talk name this request maps to.
    pub fn talk_name(&self) -> String {
        format!("{}#{}", self.project, self.issue)
    }
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// A built container invocation and, once launched, its runtime handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Daemon {
    pub image: String,
    /// Rendered env-var group, e.g. `( '--env=A=5' )`.
    pub envs: String,
    /// Rendered script group, e.g. `( 'make' ';' )`.
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Final outcome of one talk's container run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub success: bool,
    pub code: i64,
    /// Last lines of container output, best effort.
    pub tail: String,
    pub finished: DateTime<Utc>,
}

impl Verdict {
    pub fn exited(code: i64, tail: impl Into<String>) -> Self {
        Self {
            success: code == 0,
            code,
            tail: tail.into(),
            finished: Utc::now(),
        }
    }

    /// A failure that never reached the container (bad profile, launch error).
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            code: -1,
            tail: reason.into(),
            finished: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Lifecycle stage of a talk. Exactly one stage holds at any time, and each
/// agent matches exactly one of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// Accepted from the queue, nothing built yet.
    Requested { request: Request },
    /// Container invocation built from the profile, not launched.
    Prepared { request: Request, daemon: Daemon },
    /// Container launched and possibly still running.
    Running { request: Request, daemon: Daemon },
    /// Container exited (or the run was aborted before launch).
    Ended { request: Request, verdict: Verdict },
    /// Outcome delivered; terminal.
    Reported { verdict: Verdict },
}

impl Stage {
    pub fn marker(&self) -> &'static str {
        match self {
            Stage::Requested { .. } => "requested",
            Stage::Prepared { .. } => "prepared",
            Stage::Running { .. } => "running",
            Stage::Ended { .. } => "ended",
            Stage::Reported { .. } => "reported",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Reported { .. })
    }
}

// ---------------------------------------------------------------------------
// Talk
// ---------------------------------------------------------------------------

/// One build/release instance, owned by the talk store and mutated only
/// through its atomic update operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Talk {
    /// Unique immutable name, e.g. "acme/widget#42".
    pub name: String,
    /// Store-assigned sequence number.
    pub number: u64,
    /// Project coordinates the talk belongs to.
    pub project: String,
    pub active: bool,
    pub stage: Stage,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Talk {
    pub fn new(name: impl Into<String>, number: u64, request: Request) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            number,
            project: request.project.clone(),
            active: true,
            stage: Stage::Requested { request },
            created: now,
            updated: now,
        }
    }

    pub fn advance(&mut self, stage: Stage) {
        self.stage = stage;
        self.updated = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated = Utc::now();
    }

    /// Talk name reduced to a container-safe identifier.
    pub fn container_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                out.push(c);
            } else {
                out.push('-');
            }
        }
        format!("drover-{out}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
