//! Container runtime seam.
//!
//! The engine's responsibility ends at producing the invocation: the rendered
//! env and script groups plus an image. `Containers` is the hand-off point.
//! `DockerContainers` drives the docker CLI; `MemoryContainers` is the
//! in-memory stand-in for tests and the `memory` daemon mode.

use crate::docker::escaped;
use crate::error::{DroverError, Result};
use crate::talk::Daemon;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Exited(i64),
}

pub trait Containers: Send + Sync {
    /// Launch a detached container for the daemon; returns a runtime handle.
    fn launch(&self, name: &str, daemon: &Daemon) -> Result<String>;

    fn status(&self, handle: &str) -> Result<ContainerStatus>;

    /// Last lines of container output, best effort.
    fn tail(&self, handle: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// DockerContainers
// ---------------------------------------------------------------------------

/// Docker CLI adapter. The env and script groups are spliced into the launch
/// command as bash array literals, which is what their quoting is for.
pub struct DockerContainers {
    docker: String,
}

impl DockerContainers {
    pub fn new() -> Self {
        Self {
            docker: "docker".to_string(),
        }
    }

    pub fn with_binary(docker: impl Into<String>) -> Self {
        Self {
            docker: docker.into(),
        }
    }

    fn bash(&self, script: &str) -> Result<String> {
        let output = Command::new("/bin/bash")
            .arg("-c")
            .arg(script)
            .output()
            .map_err(|e| DroverError::Runtime(format!("failed to spawn bash: {e}")))?;
        if !output.status.success() {
            let hint: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(500)
                .collect();
            return Err(DroverError::Runtime(hint));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for DockerContainers {
    fn default() -> Self {
        Self::new()
    }
}

impl Containers for DockerContainers {
    fn launch(&self, name: &str, daemon: &Daemon) -> Result<String> {
        let script = format!(
            "set -e\nenvs={envs}\nscripts={script}\n{docker} run --detach --name={name} \
             \"${{envs[@]}}\" {image} /bin/bash -c \"${{scripts[*]}}\"",
            envs = daemon.envs,
            script = daemon.script,
            docker = self.docker,
            name = name,
            image = escaped(&daemon.image),
        );
        self.bash(&script)
    }

    fn status(&self, handle: &str) -> Result<ContainerStatus> {
        let out = self.bash(&format!(
            "{} inspect --format '{{{{.State.Running}}}}:{{{{.State.ExitCode}}}}' {}",
            self.docker,
            escaped(handle),
        ))?;
        match out.split_once(':') {
            Some(("true", _)) => Ok(ContainerStatus::Running),
            Some(("false", code)) => {
                let code: i64 = code
                    .trim()
                    .parse()
                    .map_err(|_| DroverError::Runtime(format!("bad exit code '{out}'")))?;
                Ok(ContainerStatus::Exited(code))
            }
            _ => Err(DroverError::Runtime(format!("bad inspect output '{out}'"))),
        }
    }

    fn tail(&self, handle: &str) -> Result<String> {
        self.bash(&format!(
            "{} logs --tail=100 {} 2>&1",
            self.docker,
            escaped(handle)
        ))
    }
}

// ---------------------------------------------------------------------------
// MemoryContainers
// ---------------------------------------------------------------------------

pub struct MemoryContainers {
    exit: Option<i64>,
    refuse: Option<String>,
    seq: AtomicU64,
    launched: Mutex<Vec<(String, String)>>,
}

impl MemoryContainers {
    /// Every container exits immediately with code 0.
    pub fn new() -> Self {
        Self::exiting(0)
    }

    pub fn exiting(code: i64) -> Self {
        Self {
            exit: Some(code),
            refuse: None,
            seq: AtomicU64::new(0),
            launched: Mutex::new(Vec::new()),
        }
    }

    /// Containers launch but never exit.
    pub fn busy() -> Self {
        Self {
            exit: None,
            refuse: None,
            seq: AtomicU64::new(0),
            launched: Mutex::new(Vec::new()),
        }
    }

    /// Every launch fails with the given reason.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            exit: Some(0),
            refuse: Some(reason.into()),
            seq: AtomicU64::new(0),
            launched: Mutex::new(Vec::new()),
        }
    }

    /// `(handle, container name)` pairs, in launch order.
    pub fn launched(&self) -> Vec<(String, String)> {
        self.launched.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl Default for MemoryContainers {
    fn default() -> Self {
        Self::new()
    }
}

impl Containers for MemoryContainers {
    fn launch(&self, name: &str, _daemon: &Daemon) -> Result<String> {
        if let Some(reason) = &self.refuse {
            return Err(DroverError::Runtime(reason.clone()));
        }
        let handle = format!("mem-{}", self.seq.fetch_add(1, Ordering::SeqCst));
        self.launched
            .lock()
            .map_err(|_| DroverError::Storage("container log lock poisoned".into()))?
            .push((handle.clone(), name.to_string()));
        Ok(handle)
    }

    fn status(&self, _handle: &str) -> Result<ContainerStatus> {
        match self.exit {
            Some(code) => Ok(ContainerStatus::Exited(code)),
            None => Ok(ContainerStatus::Running),
        }
    }

    fn tail(&self, handle: &str) -> Result<String> {
        match self.exit {
            Some(code) => Ok(format!("{handle} exited with code {code}")),
            None => Ok(String::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
