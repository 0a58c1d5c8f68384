use anyhow::Context;
use drover_core::profile::Profiles;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// RuntimeKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    #[default]
    Docker,
    /// In-memory stand-in: containers "run" and exit successfully at once.
    /// For local smoke tests of the pipeline, not for real builds.
    Memory,
}

// ---------------------------------------------------------------------------
// DaemonConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_ticks_capacity")]
    pub ticks_capacity: usize,
    /// Shared secret for the admin surface; unset disables it.
    #[serde(default)]
    pub admin_token: Option<String>,
    /// Shared defaults merged under every project profile.
    #[serde(default)]
    pub defaults_profile: Option<PathBuf>,
    /// Directory of per-project override profiles.
    #[serde(default)]
    pub profiles_dir: Option<PathBuf>,
    /// Directory for talk records; unset keeps talks in memory.
    #[serde(default)]
    pub talks_dir: Option<PathBuf>,
    #[serde(default)]
    pub runtime: RuntimeKind,
    #[serde(default = "default_image")]
    pub default_image: String,
}

fn default_interval() -> u64 {
    60
}

fn default_backoff() -> u64 {
    5
}

fn default_listen() -> String {
    "0.0.0.0:3141".to_string()
}

fn default_ticks_capacity() -> usize {
    120
}

fn default_image() -> String {
    drover_core::agents::DEFAULT_IMAGE.to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            backoff_secs: default_backoff(),
            listen: default_listen(),
            ticks_capacity: default_ticks_capacity(),
            admin_token: None,
            defaults_profile: None,
            profiles_dir: None,
            talks_dir: None,
            runtime: RuntimeKind::default(),
            default_image: default_image(),
        }
    }
}

impl DaemonConfig {
    /// Load from a YAML file; a missing file means all defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    /// Build the profile resolver from the configured defaults document and
    /// overrides directory.
    pub fn profiles(&self) -> anyhow::Result<Profiles> {
        let defaults = match &self.defaults_profile {
            Some(path) => {
                let data = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_yaml::from_str(&data)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
            None => serde_yaml::Value::Null,
        };
        Ok(match &self.profiles_dir {
            Some(dir) => Profiles::with_dir(defaults, dir),
            None => Profiles::new(defaults),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_means_defaults() {
        let config = DaemonConfig::load(Path::new("/nonexistent/drover.yaml")).unwrap();
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.listen, "0.0.0.0:3141");
        assert_eq!(config.runtime, RuntimeKind::Docker);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drover.yaml");
        std::fs::write(&path, "interval_secs: 5\nruntime: memory\n").unwrap();
        let config = DaemonConfig::load(&path).unwrap();
        assert_eq!(config.interval_secs, 5);
        assert_eq!(config.runtime, RuntimeKind::Memory);
        assert_eq!(config.ticks_capacity, 120);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drover.yaml");
        std::fs::write(&path, "{not yaml").unwrap();
        assert!(DaemonConfig::load(&path).is_err());
    }

    #[test]
    fn profiles_use_the_defaults_document() {
        let dir = TempDir::new().unwrap();
        let defaults = dir.path().join("defaults.yaml");
        std::fs::write(&defaults, "merge:\n  script: make\n").unwrap();
        let config = DaemonConfig {
            defaults_profile: Some(defaults),
            ..DaemonConfig::default()
        };
        let profiles = config.profiles().unwrap();
        let profile = profiles.fetch("acme/widget").unwrap();
        assert!(profile.node(&["merge"]).is_some());
    }
}
