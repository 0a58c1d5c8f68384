use crate::error::{DroverError, Result};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A project's resolved, path-addressable configuration tree. Read-only once
/// resolved for a pipeline pass.
#[derive(Debug, Clone)]
pub struct Profile {
    doc: Value,
}

impl Profile {
    pub fn new(doc: Value) -> Self {
        Self { doc }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let doc: Value =
            serde_yaml::from_str(text).map_err(|e| DroverError::Profile(e.to_string()))?;
        Ok(Self::new(doc))
    }

    /// Merge a project override document over the shared defaults. Mappings
    /// merge key by key; on any other conflict the override wins.
    pub fn resolve(defaults: &Value, overrides: &Value) -> Self {
        Self::new(merge(defaults, overrides))
    }

    pub fn doc(&self) -> &Value {
        &self.doc
    }

    /// The node at `path`, or `None` when any segment is absent.
    pub fn node(&self, path: &[&str]) -> Option<&Value> {
        let mut node = &self.doc;
        for segment in path {
            node = node.get(*segment)?;
        }
        Some(node)
    }

    /// Ancestor-fallback lookup: the value of `key` at the deepest node
    /// along `path` holding it; the document root is the final fallback.
    /// Absence is `None`, never an error.
    pub fn lookup(&self, path: &[&str], key: &str) -> Option<&Value> {
        for depth in (0..=path.len()).rev() {
            let hit = self.node(&path[..depth]).and_then(|n| n.get(key));
            if hit.is_some() {
                return hit;
            }
        }
        None
    }
}

fn merge(defaults: &Value, overrides: &Value) -> Value {
    match (defaults, overrides) {
        // An empty override document parses to null; defaults stand.
        (base, Value::Null) => base.clone(),
        (Value::Mapping(base), Value::Mapping(over)) => {
            let mut out = base.clone();
            for (k, v) in over {
                match out.get(k) {
                    Some(existing) => {
                        let merged = merge(existing, v);
                        out.insert(k.clone(), merged);
                    }
                    None => {
                        out.insert(k.clone(), v.clone());
                    }
                }
            }
            Value::Mapping(out)
        }
        (_, other) => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Per-project profile resolver: shared defaults plus project overrides from
/// a directory of YAML files and an in-memory table. Fetching a remote
/// profile from source control is the job of an external collaborator that
/// fills either source.
pub struct Profiles {
    defaults: Value,
    dir: Option<PathBuf>,
    memory: Mutex<BTreeMap<String, String>>,
}

impl Profiles {
    pub fn new(defaults: Value) -> Self {
        Self {
            defaults,
            dir: None,
            memory: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_dir(defaults: Value, dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::new(defaults)
        }
    }

    fn table(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.memory
            .lock()
            .map_err(|_| DroverError::Storage("profile table lock poisoned".into()))
    }

    /// Register an override document for a project (tests, intake).
    pub fn insert(&self, project: impl Into<String>, text: impl Into<String>) -> Result<()> {
        self.table()?.insert(project.into(), text.into());
        Ok(())
    }

    fn override_text(&self, project: &str) -> Result<Option<String>> {
        if let Some(text) = self.table()?.get(project) {
            return Ok(Some(text.clone()));
        }
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{}.yaml", project.replace('/', "__")));
            if path.exists() {
                return Ok(Some(std::fs::read_to_string(path)?));
            }
        }
        Ok(None)
    }

    /// Resolve the profile for one project. A structurally invalid override
    /// document is a `Profile` error; a missing one means defaults apply.
    pub fn fetch(&self, project: &str) -> Result<Profile> {
        match self.override_text(project)? {
            Some(text) => {
                let over: Value = serde_yaml::from_str(&text).map_err(|e| {
                    DroverError::Profile(format!("override for '{project}' is unparseable: {e}"))
                })?;
                Ok(Profile::resolve(&self.defaults, &over))
            }
            None => Ok(Profile::new(self.defaults.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(text: &str) -> Profile {
        Profile::parse(text).unwrap()
    }

    #[test]
    fn node_walks_nested_mappings() {
        let p = profile("merge:\n  docker:\n    image: alpine\n");
        let docker = p.node(&["merge", "docker"]).unwrap();
        assert_eq!(docker.get("image"), Some(&Value::from("alpine")));
        assert!(p.node(&["merge", "ghost"]).is_none());
    }

    #[test]
    fn lookup_prefers_the_deepest_node() {
        let p = profile("image: outer\nmerge:\n  image: inner\n");
        assert_eq!(
            p.lookup(&["merge"], "image"),
            Some(&Value::from("inner"))
        );
    }

    #[test]
    fn lookup_falls_back_to_ancestors_and_root() {
        let p = profile("image: outer\nmerge:\n  fast: true\n");
        assert_eq!(p.lookup(&["merge"], "image"), Some(&Value::from("outer")));
        assert!(p.lookup(&["merge"], "ghost").is_none());
    }

    #[test]
    fn resolve_merges_override_over_defaults() {
        let defaults: Value = serde_yaml::from_str("image: base\nmerge:\n  script: make\n").unwrap();
        let over: Value = serde_yaml::from_str("merge:\n  script: cargo test\n").unwrap();
        let p = Profile::resolve(&defaults, &over);
        assert_eq!(p.lookup(&[], "image"), Some(&Value::from("base")));
        assert_eq!(
            p.lookup(&["merge"], "script"),
            Some(&Value::from("cargo test"))
        );
    }

    #[test]
    fn fetch_without_override_returns_defaults() {
        let defaults: Value = serde_yaml::from_str("image: base\n").unwrap();
        let profiles = Profiles::new(defaults);
        let p = profiles.fetch("acme/widget").unwrap();
        assert_eq!(p.lookup(&[], "image"), Some(&Value::from("base")));
    }

    #[test]
    fn fetch_with_registered_override() {
        let profiles = Profiles::new(serde_yaml::from_str("image: base\n").unwrap());
        profiles
            .insert("acme/widget", "merge:\n  script: make\n")
            .unwrap();
        let p = profiles.fetch("acme/widget").unwrap();
        assert_eq!(p.lookup(&["merge"], "script"), Some(&Value::from("make")));
        assert_eq!(p.lookup(&["merge"], "image"), Some(&Value::from("base")));
    }

    #[test]
    fn unparseable_override_is_a_profile_error() {
        let profiles = Profiles::new(Value::Null);
        profiles.insert("acme/widget", "{broken").unwrap();
        assert!(matches!(
            profiles.fetch("acme/widget"),
            Err(DroverError::Profile(_))
        ));
    }

    #[test]
    fn fetch_reads_override_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("acme__widget.yaml"),
            "deploy:\n  script: ship\n",
        )
        .unwrap();
        let profiles = Profiles::with_dir(Value::Null, dir.path());
        let p = profiles.fetch("acme/widget").unwrap();
        assert_eq!(p.lookup(&["deploy"], "script"), Some(&Value::from("ship")));
    }
}
