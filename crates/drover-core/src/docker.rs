//! Container invocation builder.
//!
//! Turns a resolved profile subtree into two shell-safe groups: an env-var
//! argument group and a concatenated script group. Both are rendered as
//! space-joined, single-quoted tokens inside `( ... )` so they can be spliced
//! into a launch script as bash array literals. The quoting is the security
//! boundary: profile content is user-controlled, and every token must survive
//! a POSIX shell byte-for-byte.

use crate::error::{DroverError, Result};
use crate::profile::Profile;
use serde_yaml::Value;

// ---------------------------------------------------------------------------
// DockerRun
// ---------------------------------------------------------------------------

/// Rendering of a group with no tokens.
pub const EMPTY_GROUP: &str = "(  )";

pub struct DockerRun<'a> {
    profile: &'a Profile,
    path: Vec<String>,
}

impl<'a> DockerRun<'a> {
    pub fn new(profile: &'a Profile, path: &[&str]) -> Self {
        Self {
            profile,
            path: path.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Env-var argument group. Entries at the base path win over the nearest
    /// ancestor `env` node and the root-level default; `extra` pairs win over
    /// everything. Render order is first-insertion document order, never
    /// sorted.
    pub fn envs(&self, extra: &[(String, String)]) -> Result<String> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for layer in self.layers("env") {
            for (key, value) in env_entries(layer)? {
                put(&mut pairs, key, value);
            }
        }
        for (key, value) in extra {
            put(&mut pairs, key.clone(), value.clone());
        }
        let tokens: Vec<String> = pairs
            .iter()
            .map(|(k, v)| escaped(&format!("--env={k}={v}")))
            .collect();
        Ok(group(&tokens))
    }

    /// Script group: root-level `install` items, each followed by a `';'`
    /// token, then the base path's `script` node. A single-string script is
    /// one token with no `';'`; list items each get one.
    pub fn script(&self) -> Result<String> {
        let mut tokens = Vec::new();
        if let Some(install) = self.profile.node(&[]).and_then(|n| n.get("install")) {
            for item in script_items(install)? {
                tokens.push(escaped(&item));
                tokens.push(escaped(";"));
            }
        }
        match self.leaf("script") {
            None => {}
            Some(Value::String(line)) => tokens.push(escaped(line.trim())),
            Some(Value::Sequence(items)) => {
                for item in items {
                    let line = item.as_str().ok_or_else(|| {
                        DroverError::Profile("script items must be strings".into())
                    })?;
                    tokens.push(escaped(line.trim()));
                    tokens.push(escaped(";"));
                }
            }
            Some(_) => {
                return Err(DroverError::Profile(
                    "script must be a string or a list".into(),
                ))
            }
        }
        Ok(group(&tokens))
    }

    fn segments(&self) -> Vec<&str> {
        self.path.iter().map(String::as_str).collect()
    }

    fn leaf(&self, key: &str) -> Option<&Value> {
        self.profile
            .node(&self.segments())
            .and_then(|n| n.get(key))
    }

    /// Fallback layers for `key`, lowest priority first: the root-level
    /// default, the nearest ancestor strictly between root and leaf, then
    /// the base path itself.
    fn layers(&self, key: &str) -> Vec<&Value> {
        let segments = self.segments();
        let mut layers = Vec::new();
        if !segments.is_empty() {
            if let Some(v) = self.profile.node(&[]).and_then(|n| n.get(key)) {
                layers.push(v);
            }
            for depth in (1..segments.len()).rev() {
                if let Some(v) = self.profile.node(&segments[..depth]).and_then(|n| n.get(key)) {
                    layers.push(v);
                    break;
                }
            }
        }
        if let Some(v) = self.leaf(key) {
            layers.push(v);
        }
        layers
    }
}

// ---------------------------------------------------------------------------
// Entry parsing
// ---------------------------------------------------------------------------

fn env_entries(node: &Value) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    match node {
        Value::String(text) => {
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                entries.push(split_assignment(line)?);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                let line = item
                    .as_str()
                    .ok_or_else(|| DroverError::Profile("env items must be strings".into()))?;
                entries.push(split_assignment(line.trim())?);
            }
        }
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = k
                    .as_str()
                    .ok_or_else(|| DroverError::Profile("env keys must be strings".into()))?;
                entries.push((key.to_string(), scalar(v)?));
            }
        }
        other => {
            return Err(DroverError::Profile(format!(
                "env must be a string, list or mapping, not {}",
                type_name(other)
            )))
        }
    }
    Ok(entries)
}

fn script_items(node: &Value) -> Result<Vec<String>> {
    match node {
        Value::String(line) => Ok(vec![line.trim().to_string()]),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| DroverError::Profile("install items must be strings".into()))
            })
            .collect(),
        other => Err(DroverError::Profile(format!(
            "install must be a string or a list, not {}",
            type_name(other)
        ))),
    }
}

fn split_assignment(line: &str) -> Result<(String, String)> {
    line.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| DroverError::Profile(format!("env entry '{line}' is not KEY=VALUE")))
}

fn scalar(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(DroverError::Profile(format!(
            "env value must be a scalar, not {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Last-writer-wins per key, first-insertion position preserved.
fn put(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => pairs.push((key, value)),
    }
}

// ---------------------------------------------------------------------------
// Quoting
// ---------------------------------------------------------------------------

/// POSIX single-quote a token: close the quote, insert an escaped literal
/// quote, reopen.
pub fn escaped(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

fn group(tokens: &[String]) -> String {
    format!("( {} )", tokens.join(" "))
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

    const NO_EXTRA: &[(String, String)] = &[];

    #[test]
    fn fetches_env_vars() {
        let p = profile(
            "a:\n  env:\n    - A=5\n    - B=f e\nb:\n  env: HELLO='1'\nc:\n  env:\n    MVN: works\n",
        );
        assert_eq!(
            DockerRun::new(&p, &["a"]).envs(NO_EXTRA).unwrap(),
            "( '--env=A=5' '--env=B=f e' )"
        );
        assert_eq!(
            DockerRun::new(&p, &["b"]).envs(NO_EXTRA).unwrap(),
            "( '--env=HELLO='\\''1'\\''' )"
        );
        let extra = vec![("X".to_string(), "a\"'b".to_string())];
        assert_eq!(
            DockerRun::new(&p, &["c"]).envs(&extra).unwrap(),
            "( '--env=MVN=works' '--env=X=a\"'\\''b' )"
        );
    }

    #[test]
    fn fetches_env_var_defaults() {
        let p = profile("o:\n  env: A=123\nenv: ALPHA=909\n");
        assert_eq!(
            DockerRun::new(&p, &["o"]).envs(NO_EXTRA).unwrap(),
            "( '--env=ALPHA=909' '--env=A=123' )"
        );
    }

    #[test]
    fn leaf_env_beats_defaults_per_key() {
        let p = profile("o:\n  env: A=leaf\nenv:\n  - A=root\n  - B=kept\n");
        assert_eq!(
            DockerRun::new(&p, &["o"]).envs(NO_EXTRA).unwrap(),
            "( '--env=A=leaf' '--env=B=kept' )"
        );
    }

    #[test]
    fn extra_pairs_win_over_everything() {
        let p = profile("o:\n  env: A=leaf\n");
        let extra = vec![("A".to_string(), "forced".to_string())];
        assert_eq!(
            DockerRun::new(&p, &["o"]).envs(&extra).unwrap(),
            "( '--env=A=forced' )"
        );
    }

    #[test]
    fn nearest_ancestor_env_is_a_fallback_layer() {
        let p = profile("group:\n  env: MID=1\n  o:\n    env: LEAF=2\n");
        assert_eq!(
            DockerRun::new(&p, &["group", "o"]).envs(NO_EXTRA).unwrap(),
            "( '--env=MID=1' '--env=LEAF=2' )"
        );
    }

    #[test]
    fn fetches_script() {
        let p = profile("x:\n  script: mvn clean\ny:\n  script:\n    - pw\n    - ls\n");
        assert_eq!(
            DockerRun::new(&p, &["x"]).script().unwrap(),
            "( 'mvn clean' )"
        );
        assert_eq!(
            DockerRun::new(&p, &["y"]).script().unwrap(),
            "( 'pw' ';' 'ls' ';' )"
        );
    }

    #[test]
    fn fetches_install_script() {
        let p = profile("f:\n  script: hi\ninstall:\n  - one\n  - two\n");
        assert_eq!(
            DockerRun::new(&p, &["f"]).script().unwrap(),
            "( 'one' ';' 'two' ';' 'hi' )"
        );
    }

    #[test]
    fn fetches_from_empty_profile() {
        let p = profile("{}");
        assert_eq!(
            DockerRun::new(&p, &["absent"]).envs(NO_EXTRA).unwrap(),
            "(  )"
        );
        assert_eq!(DockerRun::new(&p, &["doesnt-exist"]).script().unwrap(), "(  )");
    }

    #[test]
    fn env_entry_without_assignment_is_rejected() {
        let p = profile("a:\n  env: NOEQUALS\n");
        assert!(matches!(
            DockerRun::new(&p, &["a"]).envs(NO_EXTRA),
            Err(DroverError::Profile(_))
        ));
    }

    #[test]
    fn mapping_script_is_rejected() {
        let p = profile("a:\n  script:\n    k: v\n");
        assert!(matches!(
            DockerRun::new(&p, &["a"]).script(),
            Err(DroverError::Profile(_))
        ));
    }

    #[test]
    fn multiline_env_string_splits_per_line() {
        let p = profile("a:\n  env: |\n    A=1\n    B=two words\n");
        assert_eq!(
            DockerRun::new(&p, &["a"]).envs(NO_EXTRA).unwrap(),
            "( '--env=A=1' '--env=B=two words' )"
        );
    }
}
