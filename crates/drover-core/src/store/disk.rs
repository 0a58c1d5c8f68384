use crate::error::{DroverError, Result};
use crate::io;
use crate::store::Talks;
use crate::talk::{Request, Talk};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// DiskTalks
// ---------------------------------------------------------------------------

/// Talk store keeping one YAML file per talk under a root directory.
///
/// All writes go through `io::atomic_write`, so a crash mid-update leaves
/// either the previous or the next version of a record on disk. A single
/// process-wide mutex serialises writers; this matches the single-writer
/// scheduling model, and the atomic rename keeps concurrent readers safe.
pub struct DiskTalks {
    root: PathBuf,
    write: Mutex<()>,
}

impl DiskTalks {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        io::ensure_dir(&root)?;
        Ok(Self {
            root,
            write: Mutex::new(()),
        })
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.write
            .lock()
            .map_err(|_| DroverError::Storage("talk store lock poisoned".into()))
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.yaml", name.replace('/', "__")))
    }

    fn read(path: &Path) -> Result<Talk> {
        let data = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&data)
            .map_err(|e| DroverError::Storage(format!("invalid talk record {}: {e}", path.display())))
    }

    fn write_record(path: &Path, talk: &Talk) -> Result<()> {
        let data = serde_yaml::to_string(talk)?;
        io::atomic_write(path, data.as_bytes())
    }

    /// Every record on disk, unsorted. Unreadable files are skipped with a
    /// warning so one corrupt record cannot block unrelated talks.
    fn scan(&self) -> Result<Vec<Talk>> {
        let mut talks = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().map_or(true, |e| e != "yaml") {
                continue;
            }
            match Self::read(&path) {
                Ok(talk) => talks.push(talk),
                Err(e) => tracing::warn!(file = %path.display(), error = %e, "skipping talk record"),
            }
        }
        Ok(talks)
    }
}

impl Talks for DiskTalks {
    fn active(&self) -> Result<Vec<String>> {
        let mut talks: Vec<Talk> = self.scan()?.into_iter().filter(|t| t.active).collect();
        talks.sort_by_key(|t| t.number);
        Ok(talks.into_iter().map(|t| t.name).collect())
    }

    fn get(&self, name: &str) -> Result<Talk> {
        let path = self.path(name);
        if !path.exists() {
            return Err(DroverError::TalkNotFound(name.to_string()));
        }
        Self::read(&path)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path(name).exists())
    }

    fn create(&self, name: &str, request: Request) -> Result<Talk> {
        let _guard = self.guard()?;
        let path = self.path(name);
        if path.exists() {
            return Err(DroverError::TalkExists(name.to_string()));
        }
        let number = self.scan()?.iter().map(|t| t.number).max().unwrap_or(0) + 1;
        let talk = Talk::new(name, number, request);
        Self::write_record(&path, &talk)?;
        Ok(talk)
    }

    fn update(&self, name: &str, apply: &dyn Fn(&mut Talk) -> Result<()>) -> Result<Talk> {
        let _guard = self.guard()?;
        let path = self.path(name);
        if !path.exists() {
            return Err(DroverError::TalkNotFound(name.to_string()));
        }
        let mut next = Self::read(&path)?;
        apply(&mut next)?;
        Self::write_record(&path, &next)?;
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::talk::{ReqKind, Stage, Verdict};
    use tempfile::TempDir;

    fn request(project: &str, issue: u64) -> Request {
        Request::new(project, issue, ReqKind::Deploy, "jeff")
    }

    #[test]
    fn create_and_reload() {
        let dir = TempDir::new().unwrap();
        let talks = DiskTalks::open(dir.path()).unwrap();
        talks.create("acme/widget#7", request("acme/widget", 7)).unwrap();

        let reopened = DiskTalks::open(dir.path()).unwrap();
        let talk = reopened.get("acme/widget#7").unwrap();
        assert_eq!(talk.project, "acme/widget");
        assert!(talk.active);
    }

    #[test]
    fn numbers_continue_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let talks = DiskTalks::open(dir.path()).unwrap();
            talks.create("a#1", request("a", 1)).unwrap();
        }
        let talks = DiskTalks::open(dir.path()).unwrap();
        let second = talks.create("a#2", request("a", 2)).unwrap();
        assert_eq!(second.number, 2);
    }

    #[test]
    fn update_survives_closure_error() {
        let dir = TempDir::new().unwrap();
        let talks = DiskTalks::open(dir.path()).unwrap();
        talks.create("a#1", request("a", 1)).unwrap();
        let result = talks.update("a#1", &|t| {
            t.advance(Stage::Reported {
                verdict: Verdict::exited(0, ""),
            });
            Err(DroverError::Storage("midway".into()))
        });
        assert!(result.is_err());
        assert_eq!(talks.get("a#1").unwrap().stage.marker(), "requested");
    }

    #[test]
    fn corrupt_record_does_not_block_listing() {
        let dir = TempDir::new().unwrap();
        let talks = DiskTalks::open(dir.path()).unwrap();
        talks.create("a#1", request("a", 1)).unwrap();
        std::fs::write(dir.path().join("b__c#2.yaml"), "{not yaml").unwrap();
        assert_eq!(talks.active().unwrap(), vec!["a#1"]);
    }

    #[test]
    fn missing_talk_is_not_found() {
        let dir = TempDir::new().unwrap();
        let talks = DiskTalks::open(dir.path()).unwrap();
        assert!(matches!(
            talks.get("ghost#1"),
            Err(DroverError::TalkNotFound(_))
        ));
    }
}
