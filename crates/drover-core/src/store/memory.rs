use crate::error::{DroverError, Result};
use crate::store::Talks;
use crate::talk::{Request, Talk};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// MemoryTalks
// ---------------------------------------------------------------------------

/// In-memory talk store. Backs tests and the `memory` daemon mode; real
/// durability belongs to `DiskTalks` or an external persistence adapter.
#[derive(Default)]
pub struct MemoryTalks {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    seq: u64,
    talks: BTreeMap<String, Talk>,
}

impl MemoryTalks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| DroverError::Storage("talk store lock poisoned".into()))
    }
}

impl Talks for MemoryTalks {
    fn active(&self) -> Result<Vec<String>> {
        let inner = self.lock()?;
        let mut talks: Vec<&Talk> = inner.talks.values().filter(|t| t.active).collect();
        talks.sort_by_key(|t| t.number);
        Ok(talks.iter().map(|t| t.name.clone()).collect())
    }

    fn get(&self, name: &str) -> Result<Talk> {
        let inner = self.lock()?;
        inner
            .talks
            .get(name)
            .cloned()
            .ok_or_else(|| DroverError::TalkNotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.talks.contains_key(name))
    }

    fn create(&self, name: &str, request: Request) -> Result<Talk> {
        let mut inner = self.lock()?;
        if inner.talks.contains_key(name) {
            return Err(DroverError::TalkExists(name.to_string()));
        }
        inner.seq += 1;
        let talk = Talk::new(name, inner.seq, request);
        inner.talks.insert(name.to_string(), talk.clone());
        Ok(talk)
    }

    fn update(&self, name: &str, apply: &dyn Fn(&mut Talk) -> Result<()>) -> Result<Talk> {
        let mut inner = self.lock()?;
        let current = inner
            .talks
            .get(name)
            .ok_or_else(|| DroverError::TalkNotFound(name.to_string()))?;
        // Apply to a copy; the stored record only ever sees the full result.
        let mut next = current.clone();
        apply(&mut next)?;
        inner.talks.insert(name.to_string(), next.clone());
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
