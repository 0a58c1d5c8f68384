//! Talk store: ownership and atomic mutation of talk records.
//!
//! The store is the only owner of `Talk` state. Agents never hold a mutable
//! talk across operations; they read a snapshot and submit a transformation
//! closure, which the store applies atomically — the stored record reflects
//! either the old or the new state, never a partial write.

pub mod disk;
pub mod memory;

pub use disk::DiskTalks;
pub use memory::MemoryTalks;

use crate::error::Result;
use crate::talk::{Request, Talk};

pub trait Talks: Send + Sync {
    /// Names of active talks, in creation order.
    fn active(&self) -> Result<Vec<String>>;

    fn get(&self, name: &str) -> Result<Talk>;

    fn exists(&self, name: &str) -> Result<bool>;

    /// Create a new active talk in its requested stage. Fails with
    /// `TalkExists` when the name is already taken.
    fn create(&self, name: &str, request: Request) -> Result<Talk>;

    /// Atomic read-modify-write of one record. A closure error leaves the
    /// stored record untouched. Returns the record as stored afterwards.
    fn update(&self, name: &str, apply: &dyn Fn(&mut Talk) -> Result<()>) -> Result<Talk>;
}
