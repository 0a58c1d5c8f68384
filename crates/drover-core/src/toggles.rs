use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide maintenance flags, set from the admin surface and read once
/// per scheduler pass.
#[derive(Default)]
pub struct Toggles {
    read_only: AtomicBool,
}

impl Toggles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    pub fn set_read_only(&self, on: bool) {
        self.read_only.store(on, Ordering::SeqCst);
    }
}
