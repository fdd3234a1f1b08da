//! Renderers: consumers of store snapshots.
//!
//! The control thread calls [`Renderer::render`] after every applied
//! update. Renderers never mutate the store; user input flows back through
//! the poller's command channel instead.

pub mod terminal;

use std::sync::{Arc, RwLock};

use crate::store::Snapshot;

/// Something that displays a [`Snapshot`].
pub trait Renderer: Send {
    fn render(&mut self, snapshot: &Snapshot);
}

/// Latest snapshot, readable from other threads.
///
/// The web server holds a clone and serves reads from it without going
/// through the control thread.
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<Snapshot>>,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the most recently published snapshot.
    pub fn latest(&self) -> Snapshot {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn version(&self) -> u64 {
        match self.inner.read() {
            Ok(guard) => guard.version,
            Err(poisoned) => poisoned.into_inner().version,
        }
    }

    fn store(&self, snapshot: &Snapshot) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = snapshot.clone();
    }
}

impl Renderer for SharedSnapshot {
    fn render(&mut self, snapshot: &Snapshot) {
        self.store(snapshot);
    }
}
