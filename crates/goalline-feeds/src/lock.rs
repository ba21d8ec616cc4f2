//! Per-source fetch exclusion.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, PoisonError},
};

use goalline_core::feed::SourceKind;

/// Sources with a fetch in flight. A second fetch of the same source is
/// skipped rather than queued.
#[derive(Debug, Clone, Default)]
pub(crate) struct FetchLocks {
  busy: Arc<Mutex<HashSet<SourceKind>>>,
}

impl FetchLocks {
  /// Claim `kind`, or `None` if it is already being fetched.
  pub(crate) fn try_acquire(&self, kind: SourceKind) -> Option<FetchGuard> {
    let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
    busy.insert(kind).then(|| FetchGuard {
      busy: Arc::clone(&self.busy),
      kind,
    })
  }
}

/// Releases the source on drop.
#[derive(Debug)]
pub(crate) struct FetchGuard {
  busy: Arc<Mutex<HashSet<SourceKind>>>,
  kind: SourceKind,
}

impl Drop for FetchGuard {
  fn drop(&mut self) {
    self
      .busy
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.kind);
  }
}
