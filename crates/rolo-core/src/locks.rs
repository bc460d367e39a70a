//! Keyed async locks: one per submitter for duplicate-check-then-insert, one
//! per card for read-check-write updates.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct Slot {
  lock:  Arc<AsyncMutex<()>>,
  /// Holders plus waiters, including waiters that are still queued.
  users: usize,
}

/// Hands out one async lock per key. An entry is dropped once nobody holds
/// it or waits on it, including waiters whose future was cancelled.
#[derive(Default)]
pub(crate) struct KeyedLocks {
  slots: Mutex<HashMap<String, Slot>>,
}

impl KeyedLocks {
  pub(crate) async fn acquire(&self, key: &str) -> KeyGuard<'_> {
    let (lock, registration) = {
      let mut slots = self.slots();
      let slot = slots.entry(key.to_owned()).or_insert_with(|| Slot {
        lock:  Arc::default(),
        users: 0,
      });
      slot.users += 1;
      (slot.lock.clone(), Registration { owner: self, key: key.to_owned() })
    };
    // If this future is dropped while waiting, `registration` still runs.
    let guard = lock.lock_owned().await;
    KeyGuard { _guard: guard, _registration: registration }
  }

  fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
    self.slots.lock().unwrap_or_else(|e| e.into_inner())
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize { self.slots().len() }
}

/// Held for as long as the key is locked. Fields drop in order: the mutex is
/// released before the registration is withdrawn.
pub(crate) struct KeyGuard<'a> {
  _guard:        OwnedMutexGuard<()>,
  _registration: Registration<'a>,
}

/// One holder's or waiter's claim on a map entry.
struct Registration<'a> {
  owner: &'a KeyedLocks,
  key:   String,
}

impl Drop for Registration<'_> {
  fn drop(&mut self) {
    let mut slots = self.owner.slots();
    if let Some(slot) = slots.get_mut(&self.key) {
      slot.users -= 1;
      if slot.users == 0 {
        slots.remove(&self.key);
      }
    }
  }
}
