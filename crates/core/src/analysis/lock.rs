//! Per-image advisory locks.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// Set of images currently being analyzed in this process.
#[derive(Debug, Clone, Default)]
pub struct AnalysisLocks {
    held: Arc<DashMap<Uuid, ()>>,
}

impl AnalysisLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock for `image_id`, or returns `None` if it is held.
    #[must_use]
    pub fn try_acquire(&self, image_id: Uuid) -> Option<AnalysisGuard> {
        match self.held.entry(image_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(AnalysisGuard {
                    held: Arc::clone(&self.held),
                    image_id,
                })
            }
        }
    }

    /// Returns true if an analysis of `image_id` is running.
    #[must_use]
    pub fn is_locked(&self, image_id: Uuid) -> bool {
        self.held.contains_key(&image_id)
    }
}

/// Releases the image lock on drop.
#[derive(Debug)]
pub struct AnalysisGuard {
    held: Arc<DashMap<Uuid, ()>>,
    image_id: Uuid,
}

impl Drop for AnalysisGuard {
    fn drop(&mut self) {
        self.held.remove(&self.image_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let locks = AnalysisLocks::new();
        let id = Uuid::new_v4();

        let guard = locks.try_acquire(id).unwrap();
        assert!(locks.try_acquire(id).is_none());
        assert!(locks.is_locked(id));

        drop(guard);
        assert!(!locks.is_locked(id));
        assert!(locks.try_acquire(id).is_some());
    }

    #[test]
    fn test_locks_are_per_image() {
        let locks = AnalysisLocks::new();

        let _a = locks.try_acquire(Uuid::new_v4()).unwrap();
        assert!(locks.try_acquire(Uuid::new_v4()).is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let locks = AnalysisLocks::new();
        let other = locks.clone();
        let id = Uuid::new_v4();

        let _guard = locks.try_acquire(id).unwrap();
        assert!(other.try_acquire(id).is_none());
    }
}
