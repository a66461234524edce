//! Upload progress tracking shared between the editor and upload workers.
//!
//! `UploadRegistry` is mutated from the UI thread and from any number of
//! upload worker threads. Each id has a single entry in a sharded concurrent
//! map, and every per-id transition is one write under that entry's shard
//! lock, so per-id operations are linearizable. Whole-registry reads copy
//! entries out shard by shard, so they never block writers for long and may
//! be slightly stale; the next progress tick reconciles.

use dashmap::DashMap;

use crate::media::MediaId;

/// Where a tracked upload stands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UploadState {
    /// Uploading, with the last reported progress in `[0, 1]`.
    InFlight(f32),
    Failed,
}

/// Progress of in-flight uploads plus the uploads that failed.
///
/// An id is either in flight or failed, never both.
#[derive(Debug, Default)]
pub struct UploadRegistry {
    uploads: DashMap<MediaId, UploadState>,
}

/// Clamp a reported progress into `[0, 1]`. Non-finite values count as no progress.
pub fn clamp_progress(progress: f32) -> f32 {
    if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an upload. A failed id is in flight again afterwards.
    pub fn put(&self, id: MediaId, progress: f32) {
        self.uploads
            .insert(id, UploadState::InFlight(clamp_progress(progress)));
    }

    /// Record new progress for an upload, tracking it if it wasn't already.
    pub fn update(&self, id: MediaId, progress: f32) {
        self.put(id, progress);
    }

    /// Stop tracking an in-flight upload. Returns the last known progress.
    pub fn remove(&self, id: MediaId) -> Option<f32> {
        match self
            .uploads
            .remove_if(&id, |_, state| matches!(state, UploadState::InFlight(_)))
        {
            Some((_, UploadState::InFlight(progress))) => Some(progress),
            _ => None,
        }
    }

    pub fn state(&self, id: MediaId) -> Option<UploadState> {
        self.uploads.get(&id).map(|entry| *entry)
    }

    pub fn progress(&self, id: MediaId) -> Option<f32> {
        match self.state(id)? {
            UploadState::InFlight(progress) => Some(progress),
            UploadState::Failed => None,
        }
    }

    pub fn contains(&self, id: MediaId) -> bool {
        self.progress(id).is_some()
    }

    /// No upload is in flight. Failed uploads don't count.
    pub fn is_empty(&self) -> bool {
        !self
            .uploads
            .iter()
            .any(|entry| matches!(*entry, UploadState::InFlight(_)))
    }

    /// Number of in-flight uploads.
    pub fn len(&self) -> usize {
        self.uploads
            .iter()
            .filter(|entry| matches!(**entry, UploadState::InFlight(_)))
            .count()
    }

    /// Ids of all in-flight uploads, sorted.
    pub fn snapshot_ids(&self) -> Vec<MediaId> {
        self.snapshot().into_iter().map(|(id, _)| id).collect()
    }

    /// In-flight uploads with their last known progress, sorted by id.
    ///
    /// Callers act on the returned copy, never while holding shard locks.
    pub fn snapshot(&self) -> Vec<(MediaId, f32)> {
        let mut entries: Vec<_> = self
            .uploads
            .iter()
            .filter_map(|entry| match *entry.value() {
                UploadState::InFlight(progress) => Some((*entry.key(), progress)),
                UploadState::Failed => None,
            })
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    /// Move an upload from in-flight to failed.
    pub fn mark_failed(&self, id: MediaId) {
        self.uploads.insert(id, UploadState::Failed);
    }

    /// Forget a failure. Returns whether the id was marked failed.
    pub fn clear_failed(&self, id: MediaId) -> bool {
        self.uploads
            .remove_if(&id, |_, state| *state == UploadState::Failed)
            .is_some()
    }

    /// Restart a failed upload at zero progress.
    ///
    /// Ids that aren't marked failed are left alone. Returns whether a retry
    /// was recorded.
    pub fn retry(&self, id: MediaId) -> bool {
        match self.uploads.get_mut(&id) {
            Some(mut state) if *state == UploadState::Failed => {
                *state = UploadState::InFlight(0.0);
                true
            }
            _ => false,
        }
    }

    pub fn has_failed(&self) -> bool {
        self.uploads
            .iter()
            .any(|entry| *entry == UploadState::Failed)
    }

    pub fn contains_failed(&self, id: MediaId) -> bool {
        self.state(id) == Some(UploadState::Failed)
    }

    pub fn failed_ids(&self) -> Vec<MediaId> {
        let mut ids: Vec<_> = self
            .uploads
            .iter()
            .filter(|entry| *entry.value() == UploadState::Failed)
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_put_update_remove() {
        let registry = UploadRegistry::new();
        assert!(registry.is_empty());

        registry.put(MediaId(9), 0.0);
        assert_eq!(registry.progress(MediaId(9)), Some(0.0));

        registry.update(MediaId(9), 0.4);
        assert_eq!(registry.snapshot(), vec![(MediaId(9), 0.4)]);

        assert_eq!(registry.remove(MediaId(9)), Some(0.4));
        assert!(registry.is_empty());
        assert_eq!(registry.remove(MediaId(9)), None);
    }

    #[test]
    fn test_progress_is_clamped() {
        let registry = UploadRegistry::new();
        registry.put(MediaId(1), 1.5);
        registry.put(MediaId(2), -0.2);
        registry.put(MediaId(3), f32::NAN);

        assert_eq!(
            registry.snapshot(),
            vec![(MediaId(1), 1.0), (MediaId(2), 0.0), (MediaId(3), 0.0)]
        );
    }

    #[test]
    fn test_failed_and_progress_disjoint() {
        let registry = UploadRegistry::new();
        registry.put(MediaId(4), 0.7);

        registry.mark_failed(MediaId(4));
        assert!(!registry.contains(MediaId(4)));
        assert!(registry.contains_failed(MediaId(4)));
        assert!(registry.has_failed());

        // New progress for a failed id means the upload is running again.
        registry.update(MediaId(4), 0.1);
        assert!(registry.contains(MediaId(4)));
        assert!(!registry.contains_failed(MediaId(4)));
    }

    #[test]
    fn test_retry() {
        let registry = UploadRegistry::new();

        assert!(!registry.retry(MediaId(5)));
        assert!(registry.is_empty());

        registry.put(MediaId(5), 0.3);
        registry.mark_failed(MediaId(5));
        assert!(registry.retry(MediaId(5)));

        assert_eq!(registry.progress(MediaId(5)), Some(0.0));
        assert!(!registry.contains_failed(MediaId(5)));
        assert!(!registry.has_failed());
    }

    #[test]
    fn test_snapshot_ids_sorted() {
        let registry = UploadRegistry::new();
        for id in [8, 5, 13] {
            registry.put(MediaId(id), 0.0);
        }
        assert_eq!(
            registry.snapshot_ids(),
            vec![MediaId(5), MediaId(8), MediaId(13)]
        );
        registry.mark_failed(MediaId(13));
        registry.mark_failed(MediaId(5));
        assert_eq!(registry.failed_ids(), vec![MediaId(5), MediaId(13)]);
    }

    #[test]
    fn test_concurrent_workers_and_sweeps() {
        let registry = Arc::new(UploadRegistry::new());

        let workers: Vec<_> = (0..4u64)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for step in 0..200u64 {
                        let id = MediaId(worker * 1000 + step % 10);
                        registry.update(id, (step % 10) as f32 / 10.0);
                        if step % 7 == 0 {
                            registry.mark_failed(id);
                        }
                        if step % 11 == 0 {
                            registry.retry(id);
                        }
                    }
                })
            })
            .collect();

        let sweeper = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    for (_, progress) in registry.snapshot() {
                        assert!((0.0..=1.0).contains(&progress));
                    }
                }
            })
        };

        for worker in workers {
            worker.join().unwrap();
        }
        sweeper.join().unwrap();

        for id in registry.snapshot_ids() {
            assert!(!registry.contains_failed(id));
        }
    }

    #[test]
    fn test_put_racing_mark_failed_stays_disjoint() {
        use std::sync::Barrier;

        let registry = Arc::new(UploadRegistry::new());
        let id = MediaId(1);

        for _ in 0..2_000 {
            registry.mark_failed(id);
            let barrier = Arc::new(Barrier::new(2));

            let restart = {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.put(id, 0.0);
                })
            };
            let fail = {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.mark_failed(id);
                })
            };
            restart.join().unwrap();
            fail.join().unwrap();

            assert!(
                registry.contains(id) != registry.contains_failed(id),
                "{id} must be exactly one of in flight or failed"
            );
        }
    }

    #[test]
    fn test_remove_leaves_failed_entry() {
        let registry = UploadRegistry::new();
        registry.mark_failed(MediaId(3));

        assert_eq!(registry.remove(MediaId(3)), None);
        assert!(registry.contains_failed(MediaId(3)));
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.state(MediaId(3)), Some(UploadState::Failed));
    }
}
