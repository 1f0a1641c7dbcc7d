//! Time-bounded snapshot of generated insights.

use super::record::InsightRecord;
use crate::error::Result;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// An immutable, fully generated set of insights.
#[derive(Debug)]
pub struct InsightSnapshot {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<InsightRecord>,
    expires_at: Instant,
}

impl InsightSnapshot {
    fn new(records: Vec<InsightRecord>, ttl: Duration) -> Self {
        Self {
            generated_at: Utc::now(),
            records,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Cached snapshot plus the invalidation count it was stored under.
#[derive(Debug, Default)]
struct Slot {
    snapshot: Option<Arc<InsightSnapshot>>,
    generation: u64,
}

/// Holds the current snapshot and serializes regeneration.
///
/// Reads clone an `Arc` and never wait on a running refresh unless the
/// snapshot is stale. Only one refresh runs at a time; callers that arrive
/// while it runs receive its result instead of starting their own.
#[derive(Debug)]
pub struct InsightCache {
    ttl: Duration,
    current: RwLock<Slot>,
    refresh: Mutex<()>,
}

impl InsightCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: RwLock::new(Slot::default()),
            refresh: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot if it has not expired.
    pub fn fresh(&self) -> Option<Arc<InsightSnapshot>> {
        self.current
            .read()
            .snapshot
            .as_ref()
            .filter(|s| !s.is_expired())
            .map(Arc::clone)
    }

    /// Current snapshot, regenerating it with `generate` when stale.
    ///
    /// A failed generation leaves the previous snapshot in place. A result
    /// whose generation overlapped an [`invalidate`](Self::invalidate) is
    /// returned to this caller but not stored.
    pub fn get_or_refresh<F>(&self, generate: F) -> Result<Arc<InsightSnapshot>>
    where
        F: FnOnce() -> Result<Vec<InsightRecord>>,
    {
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let _guard = self.refresh.lock();
        // another caller may have refreshed while we waited
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let started = self.current.read().generation;
        let snapshot = Arc::new(InsightSnapshot::new(generate()?, self.ttl));

        let mut slot = self.current.write();
        if slot.generation == started {
            slot.snapshot = Some(Arc::clone(&snapshot));
        } else {
            debug!("cache invalidated during refresh, result not stored");
        }
        Ok(snapshot)
    }

    /// Drop the current snapshot so the next read regenerates, including any
    /// refresh already in flight.
    pub fn invalidate(&self) {
        let mut slot = self.current.write();
        slot.snapshot = None;
        slot.generation = slot.generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn reuses_snapshot_within_ttl() {
        let cache = InsightCache::new(Duration::from_secs(300));
        let calls = AtomicUsize::new(0);
        let generate = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        };

        let first = cache.get_or_refresh(generate).unwrap();
        let second = cache.get_or_refresh(generate).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.generated_at, second.generated_at);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_snapshot_regenerates() {
        let cache = InsightCache::new(Duration::ZERO);
        let first = cache.get_or_refresh(|| Ok(Vec::new())).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.fresh().is_none());
        let second = cache.get_or_refresh(|| Ok(Vec::new())).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidate_forces_refresh() {
        let cache = InsightCache::new(Duration::from_secs(300));
        let first = cache.get_or_refresh(|| Ok(Vec::new())).unwrap();
        cache.invalidate();
        assert!(cache.fresh().is_none());
        let second = cache.get_or_refresh(|| Ok(Vec::new())).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidate_during_refresh_discards_result() {
        let cache = Arc::new(InsightCache::new(Duration::from_secs(300)));
        let (started_tx, started_rx) = mpsc::channel();

        let worker = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                cache.get_or_refresh(|| {
                    started_tx.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(100));
                    Ok(Vec::new())
                })
            })
        };

        started_rx.recv().unwrap();
        cache.invalidate();
        let in_flight = worker.join().unwrap().unwrap();

        assert!(cache.fresh().is_none());
        let calls = AtomicUsize::new(0);
        let next = cache
            .get_or_refresh(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!Arc::ptr_eq(&in_flight, &next));
        assert!(Arc::ptr_eq(&cache.fresh().unwrap(), &next));
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let cache = InsightCache::new(Duration::ZERO);
        let first = cache.get_or_refresh(|| Ok(Vec::new())).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let result = cache.get_or_refresh(|| Err(EngineError::EmptyData));
        assert_eq!(result.unwrap_err(), EngineError::EmptyData);
        assert!(Arc::ptr_eq(
            cache.current.read().snapshot.as_ref().unwrap(),
            &first
        ));
    }

    #[test]
    fn concurrent_readers_share_one_refresh() {
        let cache = Arc::new(InsightCache::new(Duration::from_secs(300)));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache.get_or_refresh(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        Ok(Vec::new())
                    })
                })
            })
            .collect();

        let snapshots: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
