//! Object pooling for short-lived entities
//!
//! Projectiles and particles churn every frame; pooling them keeps the
//! update path free of per-frame allocation. Every managed instance lives in
//! exactly one of two places: the free list (a `Vec`, reuse in LIFO order)
//! or the active set (keyed by slot id). The instance physically moves
//! between the two on acquire/release, so double-membership is
//! unrepresentable by construction.

use std::collections::BTreeMap;

/// Handle to an instance currently held in a pool's active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

/// Reuse counters, for logging how well the pool absorbs churn.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Acquires served from the free list
    pub reused: usize,
    /// Acquires that had to call the factory
    pub created: usize,
    /// Releases that dropped the instance because the free list was full
    pub dropped: usize,
}

impl PoolStats {
    /// Fraction of acquires served without allocating (0.0 when unused)
    pub fn hit_rate(&self) -> f64 {
        let total = self.reused + self.created;
        if total == 0 {
            0.0
        } else {
            self.reused as f64 / total as f64
        }
    }
}

/// Generic reuse container for transient instances.
///
/// `max_size` is a soft cap on the *retained* free list, not on how many
/// instances exist: acquire always succeeds (the factory runs when the free
/// list is empty), and a release past the cap simply drops the instance.
///
/// The active set is a `BTreeMap` so that [`ObjectPool::release_all`] walks
/// slots in a stable order; free-list order, and therefore reuse order,
/// stays deterministic.
pub struct ObjectPool<T> {
    factory: Box<dyn FnMut() -> T>,
    reset: Box<dyn FnMut(&mut T)>,
    free: Vec<T>,
    active: BTreeMap<SlotId, T>,
    next_slot: u64,
    max_size: usize,
    stats: PoolStats,
}

impl<T> ObjectPool<T> {
    /// Construct a pool and pre-populate the free list with `initial_size`
    /// instances.
    pub fn new(
        initial_size: usize,
        max_size: usize,
        factory: impl FnMut() -> T + 'static,
        reset: impl FnMut(&mut T) + 'static,
    ) -> Self {
        let mut pool = ObjectPool {
            factory: Box::new(factory),
            reset: Box::new(reset),
            free: Vec::with_capacity(initial_size),
            active: BTreeMap::new(),
            next_slot: 0,
            max_size,
            stats: PoolStats::default(),
        };
        pool.warm_up(initial_size);
        pool
    }

    /// Take an instance out of the pool: pops the free list if non-empty,
    /// otherwise calls the factory. The instance moves into the active set
    /// and is addressed by the returned slot id until released.
    pub fn acquire(&mut self) -> SlotId {
        let obj = match self.free.pop() {
            Some(obj) => {
                self.stats.reused += 1;
                obj
            }
            None => {
                self.stats.created += 1;
                (self.factory)()
            }
        };
        let id = SlotId(self.next_slot);
        self.next_slot += 1;
        self.active.insert(id, obj);
        id
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.active.get(&id)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.active.get_mut(&id)
    }

    /// Return an instance to the pool. Returns false if `id` is not in the
    /// active set (already released, or never from this pool): a common,
    /// recoverable caller mistake, so it is a boolean rather than an error.
    ///
    /// On success the instance is reset and pushed onto the free list, or
    /// dropped outright if the free list already holds `max_size` entries.
    pub fn release(&mut self, id: SlotId) -> bool {
        let Some(mut obj) = self.active.remove(&id) else {
            return false;
        };
        (self.reset)(&mut obj);
        if self.free.len() < self.max_size {
            self.free.push(obj);
        } else {
            self.stats.dropped += 1;
        }
        true
    }

    /// Release every active instance, in slot order. Used for whole-state
    /// resets (wave cleared, game restarted).
    pub fn release_all(&mut self) {
        let ids: Vec<SlotId> = self.active.keys().copied().collect();
        for id in ids {
            self.release(id);
        }
    }

    /// Pre-populate the free list up to `n` entries without activating any
    /// of them. Absorbs allocation bursts outside the hot path.
    pub fn warm_up(&mut self, n: usize) {
        while self.free.len() < n {
            let obj = (self.factory)();
            self.free.push(obj);
        }
    }

    /// Discard free-list entries beyond `max_size`. The pool's own soft cap
    /// is unchanged; this is a one-off shrink (e.g. after a particle storm).
    pub fn trim(&mut self, max_size: usize) {
        if self.free.len() > max_size {
            self.stats.dropped += self.free.len() - max_size;
            self.free.truncate(max_size);
        }
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Active instances in slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.active.iter().map(|(&id, obj)| (id, obj))
    }

    /// Active instances in slot order, mutably.
    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        self.active.iter_mut().map(|(&id, obj)| (id, obj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_pool(initial: usize, max: usize) -> ObjectPool<Vec<u32>> {
        ObjectPool::new(initial, max, Vec::new, Vec::clear)
    }

    #[test]
    fn test_acquire_prefers_free_list() {
        let mut pool = counter_pool(2, 4);
        assert_eq!(pool.free_len(), 2);

        let a = pool.acquire();
        assert_eq!(pool.free_len(), 1);
        assert_eq!(pool.active_len(), 1);
        assert_eq!(pool.stats().reused, 1);

        // Free list exhausted: factory kicks in
        let _b = pool.acquire();
        let _c = pool.acquire();
        assert_eq!(pool.free_len(), 0);
        assert_eq!(pool.stats().created, 1);

        assert!(pool.get(a).is_some());
    }

    #[test]
    fn test_release_applies_reset_before_reuse() {
        let mut pool = counter_pool(0, 4);
        let a = pool.acquire();
        pool.get_mut(a).unwrap().extend([1, 2, 3]);
        assert!(pool.release(a));

        let b = pool.acquire();
        assert!(pool.get(b).unwrap().is_empty());
    }

    #[test]
    fn test_double_release_returns_false() {
        let mut pool = counter_pool(0, 4);
        let a = pool.acquire();
        assert!(pool.release(a));
        assert!(!pool.release(a));
        // The stale handle no longer resolves either
        assert!(pool.get(a).is_none());
    }

    #[test]
    fn test_max_size_is_a_soft_cap() {
        let mut pool = counter_pool(0, 2);
        let ids: Vec<SlotId> = (0..3).map(|_| pool.acquire()).collect();
        for id in ids {
            assert!(pool.release(id));
        }
        // Two retained, one dropped: the cap bounds retention, not creation
        assert_eq!(pool.free_len(), 2);
        assert_eq!(pool.stats().dropped, 1);
    }

    #[test]
    fn test_release_all() {
        let mut pool = counter_pool(0, 8);
        for _ in 0..5 {
            pool.acquire();
        }
        assert_eq!(pool.active_len(), 5);

        pool.release_all();
        assert_eq!(pool.active_len(), 0);
        assert_eq!(pool.free_len(), 5);
    }

    #[test]
    fn test_warm_up_and_trim() {
        let mut pool = counter_pool(0, 16);
        pool.warm_up(8);
        assert_eq!(pool.free_len(), 8);
        assert_eq!(pool.active_len(), 0);

        // warm_up never removes entries
        pool.warm_up(4);
        assert_eq!(pool.free_len(), 8);

        pool.trim(3);
        assert_eq!(pool.free_len(), 3);
        assert_eq!(pool.stats().dropped, 5);
    }

    #[test]
    fn test_free_and_active_stay_disjoint() {
        // Scripted acquire/release churn; after every step the instance
        // counts must partition cleanly and no released handle may resolve.
        let mut pool = counter_pool(2, 3);
        let mut held: Vec<SlotId> = Vec::new();
        let mut released: Vec<SlotId> = Vec::new();

        for step in 0..40u32 {
            if step % 3 == 0 || held.is_empty() {
                held.push(pool.acquire());
            } else {
                let id = held.remove((step as usize) % held.len());
                assert!(pool.release(id));
                released.push(id);
            }

            assert_eq!(pool.active_len(), held.len());
            for &id in &held {
                assert!(pool.get(id).is_some());
            }
            for &id in &released {
                assert!(pool.get(id).is_none());
            }
            assert!(pool.free_len() <= 3);
        }
    }

    #[test]
    fn test_hit_rate() {
        let mut pool = counter_pool(1, 4);
        assert_eq!(pool.stats().hit_rate(), 0.0);

        let a = pool.acquire(); // reuse
        pool.release(a);
        let _b = pool.acquire(); // reuse
        let _c = pool.acquire(); // create
        assert!((pool.stats().hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
