//! Bounded top-k collection with lazy deletion.
//!
//! A min-heap of `(key, seq, item)` entries plus an identity index mapping
//! each live item to the sequence number of its current heap entry.
//! `remove` only drops the index entry; the heap entry becomes stale and is
//! skipped whenever it surfaces. When stale entries outnumber live ones by
//! a wide margin the heap is rebuilt from the index.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use crate::error::{CoreError, Result};

// In debug builds, cross-check heap and index after this many mutations.
const CHECK_INTERVAL: u64 = 1024;

// Rebuild the heap once stale entries push it past this multiple of the
// live count.
const REBUILD_FACTOR: usize = 4;

#[derive(Debug)]
struct Entry<K, T> {
    key: K,
    seq: u64,
    item: T,
}

impl<K: Ord, T> PartialEq for Entry<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.seq == other.seq
    }
}

impl<K: Ord, T> Eq for Entry<K, T> {}

impl<K: Ord, T> PartialOrd for Entry<K, T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, T> Ord for Entry<K, T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key).then_with(|| self.seq.cmp(&other.seq))
    }
}

/// At most `capacity` items, ordered by a key function; the smallest key is
/// evicted first. Items must be distinct under `Eq`/`Hash`.
pub struct BoundedTopK<T, K, F>
where
    T: Clone + Eq + Hash,
    K: Ord,
    F: Fn(&T) -> K,
{
    capacity: usize,
    key_fn: F,
    heap: BinaryHeap<Reverse<Entry<K, T>>>,
    index: HashMap<T, u64>,
    next_seq: u64,
    mutations: u64,
}

impl<T, K, F> BoundedTopK<T, K, F>
where
    T: Clone + Eq + Hash,
    K: Ord,
    F: Fn(&T) -> K,
{
    pub fn new(capacity: usize, key_fn: F) -> Result<Self> {
        if capacity == 0 {
            return Err(CoreError::construction("top-k capacity must be at least 1"));
        }
        Ok(Self {
            capacity,
            key_fn,
            heap: BinaryHeap::new(),
            index: HashMap::new(),
            next_seq: 0,
            mutations: 0,
        })
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `item` is currently held.
    pub fn contains(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    /// Insert `item`. When full, the item with the smallest key (possibly
    /// the new one) is evicted and returned. Fails if `item` is already
    /// present.
    pub fn push(&mut self, item: T) -> Result<Option<T>> {
        if self.index.contains_key(&item) {
            return Err(CoreError::construction("item already present in top-k"));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            key: (self.key_fn)(&item),
            seq,
            item: item.clone(),
        }));
        self.index.insert(item, seq);

        let evicted = if self.index.len() > self.capacity {
            Some(self.pop_min())
        } else {
            None
        };
        self.after_mutation();
        Ok(evicted)
    }

    /// Remove and return the item with the smallest key. Fails when empty.
    pub fn pop(&mut self) -> Result<T> {
        if self.index.is_empty() {
            return Err(CoreError::invalid_operation("pop on an empty top-k"));
        }
        let item = self.pop_min();
        self.after_mutation();
        Ok(item)
    }

    /// Drop `item` without touching its heap entry. Fails if not present.
    pub fn remove(&mut self, item: &T) -> Result<()> {
        if self.index.remove(item).is_none() {
            return Err(CoreError::construction("removed item is not in the top-k"));
        }
        self.after_mutation();
        Ok(())
    }

    /// Live items in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.index.keys()
    }

    // Pop the live minimum, skipping stale entries. Caller guarantees at
    // least one live item.
    fn pop_min(&mut self) -> T {
        loop {
            let Reverse(entry) = self.heap.pop().expect("live item exists below stale entries");
            if self.index.get(&entry.item) == Some(&entry.seq) {
                self.index.remove(&entry.item);
                return entry.item;
            }
        }
    }

    fn after_mutation(&mut self) {
        self.mutations += 1;
        if self.heap.len() > REBUILD_FACTOR * self.index.len().max(1) {
            self.rebuild();
        }
        if cfg!(debug_assertions) && self.mutations % CHECK_INTERVAL == 0 {
            self.assert_consistent();
        }
    }

    // Recompute the heap from the live index, discarding stale entries.
    fn rebuild(&mut self) {
        let mut heap = BinaryHeap::with_capacity(self.index.len());
        for (item, seq) in &mut self.index {
            let seq_new = self.next_seq;
            self.next_seq += 1;
            *seq = seq_new;
            heap.push(Reverse(Entry {
                key: (self.key_fn)(item),
                seq: seq_new,
                item: item.clone(),
            }));
        }
        self.heap = heap;
    }

    fn assert_consistent(&self) {
        let live = self
            .heap
            .iter()
            .filter(|Reverse(e)| self.index.get(&e.item) == Some(&e.seq))
            .count();
        debug_assert_eq!(live, self.index.len(), "heap live entries diverge from index");
        debug_assert!(self.index.len() <= self.capacity, "top-k over capacity");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_k(capacity: usize) -> BoundedTopK<u32, u32, fn(&u32) -> u32> {
        BoundedTopK::new(capacity, (|x| *x) as fn(&u32) -> u32).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(BoundedTopK::new(0, (|x: &u32| *x) as fn(&u32) -> u32).is_err());
    }

    #[test]
    fn test_push_below_capacity_keeps_all() {
        let mut k = top_k(3);
        assert_eq!(k.push(10).unwrap(), None);
        assert_eq!(k.push(20).unwrap(), None);
        assert_eq!(k.len(), 2);
        assert!(k.contains(&10));
    }

    #[test]
    fn test_push_at_capacity_evicts_minimum() {
        let mut k = top_k(2);
        k.push(10).unwrap();
        k.push(20).unwrap();
        // 10 is the smallest of {10, 20, 30}.
        assert_eq!(k.push(30).unwrap(), Some(10));
        assert!(!k.contains(&10));
        assert_eq!(k.len(), 2);
    }

    #[test]
    fn test_push_at_capacity_may_evict_newcomer() {
        let mut k = top_k(2);
        k.push(10).unwrap();
        k.push(20).unwrap();
        assert_eq!(k.push(5).unwrap(), Some(5));
        assert!(k.contains(&10));
        assert!(k.contains(&20));
    }

    #[test]
    fn test_duplicate_push_rejected() {
        let mut k = top_k(3);
        k.push(10).unwrap();
        assert!(k.push(10).is_err());
        assert_eq!(k.len(), 1);
    }

    #[test]
    fn test_pop_returns_minimum() {
        let mut k = top_k(3);
        k.push(20).unwrap();
        k.push(10).unwrap();
        k.push(30).unwrap();
        assert_eq!(k.pop().unwrap(), 10);
        assert_eq!(k.pop().unwrap(), 20);
        assert_eq!(k.pop().unwrap(), 30);
        assert!(k.pop().is_err());
    }

    #[test]
    fn test_remove_then_pop_skips_stale() {
        let mut k = top_k(3);
        k.push(10).unwrap();
        k.push(20).unwrap();
        k.push(30).unwrap();
        k.remove(&10).unwrap();
        assert_eq!(k.len(), 2);
        assert_eq!(k.pop().unwrap(), 20);
    }

    #[test]
    fn test_remove_untracked_rejected() {
        let mut k = top_k(2);
        k.push(10).unwrap();
        assert!(k.remove(&99).is_err());
        k.remove(&10).unwrap();
        assert!(k.remove(&10).is_err());
    }

    #[test]
    fn test_removed_item_can_be_pushed_again() {
        let mut k = top_k(2);
        k.push(10).unwrap();
        k.remove(&10).unwrap();
        k.push(10).unwrap();
        assert_eq!(k.pop().unwrap(), 10);
    }

    #[test]
    fn test_rebuild_preserves_order() {
        let mut k = top_k(100);
        for i in 0..100u32 {
            k.push(i).unwrap();
        }
        // Mass removal leaves the heap mostly stale, forcing a rebuild.
        for i in 0..90u32 {
            k.remove(&i).unwrap();
        }
        assert_eq!(k.len(), 10);
        for i in 90..100u32 {
            assert_eq!(k.pop().unwrap(), i);
        }
    }

    #[test]
    fn test_iter_yields_live_items() {
        let mut k = top_k(3);
        k.push(10).unwrap();
        k.push(20).unwrap();
        k.remove(&10).unwrap();
        let items: Vec<u32> = k.iter().copied().collect();
        assert_eq!(items, vec![20]);
    }

    #[test]
    fn test_churn_stays_consistent() {
        let mut k = top_k(8);
        for round in 0..2000u32 {
            let v = (round * 37) % 4096;
            if k.contains(&v) {
                k.remove(&v).unwrap();
            } else {
                k.push(v).unwrap();
            }
        }
        assert!(k.len() <= 8);
        let mut prev = None;
        while let Ok(v) = k.pop() {
            if let Some(p) = prev {
                assert!(v >= p);
            }
            prev = Some(v);
        }
    }
}
