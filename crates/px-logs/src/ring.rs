// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity circular buffer (spec §4.1). Generic so the proxy's
//! request store (spec §4.8) can reuse the same overwrite-oldest mechanics.

use parking_lot::RwLock;
use std::collections::VecDeque;

/// A fixed-capacity ring: `append` is O(1), reads are O(count). When full,
/// the oldest entry is dropped to make room for the new one. A single
/// writer-preferred lock (`parking_lot::RwLock`) ensures reads never tear
/// across a wrap.
pub struct Ring<T> {
    capacity: usize,
    entries: RwLock<VecDeque<T>>,
}

impl<T: Clone> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self { capacity, entries: RwLock::new(VecDeque::with_capacity(capacity)) }
    }

    /// Append an entry, evicting the oldest one if at capacity. Returns the
    /// evicted entry, if any.
    pub fn append(&self, entry: T) -> Option<T> {
        let mut entries = self.entries.write();
        let evicted = if entries.len() >= self.capacity { entries.pop_front() } else { None };
        entries.push_back(entry);
        evicted
    }

    /// All entries in chronological (insertion) order.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.read().iter().cloned().collect()
    }

    /// The last `n` entries in chronological order. `n` larger than the
    /// current count returns everything.
    pub fn tail(&self, n: usize) -> Vec<T> {
        let entries = self.entries.read();
        let len = entries.len();
        let skip = len.saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mutate the first entry for which `f` returns `true`, in place.
    /// Returns whether a matching entry was found. Used to attach
    /// late-arriving details (e.g. a streamed response's captured body) to
    /// an already-recorded entry without waiting for the stream to finish
    /// before recording it.
    pub fn update<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&mut T) -> bool,
    {
        let mut entries = self.entries.write();
        entries.iter_mut().any(|entry| f(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_snapshot_preserve_order() {
        let ring: Ring<i32> = Ring::new(3);
        ring.append(1);
        ring.append(2);
        ring.append(3);
        assert_eq!(ring.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn overflow_evicts_oldest_and_keeps_last_n() {
        let ring: Ring<i32> = Ring::new(3);
        for i in 1..=5 {
            ring.append(i);
        }
        assert_eq!(ring.snapshot(), vec![3, 4, 5]);
    }

    #[test]
    fn tail_matches_snapshot_suffix() {
        let ring: Ring<i32> = Ring::new(5);
        for i in 1..=5 {
            ring.append(i);
        }
        let snap = ring.snapshot();
        for n in 0..=6 {
            assert_eq!(ring.tail(n), snap[snap.len().saturating_sub(n)..]);
        }
    }

    #[test]
    fn append_returns_evicted_entry_only_when_full() {
        let ring: Ring<i32> = Ring::new(2);
        assert_eq!(ring.append(1), None);
        assert_eq!(ring.append(2), None);
        assert_eq!(ring.append(3), Some(1));
    }

    #[test]
    fn update_mutates_first_match_in_place() {
        let ring: Ring<(&'static str, i32)> = Ring::new(3);
        ring.append(("a", 1));
        ring.append(("b", 2));
        let found = ring.update(|entry| {
            if entry.0 == "b" {
                entry.1 = 99;
                true
            } else {
                false
            }
        });
        assert!(found);
        assert_eq!(ring.snapshot(), vec![("a", 1), ("b", 99)]);
    }

    #[test]
    fn update_on_missing_entry_returns_false() {
        let ring: Ring<i32> = Ring::new(3);
        ring.append(1);
        assert!(!ring.update(|entry| *entry == 42));
    }
}
