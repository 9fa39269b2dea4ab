use std::{cmp::Ordering, fmt, ops::Range, time::Instant};

use imbl::Vector;
use smallvec::SmallVec;

use crate::keys::{KeyStore, SortKeys};

/// The sort keys of all items of the source, some of which may not have been
/// computed yet.
pub(super) struct SortKeyCache<T> {
    store: Box<dyn KeyStore<T>>,
    missing: MissingKeys,
}

impl<T> SortKeyCache<T> {
    /// Create a cache for `len` items without computing any key.
    pub(super) fn new(keys: &dyn SortKeys<T>, len: usize) -> Self {
        Self { store: keys.create_store(len), missing: MissingKeys::full(len) }
    }

    /// Try to keep the computed keys for `keys`.
    ///
    /// Returns `false` if they are incompatible, in which case the cache has
    /// to be replaced.
    pub(super) fn adopt(&mut self, keys: &dyn SortKeys<T>) -> bool {
        keys.adopt_store(self.store.as_mut())
    }

    pub(super) fn missing_count(&self) -> usize {
        self.missing.count()
    }

    pub(super) fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    pub(super) fn compare(&self, a: usize, b: usize) -> Ordering {
        self.store.compare(a, b)
    }

    /// Compute the key for the item in `slot`.
    pub(super) fn compute_key(&mut self, slot: usize, item: &T) {
        self.store.init_key(slot, item);
        self.missing.remove(slot);
    }

    /// Compute missing keys in order until all are there or `deadline` has
    /// passed.
    ///
    /// Returns whether all keys are computed.
    pub(super) fn compute_missing(&mut self, items: &Vector<T>, deadline: Option<Instant>) -> bool
    where
        T: Clone,
    {
        while let Some(slot) = self.missing.first() {
            self.compute_key(slot, &items[slot]);
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
        }

        self.missing.is_empty()
    }

    /// Release the key in `slot`, unless it was never computed.
    pub(super) fn clear_key(&mut self, slot: usize) {
        if self.store.needs_clear() && !self.missing.contains(slot) {
            self.store.clear_key(slot);
        }
    }

    /// Mark the keys in `range` as missing, releasing the computed ones.
    pub(super) fn invalidate(&mut self, range: Range<usize>) {
        if self.store.needs_clear() {
            for slot in range.clone() {
                self.clear_key(slot);
            }
        }
        self.missing.insert(range);
    }

    /// Remove `removed` keys at `position` and insert `added` missing keys in
    /// their place.
    pub(super) fn splice(&mut self, position: usize, removed: usize, added: usize) {
        if self.store.needs_clear() {
            for slot in position..position + removed {
                self.clear_key(slot);
            }
        }

        self.store.splice(position, removed, added);
        self.missing.splice(position, removed, added);
        self.invalidate(position..position + added);
    }
}

impl<T> fmt::Debug for SortKeyCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortKeyCache")
            .field("len", &self.store.len())
            .field("missing", &self.missing)
            .finish()
    }
}

/// A set of slots, stored as sorted, disjoint and non-adjacent ranges.
///
/// Keys tend to go missing in large contiguous blocks (all of them, or the
/// ones of a batch of added items), so this stays tiny.
#[derive(Clone, Default, PartialEq, Eq)]
pub(super) struct MissingKeys {
    ranges: SmallVec<[Range<usize>; 2]>,
}

impl MissingKeys {
    pub(super) fn full(len: usize) -> Self {
        let mut this = Self::default();
        this.insert(0..len);
        this
    }

    pub(super) fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub(super) fn count(&self) -> usize {
        self.ranges.iter().map(|range| range.len()).sum()
    }

    pub(super) fn contains(&self, slot: usize) -> bool {
        self.ranges.iter().any(|range| range.contains(&slot))
    }

    pub(super) fn first(&self) -> Option<usize> {
        self.ranges.first().map(|range| range.start)
    }

    pub(super) fn insert(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }

        let idx = self.ranges.partition_point(|r| r.start < range.start);
        self.ranges.insert(idx, range);

        let mut merged: SmallVec<[Range<usize>; 2]> = SmallVec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            push_merged(&mut merged, range);
        }
        self.ranges = merged;
    }

    pub(super) fn remove(&mut self, slot: usize) {
        let Some(idx) = self.ranges.iter().position(|range| range.contains(&slot)) else {
            return;
        };

        let range = self.ranges[idx].clone();
        match (slot == range.start, slot + 1 == range.end) {
            (true, true) => {
                self.ranges.remove(idx);
            }
            (true, false) => self.ranges[idx].start += 1,
            (false, true) => self.ranges[idx].end -= 1,
            (false, false) => {
                self.ranges[idx].end = slot;
                self.ranges.insert(idx + 1, slot + 1..range.end);
            }
        }
    }

    /// Remove the slots `position..position + removed` and shift the ones
    /// after them by `added - removed`.
    ///
    /// The `added` new slots are not part of the set.
    pub(super) fn splice(&mut self, position: usize, removed: usize, added: usize) {
        let end = position + removed;
        let shift = |slot: usize| slot - removed + added;

        let mut spliced: SmallVec<[Range<usize>; 2]> = SmallVec::new();
        for range in &self.ranges {
            if range.start < position {
                push_merged(&mut spliced, range.start..range.end.min(position));
            }
            if range.end > end {
                push_merged(&mut spliced, shift(range.start.max(end))..shift(range.end));
            }
        }
        self.ranges = spliced;
    }
}

impl fmt::Debug for MissingKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.ranges).finish()
    }
}

// Push a range that does not start before the last one, merging them if they
// touch.
fn push_merged(ranges: &mut SmallVec<[Range<usize>; 2]>, range: Range<usize>) {
    if range.is_empty() {
        return;
    }

    match ranges.last_mut() {
        Some(last) if last.end >= range.start => last.end = last.end.max(range.end),
        _ => ranges.push(range),
    }
}
