use std::ops::Range;

use crate::timsort::Runs;

/// The sorted view of a list: entry `i` is the position in the source of the
/// item shown at position `i`.
///
/// Source positions double as key slots of the
/// [`SortKeyCache`][super::cache::SortKeyCache].
#[derive(Debug)]
pub(super) struct PositionIndex {
    slots: Vec<usize>,
}

impl PositionIndex {
    /// Create the identity mapping for `len` items.
    pub(super) fn new(len: usize) -> Self {
        Self { slots: (0..len).collect() }
    }

    pub(super) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(super) fn get(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied()
    }

    pub(super) fn as_slice(&self) -> &[usize] {
        &self.slots
    }

    pub(super) fn as_mut_slice(&mut self) -> &mut [usize] {
        &mut self.slots
    }

    /// The range of view positions that do not show the item at the same
    /// source position.
    pub(super) fn reordered(&self) -> Range<usize> {
        let Some(start) = self.slots.iter().enumerate().position(|(i, &pos)| i != pos) else {
            return 0..0;
        };
        let end = self.slots.iter().enumerate().rposition(|(i, &pos)| i != pos);
        start..end.map_or(start, |i| i + 1)
    }

    /// Apply a change of the source: drop the entries of the `removed` items
    /// at `position`, renumber the entries after them and append entries for
    /// the `added` new items.
    ///
    /// `runs` are the sorted runs at the start of the view. They are rewritten
    /// to describe the same runs without the dropped entries.
    ///
    /// Returns how many entries at the start and at the end of the view were
    /// neither dropped nor moved. Both are the old length if nothing was
    /// dropped.
    pub(super) fn splice(
        &mut self,
        runs: &mut Runs,
        position: usize,
        removed: usize,
        added: usize,
    ) -> (usize, usize) {
        let len = self.slots.len();
        let removed_end = position + removed;

        let mut unmodified_start = len;
        let mut unmodified_end = len;
        let mut valid = 0;
        let mut new_runs = Runs::new();
        let mut old_runs = runs.iter().copied();

        let mut i = 0;
        while i < len {
            let (run_end, tracked) = match old_runs.next() {
                Some(run_len) => (i + run_len, true),
                None => (len, false),
            };
            let run_start = valid;

            for old in i..run_end {
                let pos = self.slots[old];
                let pos = if pos >= removed_end {
                    pos - removed + added
                } else if pos >= position {
                    unmodified_start = unmodified_start.min(valid);
                    unmodified_end = len - old - 1;
                    continue;
                } else {
                    pos
                };
                self.slots[valid] = pos;
                valid += 1;
            }

            if tracked && valid > run_start {
                new_runs.push(valid - run_start);
            }
            i = run_end;
        }

        self.slots.truncate(valid);
        self.slots.extend(position..position + added);
        *runs = new_runs;

        (unmodified_start, unmodified_end)
    }
}
