//! An incremental natural merge sort.
//!
//! [`TimSort`] sorts a slice the way TimSort does (detect ascending and
//! descending streaks, extend short ones with insertion sort, merge adjacent
//! runs while keeping the run stack balanced) but does so one bounded
//! [`step`][TimSort::step] at a time. Between two steps the slice is always a
//! permutation of its original contents, so it can be read, and the pending
//! runs can be exported with [`runs`][TimSort::runs] and fed into a new sort
//! after the slice was modified.

use std::{cmp::Ordering, fmt, ops::Range};

use smallvec::SmallVec;

/// Lengths of the sorted runs at the start of a slice, in order.
pub type Runs = SmallVec<[usize; 8]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Run {
    start: usize,
    len: usize,
}

impl Run {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// State of an incremental, stable merge sort over a slice of `len`
/// elements.
///
/// The slice itself is not owned by the sort. It has to be passed to every
/// call of [`step`][Self::step] and [`finish`][Self::finish], and must not be
/// modified in between.
///
/// ```rust
/// use listmodel_sort::timsort::TimSort;
///
/// let mut v = [5, 3, 1, 4, 2];
/// let mut sort = TimSort::new(v.len());
/// while sort.step(&mut v, &mut |a, b| a.cmp(b)).is_some() {}
/// assert_eq!(v, [1, 2, 3, 4, 5]);
/// ```
pub struct TimSort<E> {
    len: usize,
    // Everything before this index has been pushed onto the run stack.
    unsorted: usize,
    min_run: usize,
    max_merge_size: usize,
    runs: SmallVec<[Run; 8]>,
    scratch: Vec<E>,
    progress: usize,
}

impl<E: Copy> TimSort<E> {
    /// Create a sort for a slice of `len` elements.
    ///
    /// Nothing is known to be sorted yet and merges are not limited in size.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            unsorted: 0,
            min_run: compute_min_run(len),
            max_merge_size: 0,
            runs: SmallVec::new(),
            scratch: Vec::new(),
            progress: 0,
        }
    }

    /// The length of the slice being sorted.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the slice being sorted is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Limit the number of elements a single merge step compares.
    ///
    /// `0` removes the limit so every merge is done in one step. Run detection
    /// is limited the same way. The limit can be changed at any time.
    pub fn set_max_merge_size(&mut self, max_merge_size: usize) {
        self.max_merge_size = max_merge_size;
    }

    /// The current merge limit, `0` if there is none.
    pub fn max_merge_size(&self) -> usize {
        self.max_merge_size
    }

    /// Declare the start of the slice to consist of already sorted runs of
    /// the given lengths, in order.
    ///
    /// Runs of length `0` are ignored. This is meant to be used right after
    /// [`new`][Self::new], with the result of [`runs`][Self::runs] of an
    /// earlier sort over the same elements.
    ///
    /// # Panics
    ///
    /// Panics if the sort already started, or if the runs are longer than the
    /// slice.
    #[track_caller]
    pub fn set_runs(&mut self, runs: &[usize]) {
        assert!(
            self.runs.is_empty() && self.unsorted == 0,
            "runs can only be set before the sort starts"
        );

        let total: usize = runs.iter().sum();
        assert!(
            total <= self.len,
            "runs cover {total} elements but the slice has only {}",
            self.len
        );

        let mut start = 0;
        for &len in runs.iter().filter(|&&len| len > 0) {
            self.runs.push(Run { start, len });
            start += len;
        }
        self.unsorted = start;
        self.update_progress();
    }

    /// Lengths of the sorted runs found so far, in order, starting at the
    /// beginning of the slice.
    ///
    /// Everything after the last run has not been looked at yet.
    pub fn runs(&self) -> Runs {
        self.runs.iter().map(|run| run.len).collect()
    }

    /// Whether the slice is completely sorted.
    pub fn is_finished(&self) -> bool {
        self.unsorted == self.len && self.runs.len() <= 1
    }

    /// Estimate of how many elements are sorted.
    ///
    /// This is `0` before the first step and [`len`][Self::len] once the sort
    /// is finished. It never decreases.
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// Do one bounded unit of work: find one run, or do (part of) one merge.
    ///
    /// Returns `None` once the slice is sorted. Otherwise returns the range of
    /// `v` that was reordered by this step, which may be empty.
    ///
    /// # Panics
    ///
    /// Panics if `v` does not have the length this sort was created for.
    #[track_caller]
    pub fn step<F>(&mut self, v: &mut [E], compare: &mut F) -> Option<Range<usize>>
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        assert_eq!(v.len(), self.len, "slice length changed during sort");

        let changed = if let Some(i) = collapse(&self.runs) {
            self.merge_at(i, v, compare)
        } else if self.unsorted < self.len {
            self.push_next_run(v, compare)
        } else if let Some(i) = force_collapse(&self.runs) {
            self.merge_at(i, v, compare)
        } else {
            return None;
        };

        self.update_progress();
        Some(changed)
    }

    /// Sort the rest of the slice without any size limit.
    ///
    /// Returns the range of `v` that was reordered, which may be empty.
    pub fn finish<F>(&mut self, v: &mut [E], compare: &mut F) -> Range<usize>
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        self.max_merge_size = 0;

        let mut changed = 0..0;
        while let Some(range) = self.step(v, compare) {
            changed = union(changed, range);
        }
        changed
    }

    fn push_next_run<F>(&mut self, v: &mut [E], compare: &mut F) -> Range<usize>
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        let start = self.unsorted;
        let remaining = self.len - start;
        let limit = match self.max_merge_size {
            0 => remaining,
            max => remaining.min(max.max(self.min_run)),
        };

        let (mut len, reversed) = find_streak(&v[start..start + limit], compare);
        let mut changed = start..start;
        if reversed {
            v[start..start + len].reverse();
            changed = start..start + len;
        }

        if len < self.min_run {
            let forced = self.min_run.min(remaining);
            if forced > len {
                insertion_sort_shift_left(&mut v[start..start + forced], len, compare);
                changed = start..start + forced;
                len = forced;
            }
        }

        self.runs.push(Run { start, len });
        self.unsorted += len;
        changed
    }

    // Merge `runs[i]` and `runs[i + 1]`, or only part of them if the merge
    // limit is set and the merge is bigger than that.
    fn merge_at<F>(&mut self, i: usize, v: &mut [E], compare: &mut F) -> Range<usize>
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        let left = self.runs[i];
        let right = self.runs[i + 1];
        debug_assert_eq!(left.end(), right.start);

        // Elements of the left run that are not greater than the first
        // element of the right run are already in place.
        let first = v[right.start];
        let skip = v[left.start..left.end()]
            .partition_point(|elem| compare(elem, &first) != Ordering::Greater);
        let a = left.start + skip;
        let len1 = left.len - skip;

        // Elements of the right run that are not less than the last element
        // of the left run are already in place.
        let len2 = if len1 == 0 {
            0
        } else {
            let last = v[left.end() - 1];
            v[right.start..right.end()]
                .partition_point(|elem| compare(elem, &last) == Ordering::Less)
        };
        let b = right.start;

        if len1 == 0 || len2 == 0 {
            self.merge_runs(i);
            return a..a;
        }

        if self.max_merge_size == 0 || len1 + len2 <= self.max_merge_size {
            if len1 <= len2 {
                self.merge_lo(v, a, len1, len2, compare);
            } else {
                self.merge_hi(v, a, len1, len2, compare);
            }
            self.merge_runs(i);
            return a..b + len2;
        }

        if len1 <= len2 {
            let (taken1, taken2) = self.partial_merge_lo(v, a, len1, len2, compare);
            if taken1 == len1 || taken2 == len2 {
                self.merge_runs(i);
            } else {
                self.runs[i].len += taken2;
                self.runs[i + 1] = Run { start: b + taken2, len: right.len - taken2 };
            }
            a..b + taken2
        } else {
            let (taken1, taken2) = self.partial_merge_hi(v, a, len1, len2, compare);
            if taken1 == len1 || taken2 == len2 {
                self.merge_runs(i);
            } else {
                self.runs[i].len -= taken1;
                self.runs[i + 1] = Run { start: b - taken1, len: right.len + taken1 };
            }
            b - taken1..b + len2
        }
    }

    fn merge_runs(&mut self, i: usize) {
        let right = self.runs.remove(i + 1);
        self.runs[i].len += right.len;
    }

    // Merge v[a..a + len1] and v[a + len1..a + len1 + len2], buffering the
    // left side.
    fn merge_lo<F>(&mut self, v: &mut [E], a: usize, len1: usize, len2: usize, compare: &mut F)
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        let b = a + len1;
        let end = b + len2;
        self.scratch.clear();
        self.scratch.extend_from_slice(&v[a..b]);

        let (mut i, mut j, mut out) = (0, b, a);
        while i < len1 && j < end {
            // On ties, prefer the left run to keep the sort stable.
            if compare(&v[j], &self.scratch[i]) == Ordering::Less {
                v[out] = v[j];
                j += 1;
            } else {
                v[out] = self.scratch[i];
                i += 1;
            }
            out += 1;
        }
        v[out..out + len1 - i].copy_from_slice(&self.scratch[i..]);
    }

    // Same as `merge_lo`, but buffering the right side and merging from the
    // back.
    fn merge_hi<F>(&mut self, v: &mut [E], a: usize, len1: usize, len2: usize, compare: &mut F)
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        let b = a + len1;
        self.scratch.clear();
        self.scratch.extend_from_slice(&v[b..b + len2]);

        let (mut i, mut j, mut out) = (b, len2, b + len2);
        while i > a && j > 0 {
            out -= 1;
            // On ties, the right run goes last.
            if compare(&self.scratch[j - 1], &v[i - 1]) == Ordering::Less {
                v[out] = v[i - 1];
                i -= 1;
            } else {
                v[out] = self.scratch[j - 1];
                j -= 1;
            }
        }
        v[out - j..out].copy_from_slice(&self.scratch[..j]);
    }

    // Move the `max_merge_size` smallest elements of both runs to the front,
    // in order. What remains of both runs stays sorted behind them.
    //
    // Returns how many elements were taken from each run.
    fn partial_merge_lo<F>(
        &mut self,
        v: &mut [E],
        a: usize,
        len1: usize,
        len2: usize,
        compare: &mut F,
    ) -> (usize, usize)
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        let b = a + len1;
        self.scratch.clear();

        let (mut i, mut j) = (0, 0);
        while i < len1 && j < len2 && i + j < self.max_merge_size {
            if compare(&v[b + j], &v[a + i]) == Ordering::Less {
                self.scratch.push(v[b + j]);
                j += 1;
            } else {
                self.scratch.push(v[a + i]);
                i += 1;
            }
        }

        // [taken from left, rest of left, taken from right, ..] becomes
        // [taken from left, taken from right, rest of left, ..]
        v[a + i..b + j].rotate_left(len1 - i);
        v[a..a + i + j].copy_from_slice(&self.scratch);
        (i, j)
    }

    // Move the `max_merge_size` largest elements of both runs to the back,
    // in order. What remains of both runs stays sorted in front of them.
    //
    // Returns how many elements were taken from each run.
    fn partial_merge_hi<F>(
        &mut self,
        v: &mut [E],
        a: usize,
        len1: usize,
        len2: usize,
        compare: &mut F,
    ) -> (usize, usize)
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        let b = a + len1;
        let end = b + len2;
        self.scratch.clear();

        let (mut i, mut j) = (0, 0);
        while i < len1 && j < len2 && i + j < self.max_merge_size {
            if compare(&v[end - 1 - j], &v[b - 1 - i]) == Ordering::Less {
                self.scratch.push(v[b - 1 - i]);
                i += 1;
            } else {
                self.scratch.push(v[end - 1 - j]);
                j += 1;
            }
        }

        // [.., rest of right, taken from left, ..] is what we want in front of
        // the taken elements, so swap the taken left elements behind the rest
        // of the right run.
        v[b - i..end - j].rotate_left(i);
        self.scratch.reverse();
        v[end - i - j..end].copy_from_slice(&self.scratch);
        (i, j)
    }

    fn update_progress(&mut self) {
        let level = |len: usize| len * (len.max(1).ilog2() as usize + 1);
        let total = level(self.len);
        let estimate = match total {
            0 => 0,
            total => {
                let done: usize = self.runs.iter().map(|run| level(run.len)).sum();
                (done as u128 * self.len as u128 / total as u128) as usize
            }
        };
        let estimate = if self.is_finished() { self.len } else { estimate };
        self.progress = self.progress.max(estimate);
    }
}

impl<E> fmt::Debug for TimSort<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimSort")
            .field("len", &self.len)
            .field("unsorted", &self.unsorted)
            .field("max_merge_size", &self.max_merge_size)
            .field("runs", &self.runs)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

/// Compute the minimum run length: a value between 32 and 64 so that
/// `len / min_run` is a power of two or slightly less than one.
fn compute_min_run(mut len: usize) -> usize {
    let mut r = 0;
    while len >= 64 {
        r |= len & 1;
        len >>= 1;
    }
    len + r
}

// Examines the stack of runs and identifies the next pair of runs to merge.
// If `Some(r)` is returned, `runs[r]` and `runs[r + 1]` must be merged next.
//
// The invariants are checked on the top four runs, checking the top three is
// not enough to keep them for the whole stack.
fn collapse(runs: &[Run]) -> Option<usize> {
    let n = runs.len();
    if n >= 2
        && (runs[n - 2].len <= runs[n - 1].len
            || (n >= 3 && runs[n - 3].len <= runs[n - 2].len + runs[n - 1].len)
            || (n >= 4 && runs[n - 4].len <= runs[n - 3].len + runs[n - 2].len))
    {
        if n >= 3 && runs[n - 3].len < runs[n - 1].len {
            Some(n - 3)
        } else {
            Some(n - 2)
        }
    } else {
        None
    }
}

// Once no unsorted elements are left, everything gets merged.
fn force_collapse(runs: &[Run]) -> Option<usize> {
    let n = runs.len();
    if n < 2 {
        None
    } else if n >= 3 && runs[n - 3].len < runs[n - 1].len {
        Some(n - 3)
    } else {
        Some(n - 2)
    }
}

/// Finds a streak of presorted elements starting at the beginning of the
/// slice. Returns the length of the streak, and whether it is strictly
/// descending and thus has to be reversed.
fn find_streak<E, F>(v: &[E], compare: &mut F) -> (usize, bool)
where
    F: FnMut(&E, &E) -> Ordering,
{
    let len = v.len();
    if len < 2 {
        return (len, false);
    }

    let mut end = 2;
    if compare(&v[1], &v[0]) == Ordering::Less {
        while end < len && compare(&v[end], &v[end - 1]) == Ordering::Less {
            end += 1;
        }
        (end, true)
    } else {
        while end < len && compare(&v[end], &v[end - 1]) != Ordering::Less {
            end += 1;
        }
        (end, false)
    }
}

// Sort `v` assuming `v[..offset]` is already sorted.
fn insertion_sort_shift_left<E: Copy, F>(v: &mut [E], offset: usize, compare: &mut F)
where
    F: FnMut(&E, &E) -> Ordering,
{
    for i in offset.max(1)..v.len() {
        let elem = v[i];
        let mut j = i;
        while j > 0 && compare(&elem, &v[j - 1]) == Ordering::Less {
            v[j] = v[j - 1];
            j -= 1;
        }
        v[j] = elem;
    }
}

pub(crate) fn union(a: Range<usize>, b: Range<usize>) -> Range<usize> {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b,
        (_, true) => a,
        _ => a.start.min(b.start)..a.end.max(b.end),
    }
}
