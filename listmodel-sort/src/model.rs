use std::{
    fmt,
    ops::Range,
    sync::Arc,
    task::Waker,
    time::{Duration, Instant},
};

use eyeball::{Observable, Subscriber};
use imbl::Vector;
use listmodel::{ItemsChanged, ListSender, ListSubscriber};
use smallvec::smallvec;

use crate::{
    keys::SortKeys,
    sorter::{Sorter, SorterChange, SorterOrder},
    timsort::{union, Runs, TimSort},
};

mod cache;
mod positions;
mod reconcile;

use self::{cache::SortKeyCache, positions::PositionIndex};

const DEFAULT_MAX_MERGE_SIZE: usize = 1024;
const DEFAULT_STEP_DURATION: Duration = Duration::from_millis(1);

/// A list that presents the items of a source list in the order of a
/// [`Sorter`].
///
/// The model keeps its own snapshot of the source. Changes of the source are
/// fed in with [`items_changed`][Self::items_changed], in the order they
/// happened; the model then broadcasts the corresponding changes of the
/// sorted view to its own [subscribers][Self::subscribe]. Sorting is stable:
/// items the sorter considers equal keep their source order.
///
/// Without a sorter, or with a sorter whose [order][Sorter::order] is
/// [`SorterOrder::None`], the model shows the source as it is.
///
/// # Incremental sorting
///
/// By default every change is sorted in right away. With
/// [`set_incremental(true)`][Self::set_incremental], sorting is split into
/// steps that each take about [`step_duration`][Self::set_step_duration],
/// and the owner of the model has to call [`sort_step`][Self::sort_step]
/// until it returns `false`. Until then, the view is partially sorted and
/// [`pending`][Self::pending] estimates the remaining work. The [`Sorted`]
/// stream adapter does the stepping between the changes it forwards.
///
/// [`Sorted`]: crate::Sorted
///
/// ```rust
/// use std::sync::Arc;
///
/// use listmodel_sort::{ItemsChanged, OrdSorter, SortListModel, Vector};
///
/// let mut model = SortListModel::<i32>::new(Some(Arc::new(OrdSorter::new())));
/// model.set_source(Some(Vector::from_iter([5, 3, 1, 4, 2])));
/// assert_eq!(model.values(), Vector::from_iter([1, 2, 3, 4, 5]));
///
/// // The source had 0 appended at its end.
/// model.items_changed(ItemsChanged::new(5, 0, Vector::unit(0)));
/// assert_eq!(model.get(0), Some(&0));
/// ```
pub struct SortListModel<T> {
    source: Option<Vector<T>>,
    sorter: Option<Arc<dyn Sorter<T>>>,
    incremental: bool,
    max_merge_size: usize,
    step_duration: Duration,
    // Present while the view is sorted, absent while it passes the source
    // through.
    state: Option<SortState<T>>,
    // Present while a sort is in progress.
    sort: Option<TimSort<usize>>,
    // The view as subscribers know it, updated with every emitted change.
    view: Vector<T>,
    sender: ListSender<T>,
    pending: Observable<usize>,
    idle_waker: Option<Waker>,
}

struct SortState<T> {
    keys: SortKeyCache<T>,
    positions: PositionIndex,
}

impl<T: Clone + Send + Sync + 'static> SortListModel<T> {
    /// Create a new `SortListModel` without a source.
    ///
    /// Up to 16 changes are buffered for subscribers, see
    /// [`with_capacity`][Self::with_capacity].
    pub fn new(sorter: Option<Arc<dyn Sorter<T>>>) -> Self {
        Self::with_capacity(sorter, 16)
    }

    /// Create a new `SortListModel` without a source, buffering up to
    /// `capacity` changes for subscribers that fall behind.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is `0`, or larger than `usize::MAX / 2`.
    pub fn with_capacity(sorter: Option<Arc<dyn Sorter<T>>>, capacity: usize) -> Self {
        Self {
            source: None,
            sorter,
            incremental: false,
            max_merge_size: DEFAULT_MAX_MERGE_SIZE,
            step_duration: DEFAULT_STEP_DURATION,
            state: None,
            sort: None,
            view: Vector::new(),
            sender: ListSender::new(capacity),
            pending: Observable::new(0),
            idle_waker: None,
        }
    }

    /// The source snapshot, in source order.
    pub fn source(&self) -> Option<&Vector<T>> {
        self.source.as_ref()
    }

    /// Replace the source.
    ///
    /// Subscribers see all previous items being replaced by the new ones. With
    /// incremental sorting, the new items start out in source order.
    pub fn set_source(&mut self, source: Option<Vector<T>>) {
        let removed = self.len();
        self.clear_items();
        self.source = source;
        let added = self.len();

        #[cfg(feature = "tracing")]
        tracing::debug!(target: "listmodel_sort::model", removed, added, "Source replaced");

        if let Some(keys) = self.sort_keys() {
            self.create_items(&*keys);
            if !self.start_sorting(None) {
                self.finish_sorting();
            }
        }

        if removed > 0 || added > 0 {
            self.emit(0, removed, added);
        }
    }

    /// The current sorter.
    pub fn sorter(&self) -> Option<&Arc<dyn Sorter<T>>> {
        self.sorter.as_ref()
    }

    /// Replace the sorter and re-sort.
    ///
    /// Setting the sorter that is already set does nothing.
    pub fn set_sorter(&mut self, sorter: Option<Arc<dyn Sorter<T>>>) {
        let unchanged = match (&self.sorter, &sorter) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        self.sorter = sorter;
        self.sorter_changed(SorterChange::Different);
    }

    /// Re-sort after the sorter changed the way it orders items.
    ///
    /// Keys that are still compatible with the sorter's keys are kept, and the
    /// sort starts from the current order.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn sorter_changed(&mut self, change: SorterChange) {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "listmodel_sort::model", ?change, "Sorter changed");

        let changed = match self.sort_keys() {
            Some(keys) => {
                self.stop_sorting();
                match &mut self.state {
                    Some(state) => {
                        if !state.keys.adopt(&*keys) {
                            state.keys = SortKeyCache::new(&*keys, state.positions.len());
                        }
                    }
                    None => self.create_items(&*keys),
                }

                if self.start_sorting(None) {
                    0..0
                } else {
                    self.finish_sorting()
                }
            }
            None => self.clear_items(),
        };

        if !changed.is_empty() {
            self.emit(changed.start, changed.len(), changed.len());
        }
    }

    /// Whether sorting is split into steps.
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Choose between sorting in steps and sorting right away.
    ///
    /// Turning incremental sorting off while a sort is in progress finishes
    /// it.
    pub fn set_incremental(&mut self, incremental: bool) {
        if self.incremental == incremental {
            return;
        }
        self.incremental = incremental;

        if !incremental && self.is_sorting() {
            let changed = self.finish_sorting();
            if !changed.is_empty() {
                self.emit(changed.start, changed.len(), changed.len());
            }
        }
    }

    /// Limit the number of items a single incremental merge compares.
    ///
    /// Defaults to 1024. `0` removes the limit. Takes effect for the next
    /// sort.
    pub fn set_max_merge_size(&mut self, max_merge_size: usize) {
        self.max_merge_size = max_merge_size;
    }

    /// Limit the time a single [`sort_step`][Self::sort_step] spends.
    ///
    /// Defaults to one millisecond. A step always makes some progress, so it
    /// may overrun this by the time of one bounded merge.
    pub fn set_step_duration(&mut self, step_duration: Duration) {
        self.step_duration = step_duration;
    }

    /// Whether an incremental sort is in progress.
    pub fn is_sorting(&self) -> bool {
        self.sort.is_some()
    }

    /// Continue the sort in progress for about the
    /// [step duration][Self::set_step_duration].
    ///
    /// Items that were reordered are announced to subscribers. Returns
    /// whether more steps are needed; `false` if no sort is in progress.
    pub fn sort_step(&mut self) -> bool {
        if self.sort.is_none() {
            return false;
        }

        let deadline = Instant::now() + self.step_duration;
        let changed = self.run_sort(Some(deadline));
        if !changed.is_empty() {
            self.emit(changed.start, changed.len(), changed.len());
        }

        if self.sort.as_ref().is_some_and(|sort| sort.is_finished()) {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "listmodel_sort::model", "Incremental sort finished");

            self.stop_sorting();
            false
        } else {
            self.update_pending();
            true
        }
    }

    /// An estimate of the work left for the sort in progress, in items.
    ///
    /// `0` if no sort is in progress.
    pub fn pending(&self) -> usize {
        *self.pending
    }

    /// Subscribe to changes of [`pending`][Self::pending].
    pub fn subscribe_pending(&self) -> Subscriber<usize> {
        Observable::subscribe(&self.pending)
    }

    /// The number of items.
    pub fn len(&self) -> usize {
        self.source.as_ref().map_or(0, Vector::len)
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at `index` of the view.
    pub fn get(&self, index: usize) -> Option<&T> {
        let source = self.source.as_ref()?;
        match &self.state {
            Some(state) => source.get(state.positions.get(index)?),
            None => source.get(index),
        }
    }

    /// Iterate over the items in view order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(|index| self.get(index))
    }

    /// The items in view order.
    pub fn values(&self) -> Vector<T> {
        self.view.clone()
    }

    /// Obtain a new subscriber for changes of the view.
    ///
    /// Its initial values are the current [`values`][Self::values].
    pub fn subscribe(&self) -> ListSubscriber<T> {
        self.sender.subscribe(self.view.clone())
    }

    pub(crate) fn set_idle_waker(&mut self, waker: &Waker) {
        match &self.idle_waker {
            Some(current) if current.will_wake(waker) => {}
            _ => self.idle_waker = Some(waker.clone()),
        }
    }

    // The keys to sort by, if the view is to be sorted at all.
    fn sort_keys(&self) -> Option<Arc<dyn SortKeys<T>>> {
        self.source.as_ref()?;
        let sorter = self.sorter.as_ref()?;
        (sorter.order() != SorterOrder::None).then(|| sorter.keys())
    }

    fn create_items(&mut self, keys: &dyn SortKeys<T>) {
        let len = self.len();
        let keys = SortKeyCache::new(keys, len);
        self.state = Some(SortState { keys, positions: PositionIndex::new(len) });
    }

    // Drop all sorting state. Returns the range of the view that was not in
    // source order.
    fn clear_items(&mut self) -> Range<usize> {
        self.stop_sorting();
        self.state.take().map_or(0..0, |state| state.positions.reordered())
    }

    // Start a sort, seeded with the runs of an earlier one. Returns whether
    // it runs incrementally; otherwise the caller has to finish it.
    fn start_sorting(&mut self, runs: Option<&[usize]>) -> bool {
        let Some(state) = &self.state else {
            return false;
        };

        let mut sort = TimSort::new(state.positions.len());
        if let Some(runs) = runs {
            sort.set_runs(runs);
        }
        if self.incremental {
            sort.set_max_merge_size(self.max_merge_size);
        }
        self.sort = Some(sort);

        if !self.incremental {
            return false;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(target: "listmodel_sort::model", "Incremental sort started");

        self.update_pending();
        if let Some(waker) = self.idle_waker.take() {
            waker.wake();
        }
        true
    }

    // Stop the sort in progress. Returns the sorted runs at the start of the
    // view, which is a single run if no sort was in progress.
    fn stop_sorting(&mut self) -> Runs {
        let runs = match self.sort.take() {
            Some(sort) => sort.runs(),
            None => smallvec![self.state.as_ref().map_or(0, |state| state.positions.len())],
        };
        self.update_pending();
        runs
    }

    // Sort to completion. Returns the range of the view that was reordered.
    fn finish_sorting(&mut self) -> Range<usize> {
        let Some(sort) = &mut self.sort else {
            return 0..0;
        };
        sort.set_max_merge_size(0);

        let changed = self.run_sort(None);
        self.stop_sorting();
        changed
    }

    // Compute missing keys, then sort, until done or past `deadline`.
    // Returns the range of the view that was reordered.
    fn run_sort(&mut self, deadline: Option<Instant>) -> Range<usize> {
        let (Some(source), Some(state), Some(sort)) =
            (&self.source, &mut self.state, &mut self.sort)
        else {
            return 0..0;
        };

        if state.keys.has_missing() && !state.keys.compute_missing(source, deadline) {
            return 0..0;
        }

        let SortState { keys, positions } = state;
        let mut compare = |a: &usize, b: &usize| keys.compare(*a, *b).then_with(|| a.cmp(b));

        let mut changed = 0..0;
        while let Some(range) = sort.step(positions.as_mut_slice(), &mut compare) {
            changed = union(changed, range);
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
        }
        changed
    }

    fn compute_pending(&self) -> usize {
        match (&self.sort, &self.state) {
            (Some(sort), Some(state)) if state.keys.has_missing() => {
                (sort.len() + state.keys.missing_count()) / 2
            }
            (Some(sort), Some(_)) => (sort.len() - sort.progress()) / 2,
            _ => 0,
        }
    }

    fn update_pending(&mut self) {
        let pending = self.compute_pending();
        Observable::set_if_not_eq(&mut self.pending, pending);
    }

    // Announce that `removed` items at `position` of the view were replaced
    // by the `added` items now found there.
    fn emit(&mut self, position: usize, removed: usize, added: usize) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            target: "listmodel_sort::model",
            position, removed, added,
            "Emitting items-changed"
        );

        let added: Vector<T> =
            (position..position + added).filter_map(|index| self.get(index)).cloned().collect();
        let change = ItemsChanged::new(position, removed, added);

        if self.sender.has_subscribers() {
            change.clone().apply(&mut self.view);
            self.sender.send(change, || self.view.clone());
        } else {
            change.apply(&mut self.view);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for SortListModel<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T: fmt::Debug> fmt::Debug for SortListModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortListModel")
            .field("source", &self.source)
            .field("incremental", &self.incremental)
            .field("sorting", &self.sort.is_some())
            .field("pending", &*self.pending)
            .finish_non_exhaustive()
    }
}
