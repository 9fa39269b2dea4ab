//! Sorters decide the order of a [`SortListModel`][crate::SortListModel].

use std::{cmp::Ordering, fmt, marker::PhantomData, sync::Arc};

use crate::keys::{Keys, SortKeys};

/// How strictly a sorter orders items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SorterOrder {
    /// All items compare equal. A sort model does not reorder anything.
    None,
    /// Some different items may compare equal.
    Partial,
    /// Only identical items compare equal.
    Total,
}

/// What changed about a sorter, passed to
/// [`SortListModel::sorter_changed`][crate::SortListModel::sorter_changed].
///
/// This is a hint. Every change is handled by sorting again, starting from the
/// current order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SorterChange {
    /// The sorter orders items differently now.
    Different,
    /// The sorter orders items in the reverse order now.
    Inverted,
    /// Items that compared unequal before may compare equal now.
    LessStrict,
    /// Items that compared equal before may compare unequal now.
    MoreStrict,
}

/// Direction of a key based sort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Smallest keys first.
    #[default]
    Ascending,
    /// Largest keys first.
    Descending,
}

impl SortOrder {
    /// Apply this order to the result of comparing two keys in ascending
    /// order.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Decides the order of items.
///
/// A sorter does not compare items itself. It hands out [`SortKeys`] that
/// extract a key from every item once; those keys are then compared while
/// sorting. Returning the same keys (or keys made compatible through
/// [`Keys::with_compare`]) from a new sorter lets a sort model keep the keys it
/// already computed.
///
/// A sorter must not panic while keys are computed or compared; a sort model
/// whose sorter panicked can only be dropped.
pub trait Sorter<T>: Send + Sync {
    /// How strictly this sorter orders items.
    fn order(&self) -> SorterOrder {
        SorterOrder::Partial
    }

    /// The keys to sort items by.
    fn keys(&self) -> Arc<dyn SortKeys<T>>;
}

/// Sorts items by their [`Ord`] implementation.
pub struct OrdSorter<T> {
    order: SortOrder,
    keys: Arc<Keys<T, T>>,
}

impl<T: Ord + Clone + Send + 'static> OrdSorter<T> {
    /// Create a sorter for ascending order.
    pub fn new() -> Self {
        Self::with_order(SortOrder::Ascending)
    }

    /// Create a sorter for the given order.
    pub fn with_order(order: SortOrder) -> Self {
        let keys = Keys::new(T::clone, move |a: &T, b: &T| order.apply(a.cmp(b)));
        Self { order, keys: Arc::new(keys) }
    }

    /// Create a sorter for the opposite order.
    ///
    /// Its keys are compatible with this sorter's.
    pub fn reversed(&self) -> Self {
        let order = match self.order {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        };
        let keys = self.keys.with_compare(move |a: &T, b: &T| order.apply(a.cmp(b)));
        Self { order, keys: Arc::new(keys) }
    }
}

impl<T: Ord + Clone + Send + 'static> Default for OrdSorter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for OrdSorter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrdSorter").field("order", &self.order).finish()
    }
}

impl<T: Ord + Clone + Send + Sync + 'static> Sorter<T> for OrdSorter<T> {
    fn order(&self) -> SorterOrder {
        SorterOrder::Total
    }

    fn keys(&self) -> Arc<dyn SortKeys<T>> {
        self.keys.clone()
    }
}

/// Sorts items with a comparison function.
///
/// The items themselves are used as keys, so they are cloned once per sort.
pub struct SortBy<T> {
    keys: Arc<Keys<T, T>>,
}

impl<T: Clone + Send + 'static> SortBy<T> {
    /// Create a sorter that compares items with `compare`.
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self { keys: Arc::new(Keys::new(T::clone, compare)) }
    }
}

impl<T> fmt::Debug for SortBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortBy").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Sorter<T> for SortBy<T> {
    fn keys(&self) -> Arc<dyn SortKeys<T>> {
        self.keys.clone()
    }
}

/// Sorts items by a key extracted from each of them.
///
/// ```rust
/// use std::sync::Arc;
///
/// use listmodel_sort::{Vector, SortByKey, SortListModel, SortOrder};
///
/// let by_len = SortByKey::new(|s: &String| s.len());
/// let mut model = SortListModel::<String>::new(Some(Arc::new(by_len.clone())));
/// model.set_source(Some(Vector::from_iter(["ccc", "a", "bb"].map(String::from))));
/// assert_eq!(model.values(), Vector::from_iter(["a", "bb", "ccc"].map(String::from)));
///
/// // Keys are shared, so only the order has to be restored.
/// model.set_sorter(Some(Arc::new(by_len.with_order(SortOrder::Descending))));
/// assert_eq!(model.values(), Vector::from_iter(["ccc", "bb", "a"].map(String::from)));
/// ```
pub struct SortByKey<T, K> {
    order: SortOrder,
    keys: Arc<Keys<T, K>>,
}

impl<T, K> SortByKey<T, K>
where
    T: 'static,
    K: Ord + Send + 'static,
{
    /// Create a sorter that sorts by the keys `key` returns, in ascending
    /// order.
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self { order: SortOrder::Ascending, keys: Arc::new(Keys::by_key(key)) }
    }

    /// The direction this sorter sorts in.
    pub fn sort_order(&self) -> SortOrder {
        self.order
    }

    /// Create a sorter with the same keys that sorts in the given order.
    pub fn with_order(&self, order: SortOrder) -> Self {
        let keys = self.keys.with_compare(move |a: &K, b: &K| order.apply(a.cmp(b)));
        Self { order, keys: Arc::new(keys) }
    }
}

impl<T, K> Clone for SortByKey<T, K> {
    fn clone(&self) -> Self {
        Self { order: self.order, keys: self.keys.clone() }
    }
}

impl<T, K> fmt::Debug for SortByKey<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortByKey").field("order", &self.order).finish_non_exhaustive()
    }
}

impl<T, K> Sorter<T> for SortByKey<T, K>
where
    T: Send + Sync + 'static,
    K: Ord + Send + 'static,
{
    fn keys(&self) -> Arc<dyn SortKeys<T>> {
        self.keys.clone()
    }
}

/// A sorter that considers all items equal, so the source order is kept.
pub struct Unsorted<T> {
    _item: PhantomData<fn(&T)>,
}

impl<T> Unsorted<T> {
    /// Create a new `Unsorted` sorter.
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for Unsorted<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Unsorted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsorted")
    }
}

impl<T: 'static> Sorter<T> for Unsorted<T> {
    fn order(&self) -> SorterOrder {
        SorterOrder::None
    }

    fn keys(&self) -> Arc<dyn SortKeys<T>> {
        Arc::new(Keys::new(|_: &T| (), |_: &(), _: &()| Ordering::Equal))
    }
}
