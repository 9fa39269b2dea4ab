#![allow(missing_docs)]

use std::sync::Arc;

use futures_util::{FutureExt, StreamExt};
use imbl::{vector, Vector};
use stream_assert::{assert_next_eq, assert_pending};

use listmodel::ListSubscriberStream;
use listmodel_sort::{ItemsChanged, OrdSorter, SortByKey, SortListModel, Sorter, Unsorted};

mod panic;
mod sorter;
mod timsort;

fn ascending() -> Arc<dyn Sorter<i32>> {
    Arc::new(OrdSorter::new())
}

/// Apply all changes `sub` has ready to `mirror`.
fn drain<T>(sub: &mut ListSubscriberStream<T>, mirror: &mut Vector<T>)
where
    T: Clone + Send + Sync + 'static,
{
    while let Some(Some(change)) = sub.next().now_or_never() {
        change.apply(mirror);
    }
}

/// `items` sorted by `key` with a stable sort.
fn stable_sorted<T: Clone, K: Ord>(items: &Vector<T>, key: impl Fn(&T) -> K) -> Vector<T> {
    let mut items: Vec<T> = items.iter().cloned().collect();
    items.sort_by_key(key);
    items.into()
}

#[test]
fn sorts_source() {
    let mut model = SortListModel::new(Some(ascending()));
    let mut sub = model.subscribe().into_stream();

    model.set_source(Some(vector![5, 3, 1, 4, 2]));
    assert_next_eq!(sub, ItemsChanged::new(0, 0, vector![1, 2, 3, 4, 5]));
    assert_pending!(sub);

    assert_eq!(model.len(), 5);
    assert_eq!(model.get(0), Some(&1));
    assert_eq!(model.get(4), Some(&5));
    assert_eq!(model.get(5), None);
    assert_eq!(model.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
    assert_eq!(model.source(), Some(&vector![5, 3, 1, 4, 2]));
    assert!(!model.is_sorting());
    assert_eq!(model.pending(), 0);
}

#[test]
fn stable() {
    let by_number = SortByKey::new(|&(number, _): &(u8, &'static str)| number);
    let mut model = SortListModel::<(u8, &str)>::new(Some(Arc::new(by_number)));

    model.set_source(Some(vector![(1, "a"), (1, "b"), (0, "c")]));
    assert_eq!(model.values(), vector![(0, "c"), (1, "a"), (1, "b")]);

    let sorter = SortByKey::new(|&(number, _): &(u8, char)| number);
    let mut model = SortListModel::<(u8, char)>::new(Some(Arc::new(sorter)));
    model.set_source(Some(vector![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd'), (1, 'e')]));
    assert_eq!(model.values(), vector![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c'), (1, 'e')]);
}

#[test]
fn without_sorter() {
    let mut model = SortListModel::new(None);
    let mut sub = model.subscribe().into_stream();

    model.set_source(Some(vector![3, 1, 2]));
    assert_next_eq!(sub, ItemsChanged::new(0, 0, vector![3, 1, 2]));
    assert_eq!(model.values(), vector![3, 1, 2]);

    model.items_changed(ItemsChanged::new(1, 1, vector![9]));
    assert_next_eq!(sub, ItemsChanged::new(1, 1, vector![9]));
    assert_pending!(sub);
    assert_eq!(model.values(), vector![3, 9, 2]);
}

#[test]
fn unsorted_passes_through() {
    let mut model = SortListModel::<i32>::new(Some(Arc::new(Unsorted::new())));
    model.set_source(Some(vector![3, 1, 2]));
    let mut sub = model.subscribe().into_stream();
    assert_eq!(model.values(), vector![3, 1, 2]);

    model.items_changed(ItemsChanged::new(3, 0, vector![0]));
    assert_next_eq!(sub, ItemsChanged::new(3, 0, vector![0]));
    assert_pending!(sub);
}

#[test]
fn sorter_without_order_restores_source_order() {
    let mut model = SortListModel::new(Some(ascending()));
    model.set_source(Some(vector![3, 1, 2]));
    let mut sub = model.subscribe().into_stream();

    model.set_sorter(Some(Arc::new(Unsorted::new())));
    assert_next_eq!(sub, ItemsChanged::new(0, 3, vector![3, 1, 2]));
    assert_pending!(sub);

    // Only the part that was out of order is announced.
    let mut model = SortListModel::new(Some(ascending()));
    model.set_source(Some(vector![1, 2, 4, 3, 5]));
    let mut sub = model.subscribe().into_stream();

    model.set_sorter(None);
    assert_next_eq!(sub, ItemsChanged::new(2, 2, vector![4, 3]));
    assert_pending!(sub);
}

#[test]
fn set_same_sorter() {
    let sorter = ascending();
    let mut model = SortListModel::new(None);
    model.set_source(Some(vector![3, 1, 2]));
    let mut sub = model.subscribe().into_stream();

    model.set_sorter(Some(sorter.clone()));
    assert_next_eq!(sub, ItemsChanged::new(0, 3, vector![1, 2, 3]));

    model.set_sorter(Some(sorter.clone()));
    assert_pending!(sub);

    model.set_sorter(None);
    assert_next_eq!(sub, ItemsChanged::new(0, 3, vector![3, 1, 2]));

    model.set_sorter(None);
    assert_pending!(sub);
}

#[test]
fn already_sorted_source() {
    let mut model = SortListModel::new(None);
    model.set_source(Some(vector![1, 2, 3]));
    let mut sub = model.subscribe().into_stream();

    model.set_sorter(Some(ascending()));
    assert_pending!(sub);
    assert_eq!(model.values(), vector![1, 2, 3]);
}

#[test]
fn replace_source() {
    let mut model = SortListModel::new(Some(ascending()));
    model.set_source(Some(vector![2, 1]));
    let mut sub = model.subscribe().into_stream();

    model.set_source(Some(vector![9, 7, 8]));
    assert_next_eq!(sub, ItemsChanged::new(0, 2, vector![7, 8, 9]));

    model.set_source(None);
    assert_next_eq!(sub, ItemsChanged::new(0, 3, vector![]));
    assert!(model.is_empty());
    assert_eq!(model.get(0), None);

    model.set_source(Some(vector![]));
    assert_pending!(sub);
}

#[test]
fn subscribe_sees_sorted_values() {
    let mut model = SortListModel::new(Some(ascending()));
    model.set_source(Some(vector![3, 1, 2]));

    let (values, mut sub) = model.subscribe().into_values_and_stream();
    assert_eq!(values, vector![1, 2, 3]);
    assert_pending!(sub);
}
