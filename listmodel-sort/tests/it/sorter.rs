use std::{
    cmp::Ordering,
    sync::{
        atomic::{self, AtomicUsize},
        Arc,
    },
};

use imbl::vector;
use stream_assert::{assert_next_eq, assert_pending};

use listmodel_sort::{
    ItemsChanged, Keys, OrdSorter, SortBy, SortByKey, SortKeys, SortListModel, SortOrder, Sorter,
    SorterChange, SorterOrder,
};

fn counting_key(calls: &Arc<AtomicUsize>) -> impl Fn(&i32) -> i32 + Send + Sync + 'static {
    let calls = calls.clone();
    move |&value| {
        calls.fetch_add(1, atomic::Ordering::SeqCst);
        value
    }
}

#[test]
fn compatible_keys_are_kept() {
    let calls = Arc::new(AtomicUsize::new(0));
    let by_value = SortByKey::new(counting_key(&calls));

    let mut model = SortListModel::<i32>::new(Some(Arc::new(by_value.clone())));
    model.set_source(Some(vector![3, 1, 2]));
    assert_eq!(calls.load(atomic::Ordering::SeqCst), 3);
    let mut sub = model.subscribe().into_stream();

    model.set_sorter(Some(Arc::new(by_value.with_order(SortOrder::Descending))));
    assert_next_eq!(sub, ItemsChanged::new(0, 3, vector![3, 2, 1]));
    assert_eq!(calls.load(atomic::Ordering::SeqCst), 3);

    // Only the new item needs a key.
    model.items_changed(ItemsChanged::new(0, 0, vector![0]));
    assert_next_eq!(sub, ItemsChanged::new(3, 0, vector![0]));
    assert_eq!(calls.load(atomic::Ordering::SeqCst), 4);
}

#[test]
fn incompatible_keys_are_recomputed() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut model = SortListModel::<i32>::new(Some(Arc::new(OrdSorter::new())));
    model.set_source(Some(vector![3, 1, 2]));
    let mut sub = model.subscribe().into_stream();

    let by_value = SortByKey::new(counting_key(&calls)).with_order(SortOrder::Descending);
    model.set_sorter(Some(Arc::new(by_value)));
    assert_eq!(calls.load(atomic::Ordering::SeqCst), 3);
    assert_next_eq!(sub, ItemsChanged::new(0, 3, vector![3, 2, 1]));
    assert_pending!(sub);
}

#[test]
fn descending_is_stable() {
    let by_number = SortByKey::new(|&(number, _): &(u8, char)| number);
    let descending = by_number.with_order(SortOrder::Descending);
    let mut model = SortListModel::<(u8, char)>::new(Some(Arc::new(descending)));

    model.set_source(Some(vector![(1, 'a'), (2, 'b'), (1, 'c'), (2, 'd')]));
    assert_eq!(model.values(), vector![(2, 'b'), (2, 'd'), (1, 'a'), (1, 'c')]);
}

#[test]
fn sort_by() {
    let by_len = SortBy::new(|a: &String, b: &String| a.len().cmp(&b.len()));
    let mut model = SortListModel::<String>::new(Some(Arc::new(by_len)));

    let strings = |items: [&str; 4]| items.into_iter().map(str::to_owned).collect();
    model.set_source(Some(strings(["ccc", "a", "bb", "d"])));
    assert_eq!(model.values(), strings(["a", "d", "bb", "ccc"]));
}

#[test]
fn ord_sorter_reversed() {
    let ascending = OrdSorter::<char>::new();
    let descending = ascending.reversed();
    assert_eq!(Sorter::order(&ascending), SorterOrder::Total);

    let mut model = SortListModel::<char>::new(Some(Arc::new(ascending)));
    model.set_source(Some(vector!['b', 'c', 'a']));
    assert_eq!(model.values(), vector!['a', 'b', 'c']);

    model.set_sorter(Some(Arc::new(descending)));
    assert_eq!(model.values(), vector!['c', 'b', 'a']);
}

/// A sorter whose direction can be flipped in place, reporting the change
/// through `sorter_changed`.
struct Flippable {
    descending: Arc<atomic::AtomicBool>,
    keys: Arc<Keys<i32, i32>>,
}

impl Flippable {
    fn new() -> Self {
        let descending = Arc::new(atomic::AtomicBool::new(false));
        let keys = {
            let descending = descending.clone();
            Keys::by_key(|&value: &i32| value).with_compare(move |a: &i32, b: &i32| {
                let ordering = a.cmp(b);
                if descending.load(atomic::Ordering::SeqCst) {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
        };
        Self { descending, keys: Arc::new(keys) }
    }
}

impl Sorter<i32> for Flippable {
    fn keys(&self) -> Arc<dyn SortKeys<i32>> {
        self.keys.clone()
    }
}

#[test]
fn sorter_changed_in_place() {
    let sorter = Arc::new(Flippable::new());
    let descending = sorter.descending.clone();

    let mut model = SortListModel::new(Some(sorter as Arc<dyn Sorter<i32>>));
    model.set_source(Some(vector![2, 3, 1]));
    assert_eq!(model.values(), vector![1, 2, 3]);
    let mut sub = model.subscribe().into_stream();

    descending.store(true, atomic::Ordering::SeqCst);
    model.sorter_changed(SorterChange::Inverted);
    assert_next_eq!(sub, ItemsChanged::new(0, 3, vector![3, 2, 1]));

    // Nothing changed, nothing to announce.
    model.sorter_changed(SorterChange::Different);
    assert_pending!(sub);
}

#[test]
fn custom_keys_compare() {
    let keys = Keys::new(|s: &&str| s.to_lowercase(), |a: &String, b: &String| a.cmp(b));
    let store_keys: Arc<dyn SortKeys<&'static str>> = Arc::new(keys);

    let mut store = store_keys.create_store(2);
    assert_eq!(store.len(), 2);
    store.init_key(0, &"B");
    store.init_key(1, &"a");
    assert_eq!(store.compare(0, 1), Ordering::Greater);
    assert!(store.needs_clear());

    store.splice(0, 1, 2);
    assert_eq!(store.len(), 3);
    store.init_key(0, &"c");
    assert_eq!(store.compare(0, 2), Ordering::Greater);

    let other: Arc<dyn SortKeys<&'static str>> =
        Arc::new(Keys::new(|s: &&str| s.len(), |a: &usize, b: &usize| a.cmp(b)));
    assert!(!other.adopt_store(store.as_mut()));
    assert!(store_keys.adopt_store(store.as_mut()));
}
