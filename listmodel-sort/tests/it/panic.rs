use imbl::vector;

use listmodel_sort::{timsort::TimSort, ItemsChanged, SortListModel};

use super::ascending;

#[test]
#[should_panic(expected = "no source")]
fn items_changed_without_source() {
    let mut model = SortListModel::new(Some(ascending()));
    model.items_changed(ItemsChanged::new(0, 0, vector![1]));
}

#[test]
#[should_panic(expected = "change out of bounds")]
fn change_past_the_end() {
    let mut model = SortListModel::new(Some(ascending()));
    model.set_source(Some(vector![1, 2]));
    model.items_changed(ItemsChanged::new(1, 2, vector![]));
}

#[test]
#[should_panic(expected = "runs can only be set before the sort starts")]
fn set_runs_after_step() {
    let mut v = [2, 1, 3];
    let mut sort = TimSort::new(v.len());
    sort.step(&mut v, &mut |a, b| a.cmp(b));
    sort.set_runs(&[3]);
}

#[test]
#[should_panic(expected = "runs cover 4 elements")]
fn runs_longer_than_slice() {
    let mut sort = TimSort::<u8>::new(3);
    sort.set_runs(&[2, 2]);
}
