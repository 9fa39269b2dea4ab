use imbl::vector;
use listmodel::ObservableList;

#[test]
#[should_panic]
fn zero_capacity() {
    let _ob: ObservableList<i32> = ObservableList::with_capacity(0);
}

#[test]
#[should_panic]
fn capacity_overflow() {
    let _ob: ObservableList<usize> = ObservableList::with_capacity(usize::MAX / 2);
}

#[test]
#[should_panic]
fn insert_out_of_range() {
    let mut ob: ObservableList<i32> = ObservableList::new();
    ob.insert(1, -1);
}

#[test]
#[should_panic]
fn set_out_of_range() {
    let mut ob = ObservableList::<usize>::new();
    ob.append(vector![10, 20]);
    ob.set(2, 30);
}

#[test]
#[should_panic]
fn remove_out_of_range() {
    let mut ob: ObservableList<i32> = ObservableList::new();
    ob.remove(0);
}

#[test]
#[should_panic]
fn splice_past_the_end() {
    let mut ob = ObservableList::<usize>::new();
    ob.append(vector![10, 20]);
    ob.splice(1, 2, vector![]);
}
