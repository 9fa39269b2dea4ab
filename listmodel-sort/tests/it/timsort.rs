use std::cmp::Ordering;

use rand::{rngs::StdRng, Rng, SeedableRng};

use listmodel_sort::timsort::TimSort;

type Item = (u8, u32);

fn by_key(a: &Item, b: &Item) -> Ordering {
    a.0.cmp(&b.0)
}

fn random_items(seed: u64, len: usize) -> Vec<Item> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len as u32).map(|id| (rng.gen_range(0..32), id)).collect()
}

fn stable_sorted(items: &[Item]) -> Vec<Item> {
    let mut items = items.to_vec();
    items.sort_by(by_key);
    items
}

#[test]
fn matches_stable_sort() {
    for (seed, len) in [(1, 0), (2, 1), (3, 2), (4, 63), (5, 64), (6, 65), (7, 1000), (8, 5000)] {
        let items = random_items(seed, len);
        let expected = stable_sorted(&items);

        for max_merge_size in [0, 1, 7, 64, 1024] {
            let mut v = items.clone();
            let mut sort = TimSort::new(v.len());
            sort.set_max_merge_size(max_merge_size);
            while sort.step(&mut v, &mut by_key).is_some() {}

            assert!(sort.is_finished());
            assert_eq!(v, expected, "len {len}, max merge size {max_merge_size}");
        }
    }
}

#[test]
fn presorted_input() {
    let mut ascending: Vec<u32> = (0..500).collect();
    let mut sort = TimSort::new(ascending.len());
    assert_eq!(sort.finish(&mut ascending, &mut |a, b| a.cmp(b)), 0..0);
    assert_eq!(sort.runs().as_slice(), [500]);

    let mut descending: Vec<u32> = (0..500).rev().collect();
    let mut sort = TimSort::new(descending.len());
    assert_eq!(sort.finish(&mut descending, &mut |a, b| a.cmp(b)), 0..500);
    assert!(descending.iter().copied().eq(0..500));
}

#[test]
fn changed_ranges_cover_all_moves() {
    let mut v = random_items(9, 700);
    let expected = stable_sorted(&v);

    let mut sort = TimSort::new(v.len());
    sort.set_max_merge_size(16);
    loop {
        let before = v.clone();
        let Some(changed) = sort.step(&mut v, &mut by_key) else { break };

        for (i, (old, new)) in before.iter().zip(&v).enumerate() {
            if old != new {
                assert!(changed.contains(&i), "index {i} moved outside of {changed:?}");
            }
        }
    }

    assert_eq!(v, expected);
}

#[test]
fn progress_is_monotone() {
    let mut v = random_items(10, 3000);
    let mut sort = TimSort::new(v.len());
    sort.set_max_merge_size(32);
    assert_eq!(sort.progress(), 0);

    let mut last = 0;
    while sort.step(&mut v, &mut by_key).is_some() {
        let progress = sort.progress();
        assert!(progress >= last, "progress went down from {last} to {progress}");
        assert!(progress <= sort.len());
        last = progress;
    }

    assert_eq!(sort.progress(), sort.len());
}

#[test]
fn resume_from_runs() {
    let mut v = random_items(11, 2000);
    let expected = stable_sorted(&v);

    let mut sort = TimSort::new(v.len());
    sort.set_max_merge_size(8);
    for _ in 0..40 {
        sort.step(&mut v, &mut by_key);
    }
    while sort.runs().len() < 2 {
        assert!(sort.step(&mut v, &mut by_key).is_some());
    }

    let runs = sort.runs();
    let mut start = 0;
    for &len in &runs {
        let run = &v[start..start + len];
        assert!(run.windows(2).all(|w| by_key(&w[0], &w[1]) != Ordering::Greater));
        start += len;
    }

    // A fresh sort picks up where the old one stopped.
    let mut resumed = TimSort::new(v.len());
    resumed.set_runs(&runs);
    assert!(resumed.progress() > 0);
    resumed.finish(&mut v, &mut by_key);

    assert!(resumed.is_finished());
    assert_eq!(v, expected);
}

#[test]
fn zero_length_runs_are_ignored() {
    let mut v = [1, 3, 2, 4];
    let mut sort = TimSort::new(v.len());
    sort.set_runs(&[0, 2, 0, 2]);
    assert_eq!(sort.runs().as_slice(), [2, 2]);

    assert_eq!(sort.finish(&mut v, &mut |a, b| a.cmp(b)), 1..3);
    assert_eq!(v, [1, 2, 3, 4]);
}
