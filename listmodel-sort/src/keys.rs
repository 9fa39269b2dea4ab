//! Sort keys: values computed once per item and compared instead of the items.

use std::{any::Any, cmp::Ordering, fmt, iter, mem, sync::Arc};

/// Storage for one sort key per item of a list.
///
/// Slots are addressed by the position of the item in the unsorted list. A
/// slot is either empty or holds the key of the item at its position; the
/// store does not track which, its owner does.
pub trait KeyStore<T>: Send {
    /// The number of slots.
    fn len(&self) -> usize;

    /// Whether there are no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether keys hold resources, so that they have to be cleared before a
    /// slot is reused or removed.
    fn needs_clear(&self) -> bool;

    /// Compute the key for `item` and store it in `slot`.
    fn init_key(&mut self, slot: usize, item: &T);

    /// Release the key in `slot`.
    fn clear_key(&mut self, slot: usize);

    /// Compare the keys in slots `a` and `b`.
    ///
    /// # Panics
    ///
    /// Panics if either slot does not hold a key.
    fn compare(&self, a: usize, b: usize) -> Ordering;

    /// Remove `removed` slots starting at `position` and insert `added` empty
    /// slots in their place.
    fn splice(&mut self, position: usize, removed: usize, added: usize);

    /// Access the store as [`Any`], for [`SortKeys::adopt_store`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Describes how a sorter turns items into keys and how it compares them.
pub trait SortKeys<T>: Send + Sync {
    /// Create storage for `len` keys. All slots start out empty.
    fn create_store(&self, len: usize) -> Box<dyn KeyStore<T>>;

    /// Make `store` compare its keys the way these keys do, if the keys it
    /// holds are valid for them.
    ///
    /// Returns `false` if `store` was created by incompatible keys; it is
    /// left unchanged in that case.
    fn adopt_store(&self, store: &mut dyn KeyStore<T>) -> bool;
}

type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;
type CompareFn<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// [`SortKeys`] from a key function and a comparison function.
///
/// Two `Keys` are compatible if they were created from the same key function
/// (that is, one is a clone of the other or was created with
/// [`with_compare`][Self::with_compare]), regardless of how they compare.
pub struct Keys<T, K> {
    key: KeyFn<T, K>,
    compare: CompareFn<K>,
}

impl<T, K> Keys<T, K>
where
    T: 'static,
    K: Send + 'static,
{
    /// Create keys that are extracted with `key` and compared with `compare`.
    pub fn new<F, C>(key: F, compare: C) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
        C: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        Self { key: Arc::new(key), compare: Arc::new(compare) }
    }

    /// Create keys compatible with `self` that compare with `compare`.
    pub fn with_compare<C>(&self, compare: C) -> Self
    where
        C: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        Self { key: self.key.clone(), compare: Arc::new(compare) }
    }
}

impl<T, K: Ord + Send + 'static> Keys<T, K>
where
    T: 'static,
{
    /// Create keys that are extracted with `key` and compared by their
    /// [`Ord`] implementation.
    pub fn by_key<F>(key: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::new(key, K::cmp)
    }
}

impl<T, K> Clone for Keys<T, K> {
    fn clone(&self) -> Self {
        Self { key: self.key.clone(), compare: self.compare.clone() }
    }
}

impl<T, K> fmt::Debug for Keys<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys").field("key_type", &std::any::type_name::<K>()).finish()
    }
}

impl<T, K> SortKeys<T> for Keys<T, K>
where
    T: 'static,
    K: Send + 'static,
{
    fn create_store(&self, len: usize) -> Box<dyn KeyStore<T>> {
        Box::new(KeyVec {
            keys: iter::repeat_with(|| None).take(len).collect(),
            key: self.key.clone(),
            compare: self.compare.clone(),
        })
    }

    fn adopt_store(&self, store: &mut dyn KeyStore<T>) -> bool {
        match store.as_any_mut().downcast_mut::<KeyVec<T, K>>() {
            Some(store) if Arc::ptr_eq(&store.key, &self.key) => {
                store.compare = self.compare.clone();
                true
            }
            _ => false,
        }
    }
}

struct KeyVec<T, K> {
    keys: Vec<Option<K>>,
    key: KeyFn<T, K>,
    compare: CompareFn<K>,
}

impl<T, K> KeyVec<T, K> {
    #[track_caller]
    fn key(&self, slot: usize) -> &K {
        self.keys[slot].as_ref().expect("sort key must be computed before comparing")
    }
}

impl<T, K> KeyStore<T> for KeyVec<T, K>
where
    T: 'static,
    K: Send + 'static,
{
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn needs_clear(&self) -> bool {
        mem::needs_drop::<K>()
    }

    fn init_key(&mut self, slot: usize, item: &T) {
        self.keys[slot] = Some((self.key)(item));
    }

    fn clear_key(&mut self, slot: usize) {
        self.keys[slot] = None;
    }

    fn compare(&self, a: usize, b: usize) -> Ordering {
        (self.compare)(self.key(a), self.key(b))
    }

    fn splice(&mut self, position: usize, removed: usize, added: usize) {
        self.keys
            .splice(position..position + removed, iter::repeat_with(|| None).take(added))
            .for_each(drop);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
