use imbl::Vector;

/// A change to a list.
///
/// At `position`, `removed` items were removed and the items in `added` were
/// inserted in their place. Items before `position` are unaffected, items
/// after the removed range were shifted by `added.len() - removed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemsChanged<T> {
    /// The position at which the change happened.
    pub position: usize,
    /// The number of items that were removed at `position`.
    pub removed: usize,
    /// The items that were inserted at `position`.
    pub added: Vector<T>,
}

impl<T: Clone> ItemsChanged<T> {
    /// Create a new `ItemsChanged`.
    pub fn new(position: usize, removed: usize, added: Vector<T>) -> Self {
        Self { position, removed, added }
    }

    /// The number of items that were added.
    pub fn n_added(&self) -> usize {
        self.added.len()
    }

    /// Whether this change neither removes nor adds anything.
    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.added.is_empty()
    }

    /// Transform `ItemsChanged<T>` into `ItemsChanged<U>` by applying the
    /// given function to the added items.
    pub fn map<U: Clone>(self, f: impl FnMut(T) -> U) -> ItemsChanged<U> {
        ItemsChanged {
            position: self.position,
            removed: self.removed,
            added: self.added.into_iter().map(f).collect(),
        }
    }

    /// Applies this change to a vector.
    ///
    /// This is useful to keep two vectors in sync, with potentially one
    /// containing data [`map`](Self::map)ped from the other.
    ///
    /// # Panics
    ///
    /// Panics if `position + removed` is past the end of `vec`.
    #[track_caller]
    pub fn apply(self, vec: &mut Vector<T>) {
        let len = vec.len();
        if self.position > len || self.removed > len - self.position {
            panic!(
                "change out of bounds: the length is {len} but the change removes {}..{}",
                self.position,
                self.position.saturating_add(self.removed)
            );
        }

        let tail = vec.split_off(self.position);
        vec.append(self.added);
        if self.removed < tail.len() {
            vec.append(tail.skip(self.removed));
        }
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for ItemsChanged<T>
where
    T: serde::Serialize + Clone,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ItemsChanged", 3)?;
        state.serialize_field("position", &self.position)?;
        state.serialize_field("removed", &self.removed)?;
        state.serialize_field("added", &self.added)?;
        state.end()
    }
}
