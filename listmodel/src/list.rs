use std::{fmt, ops};

use imbl::Vector;
use tokio::sync::broadcast::{self, Sender};

mod change;
mod subscriber;

pub use self::{
    change::ItemsChanged,
    subscriber::{ListSubscriber, ListSubscriberStream},
};

/// An ordered list of elements that broadcasts any changes made to it.
pub struct ObservableList<T> {
    values: Vector<T>,
    sender: ListSender<T>,
}

impl<T: Clone + Send + Sync + 'static> ObservableList<T> {
    /// Create a new `ObservableList`.
    ///
    /// As of the time of writing, this is equivalent to
    /// `ObservableList::with_capacity(16)`, but the internal buffer capacity
    /// is subject to change in non-breaking releases.
    ///
    /// See [`with_capacity`][Self::with_capacity] for details about the buffer
    /// capacity.
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create a new `ObservableList` with the given capacity for the inner
    /// buffer.
    ///
    /// Up to `capacity` updates that have not been received by all of the
    /// subscribers yet will be retained in the inner buffer. If an update
    /// happens while the buffer is at capacity, the oldest update is discarded
    /// from it and all subscribers that have not yet received it will instead
    /// see a single [`ItemsChanged`] replacing everything they knew with the
    /// current contents.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is `0`, or larger than `usize::MAX / 2`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { values: Vector::new(), sender: ListSender::new(capacity) }
    }

    /// Turn the `ObservableList` back into a regular `Vector`.
    pub fn into_inner(self) -> Vector<T> {
        self.values
    }

    /// Obtain a new subscriber.
    ///
    /// The subscriber carries a snapshot of the current values, taken at the
    /// same time as the subscription, so no update can fall in between.
    pub fn subscribe(&self) -> ListSubscriber<T> {
        self.sender.subscribe(self.values.clone())
    }

    /// Remove `removed` elements starting at `position`, insert `values` in
    /// their place and notify subscribers.
    ///
    /// This is the primitive all other mutations are expressed through. If
    /// nothing is removed and nothing is added, subscribers are not notified.
    ///
    /// # Panics
    ///
    /// Panics if `position + removed > len`.
    #[track_caller]
    pub fn splice(&mut self, position: usize, removed: usize, values: Vector<T>) {
        let len = self.values.len();
        if position > len || removed > len - position {
            panic!(
                "splice out of bounds: the length is {len} but the range is \
                 {position}..{}",
                position.saturating_add(removed)
            );
        }

        if removed == 0 && values.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                target: "listmodel::list::update",
                "Skipping empty splice at {position}"
            );
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "listmodel::list::update",
            "splice(position = {position}, removed = {removed}, added = {})",
            values.len()
        );

        let tail = self.values.split_off(position);
        self.values.append(values.clone());
        if removed < tail.len() {
            self.values.append(tail.skip(removed));
        }

        self.broadcast(ItemsChanged { position, removed, added: values });
    }

    /// Append the given elements at the end of the list and notify
    /// subscribers.
    pub fn append(&mut self, values: Vector<T>) {
        self.splice(self.values.len(), 0, values);
    }

    /// Replace all elements with the given ones and notify subscribers.
    pub fn reset(&mut self, values: Vector<T>) {
        self.splice(0, self.values.len(), values);
    }

    /// Clear out all of the elements in this list and notify subscribers.
    pub fn clear(&mut self) {
        self.splice(0, self.values.len(), Vector::new());
    }

    /// Add an element at the front of the list and notify subscribers.
    pub fn push_front(&mut self, value: T) {
        self.splice(0, 0, Vector::unit(value));
    }

    /// Add an element at the back of the list and notify subscribers.
    pub fn push_back(&mut self, value: T) {
        self.splice(self.values.len(), 0, Vector::unit(value));
    }

    /// Remove the first element, notify subscribers and return the element.
    ///
    /// If there are no elements, subscribers will not be notified and this
    /// method will return `None`.
    pub fn pop_front(&mut self) -> Option<T> {
        let value = self.values.front().cloned()?;
        self.splice(0, 1, Vector::new());
        Some(value)
    }

    /// Remove the last element, notify subscribers and return the element.
    ///
    /// If there are no elements, subscribers will not be notified and this
    /// method will return `None`.
    pub fn pop_back(&mut self) -> Option<T> {
        let value = self.values.back().cloned()?;
        self.splice(self.values.len() - 1, 1, Vector::new());
        Some(value)
    }

    /// Insert an element at the given position and notify subscribers.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: T) {
        let len = self.values.len();
        if index <= len {
            self.splice(index, 0, Vector::unit(value));
        } else {
            panic!("index out of bounds: the length is {len} but the index is {index}");
        }
    }

    /// Replace the element at the given position, notify subscribers and return
    /// the previous element at that position.
    ///
    /// Subscribers see this as one element removed and one added at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) -> T {
        let len = self.values.len();
        if index < len {
            let old_value = self.values[index].clone();
            self.splice(index, 1, Vector::unit(value));
            old_value
        } else {
            panic!("index out of bounds: the length is {len} but the index is {index}");
        }
    }

    /// Remove the element at the given position, notify subscribers and return
    /// the element.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.values.len();
        if index < len {
            let value = self.values[index].clone();
            self.splice(index, 1, Vector::new());
            value
        } else {
            panic!("index out of bounds: the length is {len} but the index is {index}");
        }
    }

    /// Truncate the list to `len` elements and notify subscribers.
    ///
    /// Does nothing if `len` is greater or equal to the list's current
    /// length.
    pub fn truncate(&mut self, len: usize) {
        let current = self.values.len();
        if len < current {
            self.splice(len, current - len, Vector::new());
        }
    }

    fn broadcast(&self, change: ItemsChanged<T>) {
        self.sender.send(change, || self.values.clone());
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ObservableList<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList").field("values", &self.values).finish_non_exhaustive()
    }
}

// Note: No DerefMut because all mutating must go through inherent methods that
// notify subscribers
impl<T> ops::Deref for ObservableList<T> {
    type Target = Vector<T>;

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

impl<T: Clone + Send + Sync + 'static> From<Vector<T>> for ObservableList<T> {
    fn from(values: Vector<T>) -> Self {
        let mut this = Self::new();
        this.append(values);
        this
    }
}

/// The sending half of an `items-changed` broadcast.
///
/// [`ObservableList`] uses this internally. It is public so that other list
/// models, for example views that present the items of another list in a
/// different order, can hand out the same [`ListSubscriber`]s.
pub struct ListSender<T> {
    sender: Sender<BroadcastMessage<T>>,
}

impl<T: Clone + Send + Sync + 'static> ListSender<T> {
    /// Create a new `ListSender` retaining up to `capacity` updates for slow
    /// subscribers.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is `0`, or larger than `usize::MAX / 2`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Obtain a new subscriber whose initial values are `values`.
    ///
    /// `values` must be the state of the list at the time of the call.
    pub fn subscribe(&self, values: Vector<T>) -> ListSubscriber<T> {
        ListSubscriber::new(values, self.sender.subscribe())
    }

    /// Whether anyone is subscribed.
    ///
    /// Useful to skip building an expensive [`ItemsChanged`] nobody will see.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() != 0
    }

    /// Send `change` to all subscribers.
    ///
    /// `state` must return the state of the list after `change`; it is only
    /// called if there are subscribers.
    pub fn send(&self, change: ItemsChanged<T>, state: impl FnOnce() -> Vector<T>) {
        if self.has_subscribers() {
            let msg = BroadcastMessage { change, state: state() };
            let _num_receivers = self.sender.send(msg).unwrap_or(0);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                target: "listmodel::list::broadcast",
                "New change broadcast to {_num_receivers} receivers"
            );
        }
    }
}

impl<T> fmt::Debug for ListSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSender")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[derive(Clone)]
struct BroadcastMessage<T> {
    change: ItemsChanged<T>,
    state: Vector<T>,
}
