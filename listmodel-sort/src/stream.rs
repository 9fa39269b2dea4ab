use std::{
    fmt,
    pin::Pin,
    sync::Arc,
    task::{self, Poll},
};

use futures_core::Stream;
use imbl::Vector;
use listmodel::{ItemsChanged, ListSubscriber, ListSubscriberStream};
use pin_project_lite::pin_project;

use crate::{sorter::Sorter, SortListModel};

pin_project! {
    /// An [`ItemsChanged`] stream adapter that presents the items of the
    /// underlying list sorted.
    ///
    /// Changes of the underlying list are fed into a [`SortListModel`] and
    /// its changes are returned. If the model sorts incrementally, one sort
    /// step is done every time the underlying stream has nothing new, so the
    /// view gradually becomes sorted while the task polling this stream keeps
    /// control over its time.
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use listmodel::{ItemsChanged, ObservableList, Vector};
    /// use listmodel_sort::{ListSubscriberExt, OrdSorter};
    /// use stream_assert::{assert_next_eq, assert_pending};
    ///
    /// let mut list = ObservableList::from(Vector::from_iter(['d', 'b', 'e']));
    /// let (values, mut sub) = list.subscribe().sorted(Arc::new(OrdSorter::new()));
    /// assert_eq!(values, Vector::from_iter(['b', 'd', 'e']));
    /// assert_pending!(sub);
    ///
    /// list.push_back('a');
    /// assert_next_eq!(sub, ItemsChanged::new(0, 0, Vector::unit('a')));
    /// ```
    pub struct Sorted<S, T> {
        #[pin]
        inner: S,
        model: SortListModel<T>,
        output: ListSubscriberStream<T>,
    }
}

impl<S, T> Sorted<S, T>
where
    S: Stream<Item = ItemsChanged<T>>,
    T: Clone + Send + Sync + 'static,
{
    /// Create a new `Sorted` with the given (unsorted) initial values, stream
    /// of changes of those values, and sorter.
    ///
    /// Returns the sorted initial values and the adapter.
    pub fn new(
        initial_values: Vector<T>,
        inner: S,
        sorter: Arc<dyn Sorter<T>>,
    ) -> (Vector<T>, Self) {
        let mut model = SortListModel::new(Some(sorter));
        model.set_source(Some(initial_values));

        let (values, output) = model.subscribe().into_values_and_stream();
        (values, Self { inner, model, output })
    }

    /// The sort model backing this adapter.
    pub fn model(&self) -> &SortListModel<T> {
        &self.model
    }

    /// Mutable access to the sort model backing this adapter, for example to
    /// change its sorter or make it sort incrementally.
    ///
    /// Changes made through it are returned by the stream like any other.
    pub fn model_mut(&mut self) -> &mut SortListModel<T> {
        &mut self.model
    }
}

impl<S, T> Stream for Sorted<S, T>
where
    S: Stream<Item = ItemsChanged<T>>,
    T: Clone + Send + Sync + 'static,
{
    type Item = ItemsChanged<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            // First off, return whatever the model has announced.
            if let Poll::Ready(change) = Pin::new(&mut *this.output).poll_next(cx) {
                return Poll::Ready(change);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(change)) => {
                    this.model.items_changed(change);
                    continue;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => {}
            }

            if !this.model.is_sorting() {
                // A sort started from outside of `poll_next` wakes us up.
                this.model.set_idle_waker(cx.waker());
                return Poll::Pending;
            }

            this.model.sort_step();
            if let Poll::Ready(change) = Pin::new(&mut *this.output).poll_next(cx) {
                return Poll::Ready(change);
            }

            // Let other tasks run before the next step.
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
    }
}

impl<S: fmt::Debug, T: fmt::Debug> fmt::Debug for Sorted<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorted")
            .field("inner", &self.inner)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Extension trait for [`ListSubscriber`].
pub trait ListSubscriberExt<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a sorted view of the list this subscriber belongs to.
    ///
    /// Returns the sorted values the list had when subscribing, and a stream
    /// of changes to them.
    fn sorted(self, sorter: Arc<dyn Sorter<T>>) -> (Vector<T>, Sorted<ListSubscriberStream<T>, T>);
}

impl<T> ListSubscriberExt<T> for ListSubscriber<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn sorted(self, sorter: Arc<dyn Sorter<T>>) -> (Vector<T>, Sorted<ListSubscriberStream<T>, T>) {
        let (values, stream) = self.into_values_and_stream();
        Sorted::new(values, stream, sorter)
    }
}
