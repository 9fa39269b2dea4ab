use std::{
    fmt,
    pin::Pin,
    task::{ready, Context, Poll},
};

use futures_core::Stream;
use imbl::Vector;
use tokio::sync::broadcast::{
    error::{RecvError, TryRecvError},
    Receiver,
};
use tokio_util::sync::ReusableBoxFuture;
#[cfg(feature = "tracing")]
use tracing::info;

use super::{BroadcastMessage, ItemsChanged};

/// A subscriber for updates of a list.
///
/// Holds the values the list had when subscribing. Use
/// [`into_stream`][Self::into_stream] or
/// [`into_values_and_stream`][Self::into_values_and_stream] to get the updates
/// that happened after that.
pub struct ListSubscriber<T> {
    values: Vector<T>,
    rx: Receiver<BroadcastMessage<T>>,
}

impl<T: Clone + Send + Sync + 'static> ListSubscriber<T> {
    pub(super) fn new(values: Vector<T>, rx: Receiver<BroadcastMessage<T>>) -> Self {
        Self { values, rx }
    }

    /// Get the items the list contained when this subscriber was created.
    pub fn values(&self) -> Vector<T> {
        self.values.clone()
    }

    /// Turn this `ListSubscriber` into a stream of `ItemsChanged`s.
    pub fn into_stream(self) -> ListSubscriberStream<T> {
        ListSubscriberStream::new(self.values.len(), self.rx)
    }

    /// Destructure this `ListSubscriber` into the initial values and a stream
    /// of `ItemsChanged`s.
    ///
    /// Semantically equivalent to calling `.values()` and `.into_stream()`
    /// separately, but guarantees that the values are not unnecessarily
    /// cloned.
    pub fn into_values_and_stream(self) -> (Vector<T>, ListSubscriberStream<T>) {
        let Self { values, rx } = self;
        let len = values.len();
        (values, ListSubscriberStream::new(len, rx))
    }
}

impl<T: fmt::Debug> fmt::Debug for ListSubscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSubscriber").field("values", &self.values).finish_non_exhaustive()
    }
}

/// A stream of `ItemsChanged`s created from a [`ListSubscriber`].
///
/// Use its [`Stream`] implementation to interact with it (futures-util and
/// other futures-related crates have extension traits with convenience
/// methods).
///
/// If the subscriber falls behind by more than the list's buffer capacity,
/// the discarded changes are replaced by a single change that removes every
/// item the subscriber knew about and adds the current contents of the list.
#[derive(Debug)]
pub struct ListSubscriberStream<T> {
    // Length of the list as seen by this subscriber, used to build the
    // replacement change after lagging.
    len: usize,
    inner: ReusableBoxFuture<'static, SubscriberFutureReturn<BroadcastMessage<T>>>,
}

impl<T: Clone + Send + Sync + 'static> ListSubscriberStream<T> {
    fn new(len: usize, rx: Receiver<BroadcastMessage<T>>) -> Self {
        Self { len, inner: ReusableBoxFuture::new(make_future(rx)) }
    }
}

impl<T: Clone + Send + Sync + 'static> Stream for ListSubscriberStream<T> {
    type Item = ItemsChanged<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let (result, mut rx) = ready!(self.inner.poll(cx));

        let poll = match result {
            Ok(msg) => Poll::Ready(Some(msg.change)),
            Err(RecvError::Closed) => Poll::Ready(None),
            Err(RecvError::Lagged(_)) => {
                let mut msg = None;
                loop {
                    match rx.try_recv() {
                        // There's a newer message in the receiver's buffer, use that for the
                        // replacement.
                        Ok(m) => {
                            msg = Some(m);
                        }
                        // Ideally we'd return a replacement with the last state before the
                        // channel was closed here, but we have no way of obtaining it.
                        Err(TryRecvError::Closed) => {
                            #[cfg(feature = "tracing")]
                            info!("Channel closed after lag, can't return last state");
                            break Poll::Ready(None);
                        }
                        // Lagged twice in a row, is this possible? If it is, it's fine to just
                        // loop again and look at the next try_recv result.
                        Err(TryRecvError::Lagged(_)) => {}
                        Err(TryRecvError::Empty) => match msg {
                            // We exhausted the internal buffer using try_recv, msg contains the
                            // last message from it, which we use for the replacement.
                            Some(msg) => {
                                break Poll::Ready(Some(ItemsChanged {
                                    position: 0,
                                    removed: self.len,
                                    added: msg.state,
                                }));
                            }
                            // We exhausted the internal buffer using try_recv but there was no
                            // message in it, even though we got TryRecvError::Lagged(_) before.
                            None => unreachable!("got no new message via try_recv after lag"),
                        },
                    }
                }
            }
        };

        if let Poll::Ready(Some(change)) = &poll {
            self.len = self.len - change.removed + change.added.len();
        }

        self.inner.set(make_future(rx));
        poll
    }
}

type SubscriberFutureReturn<T> = (Result<T, RecvError>, Receiver<T>);

async fn make_future<T: Clone>(mut rx: Receiver<T>) -> SubscriberFutureReturn<T> {
    let result = rx.recv().await;
    (result, rx)
}
