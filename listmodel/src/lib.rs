//! Observable positional lists.
//!
//! An [`ObservableList`] is an ordered list of items that broadcasts every
//! change made to it as an [`ItemsChanged`] notification: at `position`,
//! `removed` items were removed and the items in `added` were inserted in
//! their place. This is the same contract list widgets are built around, so
//! views over an `ObservableList` (sorted, filtered, …) can forward minimal
//! change notifications further down.
//!
//! Cargo features:
//!
//! - `serde`: Implement `serde::Serialize` for [`ItemsChanged`]
//! - `tracing`: Emit [tracing] events when updates are sent out

mod list;

pub use list::{
    ItemsChanged, ListSender, ListSubscriber, ListSubscriberStream, ObservableList,
};

#[doc(no_inline)]
pub use imbl::Vector;
