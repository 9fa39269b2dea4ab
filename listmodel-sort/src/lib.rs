//! Sorted views of [`listmodel`] lists.
//!
//! A [`SortListModel`] presents the items of a source list in the order
//! decided by a [`Sorter`], and broadcasts the changes of that view the same
//! way an [`ObservableList`][listmodel::ObservableList] does. Sorting is
//! stable, and can be done incrementally: in small steps with a bounded cost
//! each, so that huge lists can be sorted without blocking whoever drives the
//! model. The sorted view stays readable between steps.
//!
//! The sort itself is available on its own as [`timsort::TimSort`].
//!
//! Cargo features:
//!
//! - `tracing`: Emit `tracing` events for source changes and sort progress

mod keys;
mod model;
mod sorter;
mod stream;
pub mod timsort;

pub use self::{
    keys::{KeyStore, Keys, SortKeys},
    model::SortListModel,
    sorter::{
        OrdSorter, SortBy, SortByKey, SortOrder, Sorter, SorterChange, SorterOrder, Unsorted,
    },
    stream::{ListSubscriberExt, Sorted},
};
#[doc(no_inline)]
pub use listmodel::{ItemsChanged, Vector};
