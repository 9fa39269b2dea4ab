use std::ops::Range;

use listmodel::ItemsChanged;

use super::SortListModel;

impl<T: Clone + Send + Sync + 'static> SortListModel<T> {
    /// Apply a change of the source.
    ///
    /// Changes have to be passed in the order they happened. Subscribers get
    /// one change covering everything in the view that moved: removed items
    /// disappear from the view, and added items are sorted in (or, with
    /// incremental sorting, appear at the end of the view until a later step
    /// moves them).
    ///
    /// # Panics
    ///
    /// Panics if there is no source, or if the change removes items past the
    /// end of the source.
    #[track_caller]
    pub fn items_changed(&mut self, change: ItemsChanged<T>) {
        let Some(source) = &mut self.source else {
            panic!("items changed, but the sort model has no source");
        };

        let position = change.position;
        let removed = change.removed;
        let added = change.n_added();
        if removed == 0 && added == 0 {
            return;
        }
        change.apply(source);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "listmodel_sort::model",
            position, removed, added,
            "Source items changed"
        );

        if self.state.is_none() {
            self.emit(position, removed, added);
            return;
        }

        let was_sorting = self.is_sorting();
        let mut runs = self.stop_sorting();

        let Some(state) = &mut self.state else {
            return;
        };
        let (mut start, mut end) = state.positions.splice(&mut runs, position, removed, added);
        state.keys.splice(position, removed, added);

        if added > 0 {
            if self.start_sorting(Some(&runs)) {
                end = 0;
            } else {
                let changed = self.finish_sorting();
                if !changed.is_empty() {
                    start = start.min(changed.start);
                }
                end = self.unmoved_after_added(position..position + added, end);
            }
        } else if was_sorting {
            self.start_sorting(Some(&runs));
        }

        let len = self.len();
        let n_items = len - start - end;
        self.emit(start, n_items + removed - added, n_items);
    }

    // The number of items at the end of the view that come after every item
    // from `added`, up to `limit`.
    fn unmoved_after_added(&self, added: Range<usize>, limit: usize) -> usize {
        let Some(state) = &self.state else {
            return limit;
        };

        let positions = state.positions.as_slice();
        positions
            .iter()
            .rev()
            .take(limit)
            .position(|pos| added.contains(pos))
            .unwrap_or(limit)
    }
}
