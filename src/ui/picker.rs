use crate::catalog::Catalog;

/// One row of the patch list, precomputed from the catalog snapshot.
#[derive(Debug, Clone)]
pub struct PickerEntry {
    pub id: String,
    pub label: String,
    searchable: String,
}

/// Filter-as-you-type patch list with a wrapping selection.
///
/// Filtering is a pure function of (catalog, filter text): the same inputs
/// always yield the same order-preserving subsequence. The selected entry
/// survives a refilter when it still matches; otherwise selection resets to
/// the top. An empty result set is a valid state, not an error, and commit
/// simply returns None then.
pub struct PatchPicker {
    entries: Vec<PickerEntry>,
    filter: String,
    filtered: Vec<usize>,
    selected: usize,
}

impl PatchPicker {
    pub fn new(catalog: &Catalog) -> Self {
        let entries = catalog
            .patches()
            .iter()
            .map(|patch| PickerEntry {
                id: patch.id.clone(),
                label: patch.display_name(),
                searchable: patch.searchable_text(),
            })
            .collect::<Vec<_>>();
        let filtered = (0..entries.len()).collect();
        Self {
            entries,
            filter: String::new(),
            filtered,
            selected: 0,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Recompute the filtered subsequence: case-insensitive substring match
    /// against each entry's searchable text.
    pub fn set_filter(&mut self, text: &str) {
        let previously_selected = self.filtered.get(self.selected).copied();

        self.filter = text.to_string();
        let needle = text.to_lowercase();
        self.filtered = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| needle.is_empty() || entry.searchable.contains(&needle))
            .map(|(i, _)| i)
            .collect();

        self.selected = previously_selected
            .and_then(|prev| self.filtered.iter().position(|&i| i == prev))
            .unwrap_or(0);
    }

    pub fn push_char(&mut self, c: char) {
        let mut text = self.filter.clone();
        text.push(c);
        self.set_filter(&text);
    }

    pub fn pop_char(&mut self) {
        let mut text = self.filter.clone();
        text.pop();
        self.set_filter(&text);
    }

    /// Move the selection by `delta` rows, wrapping modulo the filtered
    /// length. No-op on an empty list.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let len = len as isize;
        self.selected = (((self.selected as isize + delta) % len + len) % len) as usize;
    }

    /// Id of the patch under selection, or None when nothing matches.
    pub fn commit(&self) -> Option<&str> {
        self.filtered
            .get(self.selected)
            .map(|&i| self.entries[i].id.as_str())
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn matches(&self) -> impl Iterator<Item = &PickerEntry> {
        self.filtered.iter().map(|&i| &self.entries[i])
    }

    pub fn match_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}
