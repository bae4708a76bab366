use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::parse::Document;
use crate::view::fields::{FieldBinding, FieldSpec};
use crate::view::selection::{ColumnSelection, DEFAULT_VISIBLE_COLUMNS};

/// An immutable document together with the field binding derived from it.
#[derive(Debug)]
pub struct Snapshot {
    pub document: Document,
    pub binding: FieldBinding,
}

#[derive(Debug, Clone)]
struct ViewState {
    snapshot: Arc<Snapshot>,
    selection: ColumnSelection,
}

/// The document currently being viewed and its column selection.
///
/// `load` replaces the snapshot, binding and selection in one write, so readers
/// observe either the previous state or the new one. Snapshots handed out by
/// `snapshot`/`view` stay valid after a reload.
#[derive(Debug)]
pub struct Session {
    specs: Vec<FieldSpec>,
    default_columns: usize,
    state: RwLock<Option<ViewState>>,
}

impl Session {
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        Self {
            specs,
            default_columns: DEFAULT_VISIBLE_COLUMNS,
            state: RwLock::new(None),
        }
    }

    pub fn with_default_columns(mut self, n: usize) -> Self {
        self.default_columns = n;
        self
    }

    /// Install `document` as the current one, resolving fields and resetting
    /// the selection to the default columns.
    pub fn load(&self, document: Document) -> Arc<Snapshot> {
        let binding = FieldBinding::resolve(document.header(), &self.specs);
        let selection = ColumnSelection::first_n(document.column_count(), self.default_columns);
        let snapshot = Arc::new(Snapshot { document, binding });
        info!(
            columns = snapshot.document.column_count(),
            rows = snapshot.document.rows().len(),
            visible = selection.len(),
            "document loaded"
        );

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = Some(ViewState {
            snapshot: Arc::clone(&snapshot),
            selection,
        });
        snapshot
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.read(|s| Arc::clone(&s.snapshot))
    }

    /// The current snapshot and selection, read together.
    pub fn view(&self) -> Option<(Arc<Snapshot>, ColumnSelection)> {
        self.read(|s| (Arc::clone(&s.snapshot), s.selection.clone()))
    }

    /// Toggle a column of the current document. `None` when nothing is loaded.
    pub fn toggle(&self, index: usize) -> Option<bool> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.as_mut().map(|s| s.selection.toggle(index))
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        self.read(|s| s.selection.visible_indices())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn read<T>(&self, f: impl FnOnce(&ViewState) -> T) -> Option<T> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }
}
