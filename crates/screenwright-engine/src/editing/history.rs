use crate::editing::Selection;
use crate::editing::commands::Edit;

/// One committed transform, recorded as the edits that undo it (in original
/// application order) plus the selection on either side.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub(crate) inverse: Vec<Edit>,
    pub(crate) before: Selection,
    pub(crate) after: Selection,
}

/// Linear undo/redo stacks with branch-discard: recording a new entry
/// clears the redo stack, so redo is only available until the next edit.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

/// Result of an undo/redo request. Empty stacks are reported, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    Applied,
    NothingToUndo,
    NothingToRedo,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        self.redo.clear();
    }

    pub(crate) fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop()
    }

    pub(crate) fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
    }

    pub(crate) fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Point;

    fn entry() -> HistoryEntry {
        let sel = Selection::caret(Point::new(0, 0, 0));
        HistoryEntry {
            inverse: Vec::new(),
            before: sel,
            after: sel,
        }
    }

    #[test]
    fn recording_discards_the_redo_branch() {
        let mut history = History::new();
        history.record(entry());
        history.push_redo(entry());
        assert_eq!(history.redo_depth(), 1);
        history.record(entry());
        assert_eq!(history.redo_depth(), 0);
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn empty_stacks_pop_nothing() {
        let mut history = History::new();
        assert!(history.pop_undo().is_none());
        assert!(history.pop_redo().is_none());
    }
}
