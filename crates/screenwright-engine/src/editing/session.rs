use crate::editing::commands::{self, Cmd, EditError};
use crate::editing::history::{History, HistoryEntry, UndoOutcome};
use crate::editing::{Document, Patch, Selection, Snapshot, snapshot};

/// The single owner of a document, its selection and its history.
///
/// All mutation flows through [`Session::apply`]; frontends hold a session
/// (or messages into one) and read via [`Session::snapshot`]. Commands are
/// applied to a working copy and committed only after the structural
/// invariants hold, so a failed command leaves the session exactly as it
/// was.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    document: Document,
    selection: Selection,
    history: History,
}

impl Session {
    /// Start a session over `document` with the caret at the start.
    pub fn new(document: Document) -> Self {
        let selection = Selection::caret(document.start());
        Self {
            document,
            selection,
            history: History::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn snapshot(&self) -> Snapshot {
        snapshot::create_snapshot(&self.document)
    }

    /// Move the caret/selection without changing content. Pure navigation:
    /// no history entry, no version bump.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditError> {
        if !selection.is_valid(&self.document) {
            return Err(EditError::InvalidSelection);
        }
        self.selection = selection;
        Ok(())
    }

    /// Apply a command. On success the document, selection and history have
    /// all advanced together; on failure nothing changed.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        let before = self.selection;
        let mut doc = self.document.clone();
        let applied = commands::apply_cmd(cmd, &mut doc, before)?;
        doc.validate()?;
        if !applied.selection.is_valid(&doc) {
            return Err(EditError::InvalidSelection);
        }

        // Content untouched (collapsed delete, same-kind retag): commit the
        // selection move only, without history or a version bump
        if applied.inverses.is_empty() {
            self.selection = applied.selection;
            return Ok(Patch {
                changed: applied.changed,
                new_selection: applied.selection,
                version: self.document.version(),
            });
        }

        doc.bump_version();
        self.history.record(HistoryEntry {
            inverse: applied.inverses,
            before,
            after: applied.selection,
        });
        self.selection = applied.selection;
        self.document = doc;

        Ok(Patch {
            changed: applied.changed,
            new_selection: self.selection,
            version: self.document.version(),
        })
    }

    /// Revert the most recent committed command, restoring the document and
    /// the selection it started from.
    pub fn undo(&mut self) -> UndoOutcome {
        let Some(entry) = self.history.pop_undo() else {
            return UndoOutcome::NothingToUndo;
        };
        let mut doc = self.document.clone();
        let mut redo_edits = Vec::with_capacity(entry.inverse.len());
        for edit in entry.inverse.into_iter().rev() {
            redo_edits.push(edit.apply(&mut doc));
        }
        doc.bump_version();
        self.history.push_redo(HistoryEntry {
            inverse: redo_edits,
            before: entry.before,
            after: entry.after,
        });
        self.selection = entry.before;
        self.document = doc;
        UndoOutcome::Applied
    }

    /// Reapply the most recently undone command.
    pub fn redo(&mut self) -> UndoOutcome {
        let Some(entry) = self.history.pop_redo() else {
            return UndoOutcome::NothingToRedo;
        };
        let mut doc = self.document.clone();
        let mut undo_edits = Vec::with_capacity(entry.inverse.len());
        for edit in entry.inverse.into_iter().rev() {
            undo_edits.push(edit.apply(&mut doc));
        }
        doc.bump_version();
        self.history.push_undo(HistoryEntry {
            inverse: undo_edits,
            before: entry.before,
            after: entry.after,
        });
        self.selection = entry.after;
        self.document = doc;
        UndoOutcome::Applied
    }
}
