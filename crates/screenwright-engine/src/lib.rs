pub mod editing;
pub mod io;

// Re-export key types for easier usage
pub use editing::{
    Block, BlockId, BlockKind, Cmd, Document, EditError, History, HistoryEntry,
    InvariantViolation, Patch,
    Point, RenderBlock, Selection, Session, Snapshot, TextRun, UndoOutcome,
};
pub use io::{Autosave, CorruptError, LoadOutcome, PersistenceError, Store};
