/*!
 * # Editing core
 *
 * The editing system is built from a few cooperating pieces:
 *
 * ### 1. Typed block tree as the source of truth
 * - A screenplay is an ordered sequence of **blocks**, each carrying a
 *   closed [`BlockKind`] (scene heading, action, character, dialogue) and
 *   one or more plain-text **runs**.
 * - The tree is the authoritative model; rendering styles, key bindings and
 *   storage formats all live outside this module.
 *
 * ### 2. Command-based editing
 * - All edits are expressed as a [`Cmd`] which compiles to a sequence of
 *   primitive, invertible `Edit`s.
 * - Commands are applied through [`Session::apply`], the single mutation
 *   entry point. A command either commits a fully valid document or leaves
 *   the session untouched.
 *
 * ### 3. Structural invariants
 * - A document always has at least one block, every block has at least one
 *   run, and an empty run may only exist as a block's sole run.
 * - Every commit re-validates the candidate tree; a violation rejects the
 *   whole command ([`EditError::Invariant`]).
 *
 * ### 4. Selection as part of the model
 * - [`Selection`] is an anchor/focus pair of `(block, run, offset)` points.
 *   Commands produce the remapped selection together with the new tree, so
 *   the selection always resolves to a live position.
 *
 * ### 5. Undo/redo from inverse edits
 * - Each committed command records the inverse edit list plus the selection
 *   before and after. Undo replays the inverses; redo replays their
 *   inverses. A new edit discards the redo branch.
 *
 * ### 6. Read API: immutable snapshots
 * - Frontends render from [`Snapshot`]s of stable-id [`RenderBlock`]s and
 *   never touch the tree directly.
 */

pub mod commands;
pub mod document;
pub mod history;
pub mod patch;
pub mod selection;
pub mod session;
pub mod snapshot;

pub use commands::{Cmd, EditError};
pub use document::{Block, BlockId, BlockKind, Document, InvariantViolation, TextRun, UnknownKind};
pub use history::{History, HistoryEntry, UndoOutcome};
pub use patch::Patch;
pub use selection::{Point, Selection};
pub use session::Session;
pub use snapshot::{RenderBlock, Snapshot};
