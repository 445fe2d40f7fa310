use std::ops::Range;

use thiserror::Error;

use crate::editing::{
    Block, BlockKind, Document, InvariantViolation, Point, Selection, TextRun,
};

/// Why a command was rejected. A failed command never changes the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("{what} index {index} out of range (valid up to {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("selection does not resolve to a position in the document")]
    InvalidSelection,
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// An edit operation as dispatched by a frontend.
///
/// Commands address blocks positionally and use the session's current
/// selection unless an explicit one is given. Each command compiles to a
/// list of primitive [`Edit`]s whose inverses feed the undo history.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Insert a new block of `kind` with one empty run. `at: None` means
    /// immediately after the selection's block (end-of-document fallback).
    InsertBlock {
        kind: BlockKind,
        at: Option<usize>,
    },
    /// Insert text at the caret; a range selection is replaced.
    InsertText { text: String },
    /// Delete the given selection, or the current one when `None`.
    /// Cross-block ranges merge the boundary blocks, earlier kind wins.
    DeleteRange { selection: Option<Selection> },
    /// Reclassify a block in place without touching its text.
    SetBlockKind { index: usize, kind: BlockKind },
    /// Split the caret's block in two; both halves inherit the kind unless
    /// `trailing_kind` overrides the second half.
    SplitBlock { trailing_kind: Option<BlockKind> },
}

/// Primitive invertible edit. Applying one returns the edit that exactly
/// undoes it, so the history can replay inverses without diffing.
///
/// Coordinates are assumed valid; command compilation checks bounds before
/// any edit touches the tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Edit {
    InsertBlocks { at: usize, blocks: Vec<Block> },
    RemoveBlocks { at: usize, count: usize },
    InsertText { at: Point, text: String },
    RemoveText { at: Point, len: usize },
    InsertRuns { block: usize, at: usize, runs: Vec<TextRun> },
    RemoveRuns { block: usize, at: usize, count: usize },
    SetKind { index: usize, kind: BlockKind },
    /// Split a block at a caret. `at.run` may equal the run count (with
    /// offset 0) to denote the boundary past the last run.
    Split {
        at: Point,
        trailing_kind: Option<BlockKind>,
    },
    /// Merge block `at + 1` into block `at`, keeping the earlier kind.
    /// `rejoin_runs` joins the seam pair into one run (the inverse of a
    /// mid-run split).
    Merge { at: usize, rejoin_runs: bool },
}

impl Edit {
    pub(crate) fn apply(self, doc: &mut Document) -> Edit {
        match self {
            Edit::InsertBlocks { at, blocks } => {
                let count = blocks.len();
                doc.blocks.splice(at..at, blocks);
                Edit::RemoveBlocks { at, count }
            }
            Edit::RemoveBlocks { at, count } => {
                let removed: Vec<Block> = doc.blocks.drain(at..at + count).collect();
                Edit::InsertBlocks {
                    at,
                    blocks: removed,
                }
            }
            Edit::InsertText { at, text } => {
                let run = &mut doc.blocks[at.block].runs[at.run];
                run.text.insert_str(at.offset, &text);
                Edit::RemoveText {
                    at,
                    len: text.len(),
                }
            }
            Edit::RemoveText { at, len } => {
                let run = &mut doc.blocks[at.block].runs[at.run];
                let removed: String = run.text.drain(at.offset..at.offset + len).collect();
                Edit::InsertText { at, text: removed }
            }
            Edit::InsertRuns { block, at, runs } => {
                let count = runs.len();
                doc.blocks[block].runs.splice(at..at, runs);
                Edit::RemoveRuns { block, at, count }
            }
            Edit::RemoveRuns { block, at, count } => {
                let removed: Vec<TextRun> =
                    doc.blocks[block].runs.drain(at..at + count).collect();
                Edit::InsertRuns {
                    block,
                    at,
                    runs: removed,
                }
            }
            Edit::SetKind { index, kind } => {
                let old = std::mem::replace(&mut doc.blocks[index].kind, kind);
                Edit::SetKind { index, kind: old }
            }
            Edit::Split { at, trailing_kind } => apply_split(doc, at, trailing_kind),
            Edit::Merge { at, rejoin_runs } => apply_merge(doc, at, rejoin_runs),
        }
    }
}

fn apply_split(doc: &mut Document, at: Point, trailing_kind: Option<BlockKind>) -> Edit {
    let kind = doc.blocks[at.block].kind;
    let mut trailing = std::mem::take(&mut doc.blocks[at.block].runs);
    let mut leading: Vec<TextRun>;
    let mut mid_run = false;

    if at.run >= trailing.len() {
        // Boundary past the last run: everything leads
        leading = trailing;
        trailing = Vec::new();
    } else {
        leading = trailing.drain(..at.run).collect();
        let split_run = trailing.remove(0);
        if at.offset == 0 {
            trailing.insert(0, split_run);
        } else if at.offset == split_run.text.len() {
            leading.push(split_run);
        } else {
            mid_run = true;
            leading.push(TextRun::new(&split_run.text[..at.offset]));
            trailing.insert(0, TextRun::new(&split_run.text[at.offset..]));
        }
    }

    if leading.is_empty() {
        leading.push(TextRun::new(""));
    }
    if trailing.is_empty() {
        trailing.push(TextRun::new(""));
    }

    doc.blocks[at.block].runs = leading;
    let id = doc.mint_id();
    doc.blocks.insert(
        at.block + 1,
        Block {
            id,
            kind: trailing_kind.unwrap_or(kind),
            runs: trailing,
        },
    );

    Edit::Merge {
        at: at.block,
        rejoin_runs: mid_run,
    }
}

fn apply_merge(doc: &mut Document, at: usize, rejoin_runs: bool) -> Edit {
    let later = doc.blocks.remove(at + 1);
    let earlier = &mut doc.blocks[at];

    // A sole empty run stands for "no content"; it is dropped at the seam
    // rather than surviving as a dangling empty run.
    let sole_empty = |runs: &[TextRun]| runs.len() == 1 && runs[0].is_empty();
    let earlier_runs: Vec<TextRun> = if sole_empty(&earlier.runs) {
        Vec::new()
    } else {
        std::mem::take(&mut earlier.runs)
    };
    let later_runs: Vec<TextRun> = if sole_empty(&later.runs) {
        Vec::new()
    } else {
        later.runs
    };

    // Where the inverse split re-divides the merged run list
    let (split_run, split_offset) = if rejoin_runs {
        (
            earlier_runs.len().saturating_sub(1),
            earlier_runs.last().map_or(0, |r| r.text.len()),
        )
    } else {
        (earlier_runs.len(), 0)
    };

    let mut merged = earlier_runs;
    let mut later_iter = later_runs.into_iter();
    if rejoin_runs {
        if let Some(first) = later_iter.next() {
            match merged.last_mut() {
                Some(last) => last.text.push_str(&first.text),
                None => merged.push(first),
            }
        }
    }
    merged.extend(later_iter);
    if merged.is_empty() {
        merged.push(TextRun::new(""));
    }
    earlier.runs = merged;

    Edit::Split {
        at: Point::new(at, split_run, split_offset),
        trailing_kind: Some(later.kind),
    }
}

/// Outcome of compiling and applying a command: the inverses (in application
/// order) for the history, the remapped selection, and the touched block
/// range in post-edit coordinates.
#[derive(Debug)]
pub(crate) struct Applied {
    pub inverses: Vec<Edit>,
    pub selection: Selection,
    pub changed: Range<usize>,
}

pub(crate) fn apply_cmd(
    cmd: Cmd,
    doc: &mut Document,
    selection: Selection,
) -> Result<Applied, EditError> {
    match cmd {
        Cmd::InsertBlock { kind, at } => insert_block(doc, selection, kind, at),
        Cmd::InsertText { text } => insert_text(doc, selection, text),
        Cmd::DeleteRange { selection: range } => {
            let range = range.unwrap_or(selection);
            if !range.is_valid(doc) {
                return Err(EditError::InvalidSelection);
            }
            delete_range(doc, range)
        }
        Cmd::SetBlockKind { index, kind } => set_block_kind(doc, selection, index, kind),
        Cmd::SplitBlock { trailing_kind } => split_block(doc, selection, trailing_kind),
    }
}

fn insert_block(
    doc: &mut Document,
    selection: Selection,
    kind: BlockKind,
    at: Option<usize>,
) -> Result<Applied, EditError> {
    let len = doc.block_count();
    let at = match at {
        Some(index) if index <= len => index,
        Some(index) => {
            return Err(EditError::OutOfRange {
                what: "block",
                index,
                len,
            });
        }
        // Insert-after-selection, end-of-document fallback
        None => (selection.focus.block + 1).min(len),
    };

    let id = doc.mint_id();
    let block = Block {
        id,
        kind,
        runs: vec![TextRun::new("")],
    };
    let inverse = Edit::InsertBlocks {
        at,
        blocks: vec![block],
    }
    .apply(doc);

    Ok(Applied {
        inverses: vec![inverse],
        selection: Selection::caret(Point::new(at, 0, 0)),
        changed: at..at + 1,
    })
}

fn insert_text(
    doc: &mut Document,
    selection: Selection,
    text: String,
) -> Result<Applied, EditError> {
    if !selection.is_valid(doc) {
        return Err(EditError::InvalidSelection);
    }

    let mut inverses = Vec::new();
    let caret = if selection.is_caret() {
        selection.focus
    } else {
        // Replace semantics: drop the selected range first
        let deleted = delete_range(doc, selection)?;
        inverses = deleted.inverses;
        deleted.selection.focus
    };

    if !text.is_empty() {
        let len = text.len();
        inverses.push(Edit::InsertText { at: caret, text }.apply(doc));
        return Ok(Applied {
            inverses,
            selection: Selection::caret(Point::new(caret.block, caret.run, caret.offset + len)),
            changed: caret.block..caret.block + 1,
        });
    }

    Ok(Applied {
        inverses,
        selection: Selection::caret(caret),
        changed: caret.block..caret.block + 1,
    })
}

fn delete_range(doc: &mut Document, range: Selection) -> Result<Applied, EditError> {
    let (start, end) = range.ordered();
    let mut inverses = Vec::new();

    if start == end {
        // Collapsed range: nothing to delete, nothing to record
        return Ok(Applied {
            inverses,
            selection: Selection::caret(start),
            changed: start.block..start.block,
        });
    }

    if start.block == end.block {
        delete_within_block(
            doc,
            &mut inverses,
            start.block,
            (start.run, start.offset),
            (end.run, end.offset),
        );
    } else {
        // Tail of the first block
        let first_end = doc.end_of_block(start.block);
        delete_within_block(
            doc,
            &mut inverses,
            start.block,
            (start.run, start.offset),
            (first_end.run, first_end.offset),
        );
        // Fully covered middle blocks
        let middle = end.block - start.block - 1;
        if middle > 0 {
            inverses.push(
                Edit::RemoveBlocks {
                    at: start.block + 1,
                    count: middle,
                }
                .apply(doc),
            );
        }
        // Head of the last block, now adjacent
        delete_within_block(
            doc,
            &mut inverses,
            start.block + 1,
            (0, 0),
            (end.run, end.offset),
        );
        // Merge the boundary pair, earlier kind wins
        inverses.push(
            Edit::Merge {
                at: start.block,
                rejoin_runs: false,
            }
            .apply(doc),
        );
    }

    let caret = clamp_point(doc, start);
    Ok(Applied {
        inverses,
        selection: Selection::caret(caret),
        changed: start.block..start.block + 1,
    })
}

/// Delete `(from_run, from_offset)..(to_run, to_offset)` inside one block,
/// pruning runs emptied by the deletion (a sole run stays, possibly empty).
fn delete_within_block(
    doc: &mut Document,
    inverses: &mut Vec<Edit>,
    block: usize,
    from: (usize, usize),
    to: (usize, usize),
) {
    let (from_run, from_offset) = from;
    let (to_run, to_offset) = to;
    if from == to {
        return;
    }

    if from_run == to_run {
        inverses.push(
            Edit::RemoveText {
                at: Point::new(block, from_run, from_offset),
                len: to_offset - from_offset,
            }
            .apply(doc),
        );
        prune_if_empty(doc, inverses, block, from_run);
        return;
    }

    // Tail of the first run
    let first_len = doc.blocks[block].runs[from_run].text.len();
    if from_offset < first_len {
        inverses.push(
            Edit::RemoveText {
                at: Point::new(block, from_run, from_offset),
                len: first_len - from_offset,
            }
            .apply(doc),
        );
    }
    // Whole runs in between
    let middle = to_run - from_run - 1;
    if middle > 0 {
        inverses.push(
            Edit::RemoveRuns {
                block,
                at: from_run + 1,
                count: middle,
            }
            .apply(doc),
        );
    }
    // Head of the last run, now adjacent
    if to_offset > 0 {
        inverses.push(
            Edit::RemoveText {
                at: Point::new(block, from_run + 1, 0),
                len: to_offset,
            }
            .apply(doc),
        );
    }
    // Higher index first so the lower one stays stable
    prune_if_empty(doc, inverses, block, from_run + 1);
    prune_if_empty(doc, inverses, block, from_run);
}

fn prune_if_empty(doc: &mut Document, inverses: &mut Vec<Edit>, block: usize, run: usize) {
    let runs = &doc.blocks[block].runs;
    if runs.len() > 1 && runs.get(run).is_some_and(|r| r.is_empty()) {
        inverses.push(
            Edit::RemoveRuns {
                block,
                at: run,
                count: 1,
            }
            .apply(doc),
        );
    }
}

/// Collapse a point to the nearest valid boundary of the remaining content.
fn clamp_point(doc: &Document, p: Point) -> Point {
    let block = p.block.min(doc.block_count().saturating_sub(1));
    let runs = doc.blocks[block].runs.len();
    let run = p.run.min(runs.saturating_sub(1));
    let text = &doc.blocks[block].runs[run].text;
    let mut offset = p.offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    Point::new(block, run, offset)
}

fn set_block_kind(
    doc: &mut Document,
    selection: Selection,
    index: usize,
    kind: BlockKind,
) -> Result<Applied, EditError> {
    let len = doc.block_count();
    let Some(block) = doc.blocks.get(index) else {
        return Err(EditError::OutOfRange {
            what: "block",
            index,
            len,
        });
    };

    // Re-tagging with the same kind is a no-op and records no history
    let inverses = if block.kind == kind {
        Vec::new()
    } else {
        vec![Edit::SetKind { index, kind }.apply(doc)]
    };

    Ok(Applied {
        inverses,
        selection,
        changed: index..index + 1,
    })
}

fn split_block(
    doc: &mut Document,
    selection: Selection,
    trailing_kind: Option<BlockKind>,
) -> Result<Applied, EditError> {
    if !selection.is_valid(doc) {
        return Err(EditError::InvalidSelection);
    }
    let caret = selection.focus;
    let inverse = Edit::Split {
        at: caret,
        trailing_kind,
    }
    .apply(doc);

    Ok(Applied {
        inverses: vec![inverse],
        selection: Selection::caret(Point::new(caret.block + 1, 0, 0)),
        changed: caret.block..caret.block + 2,
    })
}
