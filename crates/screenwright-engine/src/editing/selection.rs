use crate::editing::Document;

/// A caret coordinate: block index, run index within the block, and byte
/// offset within the run's text (always on a char boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point {
    pub block: usize,
    pub run: usize,
    pub offset: usize,
}

impl Point {
    pub fn new(block: usize, run: usize, offset: usize) -> Self {
        Self { block, run, offset }
    }

    /// True when this point resolves to a live position in `doc`; the offset
    /// may equal the run length (caret past the last character).
    pub fn is_valid(&self, doc: &Document) -> bool {
        match doc.run_text(self.block, self.run) {
            Some(text) => self.offset <= text.len() && text.is_char_boundary(self.offset),
            None => false,
        }
    }

    /// Remap for an insertion of `count` blocks at `at`: points in blocks at
    /// or after the insertion shift right, earlier points are untouched.
    pub fn shifted_for_block_insert(&self, at: usize, count: usize) -> Self {
        if self.block >= at {
            Self::new(self.block + count, self.run, self.offset)
        } else {
            *self
        }
    }
}

/// Anchor/focus pair addressing a caret or a range within a document.
///
/// The anchor is where the selection started, the focus is where it ends;
/// focus may precede the anchor in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// A collapsed selection at `point`.
    pub fn caret(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.anchor == self.focus
    }

    /// The two endpoints in document order.
    pub fn ordered(&self) -> (Point, Point) {
        if self.anchor <= self.focus {
            (self.anchor, self.focus)
        } else {
            (self.focus, self.anchor)
        }
    }

    pub fn is_valid(&self, doc: &Document) -> bool {
        self.anchor.is_valid(doc) && self.focus.is_valid(doc)
    }

    /// Remap both endpoints for a block insertion (see
    /// [`Point::shifted_for_block_insert`]).
    pub fn shifted_for_block_insert(&self, at: usize, count: usize) -> Self {
        Self {
            anchor: self.anchor.shifted_for_block_insert(at, count),
            focus: self.focus.shifted_for_block_insert(at, count),
        }
    }
}
