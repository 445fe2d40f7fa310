use std::fmt;
use std::str::FromStr;

use crate::editing::Point;

/// The closed set of screenplay block types.
///
/// Extending the format means adding a variant here; every kind-dispatch in
/// the workspace is an exhaustive match, so the compiler points at all the
/// places that need a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    SceneHeading,
    Action,
    Character,
    Dialogue,
}

impl BlockKind {
    /// Wire name used by the persisted JSON format.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::SceneHeading => "scene_heading",
            BlockKind::Action => "action",
            BlockKind::Character => "character",
            BlockKind::Dialogue => "dialogue",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown kind names are rejected, never coerced; the persistence layer
/// relies on this to detect corrupt files.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown block kind: {0:?}")]
pub struct UnknownKind(pub String);

impl FromStr for BlockKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scene_heading" => Ok(BlockKind::SceneHeading),
            "action" => Ok(BlockKind::Action),
            "character" => Ok(BlockKind::Character),
            "dialogue" => Ok(BlockKind::Dialogue),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Stable block identifier that survives edits.
///
/// Ids are minted by the owning [`Document`] from a monotonic counter and are
/// never persisted; they exist so frontends can track a block across
/// position changes. All command addressing stays positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

/// A contiguous span of plain text within a block.
///
/// No inline marks are modelled; bold/italic and the like are presentation
/// concerns that never reach the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A typed unit of screenplay content: one scene heading, action paragraph,
/// character cue or dialogue line.
#[derive(Debug, Clone, Eq)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) kind: BlockKind,
    pub(crate) runs: Vec<TextRun>,
}

impl Block {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    /// Full text of the block, runs joined in order.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Block equality is structural (kind and text), ignoring the transient id.
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.runs == other.runs
    }
}

/// A structural rule of the block tree that every committed document must
/// satisfy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("document has no blocks")]
    EmptyDocument,
    #[error("block {index} has no runs")]
    EmptyBlock { index: usize },
    #[error("block {block} run {run} is empty but not the block's sole run")]
    DanglingEmptyRun { block: usize, run: usize },
}

/// The ordered tree of typed screenplay blocks.
///
/// The document is the single source of truth for content. It is mutated
/// only through the transform engine ([`crate::editing::Session`]); every
/// other consumer gets read access or an immutable snapshot.
#[derive(Debug, Clone, Eq)]
pub struct Document {
    pub(crate) blocks: Vec<Block>,
    /// Monotonic id counter; never reused within a document's lifetime.
    next_block_id: u64,
    /// Incremented on each committed transform (enables change detection).
    version: u64,
}

impl Document {
    /// Build a document from `(kind, runs)` pairs, minting fresh ids.
    ///
    /// Intended for restores and tests; the result is not validated here
    /// because the persistence layer wants to inspect the violation.
    pub fn from_blocks<I, R>(blocks: I) -> Self
    where
        I: IntoIterator<Item = (BlockKind, R)>,
        R: IntoIterator<Item = String>,
    {
        let mut doc = Self {
            blocks: Vec::new(),
            next_block_id: 0,
            version: 0,
        };
        for (kind, runs) in blocks {
            let id = doc.mint_id();
            doc.blocks.push(Block {
                id,
                kind,
                runs: runs.into_iter().map(TextRun::new).collect(),
            });
        }
        doc
    }

    /// Convenience for single-run blocks.
    pub fn from_parts(parts: &[(BlockKind, &str)]) -> Self {
        Self::from_blocks(
            parts
                .iter()
                .map(|(kind, text)| (*kind, vec![text.to_string()])),
        )
    }

    /// The default screenplay every fresh session starts from.
    pub fn starter() -> Self {
        Self::from_parts(&[
            (BlockKind::SceneHeading, "INT. ROOM – NIGHT"),
            (BlockKind::Action, "John enters the dark room cautiously."),
            (BlockKind::Character, "JOHN"),
            (BlockKind::Dialogue, "Is anyone here?"),
        ])
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn run_text(&self, block: usize, run: usize) -> Option<&str> {
        self.blocks
            .get(block)
            .and_then(|b| b.runs.get(run))
            .map(|r| r.text.as_str())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    pub(crate) fn mint_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        id
    }

    /// Check the structural invariants: at least one block, at least one run
    /// per block, and no empty run alongside non-empty siblings.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.blocks.is_empty() {
            return Err(InvariantViolation::EmptyDocument);
        }
        for (index, block) in self.blocks.iter().enumerate() {
            if block.runs.is_empty() {
                return Err(InvariantViolation::EmptyBlock { index });
            }
            if block.runs.len() > 1 {
                for (run, r) in block.runs.iter().enumerate() {
                    if r.is_empty() {
                        return Err(InvariantViolation::DanglingEmptyRun { block: index, run });
                    }
                }
            }
        }
        Ok(())
    }

    /// Caret position of the very start of the document.
    pub fn start(&self) -> Point {
        Point::new(0, 0, 0)
    }

    /// Caret position past the last character of the document.
    pub fn end(&self) -> Point {
        let block = self.blocks.len().saturating_sub(1);
        self.end_of_block(block)
    }

    /// Caret position past the last character of `block`.
    pub fn end_of_block(&self, block: usize) -> Point {
        let run = self
            .blocks
            .get(block)
            .map(|b| b.runs.len().saturating_sub(1))
            .unwrap_or(0);
        let offset = self
            .run_text(block, run)
            .map(|text| text.len())
            .unwrap_or(0);
        Point::new(block, run, offset)
    }

    /// Caret one character before `p`, crossing run and block boundaries.
    /// `None` at the very start of the document.
    pub fn point_before(&self, p: Point) -> Option<Point> {
        let block = self.blocks.get(p.block)?;
        let run = block.runs.get(p.run)?;
        if p.offset > 0 {
            let step = run.text[..p.offset].chars().next_back()?.len_utf8();
            return Some(Point::new(p.block, p.run, p.offset - step));
        }
        if p.run > 0 {
            let prev = &block.runs[p.run - 1];
            let step = prev.text.chars().next_back().map_or(0, char::len_utf8);
            return Some(Point::new(p.block, p.run - 1, prev.text.len() - step));
        }
        if p.block > 0 {
            return Some(self.end_of_block(p.block - 1));
        }
        None
    }

    /// Caret one character after `p`, crossing run and block boundaries.
    /// `None` at the very end of the document.
    pub fn point_after(&self, p: Point) -> Option<Point> {
        let block = self.blocks.get(p.block)?;
        let run = block.runs.get(p.run)?;
        if p.offset < run.text.len() {
            let step = run.text[p.offset..].chars().next()?.len_utf8();
            return Some(Point::new(p.block, p.run, p.offset + step));
        }
        if p.run + 1 < block.runs.len() {
            let next = &block.runs[p.run + 1];
            let step = next.text.chars().next().map_or(0, char::len_utf8);
            return Some(Point::new(p.block, p.run + 1, step));
        }
        if p.block + 1 < self.blocks.len() {
            return Some(Point::new(p.block + 1, 0, 0));
        }
        None
    }
}

/// Structural equality: same kinds and text in the same order. Ids and the
/// version counter are transient and ignored, so a saved and reloaded
/// document compares equal to the original.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks
    }
}
