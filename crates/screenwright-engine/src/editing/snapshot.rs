use crate::editing::{BlockId, BlockKind, Document};

/// Immutable render view of a document.
///
/// Frontends draw from snapshots and dispatch commands back through the
/// session; they never see the mutable tree. Stable block ids let a UI diff
/// consecutive snapshots across insertions and reorders.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub blocks: Vec<RenderBlock>,
    pub version: u64,
}

/// One block as a frontend sees it: stable id, kind for style dispatch, and
/// the run text joined into a single string.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub text: String,
}

pub fn create_snapshot(doc: &Document) -> Snapshot {
    Snapshot {
        blocks: doc
            .blocks()
            .iter()
            .map(|block| RenderBlock {
                id: block.id(),
                kind: block.kind(),
                text: block.text(),
            })
            .collect(),
        version: doc.version(),
    }
}
