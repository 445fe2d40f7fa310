use crate::editing::Selection;

/// Result of applying a command
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Block indices touched by the edit, in post-edit coordinates.
    pub changed: std::ops::Range<usize>,
    pub new_selection: Selection,
    pub version: u64,
}
