//! Core editor types: cursor and edit tracking.

use std::ops::Range;

/// Cursor state for one buffer.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct CursorState {
    /// Character offset in text (NOT byte offset!)
    pub offset: usize,

    /// Column to aim for on vertical movement, kept across consecutive
    /// up/down moves through shorter lines. Cleared by any other movement.
    pub goal_column: Option<usize>,
}

impl CursorState {
    /// Create a new cursor at the given offset.
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            goal_column: None,
        }
    }

    /// Move to an offset, dropping any vertical goal column.
    pub fn move_to(&mut self, offset: usize) {
        self.offset = offset;
        self.goal_column = None;
    }

    /// Clamp the cursor into a buffer of `len` chars.
    pub fn clamp(&mut self, len: usize) {
        if self.offset > len {
            self.offset = len;
            self.goal_column = None;
        }
    }
}

/// Information about an applied edit.
///
/// Carries enough to tell which lines had their spans recomputed, so the
/// caller can forward only those to the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditInfo {
    /// Character offset where the edit occurred
    pub edit_char_pos: usize,
    /// Number of characters inserted
    pub inserted_len: usize,
    /// Number of characters deleted
    pub deleted_len: usize,
    /// Whether the inserted or deleted text contained a newline
    pub contains_newline: bool,
    /// Lines (post-edit numbering) whose content changed
    pub changed_lines: Range<usize>,
    /// Document length (in chars) after this edit was applied.
    pub doc_len_after: usize,
}
