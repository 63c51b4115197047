//! Text storage abstraction.
//!
//! The `TextBuffer` trait is the raw character store underneath a
//! [`Document`](crate::Document). It performs no bounds policy of its own;
//! the document validates offsets before calling in.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// A text store addressed by Unicode scalar value (char) offsets.
///
/// All offsets are in chars, never bytes, so multi-byte glyphs stay atomic.
pub trait TextBuffer {
    /// Total length in chars.
    fn len_chars(&self) -> usize;

    /// Number of lines. An empty buffer has one (empty) line, and a trailing
    /// newline opens a further empty line.
    fn len_lines(&self) -> usize;

    /// Check if empty.
    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert text at char offset. Caller guarantees `char_offset <= len_chars()`.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete a char range. Caller guarantees the range is in bounds.
    fn delete(&mut self, char_range: Range<usize>);

    /// Get a slice as SmolStr. Returns None if range is invalid.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// Get character at offset. Returns None if out of bounds.
    fn char_at(&self, char_offset: usize) -> Option<char>;

    /// Line index containing the char offset (clamped to the last line).
    fn char_to_line(&self, char_offset: usize) -> usize;

    /// Char offset at which a line starts. Returns None past the last line.
    fn line_to_char(&self, line_no: usize) -> Option<usize>;

    /// Text of a line without its line terminator.
    fn line(&self, line_no: usize) -> Option<SmolStr>;

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;
}

/// Ropey-backed text buffer.
///
/// Provides O(log n) editing and line lookup, so per-line work after an edit
/// stays proportional to the edited line rather than the document.
#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    /// Create from string.
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        if char_offset >= self.len_chars() {
            return None;
        }
        Some(self.rope.char(char_offset))
    }

    fn char_to_line(&self, char_offset: usize) -> usize {
        self.rope.char_to_line(char_offset.min(self.rope.len_chars()))
    }

    fn line_to_char(&self, line_no: usize) -> Option<usize> {
        if line_no >= self.rope.len_lines() {
            return None;
        }
        Some(self.rope.line_to_char(line_no))
    }

    fn line(&self, line_no: usize) -> Option<SmolStr> {
        if line_no >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_no);
        let mut len = line.len_chars();
        // Strip the terminator; ropey keeps "\r\n" together as one break.
        if len > 0 && line.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && line.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        Some(line.slice(..len).to_smolstr())
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}
