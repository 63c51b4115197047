//! The editable document: text storage plus per-line derived spans.
//!
//! Every mutation re-derives spans only for the lines it touched, so the cost
//! of an edit is proportional to the edited lines, not the document.

use std::ops::Range;

use smol_str::SmolStr;

use crate::error::BufferError;
use crate::format::{FormatSpan, derive_spans};
use crate::text::{EditorRope, TextBuffer};
use crate::types::EditInfo;

/// A text buffer with a derived span cache, one entry per line.
#[derive(Clone)]
pub struct Document<T: TextBuffer = EditorRope> {
    buffer: T,
    spans: Vec<Vec<FormatSpan>>,
}

impl Default for Document<EditorRope> {
    fn default() -> Self {
        Self::new(EditorRope::default())
    }
}

impl Document<EditorRope> {
    /// Build a document from initial text.
    pub fn from_text(text: &str) -> Self {
        Self::new(EditorRope::from_str(text))
    }
}

impl<T: TextBuffer> Document<T> {
    /// Wrap an existing buffer, deriving spans for all of its lines.
    pub fn new(buffer: T) -> Self {
        let spans = (0..buffer.len_lines())
            .map(|line_no| derive_line(&buffer, line_no))
            .collect();
        Self {
            buffer,
            spans,
        }
    }

    /// Insert text at a char offset.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<EditInfo, BufferError> {
        let len = self.buffer.len_chars();
        if offset > len {
            return Err(BufferError::OutOfRange { offset, len });
        }

        let first = self.buffer.char_to_line(offset);
        let lines_before = self.buffer.len_lines();
        self.buffer.insert(offset, text);
        let added = self.buffer.len_lines().saturating_sub(lines_before);
        let changed_lines = self.refresh_lines(first, 1, added + 1);

        Ok(EditInfo {
            edit_char_pos: offset,
            inserted_len: text.chars().count(),
            deleted_len: 0,
            contains_newline: text.contains(['\n', '\r']),
            changed_lines,
            doc_len_after: self.buffer.len_chars(),
        })
    }

    /// Delete the chars in `start..end`.
    pub fn delete_range(&mut self, start: usize, end: usize) -> Result<EditInfo, BufferError> {
        let len = self.buffer.len_chars();
        if end > len {
            return Err(BufferError::OutOfRange { offset: end, len });
        }
        if start > end {
            return Err(BufferError::OutOfRange { offset: start, len });
        }

        let contains_newline = self
            .buffer
            .slice(start..end)
            .is_some_and(|s| s.contains(['\n', '\r']));
        let first = self.buffer.char_to_line(start);
        let last = self.buffer.char_to_line(end);
        let lines_before = self.buffer.len_lines();
        self.buffer.delete(start..end);
        let removed = lines_before.saturating_sub(self.buffer.len_lines());
        let old_count = last - first + 1;
        let changed_lines = self.refresh_lines(first, old_count, old_count.saturating_sub(removed));

        Ok(EditInfo {
            edit_char_pos: start,
            inserted_len: 0,
            deleted_len: end - start,
            contains_newline,
            changed_lines,
            doc_len_after: self.buffer.len_chars(),
        })
    }

    /// Remove all text.
    pub fn clear(&mut self) -> Result<EditInfo, BufferError> {
        self.delete_range(0, self.buffer.len_chars())
    }

    /// Text of one line, without its terminator.
    pub fn line_text(&self, line_no: usize) -> Option<SmolStr> {
        self.buffer.line(line_no)
    }

    /// Derived spans for one line.
    pub fn line_spans(&self, line_no: usize) -> Option<&[FormatSpan]> {
        self.spans.get(line_no).map(Vec::as_slice)
    }

    pub fn full_text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    pub fn line_count(&self) -> usize {
        self.buffer.len_lines()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.buffer.char_at(offset)
    }

    pub fn slice(&self, range: Range<usize>) -> Option<SmolStr> {
        self.buffer.slice(range)
    }

    /// Length of the text once trailing whitespace is trimmed off.
    pub fn trimmed_len(&self) -> usize {
        let mut end = self.buffer.len_chars();
        while end > 0 && self.buffer.char_at(end - 1).is_some_and(char::is_whitespace) {
            end -= 1;
        }
        end
    }

    /// Convert a char offset to (line, column).
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.buffer.len_chars());
        let line = self.buffer.char_to_line(offset);
        let start = self.buffer.line_to_char(line).unwrap_or(0);
        (line, offset - start)
    }

    /// Convert (line, column) to a char offset, clamping the column to the
    /// line's length. Returns None past the last line.
    pub fn offset_of(&self, line: usize, col: usize) -> Option<usize> {
        let start = self.buffer.line_to_char(line)?;
        let width = self.buffer.line(line)?.chars().count();
        Some(start + col.min(width))
    }

    /// Replace `old_count` cached lines starting at `first` with freshly
    /// derived spans for `new_count` lines. Returns the new line range.
    fn refresh_lines(&mut self, first: usize, old_count: usize, new_count: usize) -> Range<usize> {
        let old_end = (first + old_count).min(self.spans.len());
        let fresh: Vec<_> = (first..first + new_count)
            .map(|line_no| derive_line(&self.buffer, line_no))
            .collect();
        self.spans.splice(first..old_end, fresh);
        tracing::trace!(first, old_count, new_count, "re-derived line spans");
        debug_assert_eq!(self.spans.len(), self.buffer.len_lines());
        first..first + new_count
    }
}

fn derive_line<T: TextBuffer>(buffer: &T, line_no: usize) -> Vec<FormatSpan> {
    buffer
        .line(line_no)
        .map(|line| derive_spans(&line))
        .unwrap_or_default()
}
