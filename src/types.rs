//! Core types used throughout the project.

use std::ops::Range;

use tower_lsp::lsp_types;

/// A range in a text document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRange {
    /// Start position (inclusive).
    pub start: SourcePosition,
    /// End position (exclusive).
    pub end: SourcePosition,
}

impl From<lsp_types::Range> for SourceRange {
    fn from(range: lsp_types::Range) -> Self {
        Self { start: range.start.into(), end: range.end.into() }
    }
}

impl From<SourceRange> for lsp_types::Range {
    fn from(range: SourceRange) -> Self {
        Self { start: range.start.into(), end: range.end.into() }
    }
}

/// A position in a text document (0-indexed, `character` in UTF-16 code units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    /// Line number (0-indexed).
    pub line: u32,
    /// Character offset in UTF-16 code units (0-indexed).
    pub character: u32,
}

impl From<lsp_types::Position> for SourcePosition {
    fn from(position: lsp_types::Position) -> Self {
        Self { line: position.line, character: position.character }
    }
}

impl From<SourcePosition> for lsp_types::Position {
    fn from(position: SourcePosition) -> Self {
        Self { line: position.line, character: position.character }
    }
}

impl SourceRange {
    /// Checks if a position is within this range.
    #[must_use]
    pub const fn contains(&self, position: SourcePosition) -> bool {
        if position.line < self.start.line {
            return false;
        }
        if position.line == self.start.line && position.character < self.start.character {
            return false;
        }
        if position.line > self.end.line {
            return false;
        }
        if position.line == self.end.line && position.character > self.end.character {
            return false;
        }
        true
    }
}

/// Converts between byte offsets and editor positions for one text body.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    /// The indexed text.
    text: &'a str,
    /// Byte offset where each line starts.
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    /// Indexes the line starts of `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    /// Number of lines (a trailing newline opens an empty last line).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the start of `line`.
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Text of `line` without its line terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&'a str> {
        let start = self.line_start(line)?;
        let end = self.line_starts.get(line + 1).map_or(self.text.len(), |next| next - 1);
        let text = self.text.get(start..end)?;
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// Converts a byte offset to a position. Offsets past the end clamp to the end.
    #[must_use]
    pub fn position(&self, offset: usize) -> SourcePosition {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let line_start = self.line_start(line).unwrap_or(0);
        let character = self
            .text
            .get(line_start..offset)
            .map_or(0, |prefix| prefix.encode_utf16().count());

        #[allow(clippy::cast_possible_truncation)]
        SourcePosition { line: line as u32, character: character as u32 }
    }

    /// Converts a position to a byte offset. Characters past the line end clamp to it.
    #[must_use]
    pub fn offset(&self, position: SourcePosition) -> Option<usize> {
        let line = position.line as usize;
        let start = self.line_start(line)?;
        let text = self.line_text(line)?;

        let mut units = 0;
        for (index, ch) in text.char_indices() {
            if units >= position.character as usize {
                return Some(start + index);
            }
            units += ch.len_utf16();
        }
        Some(start + text.len())
    }

    /// Converts a byte range to a source range.
    #[must_use]
    pub fn range(&self, range: Range<usize>) -> SourceRange {
        SourceRange { start: self.position(range.start), end: self.position(range.end) }
    }
}
