//! Locating logical keys inside JSON text.

use std::ops::Range;

use regex::Regex;

use crate::input::json_ranges::JsonKeyRanges;
use crate::input::key_set::leaf_segment;
use crate::syntax::scanner::{
    MethodPattern,
    QuoteStyle,
};
use crate::types::{
    LineIndex,
    SourcePosition,
    SourceRange,
};

/// Maps flat key paths to ranges in one JSON text, and back.
#[derive(Debug, Clone)]
pub struct KeyLocator<'a> {
    /// Offset/position conversion for the text.
    lines: LineIndex<'a>,
    /// Key ranges from the parsed structure.
    ranges: JsonKeyRanges,
}

impl<'a> KeyLocator<'a> {
    /// Indexes `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { lines: LineIndex::new(text), ranges: JsonKeyRanges::extract(text) }
    }

    /// Byte range of the property name of `key`, quotes included.
    ///
    /// Uses the parsed structure first. Falls back to the first line holding
    /// `"<leaf>"` followed by a colon, which may pick a same-named sibling.
    #[must_use]
    pub fn locate_bytes(&self, key: &str) -> Option<Range<usize>> {
        self.ranges.get(key).or_else(|| self.find_leaf_line(leaf_segment(key)))
    }

    /// Editor range of the property name of `key`.
    #[must_use]
    pub fn locate(&self, key: &str) -> Option<SourceRange> {
        self.locate_bytes(key).map(|range| self.lines.range(range))
    }

    /// Flat path of the property name under `position`.
    #[must_use]
    pub fn key_at(&self, position: SourcePosition) -> Option<&str> {
        self.lines.offset(position).and_then(|offset| self.ranges.key_at(offset))
    }

    /// Range of `"<leaf>"` on the first line where it is followed by a colon.
    fn find_leaf_line(&self, leaf: &str) -> Option<Range<usize>> {
        let pattern = Regex::new(&format!(r#""{}"\s*:"#, regex::escape(leaf))).ok()?;

        (0..self.lines.line_count()).find_map(|line| {
            let start = self.lines.line_start(line)?;
            let found = pattern.find(self.lines.line_text(line)?)?;
            // 末尾の `\s*:` を除いた引用符付きの名前
            Some(start + found.start()..start + found.start() + leaf.len() + 2)
        })
    }
}

/// Byte offset of `position` within its line, with the line's text.
#[must_use]
pub fn line_at<'t>(lines: &LineIndex<'t>, position: SourcePosition) -> Option<(&'t str, usize)> {
    let line = position.line as usize;
    let offset = lines.offset(position)?;
    let start = lines.line_start(line)?;
    Some((lines.line_text(line)?, offset - start))
}

/// The single- or double-quoted key literal under `position`, found by
/// re-scanning the cursor's line with `patterns`.
///
/// The cursor counts as inside from just after the opening quote up to the closing one.
#[must_use]
pub fn key_under_cursor<'p>(
    text: &str,
    position: SourcePosition,
    patterns: impl IntoIterator<Item = &'p MethodPattern>,
) -> Option<String> {
    let lines = LineIndex::new(text);
    let (line, cursor) = line_at(&lines, position)?;

    patterns.into_iter().find_map(|pattern| {
        pattern
            .scan(line, QuoteStyle::SingleOrDouble)
            .into_iter()
            .find(|usage| usage.key_contains(cursor))
            .map(|usage| usage.key)
    })
}
