//! Pattern-driven extraction of key usages from arbitrary source text.
//!
//! There is no language-aware parsing here: a usage is whatever a method
//! pattern followed by a parenthesised, quoted literal matches.

use std::collections::HashSet;
use std::ops::Range;

use regex::Regex;

/// Key literal quoted with `"`, `'` or a backtick. The key may contain the other quotes.
const ANY_QUOTED_KEY: &str = r#"(?:"(?P<double>[^"]+)"|'(?P<single>[^']+)'|`(?P<backtick>[^`]+)`)"#;

/// Key literal quoted with `"` or `'` only.
const PLAIN_QUOTED_KEY: &str = r#"(?:"(?P<double>[^"]+)"|'(?P<single>[^']+)')"#;

/// Capture group names holding the key text, one per quote kind.
const KEY_GROUPS: [&str; 3] = ["double", "single", "backtick"];

/// Which quote characters may delimit a key literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// Single, double and backtick quotes. Used when checking documents.
    Any,
    /// Single and double quotes. Used when re-deriving the key under the cursor.
    SingleOrDouble,
}

/// One literal key occurrence found in a text body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageRecord {
    /// The key, without quotes.
    pub key: String,
    /// Byte range of the key literal, quotes included.
    pub span: Range<usize>,
    /// Byte range of the whole call, from the method name to the closing parenthesis.
    pub call: Range<usize>,
}

impl UsageRecord {
    /// Byte offset of the opening quote.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.span.start
    }

    /// Length of the literal, quotes included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.span.end - self.span.start
    }

    /// True for a zero-length literal.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `offset` is a cursor position inside the literal, from just after
    /// the opening quote up to the closing one.
    #[must_use]
    pub const fn key_contains(&self, offset: usize) -> bool {
        self.span.start < offset && offset < self.span.end
    }
}

/// A compiled `methodPatterns` entry.
#[derive(Debug, Clone)]
pub struct MethodPattern {
    /// The fragment as configured.
    source: String,
    /// The fragment alone.
    bare: Regex,
    /// A call with a key in single, double or backtick quotes.
    any_quotes: Regex,
    /// A call with a key in single or double quotes.
    plain_quotes: Regex,
    /// An unterminated call ending at the cursor.
    completion: Regex,
}

impl MethodPattern {
    /// Compiles a method-pattern fragment.
    ///
    /// The fragment is wrapped in a non-capturing group so alternations such
    /// as `t|translate` bind to the call syntax as a whole.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            bare: Regex::new(source)?,
            any_quotes: Regex::new(&format!(r"(?:{source})\s*\(\s*{ANY_QUOTED_KEY}\s*\)"))?,
            plain_quotes: Regex::new(&format!(r"(?:{source})\s*\(\s*{PLAIN_QUOTED_KEY}\s*\)"))?,
            completion: Regex::new(&format!(r#"(?:{source})\s*\(\s*['"](?P<partial>[^'"]*)$"#))?,
        })
    }

    /// The fragment as configured.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True if the bare fragment occurs anywhere in `text`.
    #[must_use]
    pub fn appears_in(&self, text: &str) -> bool {
        self.bare.is_match(text)
    }

    /// Finds every non-overlapping usage in `text`, in order of appearance.
    #[must_use]
    pub fn scan(&self, text: &str, quotes: QuoteStyle) -> Vec<UsageRecord> {
        let regex = match quotes {
            QuoteStyle::Any => &self.any_quotes,
            QuoteStyle::SingleOrDouble => &self.plain_quotes,
        };

        regex
            .captures_iter(text)
            .filter_map(|captures| {
                let call = captures.get(0)?;
                let key = KEY_GROUPS.iter().find_map(|name| captures.name(name))?;
                Some(UsageRecord {
                    key: key.as_str().to_string(),
                    span: key.start() - 1..key.end() + 1,
                    call: call.range(),
                })
            })
            .collect()
    }

    /// Returns the partial key when `before_cursor` ends inside an opened key literal.
    #[must_use]
    pub fn partial_key<'t>(&self, before_cursor: &'t str) -> Option<&'t str> {
        self.completion
            .captures(before_cursor)
            .and_then(|captures| captures.name("partial"))
            .map(|partial| partial.as_str())
    }
}

/// Runs every pattern over `text`. Records are ordered by offset; a literal
/// matched by several patterns is reported once.
#[must_use]
pub fn scan_usages<'p>(
    text: &str,
    patterns: impl IntoIterator<Item = &'p MethodPattern>,
    quotes: QuoteStyle,
) -> Vec<UsageRecord> {
    let mut records: Vec<_> =
        patterns.into_iter().flat_map(|pattern| pattern.scan(text, quotes)).collect();
    records.sort_by(|a, b| a.span.start.cmp(&b.span.start).then_with(|| a.key.cmp(&b.key)));
    records.dedup_by(|a, b| a.span == b.span && a.key == b.key);
    records
}

/// Deduplicated key texts of `records`.
#[must_use]
pub fn used_keys(records: &[UsageRecord]) -> HashSet<String> {
    records.iter().map(|record| record.key.clone()).collect()
}
