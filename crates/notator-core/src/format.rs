//! Line-local Markdown span detection.
//!
//! Derives formatting spans for one line of text. Each rule is a pure
//! matcher producing candidate groups (a group is the set of spans one match
//! contributes, e.g. `**`, interior, `**`). Groups are merged in a fixed
//! rule order: a group is kept only if none of its spans clashes with a span
//! already accepted. This makes the ambiguity policy explicit:
//!
//! - a heading line never also gets quote or bullet styling;
//! - where `**` and `*` both claim the same asterisks, bold wins;
//! - a bullet item resets the rest of its line to plain text.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Opacity of marker glyphs (`#`, `**`, `>`) relative to body text.
pub const MUTED_ALPHA: f64 = 0.45;

/// Opacity of quoted text.
pub const QUOTE_ALPHA: f64 = 0.7;

/// Formatting kind of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanKind {
    Bold,
    Italic,
    /// Heading level 1..=6.
    Heading(u8),
    /// Block quote; rendered italic and dimmed.
    QuoteMarker,
    /// The `*` glyph opening a bullet item.
    BulletMarker,
    /// Dimmed marker glyph layered over whatever lies beneath.
    Muted,
}

impl SpanKind {
    /// Stacking rank; higher ranks are drawn over lower ones.
    pub fn rank(self) -> u8 {
        match self {
            SpanKind::Heading(_) => 0,
            SpanKind::QuoteMarker => 1,
            SpanKind::Bold => 2,
            SpanKind::Italic => 3,
            SpanKind::BulletMarker => 4,
            SpanKind::Muted => 5,
        }
    }

    /// The weight a freshly derived span of this kind carries.
    ///
    /// Headings carry their size factor, quote and marker kinds their opacity,
    /// everything else 1.0.
    pub fn default_weight(self) -> f64 {
        match self {
            SpanKind::Heading(level) => heading_scale(level),
            SpanKind::QuoteMarker => QUOTE_ALPHA,
            SpanKind::Muted => MUTED_ALPHA,
            SpanKind::Bold | SpanKind::Italic | SpanKind::BulletMarker => 1.0,
        }
    }

    /// Inline emphasis kinds, as opposed to line-level styling.
    pub fn is_emphasis(self) -> bool {
        matches!(self, SpanKind::Bold | SpanKind::Italic | SpanKind::Muted)
    }

    /// Whether two kinds may cover the same chars.
    pub fn compatible_with(self, other: SpanKind) -> bool {
        use SpanKind::*;
        match (self, other) {
            // Two markers claiming the same glyph is the bold/italic clash.
            (Muted, Muted) => false,
            (BulletMarker, Muted | Bold | Italic | BulletMarker) => false,
            (Muted | Bold | Italic, BulletMarker) => false,
            // Line-level kinds are mutually exclusive.
            (Heading(_), QuoteMarker | BulletMarker) => false,
            (QuoteMarker | BulletMarker, Heading(_)) => false,
            (Bold, Bold) | (Italic, Italic) => false,
            _ => true,
        }
    }
}

/// Size factor for a heading level relative to the base font size.
///
/// Unknown levels clamp to 1.0.
pub fn heading_scale(level: u8) -> f64 {
    match level {
        1 => 2.0,
        2 => 1.7,
        3 => 1.5,
        4 => 1.3,
        5 => 1.2,
        6 => 1.1,
        _ => 1.0,
    }
}

/// A formatted char range within one line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormatSpan {
    /// Char offset from the start of the line.
    pub start: usize,
    /// Length in chars.
    pub length: usize,
    pub kind: SpanKind,
    pub weight: f64,
}

impl FormatSpan {
    /// Create a span with the kind's default weight.
    pub fn new(start: usize, length: usize, kind: SpanKind) -> Self {
        Self {
            start,
            length,
            kind,
            weight: kind.default_weight(),
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Whether the two spans share at least one char.
    pub fn overlaps(&self, other: &FormatSpan) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Whether the span is allowed to sit alongside `other`.
    pub fn coexists_with(&self, other: &FormatSpan) -> bool {
        !self.overlaps(other) || self.kind.compatible_with(other.kind)
    }
}

/// Formatting rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Heading,
    Bold,
    Italic,
    Bullet,
    Quote,
}

impl Rule {
    /// Rules whose match resets everything after it on the line to plain text.
    pub fn clears_remainder(self) -> bool {
        matches!(self, Rule::Bullet)
    }
}

type Matcher = fn(&LineText<'_>) -> Vec<Vec<FormatSpan>>;

/// The fixed precedence table: earlier rules claim chars first.
const RULES: [(Rule, Matcher); 5] = [
    (Rule::Heading, match_heading),
    (Rule::Bold, match_bold),
    (Rule::Italic, match_italic),
    (Rule::Bullet, match_bullet),
    (Rule::Quote, match_quote),
];

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)").expect("heading pattern is valid"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"));
static ITALIC_RE: LazyLock<fancy_regex::Regex> = LazyLock::new(|| {
    fancy_regex::Regex::new(r"(?<!\*)\*(?!\s)(.+?)(?<!\s)\*(?!\*)")
        .expect("italic pattern is valid")
});
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\*)\s+(.*)").expect("bullet pattern is valid"));
static QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(>)\s+(.*)").expect("quote pattern is valid"));

/// A line plus its byte-to-char index, built once per derivation.
struct LineText<'a> {
    text: &'a str,
    char_starts: Vec<usize>,
}

impl<'a> LineText<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            char_starts: text.char_indices().map(|(b, _)| b).collect(),
        }
    }

    /// Char offset of a byte offset that lies on a char boundary.
    fn char_at_byte(&self, byte: usize) -> usize {
        self.char_starts.partition_point(|&b| b < byte)
    }

    fn char_range(&self, bytes: Range<usize>) -> Range<usize> {
        self.char_at_byte(bytes.start)..self.char_at_byte(bytes.end)
    }

    fn char_len(&self) -> usize {
        self.char_starts.len()
    }
}

fn span(range: Range<usize>, kind: SpanKind) -> FormatSpan {
    FormatSpan::new(range.start, range.len(), kind)
}

fn match_heading(line: &LineText<'_>) -> Vec<Vec<FormatSpan>> {
    let Some(caps) = HEADING_RE.captures(line.text) else {
        return Vec::new();
    };
    let Some(hashes) = caps.get(1) else {
        return Vec::new();
    };
    let level = hashes.as_str().len() as u8;
    vec![vec![
        span(0..line.char_len(), SpanKind::Heading(level)),
        span(line.char_range(hashes.range()), SpanKind::Muted),
    ]]
}

fn match_bold(line: &LineText<'_>) -> Vec<Vec<FormatSpan>> {
    BOLD_RE
        .captures_iter(line.text)
        .filter_map(|caps| {
            let whole = line.char_range(caps.get(0)?.range());
            let inner = line.char_range(caps.get(1)?.range());
            Some(vec![
                span(whole.start..inner.start, SpanKind::Muted),
                span(inner.clone(), SpanKind::Bold),
                span(inner.end..whole.end, SpanKind::Muted),
            ])
        })
        .collect()
}

fn match_italic(line: &LineText<'_>) -> Vec<Vec<FormatSpan>> {
    // A backtracking-limit error ends the scan; the line just stays plain.
    ITALIC_RE
        .captures_iter(line.text)
        .map_while(Result::ok)
        .filter_map(|caps| {
            let whole = line.char_range(caps.get(0)?.range());
            let inner = line.char_range(caps.get(1)?.range());
            Some(vec![
                span(whole.start..inner.start, SpanKind::Muted),
                span(inner.clone(), SpanKind::Italic),
                span(inner.end..whole.end, SpanKind::Muted),
            ])
        })
        .collect()
}

fn match_bullet(line: &LineText<'_>) -> Vec<Vec<FormatSpan>> {
    let Some(star) = BULLET_RE.captures(line.text).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };
    vec![vec![span(line.char_range(star.range()), SpanKind::BulletMarker)]]
}

fn match_quote(line: &LineText<'_>) -> Vec<Vec<FormatSpan>> {
    let Some(marker) = QUOTE_RE.captures(line.text).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };
    vec![vec![
        span(0..line.char_len(), SpanKind::QuoteMarker),
        span(line.char_range(marker.range()), SpanKind::Muted),
    ]]
}

/// Derive the formatting spans for one line.
///
/// Pure: the same input always yields the same output. Offsets are in chars
/// relative to the start of the line. The result is ordered by start offset,
/// then stacking rank.
pub fn derive_spans(line: &str) -> Vec<FormatSpan> {
    let line = LineText::new(line);
    let mut accepted: Vec<FormatSpan> = Vec::new();

    for (rule, matcher) in RULES {
        for group in matcher(&line) {
            let cleared_from = rule
                .clears_remainder()
                .then(|| group.iter().map(FormatSpan::end).max().unwrap_or(0));
            let survives = |kept: &FormatSpan| {
                cleared_from.is_none_or(|from| kept.start < from || !kept.kind.is_emphasis())
            };
            let clashes = group.iter().any(|candidate| {
                accepted
                    .iter()
                    .any(|kept| survives(kept) && !candidate.coexists_with(kept))
            });
            if clashes {
                tracing::trace!(?rule, ?group, "dropping clashing span group");
                continue;
            }
            if cleared_from.is_some() {
                accepted.retain(|kept| survives(kept));
            }
            accepted.extend(group.into_iter().filter(|s| s.length > 0));
        }
    }

    sort_spans(&mut accepted);
    accepted
}

/// Order spans by start offset, then stacking rank, longest first.
pub fn sort_spans(spans: &mut [FormatSpan]) {
    spans.sort_by_key(|s| (s.start, s.kind.rank(), std::cmp::Reverse(s.length)));
}

/// Layer a fade of opacity `alpha` over the char at `col`.
///
/// Spans that may not share that char with a `Muted` overlay are split
/// around it.
pub fn overlay_fade(spans: &mut Vec<FormatSpan>, col: usize, alpha: f64) {
    let fade = FormatSpan {
        start: col,
        length: 1,
        kind: SpanKind::Muted,
        weight: alpha,
    };
    let mut merged = Vec::with_capacity(spans.len() + 2);
    for s in spans.drain(..) {
        if fade.coexists_with(&s) {
            merged.push(s);
            continue;
        }
        if s.start < col {
            merged.push(FormatSpan {
                length: col - s.start,
                ..s
            });
        }
        if s.end() > col + 1 {
            merged.push(FormatSpan {
                start: col + 1,
                length: s.end() - col - 1,
                ..s
            });
        }
    }
    merged.push(fade);
    sort_spans(&mut merged);
    *spans = merged;
}
