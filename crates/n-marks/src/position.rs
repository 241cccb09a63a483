//! Mark position and span types.
//!
//! All coordinates are **0-indexed**. Line 0 is the first line, column 0 is the
//! first character. Columns count Unicode scalar values (chars), not bytes or
//! grapheme clusters — the same indexing the host buffer uses, so mark columns
//! can be handed straight to it.
//!
//! Display layers should convert to 1-indexed for the user — that conversion
//! never belongs here.

use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position in a text buffer: (line, column), both 0-indexed.
///
/// # Ordering
///
/// Positions are ordered lexicographically: line first, then column. This means
/// `Position { line: 0, col: 5 }` < `Position { line: 1, col: 0 }`. Mark
/// iteration order is built on this.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    /// The origin — line 0, column 0.
    pub const ZERO: Self = Self { line: 0, col: 0 };

    /// A position past any real buffer content. Used as the "end of buffer"
    /// extremity in unbounded queries; never stored in a mark.
    pub const MAX: Self = Self {
        line: usize::MAX,
        col: usize::MAX,
    };

    /// Create a new position.
    #[inline]
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

// Natural ordering: line first, then column.
impl Ord for Position {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.line
            .cmp(&other.line)
            .then(self.col.cmp(&other.col))
    }
}

impl PartialOrd for Position {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.line, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-indexed for human display, matching Vim's `line:col` status.
        write!(
            f,
            "{}:{}",
            self.line.saturating_add(1),
            self.col.saturating_add(1)
        )
    }
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// An inclusive span in a text buffer: `[from, to]`.
///
/// Mark range queries include marks sitting exactly on either endpoint, so
/// unlike an edit range this type is closed on both ends. A span covering a
/// single position has `from == to`. Spans are always normalized so that
/// `from <= to` — use [`Span::new`] which enforces this, or [`Span::ordered`]
/// on untrusted input.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub from: Position,
    pub to: Position,
}

impl Span {
    /// The whole buffer: origin through the end-of-buffer extremity.
    pub const ALL: Self = Self {
        from: Position::ZERO,
        to: Position::MAX,
    };

    /// Create a span. Panics in debug if `from > to`.
    #[inline]
    #[must_use]
    pub const fn new(from: Position, to: Position) -> Self {
        debug_assert!(
            from.line < to.line || (from.line == to.line && from.col <= to.col),
            "Span::new requires from <= to"
        );
        Self { from, to }
    }

    /// Create a span from two arbitrary positions, swapping if needed so
    /// that `from <= to`.
    #[inline]
    #[must_use]
    pub fn ordered(a: Position, b: Position) -> Self {
        if a <= b {
            Self { from: a, to: b }
        } else {
            Self { from: b, to: a }
        }
    }

    /// True when the given position falls within `[from, to]` (inclusive).
    #[inline]
    #[must_use]
    pub fn contains(self, pos: Position) -> bool {
        pos >= self.from && pos <= self.to
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Span({}:{} ..= {}:{})",
            self.from.line, self.from.col, self.to.line, self.to.col
        )
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-indexed for humans.
        write!(f, "{}-{}", self.from, self.to)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
