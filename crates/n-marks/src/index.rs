//! Two-level ordered mark index — the position store behind extended marks.
//!
//! Lines live in an ordered map keyed by line number; each line node holds an
//! ordered set of marks keyed by `(col, namespace, mark id)`. The secondary
//! and tertiary keys are a deliberate tie-break: bulk adjustments re-file many
//! marks at overlapping target columns in a single pass, and a column-only key
//! would make that ordering nondeterministic.
//!
//! # Design choices
//!
//! - **Line nodes are arena-allocated.** The identity tables map
//!   `(namespace, mark id)` to an opaque [`LineId`], never to a line number
//!   and never to a reference. Line adjustments re-key nodes freely without
//!   touching a single identity entry, and there is no pointer to dangle when
//!   a node is destroyed.
//!
//! - **A line node exists only while it holds at least one mark.** Nodes are
//!   created lazily on first insertion and dropped when their last mark
//!   leaves, so iterating lines never visits empty husks.
//!
//! - **Everything here is undo-suppressed.** Mutation primitives in this
//!   module never record anything; they return what they did (including which
//!   marks they deleted) and [`crate::marks::BufferMarks`] decides what goes
//!   into the history. The undo replayer calls straight into this module for
//!   exactly that reason.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::position::{Position, Span};

/// Sentinel `amount` for [`MarkIndex::line_adjust`]: marks on the affected
/// lines are removed instead of shifted (their text is gone).
pub const DELETED_LINES: i64 = i64::MAX;

/// Sentinel line number meaning "through the end of the buffer".
pub const MAX_LINE: usize = usize::MAX;

// ---------------------------------------------------------------------------
// Mark
// ---------------------------------------------------------------------------

/// Scan direction for neighbor and range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A mark as handed to callers: identity plus current position.
///
/// This is a plain value, re-resolved on every query — marks are re-filed
/// between line nodes as text moves, so nothing outside the index may hold
/// onto one across calls. Identity is `(ns, id)`, unique within a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub ns: u64,
    pub id: u64,
    pub pos: Position,
}

/// Inner-set key. Derived `Ord` on field order gives the
/// `(col, namespace, mark id)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct MarkKey {
    col: usize,
    ns: u64,
    id: u64,
}

impl MarkKey {
    /// Smallest key at or after `col`.
    const fn floor(col: usize) -> Self {
        Self { col, ns: 0, id: 0 }
    }

    /// Largest key at or before `col`.
    const fn ceil(col: usize) -> Self {
        Self {
            col,
            ns: u64::MAX,
            id: u64::MAX,
        }
    }
}

// ---------------------------------------------------------------------------
// Line nodes
// ---------------------------------------------------------------------------

/// Arena handle for a line node. Stable for the node's whole life, across any
/// number of line-number changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LineId(u64);

/// Per-line container of marks. Only exists while `marks` is non-empty.
#[derive(Debug)]
struct LineNode {
    line: usize,
    marks: BTreeSet<MarkKey>,
}

/// Per-namespace identity table for one buffer.
#[derive(Debug, Default)]
struct NsMarks {
    marks: FxHashMap<u64, LineId>,
    free_id: u64,
}

/// What [`MarkIndex::place`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placed {
    Created,
    Updated { old: Position },
}

/// What an adjustment pass did: whether any marks were in range, and which
/// marks it removed (in removal order, so the caller can record their unsets
/// before the adjustment record itself).
#[derive(Debug, Default)]
pub(crate) struct AdjustOutcome {
    pub(crate) marks_existed: bool,
    pub(crate) deleted: Vec<Mark>,
    /// Survivors whose exact positions the shift deltas cannot reproduce on
    /// replay: marks pinned at column 0 by a saturating shift, and marks
    /// just before `mincol` that an inverse of the shift would sweep.
    /// Stored as (pre-adjust mark, post-adjust position).
    pub(crate) pinned: Vec<(Mark, Position)>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Shift a line number by a signed amount. Lines never go negative — a caller
/// asking for that has its edit deltas wrong.
pub(crate) fn shift_line(line: usize, amount: i64) -> usize {
    let shifted = line as i64 + amount;
    debug_assert!(shifted >= 0, "line {line} shifted by {amount} went negative");
    shifted.max(0) as usize
}

/// Shift a column by a signed amount, saturating at 0. Deletion edge cases
/// remove marks instead of producing negative columns; anything that slips
/// past that rule pins to the line start.
pub(crate) fn shift_col(col: usize, amount: i64) -> usize {
    (col as i64 + amount).max(0) as usize
}

// ---------------------------------------------------------------------------
// MarkIndex
// ---------------------------------------------------------------------------

/// The per-buffer mark store: ordered position index plus identity tables.
#[derive(Debug, Default)]
pub struct MarkIndex {
    /// Arena of line nodes.
    nodes: FxHashMap<LineId, LineNode>,
    /// Line-number order over the arena. A node mid-move lives in
    /// `move_space` instead and has no entry here.
    order: BTreeMap<usize, LineId>,
    /// Identity tables, one per namespace that ever created a mark here.
    ns_marks: FxHashMap<u64, NsMarks>,
    /// Holding list for the three-phase line move: nodes pulled out of
    /// `order` so an in-flight move can't break its ordering.
    move_space: Vec<LineId>,
    next_node: u64,
    mark_count: usize,
}

impl MarkIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of marks across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mark_count
    }

    /// Whether the buffer holds no marks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mark_count == 0
    }

    /// True while at least one mark sits on `line`.
    #[must_use]
    pub fn line_has_marks(&self, line: usize) -> bool {
        self.order.contains_key(&line)
    }

    /// The next unused mark id for a namespace — the largest id ever set
    /// plus one. Returns 0 for a namespace that never created a mark here.
    #[must_use]
    pub fn next_free_id(&self, ns: u64) -> u64 {
        self.ns_marks.get(&ns).map_or(0, |n| n.free_id)
    }

    /// Release every line node, mark, and identity table. Called when the
    /// buffer is destroyed.
    pub fn free_all(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.ns_marks.clear();
        self.move_space.clear();
        self.mark_count = 0;
    }

    // -- Lookup -------------------------------------------------------------

    /// Look up a mark by identity.
    #[must_use]
    pub fn get(&self, ns: u64, id: u64) -> Option<Mark> {
        let nid = *self.ns_marks.get(&ns)?.marks.get(&id)?;
        let node = self.nodes.get(&nid)?;
        let key = node.marks.iter().find(|k| k.ns == ns && k.id == id)?;
        Some(Mark {
            ns,
            id,
            pos: Position::new(node.line, key.col),
        })
    }

    /// Look up a mark by exact position within a namespace.
    #[must_use]
    pub fn mark_at(&self, ns: u64, pos: Position) -> Option<Mark> {
        let nid = self.order.get(&pos.line)?;
        self.nodes[nid]
            .marks
            .range(MarkKey::floor(pos.col)..=MarkKey::ceil(pos.col))
            .find(|k| k.ns == ns)
            .map(|k| Mark {
                ns,
                id: k.id,
                pos,
            })
    }

    // -- Iteration ----------------------------------------------------------

    /// All marks at or after `pos`, in `(line, col, ns, id)` order, every
    /// namespace included. Lazy — neighbor queries stop at the first hit.
    pub fn marks_from(&self, pos: Position) -> impl Iterator<Item = Mark> + '_ {
        self.order.range(pos.line..).flat_map(move |(&line, nid)| {
            let start = if line == pos.line {
                MarkKey::floor(pos.col)
            } else {
                MarkKey::floor(0)
            };
            self.nodes[nid].marks.range(start..).map(move |k| Mark {
                ns: k.ns,
                id: k.id,
                pos: Position::new(line, k.col),
            })
        })
    }

    /// All marks at or before `pos`, in reverse `(line, col, ns, id)` order.
    pub fn marks_until(&self, pos: Position) -> impl Iterator<Item = Mark> + '_ {
        self.order
            .range(..=pos.line)
            .rev()
            .flat_map(move |(&line, nid)| {
                let end = if line == pos.line {
                    MarkKey::ceil(pos.col)
                } else {
                    MarkKey::ceil(usize::MAX)
                };
                self.nodes[nid]
                    .marks
                    .range(..=end)
                    .rev()
                    .map(move |k| Mark {
                        ns: k.ns,
                        id: k.id,
                        pos: Position::new(line, k.col),
                    })
            })
    }

    /// The nearest mark in `ns` scanning from `pos` in `dir`. With
    /// `include_exact`, a mark sitting exactly at `pos` counts; otherwise the
    /// first mark strictly past it wins. `None` at the boundary of the index.
    #[must_use]
    pub fn neighbor(
        &self,
        ns: u64,
        pos: Position,
        dir: Direction,
        include_exact: bool,
    ) -> Option<Mark> {
        match dir {
            Direction::Forward => self
                .marks_from(pos)
                .find(|m| m.ns == ns && (m.pos > pos || (include_exact && m.pos == pos))),
            Direction::Backward => self
                .marks_until(pos)
                .find(|m| m.ns == ns && (m.pos < pos || (include_exact && m.pos == pos))),
        }
    }

    /// Marks in `ns` within `span` (inclusive on both ends), ordered in
    /// `dir`, truncated to `limit` matches (`None` = unbounded). Endpoints
    /// given back-to-front are normalized first; use [`Span::ALL`] or
    /// `Position::ZERO`/`Position::MAX` endpoints for buffer extremities.
    #[must_use]
    pub fn range(
        &self,
        ns: u64,
        span: Span,
        dir: Direction,
        limit: Option<usize>,
    ) -> Vec<Mark> {
        let span = Span::ordered(span.from, span.to);
        let take = limit.unwrap_or(usize::MAX);
        let iter: Box<dyn Iterator<Item = Mark> + '_> = match dir {
            Direction::Forward => {
                Box::new(self.marks_from(span.from).take_while(move |m| span.contains(m.pos)))
            }
            Direction::Backward => {
                Box::new(self.marks_until(span.to).take_while(move |m| span.contains(m.pos)))
            }
        };
        iter.filter(|m| m.ns == ns).take(take).collect()
    }

    // -- Mutation primitives (undo-suppressed) ------------------------------

    /// Create a mark, or move an existing one. Maintains node lifecycle and
    /// identity tables; records nothing.
    pub(crate) fn place(&mut self, ns: u64, id: u64, pos: Position) -> Placed {
        if let Some(existing) = self.get(ns, id) {
            let old = existing.pos;
            let old_nid = self.ns_marks[&ns].marks[&id];
            if old.line == pos.line {
                // Same line: re-key the column in place.
                let node = self.node_mut(old_nid);
                node.marks.remove(&MarkKey { col: old.col, ns, id });
                node.marks.insert(MarkKey { col: pos.col, ns, id });
            } else {
                // Re-file onto another line and repoint the identity entry.
                let node = self.node_mut(old_nid);
                node.marks.remove(&MarkKey { col: old.col, ns, id });
                self.drop_if_empty(old_nid);

                let nid = self.ensure_line(pos.line);
                let fresh = self.node_mut(nid).marks.insert(MarkKey { col: pos.col, ns, id });
                assert!(fresh, "mark {ns}:{id} already present on line {}", pos.line);
                self.ns_marks
                    .get_mut(&ns)
                    .expect("identity table vanished mid-update")
                    .marks
                    .insert(id, nid);
            }
            Placed::Updated { old }
        } else {
            let nid = self.ensure_line(pos.line);
            let fresh = self.node_mut(nid).marks.insert(MarkKey { col: pos.col, ns, id });
            assert!(fresh, "mark {ns}:{id} already present on line {}", pos.line);

            let table = self.ns_marks.entry(ns).or_default();
            table.marks.insert(id, nid);
            table.free_id = id + 1;
            self.mark_count += 1;
            Placed::Created
        }
    }

    /// Remove a mark by identity, dropping its line node if emptied.
    /// Returns the mark as it was, or `None` if absent. Records nothing.
    pub(crate) fn remove(&mut self, ns: u64, id: u64) -> Option<Mark> {
        let nid = *self.ns_marks.get(&ns)?.marks.get(&id)?;
        let node = self.node_mut(nid);
        let key = *node
            .marks
            .iter()
            .find(|k| k.ns == ns && k.id == id)
            .expect("identity entry points at a line node without the mark");
        node.marks.remove(&key);
        let pos = Position::new(node.line, key.col);
        self.drop_if_empty(nid);

        self.ns_marks
            .get_mut(&ns)
            .expect("identity table vanished mid-remove")
            .marks
            .remove(&id);
        self.mark_count -= 1;
        Some(Mark { ns, id, pos })
    }

    // -- Adjustment loops (undo-suppressed) ---------------------------------

    /// Shift every mark on `line` at or past `mincol` by
    /// (`line_amount`, `col_amount`), re-filing across lines as needed.
    /// A negative `col_amount` deletes marks whose column lands at or below
    /// zero (their text was removed), provided they sat strictly past
    /// `mincol`. Survivors the deltas cannot round-trip are reported in
    /// `pinned` so the caller can record their positions explicitly.
    pub(crate) fn col_adjust(
        &mut self,
        line: usize,
        mincol: usize,
        line_amount: i64,
        col_amount: i64,
    ) -> AdjustOutcome {
        let mut out = AdjustOutcome::default();
        let Some(&nid) = self.order.get(&line) else {
            return out;
        };
        // A node only exists while it holds marks.
        out.marks_existed = true;

        let keys: Vec<MarkKey> = self.nodes[&nid].marks.iter().copied().collect();
        for key in keys {
            if col_amount < 0 && (key.col as i64) <= -col_amount && key.col > mincol {
                let mark = self
                    .remove(key.ns, key.id)
                    .expect("mark vanished during column adjust");
                out.deleted.push(mark);
            } else if key.col >= mincol {
                let target = Position::new(
                    shift_line(line, line_amount),
                    shift_col(key.col, col_amount),
                );
                if (key.col as i64) + col_amount < 0 {
                    // Pinned at column 0; the delta alone cannot undo this.
                    let old = Mark {
                        ns: key.ns,
                        id: key.id,
                        pos: Position::new(line, key.col),
                    };
                    out.pinned.push((old, target));
                }
                self.place(key.ns, key.id, target);
            } else if line_amount == 0
                && col_amount < 0
                && key.col >= shift_col(mincol, col_amount)
            {
                // Untouched, but inside the span the inverse shift sweeps.
                let mark = Mark {
                    ns: key.ns,
                    id: key.id,
                    pos: Position::new(line, key.col),
                };
                out.pinned.push((mark, mark.pos));
            }
        }
        out
    }

    /// Shift whole lines. Nodes with line number in `[line1, line2]` shift by
    /// `amount` (or lose all their marks when `amount` is [`DELETED_LINES`]);
    /// nodes past `line2` shift by `amount_after` when nonzero.
    ///
    /// `end_temp` drives the three-phase line move: with `amount > 0` the
    /// affected nodes are pulled out of the order into the move space
    /// (pre-shifted), and a later call with `amount < 0` drops them back in
    /// at their final line numbers. Mutating their keys in place would break
    /// the order invariant mid-pass.
    pub(crate) fn line_adjust(
        &mut self,
        line1: usize,
        line2: usize,
        amount: i64,
        amount_after: i64,
        end_temp: bool,
    ) -> AdjustOutcome {
        let mut out = AdjustOutcome::default();

        if end_temp && amount < 0 {
            // Phase two of a move: re-file the held nodes.
            for nid in std::mem::take(&mut self.move_space) {
                let node = self.node_mut(nid);
                node.line = shift_line(node.line, amount);
                let line = node.line;
                let clash = self.order.insert(line, nid);
                assert!(clash.is_none(), "line {line} already occupied re-filing a moved line");
            }
            return out;
        }

        let lines: Vec<(usize, LineId)> = self.order.iter().map(|(&l, &n)| (l, n)).collect();
        let mut refile: Vec<(LineId, usize)> = Vec::new();
        for (l, nid) in lines {
            if l >= line1 && l <= line2 {
                out.marks_existed = true;
                if end_temp && amount > 0 {
                    // Phase one of a move: park the node, pre-shifted.
                    self.order.remove(&l);
                    self.node_mut(nid).line = shift_line(l, amount);
                    self.move_space.push(nid);
                } else if amount == DELETED_LINES {
                    let keys: Vec<MarkKey> = self.nodes[&nid].marks.iter().copied().collect();
                    for key in keys {
                        let mark = self
                            .remove(key.ns, key.id)
                            .expect("mark vanished during line adjust");
                        out.deleted.push(mark);
                    }
                    // remove() drops the node with its last mark.
                } else {
                    self.order.remove(&l);
                    refile.push((nid, shift_line(l, amount)));
                }
            } else if amount_after != 0 && l > line2 {
                out.marks_existed = true;
                self.order.remove(&l);
                refile.push((nid, shift_line(l, amount_after)));
            }
        }

        // Re-insert after the whole sweep so shifted ranges can pass through
        // each other's old keys.
        for (nid, line) in refile {
            self.node_mut(nid).line = line;
            let clash = self.order.insert(line, nid);
            assert!(clash.is_none(), "line {line} already occupied after line adjust");
        }
        out
    }

    // -- Node plumbing ------------------------------------------------------

    fn node_mut(&mut self, nid: LineId) -> &mut LineNode {
        self.nodes.get_mut(&nid).expect("stale line node handle")
    }

    /// The node for `line`, created if no mark currently occupies that line.
    fn ensure_line(&mut self, line: usize) -> LineId {
        if let Some(&nid) = self.order.get(&line) {
            return nid;
        }
        let nid = LineId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            nid,
            LineNode {
                line,
                marks: BTreeSet::new(),
            },
        );
        self.order.insert(line, nid);
        nid
    }

    /// Destroy a node once its last mark leaves.
    fn drop_if_empty(&mut self, nid: LineId) {
        let node = &self.nodes[&nid];
        if node.marks.is_empty() {
            let line = node.line;
            if self.order.get(&line) == Some(&nid) {
                self.order.remove(&line);
            }
            self.nodes.remove(&nid);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pos(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    // -- place / remove lifecycle -------------------------------------------

    #[test]
    fn place_creates_then_updates() {
        let mut idx = MarkIndex::new();
        assert_eq!(idx.place(1, 1, pos(5, 3)), Placed::Created);
        assert_eq!(
            idx.place(1, 1, pos(5, 7)),
            Placed::Updated { old: pos(5, 3) }
        );
        assert_eq!(idx.get(1, 1).unwrap().pos, pos(5, 7));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn place_refiles_across_lines() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(5, 3));
        idx.place(1, 1, pos(9, 0));

        assert!(!idx.line_has_marks(5));
        assert!(idx.line_has_marks(9));
        assert_eq!(idx.get(1, 1).unwrap().pos, pos(9, 0));
    }

    #[test]
    fn remove_drops_emptied_line_node() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(5, 3));
        idx.place(1, 2, pos(5, 8));

        assert_eq!(idx.remove(1, 1).unwrap().pos, pos(5, 3));
        assert!(idx.line_has_marks(5)); // id 2 still there

        assert_eq!(idx.remove(1, 2).unwrap().pos, pos(5, 8));
        assert!(!idx.line_has_marks(5));
        assert!(idx.is_empty());
    }

    #[test]
    fn remove_missing_is_none() {
        let mut idx = MarkIndex::new();
        assert_eq!(idx.remove(1, 1), None);
        idx.place(1, 1, pos(0, 0));
        assert_eq!(idx.remove(2, 1), None); // other namespace
        assert_eq!(idx.remove(1, 2), None); // other id
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn identity_is_unique_per_namespace() {
        let mut idx = MarkIndex::new();
        idx.place(1, 7, pos(2, 2));
        idx.place(2, 7, pos(2, 2)); // same id, different namespace

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get(1, 7).unwrap().pos, pos(2, 2));
        assert_eq!(idx.get(2, 7).unwrap().pos, pos(2, 2));
    }

    #[test]
    fn next_free_id_tracks_largest_set() {
        let mut idx = MarkIndex::new();
        assert_eq!(idx.next_free_id(1), 0);
        idx.place(1, 4, pos(0, 0));
        assert_eq!(idx.next_free_id(1), 5);
        idx.place(1, 2, pos(0, 1));
        assert_eq!(idx.next_free_id(1), 3);
    }

    // -- Lookup -------------------------------------------------------------

    #[test]
    fn mark_at_is_exact_match_only() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(3, 4));

        assert_eq!(idx.mark_at(1, pos(3, 4)).unwrap().id, 1);
        assert_eq!(idx.mark_at(1, pos(3, 5)), None);
        assert_eq!(idx.mark_at(1, pos(4, 4)), None);
        assert_eq!(idx.mark_at(2, pos(3, 4)), None); // other namespace
    }

    // -- Ordering -----------------------------------------------------------

    #[test]
    fn iteration_is_line_col_ns_id_ordered() {
        let mut idx = MarkIndex::new();
        idx.place(2, 1, pos(1, 5));
        idx.place(1, 2, pos(1, 5)); // same position, lower namespace
        idx.place(1, 1, pos(0, 9));
        idx.place(1, 3, pos(1, 2));
        idx.place(1, 4, pos(2, 0));

        let all: Vec<(u64, u64, Position)> = idx
            .marks_from(Position::ZERO)
            .map(|m| (m.ns, m.id, m.pos))
            .collect();
        assert_eq!(
            all,
            vec![
                (1, 1, pos(0, 9)),
                (1, 3, pos(1, 2)),
                (1, 2, pos(1, 5)),
                (2, 1, pos(1, 5)),
                (1, 4, pos(2, 0)),
            ]
        );

        let back: Vec<(u64, u64, Position)> = idx
            .marks_until(Position::MAX)
            .map(|m| (m.ns, m.id, m.pos))
            .collect();
        let mut expected = all;
        expected.reverse();
        assert_eq!(back, expected);
    }

    #[test]
    fn same_id_different_namespace_orders_by_namespace() {
        let mut idx = MarkIndex::new();
        idx.place(9, 1, pos(0, 3));
        idx.place(2, 1, pos(0, 3));

        let ns_order: Vec<u64> = idx.marks_from(Position::ZERO).map(|m| m.ns).collect();
        assert_eq!(ns_order, vec![2, 9]);
    }

    // -- Neighbor -----------------------------------------------------------

    #[test]
    fn neighbor_forward_and_backward() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(1, 3));
        idx.place(1, 2, pos(1, 7));
        idx.place(1, 3, pos(4, 0));

        let next = idx.neighbor(1, pos(1, 3), Direction::Forward, false).unwrap();
        assert_eq!(next.id, 2);

        let exact = idx.neighbor(1, pos(1, 3), Direction::Forward, true).unwrap();
        assert_eq!(exact.id, 1);

        let prev = idx.neighbor(1, pos(4, 0), Direction::Backward, false).unwrap();
        assert_eq!(prev.id, 2);

        let prev_exact = idx.neighbor(1, pos(4, 0), Direction::Backward, true).unwrap();
        assert_eq!(prev_exact.id, 3);
    }

    #[test]
    fn neighbor_none_at_boundary() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(1, 3));

        assert_eq!(idx.neighbor(1, pos(1, 3), Direction::Forward, false), None);
        assert_eq!(idx.neighbor(1, pos(1, 3), Direction::Backward, false), None);
        assert_eq!(idx.neighbor(1, pos(0, 0), Direction::Backward, true), None);
    }

    #[test]
    fn neighbor_ignores_other_namespaces() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(1, 3));
        idx.place(2, 1, pos(1, 5));
        idx.place(1, 2, pos(1, 9));

        let next = idx.neighbor(1, pos(1, 3), Direction::Forward, false).unwrap();
        assert_eq!((next.ns, next.id), (1, 2));
    }

    // -- Range --------------------------------------------------------------

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let mut idx = MarkIndex::new();
        for (id, col) in [(1, 1), (2, 3), (3, 5), (4, 7)] {
            idx.place(1, id, pos(0, col));
        }

        let span = Span::new(pos(0, 3), pos(0, 5));
        let hits: Vec<u64> = idx
            .range(1, span, Direction::Forward, None)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(hits, vec![2, 3]);

        let last: Vec<u64> = idx
            .range(1, span, Direction::Backward, Some(1))
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(last, vec![3]);
    }

    #[test]
    fn range_extremities_cover_whole_buffer() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(0, 0));
        idx.place(1, 2, pos(100, 50));

        let all = idx.range(1, Span::ALL, Direction::Forward, None);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn range_normalizes_reversed_bounds() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(0, 3));
        idx.place(1, 2, pos(2, 5));

        let reversed = Span {
            from: pos(2, 5),
            to: pos(0, 3),
        };
        let hits: Vec<u64> = idx
            .range(1, reversed, Direction::Forward, None)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn range_limit_counts_namespace_matches_only() {
        let mut idx = MarkIndex::new();
        idx.place(2, 1, pos(0, 1));
        idx.place(1, 1, pos(0, 2));
        idx.place(2, 2, pos(0, 3));
        idx.place(1, 2, pos(0, 4));

        let hits: Vec<u64> = idx
            .range(1, Span::ALL, Direction::Forward, Some(2))
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn range_namespace_isolation_at_identical_positions() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(2, 2));
        idx.place(2, 9, pos(2, 2));

        let only_a = idx.range(1, Span::ALL, Direction::Forward, None);
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].ns, 1);
    }

    // -- Column adjust (raw) ------------------------------------------------

    #[test]
    fn col_adjust_shifts_marks_past_mincol() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(10, 2));
        idx.place(1, 2, pos(10, 5));

        let out = idx.col_adjust(10, 4, 0, 3);
        assert!(out.marks_existed);
        assert!(out.deleted.is_empty());
        assert_eq!(idx.get(1, 1).unwrap().pos, pos(10, 2)); // before mincol
        assert_eq!(idx.get(1, 2).unwrap().pos, pos(10, 8));
    }

    #[test]
    fn col_adjust_deletes_marks_in_removed_text() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(10, 8));

        let out = idx.col_adjust(10, 0, 0, -10);
        assert_eq!(out.deleted.len(), 1);
        assert_eq!(out.deleted[0].pos, pos(10, 8));
        assert_eq!(idx.get(1, 1), None);
        assert!(!idx.line_has_marks(10));
    }

    #[test]
    fn col_adjust_refiles_to_other_line() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(3, 6));
        idx.place(1, 2, pos(3, 1));

        // Split line 3 at column 4: tail marks go to line 4.
        idx.col_adjust(3, 4, 1, -4);
        assert_eq!(idx.get(1, 1).unwrap().pos, pos(4, 2));
        assert_eq!(idx.get(1, 2).unwrap().pos, pos(3, 1));
    }

    #[test]
    fn col_adjust_reports_pinned_survivors() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(0, 0));
        idx.place(1, 2, pos(0, 2));
        idx.place(1, 3, pos(0, 8));

        // Delete the first five columns: the mark at the anchor column
        // survives pinned at 0, the one inside the deleted text goes.
        let out = idx.col_adjust(0, 0, 0, -5);
        assert_eq!(out.deleted.len(), 1);
        assert_eq!(out.deleted[0].id, 2);
        assert_eq!(
            out.pinned,
            vec![(Mark { ns: 1, id: 1, pos: pos(0, 0) }, pos(0, 0))]
        );
        assert_eq!(idx.get(1, 1).unwrap().pos, pos(0, 0));
        assert_eq!(idx.get(1, 3).unwrap().pos, pos(0, 3));
    }

    #[test]
    fn col_adjust_reports_untouched_marks_in_inverse_span() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(0, 3));
        idx.place(1, 2, pos(0, 10));

        // Delete 4 columns at column 5: the mark at column 3 never moves,
        // but it sits where the inverse shift would sweep.
        let out = idx.col_adjust(0, 5, 0, -4);
        assert!(out.deleted.is_empty());
        assert_eq!(
            out.pinned,
            vec![(Mark { ns: 1, id: 1, pos: pos(0, 3) }, pos(0, 3))]
        );
        assert_eq!(idx.get(1, 1).unwrap().pos, pos(0, 3));
        assert_eq!(idx.get(1, 2).unwrap().pos, pos(0, 6));
    }

    #[test]
    fn col_adjust_plain_shift_pins_nothing() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(0, 0));
        idx.place(1, 2, pos(0, 9));

        let out = idx.col_adjust(0, 4, 0, -3);
        assert!(out.pinned.is_empty());
        assert!(out.deleted.is_empty());
        assert_eq!(idx.get(1, 2).unwrap().pos, pos(0, 6));
    }

    #[test]
    fn col_adjust_on_markless_line_reports_nothing() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(2, 0));
        let out = idx.col_adjust(7, 0, 0, 5);
        assert!(!out.marks_existed);
    }

    // -- Line adjust (raw) --------------------------------------------------

    #[test]
    fn line_adjust_shifts_range_and_tail() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(2, 0));
        idx.place(1, 2, pos(4, 0));
        idx.place(1, 3, pos(6, 0));

        // Two lines inserted above line 4.
        let out = idx.line_adjust(4, MAX_LINE, 2, 0, false);
        assert!(out.marks_existed);
        assert_eq!(idx.get(1, 1).unwrap().pos, pos(2, 0));
        assert_eq!(idx.get(1, 2).unwrap().pos, pos(6, 0));
        assert_eq!(idx.get(1, 3).unwrap().pos, pos(8, 0));
    }

    #[test]
    fn line_adjust_delete_removes_marks_and_shifts_tail() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(3, 0));
        idx.place(1, 2, pos(4, 1));
        idx.place(1, 3, pos(5, 2));
        idx.place(1, 4, pos(6, 3));

        let out = idx.line_adjust(4, 5, DELETED_LINES, -2, false);
        let deleted: Vec<u64> = out.deleted.iter().map(|m| m.id).collect();
        assert_eq!(deleted, vec![2, 3]);
        assert_eq!(idx.get(1, 1).unwrap().pos, pos(3, 0));
        assert_eq!(idx.get(1, 4).unwrap().pos, pos(4, 3));
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn line_adjust_ranges_can_pass_through_each_other() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(4, 0));
        idx.place(1, 2, pos(5, 0));
        idx.place(1, 3, pos(6, 0));

        // Delete lines 4–5; the tail slides up into their old keys.
        idx.line_adjust(4, 5, DELETED_LINES, -2, false);
        assert_eq!(idx.get(1, 3).unwrap().pos, pos(4, 0));
    }

    #[test]
    fn line_adjust_move_phases_roundtrip() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(2, 0));
        idx.place(1, 2, pos(3, 5));
        idx.place(1, 3, pos(7, 0));

        // Park lines 2–3 nine lines down, then drop them at 5–6.
        idx.line_adjust(2, 3, 9, 0, true);
        assert!(!idx.line_has_marks(2));
        assert!(!idx.line_has_marks(3));
        idx.line_adjust(0, 0, -6, 0, true);

        assert_eq!(idx.get(1, 1).unwrap().pos, pos(5, 0));
        assert_eq!(idx.get(1, 2).unwrap().pos, pos(6, 5));
        assert_eq!(idx.get(1, 3).unwrap().pos, pos(7, 0));
    }

    // -- free_all -----------------------------------------------------------

    #[test]
    fn free_all_releases_everything() {
        let mut idx = MarkIndex::new();
        idx.place(1, 1, pos(0, 0));
        idx.place(2, 1, pos(5, 5));

        idx.free_all();
        assert!(idx.is_empty());
        assert_eq!(idx.get(1, 1), None);
        assert_eq!(idx.get(2, 1), None);
        assert!(!idx.line_has_marks(0));
        assert_eq!(idx.range(1, Span::ALL, Direction::Forward, None), vec![]);
    }
}
