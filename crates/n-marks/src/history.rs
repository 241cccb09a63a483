//! Undo history for extended marks.
//!
//! Marks cannot be restored by re-running text edits backwards — a deleted
//! mark's identity and exact column are gone from the index the moment the
//! deletion lands. So every undoable mutation appends a small [`UndoRecord`]
//! to the transaction in flight, and undo/redo replay those records against
//! the index with all recording suppressed.
//!
//! Records store the *forward* parameters of the operation. The replayer
//! derives the inverse on the fly ([`apply`] with `undo = true`), which keeps
//! each record a handful of integers instead of a before/after snapshot.
//!
//! # Transactions
//!
//! A transaction brackets all mark effects of one user-visible edit. Records
//! accumulate in `pending` until [`MarkHistory::commit`]; committing a
//! transaction clears the redo stack, exactly like a fresh edit after undo
//! invalidates redone state. An operation arriving with no transaction open
//! opens one implicitly, and a stray open transaction is committed before
//! `begin` or `undo` proceeds — callers that forget the bracketing still get
//! a coherent history, just with coarser steps.

use crate::index::{self, MarkIndex, Placed, DELETED_LINES, MAX_LINE};
use crate::position::Position;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One replayable mark mutation, stored with its forward parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoRecord {
    /// A within-line shift: marks on `line` at or past `mincol` moved by
    /// (`line_amount`, `col_amount`).
    ColAdjust {
        line: usize,
        mincol: usize,
        line_amount: i64,
        col_amount: i64,
    },
    /// A whole-line shift over `[line1, line2]` by `amount`
    /// ([`DELETED_LINES`] = the lines were removed), with the tail past
    /// `line2` shifted by `amount_after`.
    LineAdjust {
        line1: usize,
        line2: usize,
        amount: i64,
        amount_after: i64,
    },
    /// A block move: lines `[line1, line2]` relocated after `dest`, within a
    /// buffer whose last line was `last_line`. `extra` is the fold-in
    /// correction applied to the block in the final phase of the move.
    LineMove {
        line1: usize,
        line2: usize,
        last_line: usize,
        dest: usize,
        num_lines: usize,
        extra: i64,
    },
    /// A mark was created at `pos`.
    Set { ns: u64, id: u64, pos: Position },
    /// An existing mark moved from `old` to `new`.
    Update {
        ns: u64,
        id: u64,
        old: Position,
        new: Position,
    },
    /// A mark at `pos` was removed (explicitly, or by an edit swallowing it).
    Unset { ns: u64, id: u64, pos: Position },
}

/// Grouping marker on an entry. A group is a contiguous run of `Member`
/// entries closed by an `End`; compaction never merges into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Solo,
    Member,
    End,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    record: UndoRecord,
    group: Group,
}

/// The records of one committed (or in-flight) edit.
#[derive(Debug, Default)]
struct Transaction {
    entries: Vec<Entry>,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Per-buffer undo/redo stacks of mark transactions.
#[derive(Debug, Default)]
pub struct MarkHistory {
    undo_stack: Vec<Transaction>,
    redo_stack: Vec<Transaction>,
    pending: Option<Transaction>,
    grouping: bool,
}

impl MarkHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction. An already-open one is committed first.
    pub fn begin(&mut self) {
        if self.pending.is_some() {
            self.commit();
        }
        self.pending = Some(Transaction::default());
    }

    /// Close the open transaction onto the undo stack. An empty transaction
    /// is discarded; a non-empty one invalidates all redo state.
    pub fn commit(&mut self) {
        self.grouping = false;
        if let Some(txn) = self.pending.take() {
            if !txn.entries.is_empty() {
                self.redo_stack.clear();
                self.undo_stack.push(txn);
            }
        }
    }

    /// Start a record group inside the open transaction. Grouped records are
    /// exempt from compaction so composite operations keep their exact shape.
    pub fn start_group(&mut self) {
        self.grouping = true;
    }

    /// Close the current record group.
    pub fn end_group(&mut self) {
        self.grouping = false;
        if let Some(txn) = self.pending.as_mut() {
            if let Some(last) = txn.entries.last_mut() {
                if last.group == Group::Member {
                    last.group = Group::End;
                }
            }
        }
    }

    /// Append a record, opening a transaction implicitly if none is.
    pub(crate) fn push(&mut self, record: UndoRecord) {
        let group = if self.grouping { Group::Member } else { Group::Solo };
        self.pending
            .get_or_insert_with(Transaction::default)
            .entries
            .push(Entry { record, group });
    }

    /// Append a column adjustment, folding it into the previous record when
    /// the two describe one continuous run of typing or deletion on the same
    /// line. Character-at-a-time insertion would otherwise bloat every
    /// transaction with one record per keystroke.
    pub(crate) fn push_col_adjust(
        &mut self,
        line: usize,
        mincol: usize,
        line_amount: i64,
        col_amount: i64,
    ) {
        if !self.grouping && line_amount == 0 {
            if let Some(txn) = self.pending.as_mut() {
                if let Some(last) = txn.entries.last_mut() {
                    if last.group == Group::Solo && try_compact(&mut last.record, line, mincol, col_amount) {
                        return;
                    }
                }
            }
        }
        self.push(UndoRecord::ColAdjust {
            line,
            mincol,
            line_amount,
            col_amount,
        });
    }

    // -- Replay -------------------------------------------------------------

    /// Undo the most recent transaction against `index`. Returns false when
    /// there is nothing to undo. A stray open transaction is committed first
    /// so it becomes the thing undone.
    pub fn undo(&mut self, index: &mut MarkIndex) -> bool {
        if self.pending.is_some() {
            self.commit();
        }
        let Some(txn) = self.undo_stack.pop() else {
            return false;
        };
        // Entries replay newest-first; grouped entries are contiguous, so the
        // reverse walk unwinds a composite operation innermost-first too.
        for entry in txn.entries.iter().rev() {
            apply(index, &entry.record, true);
        }
        self.redo_stack.push(txn);
        true
    }

    /// Re-apply the most recently undone transaction. Returns false when
    /// there is nothing to redo.
    pub fn redo(&mut self, index: &mut MarkIndex) -> bool {
        let Some(txn) = self.redo_stack.pop() else {
            return false;
        };
        for entry in &txn.entries {
            apply(index, &entry.record, false);
        }
        self.undo_stack.push(txn);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.pending.as_ref().is_some_and(|t| !t.entries.is_empty())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of committed transactions available to undo.
    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of undone transactions available to redo.
    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop all history, including any open transaction.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
        self.grouping = false;
    }
}

/// Fold a new column adjustment into `prev` when both are pure column shifts
/// on the same line and the new `mincol` falls inside the span the previous
/// record already moved. Mutates and returns true on success.
fn try_compact(prev: &mut UndoRecord, line: usize, mincol: usize, col_amount: i64) -> bool {
    match prev {
        UndoRecord::ColAdjust {
            line: pline,
            mincol: pmin,
            line_amount: 0,
            col_amount: pca,
        } if *pline == line
            && *pmin as i64 <= mincol as i64
            && mincol as i64 <= *pmin as i64 + *pca =>
        {
            *pca += col_amount;
            true
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Record replay
// ---------------------------------------------------------------------------

/// Replay one record against the index, forwards (`undo = false`) or as its
/// inverse (`undo = true`). Never records anything.
pub(crate) fn apply(index: &mut MarkIndex, record: &UndoRecord, undo: bool) {
    match *record {
        UndoRecord::ColAdjust {
            line,
            mincol,
            line_amount,
            col_amount,
        } => {
            if undo {
                // The marks to move back sit where the forward pass put them.
                index.col_adjust(
                    index::shift_line(line, line_amount),
                    index::shift_col(mincol, col_amount),
                    -line_amount,
                    -col_amount,
                );
            } else {
                index.col_adjust(line, mincol, line_amount, col_amount);
            }
        }

        UndoRecord::LineAdjust {
            line1,
            line2,
            amount,
            amount_after,
        } => {
            if undo {
                if amount == DELETED_LINES {
                    // Lines were removed: the deleted marks come back via
                    // their own Unset records; here only the tail slides
                    // back down.
                    index.line_adjust(line1, MAX_LINE, -amount_after, 0, false);
                } else if line2 == MAX_LINE {
                    // Open-ended insert below line1.
                    index.line_adjust(line1, line2, -amount, amount_after, false);
                } else {
                    // Bounded shift: the range now lives `amount` away.
                    index.line_adjust(
                        index::shift_line(line1, amount),
                        index::shift_line(line2, amount),
                        -amount,
                        -amount_after,
                        false,
                    );
                }
            } else {
                index.line_adjust(line1, line2, amount, amount_after, false);
            }
        }

        UndoRecord::LineMove {
            line1,
            line2,
            last_line,
            dest,
            num_lines,
            extra,
        } => {
            if undo {
                undo_move(index, line1, line2, last_line, dest, num_lines)
            } else {
                redo_move(index, line1, line2, last_line, dest, num_lines, extra)
            }
        }

        UndoRecord::Set { ns, id, pos } => {
            if undo {
                let removed = index.remove(ns, id);
                assert!(removed.is_some(), "undo of set: mark {ns}:{id} missing");
            } else {
                let placed = index.place(ns, id, pos);
                assert!(
                    placed == Placed::Created,
                    "redo of set: mark {ns}:{id} already present"
                );
            }
        }

        UndoRecord::Update { ns, id, old, new } => {
            let target = if undo { old } else { new };
            let placed = index.place(ns, id, target);
            assert!(
                matches!(placed, Placed::Updated { .. }),
                "replay of update: mark {ns}:{id} missing"
            );
        }

        UndoRecord::Unset { ns, id, pos } => {
            if undo {
                let placed = index.place(ns, id, pos);
                assert!(
                    placed == Placed::Created,
                    "undo of unset: mark {ns}:{id} already present"
                );
            } else {
                let removed = index.remove(ns, id);
                assert!(removed.is_some(), "redo of unset: mark {ns}:{id} missing");
            }
        }
    }
}

/// Replay a block move forwards: park the block past the end of the buffer,
/// close the gap it left, then fold it back in after `dest`. This is also how
/// the live operation runs — see [`crate::marks::BufferMarks::line_move`].
pub(crate) fn redo_move(
    index: &mut MarkIndex,
    line1: usize,
    line2: usize,
    last_line: usize,
    dest: usize,
    num_lines: usize,
    extra: i64,
) {
    index.line_adjust(line1, line2, (last_line - line2) as i64, 0, true);
    if dest >= line2 {
        index.line_adjust(line2 + 1, dest, -(num_lines as i64), 0, false);
    } else {
        index.line_adjust(dest + 1, line1 - 1, num_lines as i64, 0, false);
    }
    index.line_adjust(
        last_line - num_lines + 1,
        last_line,
        extra - (last_line - dest) as i64,
        0,
        true,
    );
}

/// Invert a block move: park the block from its landing site, slide the gap
/// text back over, and fold the block in at its original lines.
fn undo_move(
    index: &mut MarkIndex,
    line1: usize,
    line2: usize,
    last_line: usize,
    dest: usize,
    num_lines: usize,
) {
    if dest >= line2 {
        // The block landed at [dest - num_lines + 1, dest].
        index.line_adjust(
            dest - num_lines + 1,
            dest,
            (last_line - dest + num_lines - 1) as i64,
            0,
            true,
        );
        index.line_adjust(line1, dest - num_lines, num_lines as i64, 0, false);
        index.line_adjust(
            last_line,
            last_line + num_lines - 1,
            line1 as i64 - last_line as i64,
            0,
            true,
        );
    } else {
        // The block landed at [dest + 1, dest + num_lines].
        index.line_adjust(
            dest + 1,
            dest + num_lines,
            (last_line - dest) as i64,
            0,
            true,
        );
        index.line_adjust(dest + num_lines + 1, line2, -(num_lines as i64), 0, false);
        index.line_adjust(
            last_line + 1,
            last_line + num_lines,
            line1 as i64 - last_line as i64 - 1,
            0,
            true,
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
