//! Buffer-level extended marks: the index and its history, kept in lockstep.
//!
//! [`BufferMarks`] is the surface the rest of the editor talks to. Every
//! mutation goes through here so that the matching [`UndoRecord`] is written
//! in the same breath as the index change — the two structures are only
//! correct together, and nothing outside this module may mutate one without
//! the other.
//!
//! Text edits report their mark effects through [`BufferMarks::col_adjust`],
//! [`BufferMarks::line_adjust`] and [`BufferMarks::line_move`]; explicit mark
//! traffic goes through [`BufferMarks::set`] and [`BufferMarks::unset`];
//! queries pass straight down to the index.

use crate::history::{self, MarkHistory, UndoRecord};
use crate::index::{Direction, Mark, MarkIndex, Placed};
use crate::position::{Position, Span};

/// What [`BufferMarks::set`] did with the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResult {
    Created,
    Updated,
}

/// All extended-mark state of one buffer.
#[derive(Debug, Default)]
pub struct BufferMarks {
    index: MarkIndex,
    history: MarkHistory,
}

impl BufferMarks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the position index, for iteration helpers.
    #[must_use]
    pub fn index(&self) -> &MarkIndex {
        &self.index
    }

    // -- Mark traffic -------------------------------------------------------

    /// Create the mark `(ns, id)` at `pos`, or move it there if it exists.
    pub fn set(&mut self, ns: u64, id: u64, pos: Position) -> SetResult {
        match self.index.place(ns, id, pos) {
            Placed::Created => {
                self.history.push(UndoRecord::Set { ns, id, pos });
                SetResult::Created
            }
            Placed::Updated { old } => {
                self.history.push(UndoRecord::Update { ns, id, old, new: pos });
                SetResult::Updated
            }
        }
    }

    /// Remove the mark `(ns, id)`. Returns false if it does not exist.
    pub fn unset(&mut self, ns: u64, id: u64) -> bool {
        match self.index.remove(ns, id) {
            Some(mark) => {
                self.history.push(UndoRecord::Unset { ns, id, pos: mark.pos });
                true
            }
            None => false,
        }
    }

    // -- Edit effects -------------------------------------------------------

    /// A within-line edit on `line`: marks at or past `mincol` shift by
    /// (`line_amount`, `col_amount`); marks inside deleted text are unset.
    /// Marks the shift deltas cannot round-trip (pinned at column 0, or
    /// sitting where the inverse shift sweeps) get their positions recorded
    /// explicitly, so undo restores their exact columns. Returns whether the
    /// line held any marks.
    pub fn col_adjust(
        &mut self,
        line: usize,
        mincol: usize,
        line_amount: i64,
        col_amount: i64,
    ) -> bool {
        debug_assert!(col_amount > i64::MIN, "column delta out of range");
        let out = self.index.col_adjust(line, mincol, line_amount, col_amount);
        for m in &out.deleted {
            self.history.push(UndoRecord::Unset { ns: m.ns, id: m.id, pos: m.pos });
        }
        for (old, new) in &out.pinned {
            self.history.push(UndoRecord::Update {
                ns: old.ns,
                id: old.id,
                old: old.pos,
                new: *new,
            });
        }
        if out.marks_existed {
            self.history.push_col_adjust(line, mincol, line_amount, col_amount);
        }
        out.marks_existed
    }

    /// A whole-line edit: lines `[line1, line2]` shift by `amount`
    /// ([`crate::index::DELETED_LINES`] removes them, unsetting their
    /// marks), and lines
    /// past `line2` shift by `amount_after`. Returns whether any marks were
    /// affected — nothing is recorded otherwise.
    pub fn line_adjust(
        &mut self,
        line1: usize,
        line2: usize,
        amount: i64,
        amount_after: i64,
    ) -> bool {
        let out = self.index.line_adjust(line1, line2, amount, amount_after, false);
        for m in &out.deleted {
            self.history.push(UndoRecord::Unset { ns: m.ns, id: m.id, pos: m.pos });
        }
        if out.marks_existed {
            self.history.push(UndoRecord::LineAdjust {
                line1,
                line2,
                amount,
                amount_after,
            });
        }
        out.marks_existed
    }

    /// Lines `[line1, line2]` relocated to sit after `dest` (`:move`).
    /// `last_line` is the buffer's last line before the move; `extra` is the
    /// fold-in correction for the moved block. Returns whether the buffer
    /// held any marks.
    pub fn line_move(
        &mut self,
        line1: usize,
        line2: usize,
        dest: usize,
        last_line: usize,
        extra: i64,
    ) -> bool {
        debug_assert!(line1 <= line2 && line2 <= last_line && dest <= last_line);
        debug_assert!(dest < line1 || dest >= line2, "destination inside the moved block");
        if self.index.is_empty() {
            return false;
        }
        let record = UndoRecord::LineMove {
            line1,
            line2,
            last_line,
            dest,
            num_lines: line2 - line1 + 1,
            extra,
        };
        history::apply(&mut self.index, &record, false);
        self.history.push(record);
        true
    }

    // -- Queries ------------------------------------------------------------

    #[must_use]
    pub fn get(&self, ns: u64, id: u64) -> Option<Mark> {
        self.index.get(ns, id)
    }

    #[must_use]
    pub fn mark_at(&self, ns: u64, pos: Position) -> Option<Mark> {
        self.index.mark_at(ns, pos)
    }

    #[must_use]
    pub fn neighbor(
        &self,
        ns: u64,
        pos: Position,
        dir: Direction,
        include_exact: bool,
    ) -> Option<Mark> {
        self.index.neighbor(ns, pos, dir, include_exact)
    }

    #[must_use]
    pub fn range(&self, ns: u64, span: Span, dir: Direction, limit: Option<usize>) -> Vec<Mark> {
        self.index.range(ns, span, dir, limit)
    }

    #[must_use]
    pub fn next_free_id(&self, ns: u64) -> u64 {
        self.index.next_free_id(ns)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // -- History ------------------------------------------------------------

    /// Open an undo transaction bracketing the mark effects of one edit.
    pub fn begin_transaction(&mut self) {
        self.history.begin();
    }

    /// Commit the open transaction.
    pub fn commit_transaction(&mut self) {
        self.history.commit();
    }

    /// Mark the following records as one composite operation.
    pub fn start_group(&mut self) {
        self.history.start_group();
    }

    pub fn end_group(&mut self) {
        self.history.end_group();
    }

    /// Undo the newest transaction. Returns false with nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.index)
    }

    /// Redo the newest undone transaction. Returns false with nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.index)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.history.redo_count()
    }

    /// Release all marks and history. For buffer teardown: the history is
    /// cleared too, since its records refer to marks that no longer exist.
    pub fn free_all(&mut self) {
        self.index.free_all();
        self.history.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
