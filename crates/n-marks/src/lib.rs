//! # n-marks — Extended marks for n-nvim
//!
//! Namespaced position anchors that track buffer edits. A plugin registers a
//! namespace, sets marks at `(line, col)` positions, and from then on the
//! marks ride along with the text: insertions shift them, deletions swallow
//! them, moves relocate them, and undo brings them back exactly.
//!
//! - **[`position`]** — `Position` (line, col) and inclusive `Span` types, 0-indexed
//! - **[`namespace`]** — `NamespaceRegistry` isolating each mark owner's id space
//! - **[`index`]** — `MarkIndex`, the two-level ordered store with lookup,
//!   neighbor, and range queries
//! - **[`history`]** — `MarkHistory`, transactional undo/redo of mark effects
//! - **[`marks`]** — `BufferMarks`, the per-buffer façade edits and plugins
//!   talk to
//!
//! The host buffer reports edits through `BufferMarks::{col_adjust,
//! line_adjust, line_move}`; everything else follows from those three calls.

pub mod history;
pub mod index;
pub mod marks;
pub mod namespace;
pub mod position;
