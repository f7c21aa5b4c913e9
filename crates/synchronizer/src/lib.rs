//! The synchronizer: compares a freshly generated target [`circuit_model::Project`]
//! against an existing on-disk project and produces a minimal [`EditPlan`] that
//! preserves user-placed positions, rotations, wiring, and annotations while
//! applying semantic changes (spec §4.6 — "this is where the design lives").
//!
//! Three phases, kept in separate modules so each can be tested against its
//! own fixtures: [`matching`] pairs entities, [`diff`] turns the pairing into
//! an [`EditPlan`], [`apply`] folds the plan back onto the target and commits
//! it to disk. Ordering matters: all of `matching`/`diff` run before any byte
//! is written (spec §5 — "the edit plan is built entirely before any write").

mod apply;
mod diff;
mod error;
mod matching;
mod merge;
mod plan;

pub use apply::{apply, sync_and_write};
pub use diff::diff;
pub use error::{Result, SyncError};
pub use matching::{
    match_components, match_labels, match_ports, match_power_symbols, match_sheets, match_wires,
    ComponentMatching, MatchKind, Matched,
};
pub use merge::render_sheet_merged;
pub use plan::{
    ComponentOp, EditPlan, LabelOp, NetOp, PlanWarning, PowerSymbolOp, SheetOp, SheetPlan, WireOp,
};
