//! Bridges `circuit_model::Project` and on-disk `.kicad_*` files: lifts a
//! parsed tree into a project ([`reader`]), projects a project back into
//! fresh nodes ([`writer`]), and commits the result to disk atomically
//! ([`commit`]). The synchronizer crate sits one layer above this one and
//! decides, per entity, whether to reuse a [`preserved::PreservedTree`]
//! subtree or call into [`writer`] for a fresh rendering.

mod commit;
mod error;
mod netlist;
mod preserved;
mod reader;
mod sidecar;
mod writer;

pub use commit::{commit, commit_text, WriteReport};
pub use error::{KicadIoError, Result};
pub use netlist::render_netlist;
pub use preserved::PreservedTree;
pub use reader::{load_project, load_project_with_preserved, LoadedSheet, RECOGNIZED_TOKENS};
pub use sidecar::{
    load_board_file, load_project_file, rename_footprint_reference, render_fresh_project_file,
    BoardFile, ProjectFile,
};
pub use writer::{
    render_component, render_label, render_port, render_power_symbol, render_project_fresh,
    render_sheet_fresh, render_sheet_instance, render_wire,
};

use std::path::Path;

use circuit_model::Project;

/// Render a `Project` from scratch (no preserved bytes to reuse anywhere)
/// and commit it to `dir`. `kicad_version` is the `(version N)` atom stamped
/// into every schematic this call creates (spec §6: existing files keep
/// their own version untouched; only brand-new ones take this value).
pub fn generate_project(project: &Project, dir: &Path, kicad_version: &str) -> Result<WriteReport> {
    let files = writer::render_project_fresh(project, kicad_version);
    commit::commit(dir, &files)
}

/// Write the derived `.net` netlist export alongside the project.
pub fn export_netlist(project: &Project, dir: &Path, filename: &str) -> Result<WriteReport> {
    let tree = netlist::render_netlist(project);
    commit::commit(dir, &[(filename.to_string(), tree)])
}
