//! Apply phase (spec §4.6/§6): turns an [`EditPlan`] plus the freshly built
//! target into the final `Project`, then commits it to disk. A sheet the
//! plan left entirely untouched is re-parsed and handed back as-is —
//! `sexpr_codec::format` reproduces it byte-for-byte as long as every node
//! still carries its span. A sheet the plan did touch goes through
//! [`crate::merge::render_sheet_merged`], which reuses the preserved node
//! for every entity the plan didn't name and patches only the fields that
//! did change.

use std::path::Path;

use circuit_model::Project;
use kicad_io::WriteReport;
use symbol_library::SymbolLibrary;

use crate::error::{Result, SyncError};
use crate::plan::EditPlan;

/// Fold the decided placement carry-forwards back onto `target`, producing
/// the `Project` that will actually be written. Every other attribute is
/// already correct in `target` — it is the desired state the caller built;
/// only positions, which `target` was never told about, need restoring.
pub fn apply(plan: &EditPlan, target: &Project) -> Project {
    let mut result = target.clone();

    for sheet_plan in &plan.sheets {
        let Some(sheet_uuid) = &sheet_plan.sheet_uuid else { continue };
        for op in &sheet_plan.components {
            if let crate::plan::ComponentOp::UpdateAttributes { uuid, placement, .. } = op {
                if let Some(sheet) = result.sheet_mut(sheet_uuid) {
                    if let Some(component) = sheet.component_mut(uuid) {
                        component.placement = *placement;
                    }
                }
            }
        }
    }

    result
}

/// Load the project currently on disk, diff it against `target`, apply the
/// resulting plan, and commit the merged result — the full `sync()` +
/// `apply()` + write pipeline from spec §6 in one call.
///
/// Per-sheet output granularity follows spec §4.5/§4.6: a sheet with a
/// non-empty plan is rendered by [`crate::merge::render_sheet_merged`], which
/// reuses the preserved node for every entity the plan didn't touch and
/// patches only the fields an op actually names — not a full fresh
/// re-render of the sheet, which would lose byte-identity for every
/// untouched sibling.
pub fn sync_and_write(
    existing_dir: &Path,
    root_filename: &str,
    target: &Project,
    symbols: &SymbolLibrary,
    out_dir: &Path,
    kicad_version: &str,
) -> Result<(Project, EditPlan, WriteReport)> {
    let (existing, preserved) = kicad_io::load_project_with_preserved(existing_dir, root_filename, symbols)?;
    let plan = crate::diff::diff(&existing, target);
    let merged = apply(&plan, target);

    let plan_by_filename: std::collections::HashMap<&str, &crate::plan::SheetPlan> = plan
        .sheets
        .iter()
        .map(|s| (s.filename.as_str(), s))
        .collect();

    let mut files = Vec::with_capacity(merged.sheets.len());
    for sheet in &merged.sheets {
        let Some(sheet_plan) = plan_by_filename.get(sheet.filename.as_str()) else {
            // Untouched sheet: re-parse the file on disk and hand the
            // resulting tree straight back. Every node still carries its
            // original span, so `sexpr_codec::format` reproduces it
            // byte-for-byte.
            let original_path = existing_dir.join(&sheet.filename);
            let source = std::fs::read_to_string(&original_path).map_err(|e| {
                SyncError::Io(kicad_io::KicadIoError::io(original_path.display().to_string(), e))
            })?;
            let tree = sexpr_codec::parse(&source).map_err(|source| SyncError::InvariantViolation {
                description: format!("unchanged sheet '{}' failed to re-parse: {source}", sheet.filename),
            })?;
            files.push((sheet.filename.clone(), tree));
            continue;
        };

        match preserved.get(&sheet.filename) {
            Some(preserved_tree) => {
                files.push((
                    sheet.filename.clone(),
                    crate::merge::render_sheet_merged(preserved_tree, sheet_plan, sheet),
                ));
            }
            None => {
                // A newly inserted sheet has no preserved tree to merge
                // against; render it fresh in its entirety.
                files.push((
                    sheet.filename.clone(),
                    kicad_io::render_sheet_fresh(&merged, sheet, kicad_version),
                ));
            }
        }
    }

    let report = kicad_io::commit(out_dir, &files)?;
    Ok((merged, plan, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_model::{Component, Placement, Reference, Sheet, Uuid};

    #[test]
    fn apply_carries_forward_existing_placement() {
        let root = Sheet::new(Uuid::generate(), "root.kicad_sch", "root");
        let mut target = Project::new("Demo", root);
        let root_uuid = target.root_sheet().uuid.clone();

        let dir = tempfile::tempdir().unwrap();
        let lib_path = dir.path().join("Device.kicad_sym");
        std::fs::write(
            &lib_path,
            r#"(kicad_symbol_lib (version 20231120) (generator kicad)
  (symbol "R"
    (symbol "R_0_1"
      (pin passive line (at 0 3.81 270) (length 1.27) (name "~") (number "1"))
      (pin passive line (at 0 -3.81 90) (length 1.27) (name "~") (number "2"))
    )
  )
)
"#,
        )
        .unwrap();
        let cache = symbol_library::LibraryCache::new();
        let symbols = SymbolLibrary::new(&[dir.path().to_path_buf()], &cache);

        let r1 = Component::new(Uuid::new("r1"), Reference::new("R1"), "Device:R", "10k");
        target.add_component(&root_uuid, r1, &symbols).unwrap();

        let mut sheet_plan = crate::plan::SheetPlan::new("root.kicad_sch");
        sheet_plan.sheet_uuid = Some(root_uuid.clone());
        sheet_plan.components.push(crate::plan::ComponentOp::UpdateAttributes {
            uuid: Uuid::new("r1"),
            fields: Default::default(),
            placement: Some(Placement::at(42.0, 7.0)),
        });
        let plan = EditPlan {
            sheets: vec![sheet_plan],
            sheet_ops: Vec::new(),
            warnings: Vec::new(),
        };

        let merged = apply(&plan, &target);
        let component = merged.sheet(&root_uuid).unwrap().component(&Uuid::new("r1")).unwrap();
        assert_eq!(component.placement, Some(Placement::at(42.0, 7.0)));
    }
}
