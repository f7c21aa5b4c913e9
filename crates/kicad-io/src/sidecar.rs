//! The project's non-schematic files (spec §6). `.kicad_pro` is KiCad's
//! per-project settings file and, unlike every other file this crate
//! touches, is JSON rather than an S-expression; this core treats it as an
//! opaque blob, carried forward byte-for-byte except when it doesn't exist
//! yet. `.kicad_pcb` *is* an S-expression tree, and is opaque to the core
//! except that a component rename must be reflected in its footprint's
//! reference designator so the schematic and board don't drift apart.
//!
//! Both files are optional: a project created by [`crate::generate_project`]
//! before any PCB work exists has neither, and loading one without it
//! present is not an error.

use std::path::Path;

use sexpr_codec::{Atom, Node, Tree};

use crate::error::Result;

/// The project's `.kicad_pro` settings file, held as raw JSON text. This
/// core never parses its structure — only whether the file exists at all.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub filename: String,
    pub json: String,
}

/// A `.kicad_pcb` board file, carried forward untouched unless a component
/// rename requires patching a footprint's reference designator.
#[derive(Debug, Clone)]
pub struct BoardFile {
    pub filename: String,
    pub tree: Tree,
}

/// Load `{project_name}.kicad_pro` from `dir` if present. Returns `Ok(None)`
/// rather than an error when it's absent.
pub fn load_project_file(dir: &Path, project_name: &str) -> Result<Option<ProjectFile>> {
    let filename = format!("{project_name}.kicad_pro");
    let path = dir.join(&filename);
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(&path)
        .map_err(|e| crate::error::KicadIoError::io(path.display().to_string(), e))?;
    serde_json::from_str::<serde_json::Value>(&json).map_err(|source| {
        crate::error::KicadIoError::malformed(&filename, format!("invalid JSON: {source}"))
    })?;
    Ok(Some(ProjectFile { filename, json }))
}

/// Load `{project_name}.kicad_pcb` from `dir` if present. Returns `Ok(None)`
/// rather than an error when it's absent.
pub fn load_board_file(dir: &Path, project_name: &str) -> Result<Option<BoardFile>> {
    let filename = format!("{project_name}.kicad_pcb");
    let path = dir.join(&filename);
    if !path.exists() {
        return Ok(None);
    }
    let source = std::fs::read_to_string(&path)
        .map_err(|e| crate::error::KicadIoError::io(path.display().to_string(), e))?;
    let tree = sexpr_codec::parse(&source).map_err(|source| crate::error::KicadIoError::Parse {
        path: filename.clone(),
        source,
    })?;
    Ok(Some(BoardFile { filename, tree }))
}

/// Rewrite every `(fp_text reference "OLD" ...)` and bare
/// `(property "Reference" "OLD" ...)` atom inside a `.kicad_pcb` tree to
/// `new`, leaving every other byte of the file untouched (spec §6: "only
/// component footprint reference designators may be updated in sync with
/// schematic renames"). Only the root list's and the touched footprint's own
/// span are cleared so the rewrite is visited at all — every sibling
/// footprint, and every other field of the renamed one, keeps its original
/// span and is copied verbatim by the formatter.
pub fn rename_footprint_reference(tree: &mut Tree, old: &str, new: &str) -> bool {
    let Some(root) = tree.root.as_list_mut() else { return false };
    let mut changed = false;
    for footprint in root.children.iter_mut().filter_map(|c| c.as_list_mut()) {
        if footprint.head_atom() != Some("footprint") {
            continue;
        }
        let mut footprint_changed = false;
        for child in footprint.children.iter_mut() {
            if rename_reference_node(child, old, new) {
                footprint_changed = true;
            }
        }
        if footprint_changed {
            footprint.span = None;
            changed = true;
        }
    }
    if changed {
        root.span = None;
    }
    changed
}

fn rename_reference_node(node: &mut Node, old: &str, new: &str) -> bool {
    let Some(list) = node.as_list_mut() else { return false };
    let is_reference = match list.head_atom() {
        Some("fp_text") => list.atom(1).map(|a| a.as_str() == "reference").unwrap_or(false),
        Some("property") => list.atom(1).map(|a| a.as_str() == "Reference").unwrap_or(false),
        _ => false,
    };
    if !is_reference {
        return false;
    }
    let value_index = match list.head_atom() {
        Some("fp_text") => 2,
        Some("property") => 2,
        _ => return false,
    };
    let Some(value) = list.children.get(value_index) else { return false };
    if value.as_atom().map(|a| a.as_str() == old).unwrap_or(false) {
        list.children[value_index] = Node::Atom(Atom::string(new.to_string()));
        list.span = None;
        return true;
    }
    false
}

/// Render a brand-new `.kicad_pro` for a project that has never had one,
/// using the minimal set of top-level keys a current KiCad release expects
/// to find (and happily fills in defaults for anything else on next open).
pub fn render_fresh_project_file(project_name: &str) -> String {
    let value = serde_json::json!({
        "board": {},
        "boards": [],
        "cvpcb": {},
        "erc": {},
        "libraries": {
            "pinned_footprint_libs": [],
            "pinned_symbol_libs": [],
        },
        "meta": {
            "filename": format!("{project_name}.kicad_pro"),
            "version": 1,
        },
        "net_settings": {},
        "pcbnew": {},
        "schematic": {},
        "sheets": [],
        "text_variables": {},
    });
    let mut rendered = serde_json::to_string_pretty(&value).unwrap_or_default();
    rendered.push('\n');
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_present_project_file_and_skips_absent_one() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("demo.kicad_pro"), "{\"meta\": {\"version\": 1}}\n").unwrap();

        let project_file = load_project_file(dir.path(), "demo").unwrap();
        assert!(project_file.is_some());
        assert_eq!(project_file.unwrap().filename, "demo.kicad_pro");

        assert!(load_board_file(dir.path(), "demo").unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_project_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("demo.kicad_pro"), "not json").unwrap();
        assert!(load_project_file(dir.path(), "demo").is_err());
    }

    #[test]
    fn renames_footprint_reference_in_place() {
        let src = "(kicad_pcb (footprint \"Resistor_SMD:R_0603\" (fp_text reference \"R1\" (at 0 0))))\n";
        let mut tree = sexpr_codec::parse(src).unwrap();
        let changed = rename_footprint_reference(&mut tree, "R1", "R_PULLUP");
        assert!(changed);
        let out = sexpr_codec::format(&tree);
        assert!(out.contains("\"R_PULLUP\""));
        assert!(!out.contains("\"R1\""));
    }

    #[test]
    fn leaves_unrelated_footprints_untouched() {
        let src = "(kicad_pcb (footprint \"Resistor_SMD:R_0603\" (fp_text reference \"R2\" (at 0 0))))\n";
        let mut tree = sexpr_codec::parse(src).unwrap();
        let changed = rename_footprint_reference(&mut tree, "R1", "R_PULLUP");
        assert!(!changed);
        assert_eq!(sexpr_codec::format(&tree), src);
    }

    #[test]
    fn fresh_project_file_is_valid_json() {
        let rendered = render_fresh_project_file("demo");
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["meta"]["filename"], "demo.kicad_pro");
    }
}
