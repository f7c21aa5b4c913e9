//! Locates the root `.kicad_sch` for a project directory (spec §6): prefer
//! the `.kicad_pro` file's stem, since that's how KiCad itself names the
//! root sheet, and fall back to a lone `.kicad_sch` file when no project
//! file is present yet (a schematic sketched out by hand, or a fixture).

use std::path::Path;

use crate::error::{Result, SyncCoreError};

pub fn discover_root_filename(project_dir: &Path) -> Result<String> {
    let entries = std::fs::read_dir(project_dir).map_err(|e| SyncCoreError::DirectIo {
        path: project_dir.display().to_string(),
        source: e,
    })?;

    let mut pro_stem: Option<String> = None;
    let mut sch_files: Vec<String> = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| SyncCoreError::DirectIo {
            path: project_dir.display().to_string(),
            source: e,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = name.strip_suffix(".kicad_pro") {
            pro_stem = Some(stem.to_string());
        } else if name.ends_with(".kicad_sch") {
            sch_files.push(name);
        }
    }

    if let Some(stem) = pro_stem {
        let candidate = format!("{stem}.kicad_sch");
        if sch_files.contains(&candidate) {
            return Ok(candidate);
        }
    }

    match sch_files.len() {
        1 => Ok(sch_files.remove(0)),
        0 => Err(not_found(project_dir)),
        _ => Err(not_found(project_dir)),
    }
}

fn not_found(project_dir: &Path) -> SyncCoreError {
    SyncCoreError::ProjectNotFound {
        dir: project_dir.display().to_string(),
        name: project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}
