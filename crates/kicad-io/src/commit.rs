//! Atomic multi-file commit (spec §5): each file is written to a sibling
//! temporary path and renamed into place. KiCad projects are multi-file and
//! not transactional on disk, so a failure partway through leaves previously
//! renamed files in place; the `WriteReport` tells the caller exactly what
//! happened so it can decide recovery.

use std::path::{Path, PathBuf};

use sexpr_codec::Tree;
use tracing::{debug, info, warn};

use crate::error::{KicadIoError, Result};

#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl WriteReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Render and commit every file in `files` (filename relative to `dir`,
/// paired with the tree to format). Stops at the first failure, leaving
/// already-renamed files in place; every remaining file is recorded as
/// failed without being touched.
pub fn commit(dir: &Path, files: &[(String, Tree)]) -> Result<WriteReport> {
    std::fs::create_dir_all(dir).map_err(|e| KicadIoError::io(dir.display().to_string(), e))?;

    let mut report = WriteReport::default();
    let mut interrupted = false;

    for (filename, tree) in files {
        let path = dir.join(filename);
        if interrupted {
            report
                .failed
                .push((path, "skipped after an earlier file in this commit failed".to_string()));
            continue;
        }

        match write_one(&path, tree) {
            Ok(()) => {
                debug!(?path, "wrote file");
                report.written.push(path);
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to write file");
                report.failed.push((path, e.to_string()));
                interrupted = true;
            }
        }
    }

    if report.is_complete_success() {
        info!(count = report.written.len(), "committed project files");
    }
    Ok(report)
}

fn write_one(path: &Path, tree: &Tree) -> Result<()> {
    write_bytes(path, sexpr_codec::format(tree).as_bytes())
}

/// Same temp-then-rename commit, for a sidecar file that isn't an
/// S-expression tree (the `.kicad_pro` project file is JSON).
pub fn commit_text(dir: &Path, files: &[(String, String)]) -> Result<WriteReport> {
    std::fs::create_dir_all(dir).map_err(|e| KicadIoError::io(dir.display().to_string(), e))?;

    let mut report = WriteReport::default();
    for (filename, contents) in files {
        let path = dir.join(filename);
        match write_bytes(&path, contents.as_bytes()) {
            Ok(()) => {
                debug!(?path, "wrote file");
                report.written.push(path);
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to write file");
                report.failed.push((path, e.to_string()));
            }
        }
    }
    Ok(report)
}

fn write_bytes(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("tmp")
    ));

    std::fs::write(&tmp_path, contents)
        .map_err(|e| KicadIoError::io(tmp_path.display().to_string(), e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| KicadIoError::io(path.display().to_string(), e))?;
    Ok(())
}
