//! Configuration (spec §6 expansion): a plain struct with a `Default`
//! matching KiCad's own defaults, grounded on the teacher's
//! `CacheConfig`/`SchematicConfig` pattern — a value the caller can build
//! and pass in, never a global.

use std::path::PathBuf;

/// The KiCad schematic format version this core emits for files it creates
/// from scratch. Existing files carry their own `(version N)` forward
/// untouched (spec §6).
pub const DEFAULT_KICAD_VERSION: &str = "20231120";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Indent width used by the formatter's fresh mode (spec §4.1).
    pub fresh_indent_width: usize,
    /// `(version N)` atom written into schematics created from nothing.
    pub kicad_version: String,
    /// Directories searched for `.kicad_sym` libraries, in order.
    pub symbol_search_paths: Vec<PathBuf>,
    /// Whether `sync` also (re)writes the derived `.net` netlist export.
    pub export_netlist: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fresh_indent_width: 2,
            kicad_version: DEFAULT_KICAD_VERSION.to_string(),
            symbol_search_paths: Vec::new(),
            export_netlist: false,
        }
    }
}

impl SyncConfig {
    pub fn with_search_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.symbol_search_paths = paths.into_iter().collect();
        self
    }
}
