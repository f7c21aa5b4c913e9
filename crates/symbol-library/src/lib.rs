//! Resolves `lib_id` (`"Library:Symbol"`) strings to [`SymbolDefinition`]s,
//! parsing and caching `.kicad_sym` files as they're first needed.

mod cache;
mod error;
mod parser;
mod types;

pub use cache::LibraryCache;
pub use error::{Result, SymbolLibraryError};
pub use types::{ElectricalType, PinDefinition, SymbolDefinition};

use std::path::PathBuf;

/// Resolves `lib_id`s against a configured set of library search
/// directories, backed by a shared [`LibraryCache`].
pub struct SymbolLibrary<'a> {
    search_paths: &'a [PathBuf],
    cache: &'a LibraryCache,
}

impl<'a> SymbolLibrary<'a> {
    pub fn new(search_paths: &'a [PathBuf], cache: &'a LibraryCache) -> Self {
        Self {
            search_paths,
            cache,
        }
    }

    /// Resolve `"Library:Symbol"` to its definition.
    pub fn lookup(&self, lib_id: &str) -> Result<SymbolDefinition> {
        let (library, symbol) = split_lib_id(lib_id)?;

        for dir in self.search_paths {
            let candidate = dir.join(format!("{library}.kicad_sym"));
            if !candidate.exists() {
                continue;
            }
            let symbols = self.cache.load(&candidate)?;
            return symbols
                .get(symbol)
                .cloned()
                .ok_or_else(|| SymbolLibraryError::SymbolNotFound {
                    library: library.to_string(),
                    symbol: symbol.to_string(),
                });
        }

        Err(SymbolLibraryError::LibraryNotFound {
            lib_id: lib_id.to_string(),
            searched_paths: self
                .search_paths
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
        })
    }
}

fn split_lib_id(lib_id: &str) -> Result<(&str, &str)> {
    lib_id
        .split_once(':')
        .ok_or_else(|| SymbolLibraryError::MalformedLibId(lib_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_library(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(format!("{name}.kicad_sym"));
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{body}").unwrap();
        path
    }

    const DEVICE_LIB: &str = r#"(kicad_symbol_lib (version 20231120) (generator kicad)
  (symbol "R"
    (property "Footprint" "Resistor_SMD:R_0603")
    (symbol "R_0_1"
      (pin passive line (at 0 3.81 270) (length 1.27) (name "~") (number "1"))
      (pin passive line (at 0 -3.81 90) (length 1.27) (name "~") (number "2"))
    )
  )
)
"#;

    #[test]
    fn resolves_symbol_from_search_path() {
        let dir = tempfile::tempdir().unwrap();
        write_library(dir.path(), "Device", DEVICE_LIB);

        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let lib = SymbolLibrary::new(&paths, &cache);

        let def = lib.lookup("Device:R").expect("lookup");
        assert_eq!(def.name, "R");
        assert_eq!(def.pin_count(), 2);
        assert_eq!(def.default_footprint.as_deref(), Some("Resistor_SMD:R_0603"));
        assert!(def.has_pin("1"));
        assert!(def.has_pin("2"));
        assert!(!def.has_pin("3"));
    }

    #[test]
    fn missing_library_is_reported_with_searched_paths() {
        let cache = LibraryCache::new();
        let paths = vec![PathBuf::from("/nonexistent")];
        let lib = SymbolLibrary::new(&paths, &cache);

        let err = lib.lookup("Device:R").unwrap_err();
        match err {
            SymbolLibraryError::LibraryNotFound { lib_id, searched_paths } => {
                assert_eq!(lib_id, "Device:R");
                assert_eq!(searched_paths, vec!["/nonexistent".to_string()]);
            }
            other => panic!("expected LibraryNotFound, got {other:?}"),
        }
    }

    #[test]
    fn repeated_lookup_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_library(dir.path(), "Device", DEVICE_LIB);
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let lib = SymbolLibrary::new(&paths, &cache);

        lib.lookup("Device:R").unwrap();
        lib.lookup("Device:R").unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn malformed_lib_id_is_rejected() {
        let cache = LibraryCache::new();
        let paths: Vec<PathBuf> = vec![];
        let lib = SymbolLibrary::new(&paths, &cache);
        assert!(matches!(
            lib.lookup("NoColonHere"),
            Err(SymbolLibraryError::MalformedLibId(_))
        ));
    }
}
