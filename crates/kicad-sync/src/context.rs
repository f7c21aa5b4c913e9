//! The explicit context object spec §9's "global singletons for library
//! caches" design note calls for: an owned, passed-in value instead of a
//! process-wide static, so two independent `sync()` calls in the same
//! process (e.g. a test harness exercising several fixture projects) never
//! share cache state unless the caller explicitly shares a `Context`.

use std::sync::Arc;

use symbol_library::LibraryCache;

use crate::config::SyncConfig;

/// Owns the symbol library cache and the active configuration for one or
/// more `load_project`/`generate`/`sync` calls. Cheaply cloneable — the
/// cache is the only thing that crosses an `Arc` (spec §5: "the `Context`
/// object is the only type crossing an `Arc`; everything else is owned by a
/// single caller").
#[derive(Clone)]
pub struct Context {
    cache: Arc<LibraryCache>,
    pub config: SyncConfig,
}

impl Context {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            cache: Arc::new(LibraryCache::new()),
            config,
        }
    }

    pub fn cache(&self) -> &LibraryCache {
        &self.cache
    }

    pub fn symbol_library(&self) -> symbol_library::SymbolLibrary<'_> {
        symbol_library::SymbolLibrary::new(&self.config.symbol_search_paths, &self.cache)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}
