//! The closed error enumeration from spec §7, realized at the facade
//! boundary by wrapping each component crate's own error type (grounded on
//! the teacher's `rust_io_processor::error` layering: every layer owns its
//! own `thiserror` enum, and the outermost layer composes them with
//! `#[from]` rather than re-deriving the same variants again).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncCoreError {
    #[error(transparent)]
    Codec(#[from] sexpr_codec::ParseError),

    #[error(transparent)]
    Symbol(#[from] symbol_library::SymbolLibraryError),

    #[error(transparent)]
    Model(#[from] circuit_model::CircuitModelError),

    #[error(transparent)]
    Io(#[from] kicad_io::KicadIoError),

    #[error(transparent)]
    Sync(#[from] synchronizer::SyncError),

    #[error("no KiCad project found in {dir}: expected a {name}.kicad_pro or a single .kicad_sch")]
    ProjectNotFound { dir: String, name: String },

    #[error("I/O error at {path}: {source}")]
    DirectIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SyncCoreError>;
