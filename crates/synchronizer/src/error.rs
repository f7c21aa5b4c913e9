//! Closed error enumeration for matching and plan construction (spec §7).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("reference '{reference}' would be duplicated across sheets {sheets:?}")]
    ReferenceConflict {
        reference: String,
        sheets: Vec<String>,
    },

    #[error("lib_id '{lib_id}' does not resolve")]
    UnknownSymbol { lib_id: String },

    #[error("sheet '{uuid}' ('{filename}') is referenced but its file is missing")]
    OrphanedSheet { uuid: String, filename: String },

    #[error("invariant violation: {description}")]
    InvariantViolation { description: String },

    #[error(transparent)]
    Model(#[from] circuit_model::CircuitModelError),

    #[error(transparent)]
    Io(#[from] kicad_io::KicadIoError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
