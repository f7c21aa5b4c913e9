//! The core's closed error enumeration (spec §7), realized for the model
//! layer. `InvariantViolation` indicates a bug in this crate, not bad
//! caller input, and is never swallowed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CircuitModelError {
    #[error("reference '{reference}' already exists in this project")]
    ReferenceConflict { reference: String },

    #[error("lib_id '{lib_id}' does not resolve: {source}")]
    UnknownSymbol {
        lib_id: String,
        #[source]
        source: symbol_library::SymbolLibraryError,
    },

    #[error("pin '{pin_number}' is not declared on symbol '{lib_id}'")]
    UnknownPin { lib_id: String, pin_number: String },

    #[error("unit {unit} exceeds unit_count {unit_count} for symbol '{lib_id}'")]
    UnitOutOfRange {
        lib_id: String,
        unit: u32,
        unit_count: u32,
    },

    #[error("power symbol '{reference}' has no value naming its net")]
    PowerSymbolMissingNet { reference: String },

    #[error("sheet '{uuid}' not found in project")]
    SheetNotFound { uuid: String },

    #[error("component '{uuid}' not found in sheet")]
    ComponentNotFound { uuid: String },

    #[error("invariant violation: {description}")]
    InvariantViolation { description: String },
}

pub type Result<T> = std::result::Result<T, CircuitModelError>;
