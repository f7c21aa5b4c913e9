//! Non-fatal issues accumulated during indexing or validation. Per spec §7,
//! warnings never interrupt the operation that produced them and the core
//! never logs them itself — they are handed back to the caller to render.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    NetNameCollision { sheet: String, name: String },
    UnmatchedHierarchicalPort { sheet: String, port: String },
    ComponentAtOrigin { reference: String },
    DuplicateReference { reference: String },
    PinNotInSymbol { reference: String, lib_id: String, pin_number: String },
    UncoveredPin { reference: String, lib_id: String, pin_number: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NetNameCollision { sheet, name } => write!(
                f,
                "net name '{name}' on sheet '{sheet}' collides with a global net of the same name; local definition wins"
            ),
            Warning::UnmatchedHierarchicalPort { sheet, port } => write!(
                f,
                "hierarchical port '{port}' on sheet '{sheet}' has no matching label on its parent sheet"
            ),
            Warning::ComponentAtOrigin { reference } => write!(
                f,
                "component '{reference}' has no placement and was written at the origin; external placement is required"
            ),
            Warning::DuplicateReference { reference } => write!(
                f,
                "reference '{reference}' is assigned to more than one component in this project"
            ),
            Warning::PinNotInSymbol { reference, lib_id, pin_number } => write!(
                f,
                "component '{reference}' connects pin '{pin_number}', which is not declared on symbol '{lib_id}'"
            ),
            Warning::UncoveredPin { reference, lib_id, pin_number } => write!(
                f,
                "pin '{pin_number}' of symbol '{lib_id}' is never connected or marked unconnected on component '{reference}'"
            ),
        }
    }
}
