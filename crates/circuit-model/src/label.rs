//! Labels, power symbols, and wires: the textual/graphical mechanism that
//! connects nets, and the optional wire detail the synchronizer preserves
//! verbatim where possible (spec §3).

use crate::identity::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Local,
    Global,
    Hierarchical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub uuid: Uuid,
    pub kind: LabelKind,
    pub text: String,
    pub position: (f64, f64),
    pub justify: Option<Justify>,
}

impl Label {
    pub fn new(uuid: Uuid, kind: LabelKind, text: impl Into<String>, position: (f64, f64)) -> Self {
        Self {
            uuid,
            kind,
            text: text.into(),
            position,
            justify: None,
        }
    }
}

/// A pseudo-component whose reference starts with `#PWR`; first-class for
/// position preservation, but never contributes to a BOM.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSymbol {
    pub uuid: Uuid,
    pub reference: String,
    /// Names the global power net (`VCC`, `GND`, `+3V3`, ...).
    pub net_name: String,
    pub position: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub uuid: Uuid,
    pub points: Vec<(f64, f64)>,
}
