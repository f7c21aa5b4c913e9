//! Types exposed by a resolved `.kicad_sym` symbol.

/// Electrical type of a pin, as declared on the symbol (not the net it ends
/// up on — that's a property of `circuit_model::Net`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElectricalType {
    Input,
    Output,
    Bidirectional,
    TriState,
    Passive,
    Unspecified,
    PowerIn,
    PowerOut,
    OpenCollector,
    OpenEmitter,
    Unconnected,
}

impl ElectricalType {
    pub fn from_kicad_str(s: &str) -> Self {
        match s {
            "input" => Self::Input,
            "output" => Self::Output,
            "bidirectional" => Self::Bidirectional,
            "tri_state" => Self::TriState,
            "passive" => Self::Passive,
            "power_in" => Self::PowerIn,
            "power_out" => Self::PowerOut,
            "open_collector" => Self::OpenCollector,
            "open_emitter" => Self::OpenEmitter,
            "no_connect" | "unconnected" => Self::Unconnected,
            _ => Self::Unspecified,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PinDefinition {
    pub number: String,
    pub name: String,
    pub electrical_type: ElectricalType,
    pub position: (f64, f64),
    pub unit: u32,
}

/// A fully resolved symbol from a `.kicad_sym` library.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDefinition {
    pub name: String,
    pub extends: Option<String>,
    pub unit_count: u32,
    pub power: bool,
    pub default_footprint: Option<String>,
    pins: Vec<PinDefinition>,
}

impl SymbolDefinition {
    pub fn new(
        name: String,
        extends: Option<String>,
        unit_count: u32,
        power: bool,
        default_footprint: Option<String>,
        pins: Vec<PinDefinition>,
    ) -> Self {
        Self {
            name,
            extends,
            unit_count: unit_count.max(1),
            power,
            default_footprint,
            pins,
        }
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn pins(&self) -> impl Iterator<Item = &PinDefinition> {
        self.pins.iter()
    }

    pub fn pin(&self, number: &str) -> Option<&PinDefinition> {
        self.pins.iter().find(|p| p.number == number)
    }

    pub fn has_pin(&self, number: &str) -> bool {
        self.pin(number).is_some()
    }
}
