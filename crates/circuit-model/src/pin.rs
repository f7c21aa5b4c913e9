//! Pin connections as they hang off a `Component`. A `Pin` is identified by
//! `(component_uuid, pin_number)`; the component owns that identity, so this
//! module only models the per-pin connection record, not a back-pointer.

pub use symbol_library::ElectricalType;

/// One pin on a component, and the net name it was assigned to at
/// construction time. The authoritative connectivity graph is the
/// `NetIndex`, rebuilt from these records plus labels — this is input to
/// that computation, not the result of it.
#[derive(Debug, Clone, PartialEq)]
pub struct PinConnection {
    pub pin_number: String,
    /// `None` means explicitly unconnected (the pin will not participate in
    /// net coverage).
    pub net: Option<String>,
}

impl PinConnection {
    pub fn new(pin_number: impl Into<String>, net: impl Into<String>) -> Self {
        Self {
            pin_number: pin_number.into(),
            net: Some(net.into()),
        }
    }

    pub fn unconnected(pin_number: impl Into<String>) -> Self {
        Self {
            pin_number: pin_number.into(),
            net: None,
        }
    }
}
