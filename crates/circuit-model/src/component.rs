//! `Component`: attributes, placement, and the property bag that preserves
//! unknown KiCad properties in original order (spec §9's "dynamic attribute
//! access" design note).

use crate::identity::{Fingerprint, Reference, Uuid};
use crate::pin::PinConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn degrees(self) -> f64 {
        match self {
            Rotation::R0 => 0.0,
            Rotation::R90 => 90.0,
            Rotation::R180 => 180.0,
            Rotation::R270 => 270.0,
        }
    }

    pub fn from_degrees(deg: f64) -> Option<Self> {
        let normalized = ((deg % 360.0) + 360.0) % 360.0;
        match normalized as i64 {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    None,
    X,
    Y,
}

/// A component's geometric placement. Absent until the component has been
/// placed, either carried forward by the synchronizer or assigned by an
/// external placement collaborator (out of scope for this core).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
    pub mirror: Mirror,
    pub unit: u32,
}

impl Placement {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            rotation: Rotation::R0,
            mirror: Mirror::None,
            unit: 1,
        }
    }
}

/// Ordered key-value properties, preserving any unrecognized ones verbatim
/// in their original order — critical for losslessness per spec §9.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    pub datasheet: Option<String>,
    pub dnp: bool,
    /// Any property not one of the well-known fields above, in original
    /// insertion/read order.
    other: Vec<(String, String)>,
    /// Property names for which the file carried more than one `(property
    /// ...)` entry with that name (spec §9 open question: both are kept on
    /// read, the later one wins here and on write, and the synchronizer
    /// attaches a warning rather than guessing intent).
    duplicated: Vec<String>,
}

impl PropertyBag {
    pub fn set_other(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(entry) = self.other.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value.into();
        } else {
            self.other.push((key, value.into()));
        }
    }

    pub fn get_other(&self, key: &str) -> Option<&str> {
        self.other.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn other_in_order(&self) -> impl Iterator<Item = &(String, String)> {
        self.other.iter()
    }

    pub fn mark_duplicated(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.duplicated.contains(&key) {
            self.duplicated.push(key);
        }
    }

    pub fn duplicated_properties(&self) -> &[String] {
        &self.duplicated
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub uuid: Uuid,
    pub reference: Reference,
    pub lib_id: String,
    pub value: String,
    pub footprint: String,
    pub properties: PropertyBag,
    pub placement: Option<Placement>,
    pub pins: Vec<PinConnection>,
}

impl Component {
    pub fn new(
        uuid: Uuid,
        reference: Reference,
        lib_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            reference,
            lib_id: lib_id.into(),
            value: value.into(),
            footprint: String::new(),
            properties: PropertyBag::default(),
            placement: None,
            pins: Vec::new(),
        }
    }

    pub fn connect(&mut self, pin: PinConnection) {
        if let Some(existing) = self.pins.iter_mut().find(|p| p.pin_number == pin.pin_number) {
            *existing = pin;
        } else {
            self.pins.push(pin);
        }
    }

    pub fn is_power_symbol(&self) -> bool {
        self.reference.as_str().starts_with("#PWR")
    }

    /// Structural identity used when neither uuid nor reference can match
    /// an entity across loads.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(
            &self.lib_id,
            &self.value,
            self.pins
                .iter()
                .filter_map(|p| p.net.as_deref().map(|n| (p.pin_number.as_str(), n))),
        )
    }
}
