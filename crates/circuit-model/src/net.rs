//! Nets are derived, not stored by reference from `Component` (spec §3):
//! they are recomputed from pin connections and labels by `NetIndex::build`
//! whenever a sheet's structure changes.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::identity::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetScope {
    Local,
    Hierarchical,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub component_uuid: Uuid,
    pub pin_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    pub name: String,
    pub scope: NetScope,
    pub members: Vec<PinRef>,
}

impl Net {
    pub fn new(name: impl Into<String>, scope: NetScope) -> Self {
        Self {
            name: name.into(),
            scope,
            members: Vec::new(),
        }
    }
}

/// The rebuilt connectivity graph for one sheet: `net_name -> Net`, plus a
/// reverse lookup from `(component, pin)` to the net name it landed on.
/// Insertion order is preserved (`IndexMap`) so derived output like the
/// `.net` export is deterministic.
#[derive(Debug, Clone, Default)]
pub struct NetIndex {
    nets: IndexMap<String, Net>,
    pin_to_net: AHashMap<PinRef, String>,
}

impl NetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_member(&mut self, net_name: &str, scope: NetScope, member: PinRef) {
        let entry = self
            .nets
            .entry(net_name.to_string())
            .or_insert_with(|| Net::new(net_name, scope));
        // A later global/hierarchical classification upgrades an
        // initially-local net scope without losing already-collected
        // members.
        if scope_rank(scope) > scope_rank(entry.scope) {
            entry.scope = scope;
        }
        if !entry.members.contains(&member) {
            self.pin_to_net.insert(member.clone(), net_name.to_string());
            entry.members.push(member);
        }
    }

    pub fn net_for_pin(&self, pin: &PinRef) -> Option<&str> {
        self.pin_to_net.get(pin).map(|s| s.as_str())
    }

    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.values()
    }

    pub fn get(&self, name: &str) -> Option<&Net> {
        self.nets.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Net> {
        self.nets.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// Drop any net left with no members, e.g. after a component removal.
    /// Returns the names of nets that were collected.
    pub fn garbage_collect(&mut self) -> Vec<String> {
        let empty: Vec<String> = self
            .nets
            .iter()
            .filter(|(_, net)| net.members.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        for name in &empty {
            self.nets.shift_remove(name);
        }
        empty
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) {
        if let Some(mut net) = self.nets.shift_remove(old_name) {
            net.name = new_name.to_string();
            for pin in &net.members {
                self.pin_to_net.insert(pin.clone(), new_name.to_string());
            }
            self.nets.insert(new_name.to_string(), net);
        }
    }
}

fn scope_rank(scope: NetScope) -> u8 {
    match scope {
        NetScope::Local => 0,
        NetScope::Hierarchical => 1,
        NetScope::Global => 2,
    }
}

/// KiCad's convention for naming an otherwise-anonymous net: the
/// lexicographically smallest `reference-pin` incidence.
pub fn anonymous_net_name<'a>(incidences: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let smallest = incidences
        .map(|(reference, pin)| format!("{reference}-Pad{pin}"))
        .min();
    match smallest {
        Some(tag) => format!("Net-({tag})"),
        None => "Net-(unnamed)".to_string(),
    }
}
