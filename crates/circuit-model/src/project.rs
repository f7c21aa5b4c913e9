//! `Project`: owns the sheet tree and exposes the `CircuitModel` builder API
//! (spec §4.3) — construct components, declare hierarchy, connect pins to
//! nets, and rebuild the derived net index after every structural change.

use std::collections::{HashMap, HashSet};

use crate::component::Component;
use crate::errors::{CircuitModelError, Result};
use crate::identity::{Reference, Uuid};
use crate::label::{Label, LabelKind, PowerSymbol, Wire};
use crate::net::{anonymous_net_name, NetIndex, NetScope, PinRef};
use crate::sheet::{HierarchicalPort, Sheet, SheetInstance};
use crate::warning::Warning;

use symbol_library::SymbolLibrary;

#[derive(Debug, Clone, Default)]
pub struct ProjectMetadata {
    pub title: String,
    pub paper_size: String,
}

/// Explicit association between a hierarchical port inside a child sheet and
/// the label naming it on the parent side, for one sheet instance. Kept
/// explicit (rather than inferred from geometry) so two instances of the
/// same child sheet can be wired independently — spec §8's "edits on one
/// instance do not affect the other".
#[derive(Debug, Clone, PartialEq)]
pub struct PortBinding {
    pub port_name: String,
    pub parent_label_uuid: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub metadata: ProjectMetadata,
    pub sheets: Vec<Sheet>,
    pub root: usize,
    /// Per-instance port bindings, keyed by the owning parent sheet's uuid.
    port_bindings: HashMap<Uuid, Vec<(Uuid, PortBinding)>>,
    net_index: NetIndex,
    last_warnings: Vec<Warning>,
}

impl Project {
    pub fn new(title: impl Into<String>, root_sheet: Sheet) -> Self {
        Self {
            metadata: ProjectMetadata {
                title: title.into(),
                paper_size: "A4".to_string(),
            },
            sheets: vec![root_sheet],
            root: 0,
            port_bindings: HashMap::new(),
            net_index: NetIndex::new(),
            last_warnings: Vec::new(),
        }
    }

    pub fn root_sheet(&self) -> &Sheet {
        &self.sheets[self.root]
    }

    pub fn root_sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheets[self.root]
    }

    pub fn sheet(&self, uuid: &Uuid) -> Option<&Sheet> {
        self.sheets.iter().find(|s| &s.uuid == uuid)
    }

    pub fn sheet_mut(&mut self, uuid: &Uuid) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| &s.uuid == uuid)
    }

    pub fn sheet_index(&self, uuid: &Uuid) -> Option<usize> {
        self.sheets.iter().position(|s| &s.uuid == uuid)
    }

    pub fn all_components(&self) -> impl Iterator<Item = &Component> {
        self.sheets.iter().flat_map(|s| s.components.iter())
    }

    pub fn find_component(&self, uuid: &Uuid) -> Option<(&Sheet, &Component)> {
        self.sheets
            .iter()
            .find_map(|s| s.component(uuid).map(|c| (s, c)))
    }

    pub fn find_component_by_reference(&self, reference: &Reference) -> Option<(&Sheet, &Component)> {
        self.sheets.iter().find_map(|s| {
            s.components
                .iter()
                .find(|c| &c.reference == reference)
                .map(|c| (s, c))
        })
    }

    pub fn net_index(&self) -> &NetIndex {
        &self.net_index
    }

    /// Explicit port bindings recorded for instances owned by `parent_uuid`,
    /// keyed by instance uuid.
    pub fn port_bindings_for(&self, parent_uuid: &Uuid) -> &[(Uuid, PortBinding)] {
        self.port_bindings
            .get(parent_uuid)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    // ---- hierarchy ----------------------------------------------------

    /// Add a child sheet, instantiated once under `parent_uuid`.
    pub fn add_sheet(
        &mut self,
        parent_uuid: &Uuid,
        sheet: Sheet,
        instance: SheetInstance,
    ) -> Result<()> {
        if self.sheet_index(&sheet.uuid).is_some() {
            return Err(CircuitModelError::InvariantViolation {
                description: format!("sheet '{}' already exists in project", sheet.uuid),
            });
        }
        let parent_idx = self
            .sheet_index(parent_uuid)
            .ok_or_else(|| CircuitModelError::SheetNotFound {
                uuid: parent_uuid.to_string(),
            })?;
        self.sheets.push(sheet);
        self.sheets[parent_idx].child_instances.push(instance);
        self.reindex();
        Ok(())
    }

    pub fn bind_hierarchical_port(
        &mut self,
        parent_uuid: &Uuid,
        instance_uuid: &Uuid,
        binding: PortBinding,
    ) {
        self.port_bindings
            .entry(parent_uuid.clone())
            .or_default()
            .push((instance_uuid.clone(), binding));
        self.reindex();
    }

    pub fn add_port(&mut self, sheet_uuid: &Uuid, port: HierarchicalPort) -> Result<()> {
        let sheet = self
            .sheet_mut(sheet_uuid)
            .ok_or_else(|| CircuitModelError::SheetNotFound {
                uuid: sheet_uuid.to_string(),
            })?;
        sheet.ports.push(port);
        self.reindex();
        Ok(())
    }

    // ---- components -----------------------------------------------------

    pub fn add_component(
        &mut self,
        sheet_uuid: &Uuid,
        component: Component,
        symbols: &SymbolLibrary,
    ) -> Result<()> {
        if self.find_component_by_reference(&component.reference).is_some() {
            return Err(CircuitModelError::ReferenceConflict {
                reference: component.reference.to_string(),
            });
        }

        let definition = symbols
            .lookup(&component.lib_id)
            .map_err(|source| CircuitModelError::UnknownSymbol {
                lib_id: component.lib_id.clone(),
                source,
            })?;

        if let Some(placement) = &component.placement {
            if placement.unit > definition.unit_count {
                return Err(CircuitModelError::UnitOutOfRange {
                    lib_id: component.lib_id.clone(),
                    unit: placement.unit,
                    unit_count: definition.unit_count,
                });
            }
        }

        for pin in &component.pins {
            if !definition.has_pin(&pin.pin_number) {
                return Err(CircuitModelError::UnknownPin {
                    lib_id: component.lib_id.clone(),
                    pin_number: pin.pin_number.clone(),
                });
            }
        }

        if component.is_power_symbol() && component.value.is_empty() {
            return Err(CircuitModelError::PowerSymbolMissingNet {
                reference: component.reference.to_string(),
            });
        }

        let sheet = self
            .sheet_mut(sheet_uuid)
            .ok_or_else(|| CircuitModelError::SheetNotFound {
                uuid: sheet_uuid.to_string(),
            })?;
        sheet.components.push(component);
        self.reindex();
        Ok(())
    }

    pub fn remove_component(&mut self, uuid: &Uuid) -> Result<Component> {
        for sheet in &mut self.sheets {
            if let Some(pos) = sheet.components.iter().position(|c| &c.uuid == uuid) {
                let removed = sheet.components.remove(pos);
                self.reindex();
                return Ok(removed);
            }
        }
        Err(CircuitModelError::ComponentNotFound {
            uuid: uuid.to_string(),
        })
    }

    /// Connect a pin to an explicitly named net.
    pub fn connect_named(
        &mut self,
        sheet_uuid: &Uuid,
        component_uuid: &Uuid,
        pin_number: &str,
        net_name: &str,
    ) -> Result<()> {
        let sheet = self
            .sheet_mut(sheet_uuid)
            .ok_or_else(|| CircuitModelError::SheetNotFound {
                uuid: sheet_uuid.to_string(),
            })?;
        let component = sheet
            .component_mut(component_uuid)
            .ok_or_else(|| CircuitModelError::ComponentNotFound {
                uuid: component_uuid.to_string(),
            })?;
        component.connect(crate::pin::PinConnection::new(pin_number, net_name));
        self.reindex();
        Ok(())
    }

    /// Connect two pins together without naming a net; the net is assigned
    /// KiCad's anonymous-net convention (spec §4.3 step 5).
    pub fn connect_anonymous(
        &mut self,
        sheet_uuid: &Uuid,
        a: (&Uuid, &str),
        b: (&Uuid, &str),
    ) -> Result<()> {
        let (a_ref, b_ref) = {
            let sheet = self
                .sheet(sheet_uuid)
                .ok_or_else(|| CircuitModelError::SheetNotFound {
                    uuid: sheet_uuid.to_string(),
                })?;
            let a_ref = sheet
                .component(a.0)
                .ok_or_else(|| CircuitModelError::ComponentNotFound {
                    uuid: a.0.to_string(),
                })?
                .reference
                .clone();
            let b_ref = sheet
                .component(b.0)
                .ok_or_else(|| CircuitModelError::ComponentNotFound {
                    uuid: b.0.to_string(),
                })?
                .reference
                .clone();
            (a_ref, b_ref)
        };
        let name = anonymous_net_name(
            vec![(a_ref.as_str(), a.1), (b_ref.as_str(), b.1)].into_iter(),
        );
        self.connect_named(sheet_uuid, a.0, a.1, &name)?;
        self.connect_named(sheet_uuid, b.0, b.1, &name)?;
        Ok(())
    }

    pub fn add_label(&mut self, sheet_uuid: &Uuid, label: Label) -> Result<()> {
        let sheet = self
            .sheet_mut(sheet_uuid)
            .ok_or_else(|| CircuitModelError::SheetNotFound {
                uuid: sheet_uuid.to_string(),
            })?;
        sheet.labels.push(label);
        self.reindex();
        Ok(())
    }

    pub fn remove_label(&mut self, sheet_uuid: &Uuid, label_uuid: &Uuid) -> Result<()> {
        let sheet = self
            .sheet_mut(sheet_uuid)
            .ok_or_else(|| CircuitModelError::SheetNotFound {
                uuid: sheet_uuid.to_string(),
            })?;
        sheet.labels.retain(|l| &l.uuid != label_uuid);
        self.reindex();
        Ok(())
    }

    pub fn add_power_symbol(&mut self, sheet_uuid: &Uuid, power: PowerSymbol) -> Result<()> {
        let sheet = self
            .sheet_mut(sheet_uuid)
            .ok_or_else(|| CircuitModelError::SheetNotFound {
                uuid: sheet_uuid.to_string(),
            })?;
        sheet.power_symbols.push(power);
        self.reindex();
        Ok(())
    }

    pub fn add_wire(&mut self, sheet_uuid: &Uuid, wire: Wire) -> Result<()> {
        let sheet = self
            .sheet_mut(sheet_uuid)
            .ok_or_else(|| CircuitModelError::SheetNotFound {
                uuid: sheet_uuid.to_string(),
            })?;
        sheet.wires.push(wire);
        Ok(())
    }

    // ---- net indexing (spec §4.3) ---------------------------------------

    /// Rebuild `net_index` from scratch: group pins by assigned net name,
    /// promote power/global-label names to project-wide nets, resolve
    /// hierarchical port bindings, and record warnings for collisions and
    /// unmatched ports. Called automatically after every structural
    /// mutation above.
    pub fn reindex(&mut self) {
        let mut warnings = Vec::new();
        let mut index = NetIndex::new();

        let global_names = self.collect_global_names();
        let hier_overrides = self.collect_hierarchical_overrides(&mut warnings);

        for sheet in &self.sheets {
            for component in &sheet.components {
                for pin in &component.pins {
                    let Some(name) = &pin.net else { continue };
                    let (key, scope) = self.resolve_key(
                        &sheet.uuid,
                        name,
                        &global_names,
                        &hier_overrides,
                        &mut warnings,
                    );
                    index.insert_member(
                        &key,
                        scope,
                        PinRef {
                            component_uuid: component.uuid.clone(),
                            pin_number: pin.pin_number.clone(),
                        },
                    );
                    // Keep the human-facing name, not the internal key, as
                    // the net's display name.
                    if let Some(net) = index.get_mut(&key) {
                        net.name = name.clone();
                    }
                }
            }
            for power in &sheet.power_symbols {
                let (key, scope) = self.resolve_key(
                    &sheet.uuid,
                    &power.net_name,
                    &global_names,
                    &hier_overrides,
                    &mut warnings,
                );
                index.insert_member(
                    &key,
                    scope,
                    PinRef {
                        component_uuid: power.uuid.clone(),
                        pin_number: "1".to_string(),
                    },
                );
            }
        }

        self.net_index = index;
        self.last_warnings = warnings;
    }

    fn collect_global_names(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for sheet in &self.sheets {
            for label in &sheet.labels {
                if label.kind == LabelKind::Global {
                    names.insert(label.text.clone());
                }
            }
            for power in &sheet.power_symbols {
                names.insert(power.net_name.clone());
            }
        }
        names
    }

    /// `(sheet_uuid, name) -> synthetic hierarchical key`, built from the
    /// explicit port bindings for every sheet instance.
    fn collect_hierarchical_overrides(
        &self,
        warnings: &mut Vec<Warning>,
    ) -> HashMap<(Uuid, String), String> {
        let mut overrides = HashMap::new();

        for parent in &self.sheets {
            for instance in &parent.child_instances {
                let Some(child) = self.sheet(&instance.sheet_uuid) else {
                    continue;
                };
                let bindings = self
                    .port_bindings
                    .get(&parent.uuid)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]);

                for port in &child.ports {
                    let binding = bindings
                        .iter()
                        .find(|(inst, b)| inst == &instance.uuid && b.port_name == port.name);

                    match binding.and_then(|(_, b)| b.parent_label_uuid.as_ref()) {
                        Some(label_uuid) => {
                            let Some(label) = parent.labels.iter().find(|l| &l.uuid == label_uuid)
                            else {
                                warnings.push(Warning::UnmatchedHierarchicalPort {
                                    sheet: child.name.clone(),
                                    port: port.name.clone(),
                                });
                                continue;
                            };
                            let hier_key =
                                format!("hier::{}::{}", instance.uuid.as_str(), port.name);
                            overrides.insert((child.uuid.clone(), port.name.clone()), hier_key.clone());
                            overrides.insert((parent.uuid.clone(), label.text.clone()), hier_key);
                        }
                        None => {
                            warnings.push(Warning::UnmatchedHierarchicalPort {
                                sheet: child.name.clone(),
                                port: port.name.clone(),
                            });
                        }
                    }
                }
            }
        }

        overrides
    }

    fn resolve_key(
        &self,
        sheet_uuid: &Uuid,
        name: &str,
        global_names: &HashSet<String>,
        hier_overrides: &HashMap<(Uuid, String), String>,
        warnings: &mut Vec<Warning>,
    ) -> (String, NetScope) {
        if let Some(key) = hier_overrides.get(&(sheet_uuid.clone(), name.to_string())) {
            return (key.clone(), NetScope::Hierarchical);
        }
        if global_names.contains(name) {
            let sheet = self.sheet(sheet_uuid);
            let has_local_label = sheet
                .map(|s| {
                    s.labels
                        .iter()
                        .any(|l| l.kind == LabelKind::Local && l.text == name)
                })
                .unwrap_or(false);
            if has_local_label {
                warnings.push(Warning::NetNameCollision {
                    sheet: sheet.map(|s| s.name.clone()).unwrap_or_default(),
                    name: name.to_string(),
                });
                return (format!("{}::{}", sheet_uuid.as_str(), name), NetScope::Local);
            }
            return (name.to_string(), NetScope::Global);
        }
        (format!("{}::{}", sheet_uuid.as_str(), name), NetScope::Local)
    }

    /// Best-effort, non-mutating sanity checks (spec §4.3, §8): reference
    /// uniqueness, pin/symbol alignment, net coverage, unplaced components,
    /// and the unmatched-hierarchical-port/net-collision warnings produced by
    /// the most recent `reindex()`. `symbols` resolves each component's
    /// `lib_id` to check its pins against the symbol's actual pin list —
    /// `reader::load_symbol` builds components directly from file data
    /// without going through `add_component`'s checks, so a schematic edited
    /// outside this crate (or hand-written) can disagree with its library.
    pub fn validate(&self, symbols: &SymbolLibrary) -> Vec<Warning> {
        let mut warnings = self.last_warnings.clone();
        let mut seen_references: HashSet<&str> = HashSet::new();

        for sheet in &self.sheets {
            for component in &sheet.components {
                if component.placement.is_none() {
                    warnings.push(Warning::ComponentAtOrigin {
                        reference: component.reference.to_string(),
                    });
                }

                let reference = component.reference.as_str();
                if !reference.is_empty() && !seen_references.insert(reference) {
                    warnings.push(Warning::DuplicateReference {
                        reference: reference.to_string(),
                    });
                }

                if let Ok(definition) = symbols.lookup(&component.lib_id) {
                    for pin in &component.pins {
                        if !definition.has_pin(&pin.pin_number) {
                            warnings.push(Warning::PinNotInSymbol {
                                reference: reference.to_string(),
                                lib_id: component.lib_id.clone(),
                                pin_number: pin.pin_number.clone(),
                            });
                        }
                    }
                    for declared in definition.pins() {
                        let covered = component
                            .pins
                            .iter()
                            .any(|p| p.pin_number == declared.number);
                        if !covered {
                            warnings.push(Warning::UncoveredPin {
                                reference: reference.to_string(),
                                lib_id: component.lib_id.clone(),
                                pin_number: declared.number.clone(),
                            });
                        }
                    }
                }
            }
        }
        warnings
    }
}
