//! Diff phase (spec §4.6): turns a matched pair of projects into an
//! [`EditPlan`]. All reads happen here, before [`crate::apply`] writes a
//! single byte (spec §5).

use std::collections::HashMap;

use circuit_model::{Component, LabelKind, Project, Sheet};

use crate::matching::{
    match_components, match_labels, match_ports, match_power_symbols, match_sheets, match_wires,
    MatchKind,
};
use crate::plan::{ComponentOp, EditPlan, LabelOp, PlanWarning, PowerSymbolOp, SheetOp, SheetPlan, WireOp};

/// Compare `existing` (what is currently on disk) against `target` (the
/// freshly constructed desired state) and decide the minimal set of edits
/// that turns the former into the latter while preserving everything the
/// target doesn't actually change — position above all (spec §8's
/// position-preservation scenario).
pub fn diff(existing: &Project, target: &Project) -> EditPlan {
    let mut plan = EditPlan::default();

    let (sheet_matches, deleted_sheets, inserted_sheets) =
        match_sheets(&existing.sheets, &target.sheets);

    for uuid in deleted_sheets {
        plan.sheet_ops.push(SheetOp::Remove(uuid));
    }

    for new_uuid in &inserted_sheets {
        let sheet = target.sheet(new_uuid).expect("inserted sheet must exist in target");
        plan.sheet_ops.push(SheetOp::Insert {
            filename: sheet.filename.clone(),
            name: sheet.name.clone(),
        });
        plan.sheets.push(diff_new_sheet(sheet));
    }

    for (old_uuid, new_uuid) in sheet_matches {
        let old_sheet = existing.sheet(&old_uuid).expect("matched sheet exists in existing");
        let new_sheet = target.sheet(&new_uuid).expect("matched sheet exists in target");
        let (sheet_plan, warnings, port_ops) = diff_sheet(old_sheet, new_sheet, target);
        plan.warnings.extend(warnings);
        plan.sheet_ops.extend(port_ops);
        if !sheet_plan.is_empty() {
            plan.sheets.push(sheet_plan);
        }
    }

    plan
}

fn diff_new_sheet(sheet: &Sheet) -> SheetPlan {
    let mut sheet_plan = SheetPlan::new(sheet.filename.clone());
    sheet_plan.sheet_uuid = Some(sheet.uuid.clone());
    for component in &sheet.components {
        sheet_plan.components.push(ComponentOp::Insert(component.clone()));
    }
    for label in &sheet.labels {
        sheet_plan.labels.push(LabelOp::Insert(label.clone()));
    }
    for power in &sheet.power_symbols {
        sheet_plan.power_symbols.push(PowerSymbolOp::Insert(power.clone()));
    }
    for wire in &sheet.wires {
        sheet_plan.wires.push(WireOp::Insert(wire.clone()));
    }
    sheet_plan
}

fn diff_sheet(old: &Sheet, new: &Sheet, target: &Project) -> (SheetPlan, Vec<PlanWarning>, Vec<SheetOp>) {
    let mut sheet_plan = SheetPlan::new(new.filename.clone());
    sheet_plan.sheet_uuid = Some(new.uuid.clone());
    let mut warnings = Vec::new();
    let mut port_ops = Vec::new();

    let component_matching = match_components(&old.components, &new.components);

    for uuid in &component_matching.deleted {
        sheet_plan.components.push(ComponentOp::Remove(uuid.clone()));
    }
    for uuid in &component_matching.inserted {
        let component = new.component(uuid).expect("inserted component exists in target");
        sheet_plan.components.push(ComponentOp::Insert(component.clone()));
    }

    for m in &component_matching.matched {
        let old_c = old.component(&m.old_uuid).expect("matched component exists in existing");
        let new_c = new.component(&m.new_uuid).expect("matched component exists in target");

        if !matches!(m.kind, MatchKind::Uuid) {
            tracing::debug!(
                old = %m.old_uuid,
                new = %m.new_uuid,
                kind = ?m.kind,
                "component matched without a stable uuid"
            );
        }

        for key in old_c.properties.duplicated_properties() {
            warnings.push(PlanWarning::DuplicateProperty {
                reference: old_c.reference.to_string(),
                key: key.clone(),
            });
        }

        let resolved_placement = old_c.placement.or(new_c.placement);
        let fields = attribute_diff(old_c, new_c);
        let placement_changed = resolved_placement != new_c.placement;

        if !fields.is_empty() || placement_changed {
            sheet_plan.components.push(ComponentOp::UpdateAttributes {
                uuid: m.new_uuid.clone(),
                fields,
                placement: resolved_placement,
            });
        } else {
            sheet_plan.components.push(ComponentOp::Preserve(m.new_uuid.clone()));
        }

        let mut pin_numbers: Vec<&str> = old_c
            .pins
            .iter()
            .map(|p| p.pin_number.as_str())
            .chain(new_c.pins.iter().map(|p| p.pin_number.as_str()))
            .collect();
        pin_numbers.sort_unstable();
        pin_numbers.dedup();

        let mut lost_pins = Vec::new();
        for pin_number in pin_numbers {
            let old_net = old_c.pins.iter().find(|p| p.pin_number == pin_number).and_then(|p| p.net.as_deref());
            let new_net = new_c.pins.iter().find(|p| p.pin_number == pin_number).and_then(|p| p.net.as_deref());
            if old_net != new_net {
                if new_net.is_none() && new_c.pins.iter().all(|p| p.pin_number != pin_number) {
                    lost_pins.push(pin_number.to_string());
                }
                sheet_plan.components.push(ComponentOp::RelinkPin {
                    uuid: m.new_uuid.clone(),
                    pin_number: pin_number.to_string(),
                    new_net: new_net.map(|s| s.to_string()),
                });
            }
        }
        if !lost_pins.is_empty() {
            warnings.push(PlanWarning::PinCountChanged {
                reference: new_c.reference.to_string(),
                lost_pins,
            });
        }
    }

    let (label_matches, label_deleted, label_inserted) = match_labels(&old.labels, &new.labels);
    for uuid in label_deleted {
        sheet_plan.labels.push(LabelOp::Remove(uuid));
    }
    for uuid in &label_inserted {
        let label = new.labels.iter().find(|l| &l.uuid == uuid).expect("inserted label exists");
        if !label_is_live(target, new, label.kind, &label.text) {
            continue;
        }
        sheet_plan.labels.push(LabelOp::Insert(label.clone()));
    }
    for (old_uuid, new_uuid) in label_matches {
        let new_label = new.labels.iter().find(|l| l.uuid == new_uuid).expect("matched label exists");
        if !label_is_live(target, new, new_label.kind, &new_label.text) {
            sheet_plan.labels.push(LabelOp::Remove(old_uuid));
            continue;
        }
        let old_label = old.labels.iter().find(|l| l.uuid == old_uuid).expect("matched label exists");
        if old_label.position != new_label.position {
            sheet_plan.labels.push(LabelOp::Move {
                uuid: new_uuid,
                position: new_label.position,
            });
        }
    }

    let (_, power_deleted, power_inserted) =
        match_power_symbols(&old.power_symbols, &new.power_symbols);
    for uuid in power_deleted {
        sheet_plan.power_symbols.push(PowerSymbolOp::Remove(uuid));
    }
    for uuid in power_inserted {
        let power = new.power_symbols.iter().find(|p| p.uuid == uuid).expect("inserted power symbol exists");
        sheet_plan.power_symbols.push(PowerSymbolOp::Insert(power.clone()));
    }

    let (_, wire_deleted, wire_inserted) = match_wires(&old.wires, &new.wires);
    for uuid in wire_deleted {
        sheet_plan.wires.push(WireOp::Remove(uuid));
    }
    for uuid in wire_inserted {
        let wire = new.wires.iter().find(|w| w.uuid == uuid).expect("inserted wire exists");
        sheet_plan.wires.push(WireOp::Insert(wire.clone()));
    }

    let (port_matches, _, _) = match_ports(&old.ports, &new.ports);
    for (old_uuid, new_uuid) in port_matches {
        let old_port = old.ports.iter().find(|p| p.uuid == old_uuid).expect("matched port exists");
        let new_port = new.ports.iter().find(|p| p.uuid == new_uuid).expect("matched port exists");
        if old_port.name != new_port.name
            || old_port.electrical_type != new_port.electrical_type
            || old_port.position != new_port.position
        {
            port_ops.push(SheetOp::UpdatePort {
                sheet_uuid: new.uuid.clone(),
                port: new_port.clone(),
            });
        }
    }

    warnings.extend(ambiguous_net_merges(old, new, target));

    (sheet_plan, warnings, port_ops)
}

/// Flags a sheet where an edit left two or more *distinct* label instances
/// (different positions, not connected to each other directly) carrying the
/// same net name — spec §4.6's net-ambiguity warning. Only fires when the
/// edit actually grew the group, so a schematic that already had this shape
/// before the sync doesn't re-warn on every run.
fn ambiguous_net_merges(old: &Sheet, new: &Sheet, target: &Project) -> Vec<PlanWarning> {
    fn live_groups(
        project: &Project,
        sheet: &Sheet,
        labels: &[circuit_model::Label],
        filter_live: bool,
    ) -> Vec<(LabelKind, String, Vec<String>)> {
        let mut groups: Vec<(LabelKind, String, Vec<String>)> = Vec::new();
        for label in labels {
            if !matches!(label.kind, LabelKind::Local | LabelKind::Global) {
                continue;
            }
            if filter_live && !label_is_live(project, sheet, label.kind, &label.text) {
                continue;
            }
            match groups
                .iter_mut()
                .find(|(kind, text, _)| *kind == label.kind && text == &label.text)
            {
                Some((_, _, members)) => members.push(label.uuid.to_string()),
                None => groups.push((label.kind, label.text.clone(), vec![label.uuid.to_string()])),
            }
        }
        groups
    }

    let old_groups = live_groups(target, old, &old.labels, false);
    let new_groups = live_groups(target, new, &new.labels, true);

    let mut warnings = Vec::new();
    for (kind, text, members) in &new_groups {
        if members.len() < 2 {
            continue;
        }
        let old_count = old_groups
            .iter()
            .find(|(k, t, _)| k == kind && t == text)
            .map(|(_, _, m)| m.len())
            .unwrap_or(0);
        if members.len() > old_count {
            warnings.push(PlanWarning::AmbiguousNetMerge {
                net: text.clone(),
                candidates: members.clone(),
            });
        }
    }
    warnings
}

fn attribute_diff(old_c: &Component, new_c: &Component) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    if old_c.reference != new_c.reference {
        fields.insert("reference".to_string(), new_c.reference.to_string());
    }
    if old_c.value != new_c.value {
        fields.insert("value".to_string(), new_c.value.clone());
    }
    if old_c.footprint != new_c.footprint {
        fields.insert("footprint".to_string(), new_c.footprint.clone());
    }
    if old_c.lib_id != new_c.lib_id {
        fields.insert("lib_id".to_string(), new_c.lib_id.clone());
    }
    if old_c.properties.dnp != new_c.properties.dnp {
        fields.insert("dnp".to_string(), new_c.properties.dnp.to_string());
    }
    if old_c.properties.datasheet != new_c.properties.datasheet {
        fields.insert(
            "datasheet".to_string(),
            new_c.properties.datasheet.clone().unwrap_or_default(),
        );
    }
    for (key, value) in new_c.properties.other_in_order() {
        if old_c.properties.get_other(key) != Some(value.as_str()) {
            fields.insert(key.clone(), value.clone());
        }
    }
    fields
}

/// A label is live only if the net it names still has a real member
/// somewhere in `project` (spec §9's hierarchical-removal cascade,
/// generalised to every label kind): a bare label can't keep a net alive,
/// so once its last connected pin is gone the label must go with it.
fn label_is_live(project: &Project, sheet: &Sheet, kind: LabelKind, text: &str) -> bool {
    let net_exists = |key: &str| {
        project
            .net_index()
            .get(key)
            .map(|net| !net.members.is_empty())
            .unwrap_or(false)
    };
    match kind {
        LabelKind::Hierarchical => true,
        LabelKind::Global => net_exists(text),
        LabelKind::Local => {
            let key = format!("{}::{}", sheet.uuid.as_str(), text);
            net_exists(&key) || net_exists(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_model::{
        Component, ElectricalType, HierarchicalPort, PinConnection, PowerSymbol, Reference, Sheet,
        Uuid,
    };

    fn resistor(uuid: &str, reference: &str, value: &str) -> Component {
        let mut c = Component::new(Uuid::new(uuid), Reference::new(reference), "Device:R", value);
        c.connect(PinConnection::new("1", "VCC"));
        c.connect(PinConnection::new("2", "GND"));
        c
    }

    fn project_with(components: Vec<Component>) -> Project {
        let mut root = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        root.components = components;
        let mut project = Project::new("demo", root);
        project.reindex();
        project
    }

    #[test]
    fn identical_projects_produce_a_noop_plan() {
        let existing = project_with(vec![resistor("r1", "R1", "10k")]);
        let target = project_with(vec![resistor("r1", "R1", "10k")]);
        let plan = diff(&existing, &target);
        assert!(plan.is_noop(), "{plan:?}");
    }

    #[test]
    fn value_change_produces_a_single_attribute_update() {
        let existing = project_with(vec![resistor("r1", "R1", "10k")]);
        let target = project_with(vec![resistor("r1", "R1", "47k")]);
        let plan = diff(&existing, &target);
        assert!(!plan.is_noop());
        let sheet_plan = &plan.sheets[0];
        assert_eq!(sheet_plan.components.len(), 1);
        match &sheet_plan.components[0] {
            ComponentOp::UpdateAttributes { fields, .. } => {
                assert_eq!(fields.get("value").map(String::as_str), Some("47k"));
                assert!(!fields.contains_key("reference"));
            }
            other => panic!("expected an attribute update, got {other:?}"),
        }
    }

    #[test]
    fn rename_is_carried_as_a_reference_attribute_update_with_no_movement() {
        let existing = project_with(vec![resistor("r1", "R1", "10k")]);
        let target = project_with(vec![resistor("r1", "R_PULLUP", "10k")]);
        let plan = diff(&existing, &target);
        let sheet_plan = &plan.sheets[0];
        match &sheet_plan.components[0] {
            ComponentOp::UpdateAttributes { uuid, fields, placement } => {
                assert_eq!(uuid, &Uuid::new("r1"));
                assert_eq!(fields.get("reference").map(String::as_str), Some("R_PULLUP"));
                assert!(placement.is_none());
            }
            other => panic!("expected an attribute update, got {other:?}"),
        }
    }

    #[test]
    fn deleting_a_component_garbage_collects_its_global_label() {
        let mut existing_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        existing_sheet.components = vec![resistor("r1", "R1", "10k")];
        existing_sheet.labels.push(circuit_model::Label::new(
            Uuid::new("lbl"),
            LabelKind::Global,
            "VCC",
            (10.0, 10.0),
        ));
        let mut existing = Project::new("demo", existing_sheet);
        existing.reindex();

        // Target keeps R1 but disconnects it from VCC entirely.
        let mut target_r1 = Component::new(Uuid::new("r1"), Reference::new("R1"), "Device:R", "10k");
        target_r1.connect(PinConnection::unconnected("1"));
        target_r1.connect(PinConnection::unconnected("2"));
        let mut target_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        target_sheet.components = vec![target_r1];
        target_sheet.labels.push(circuit_model::Label::new(
            Uuid::new("lbl"),
            LabelKind::Global,
            "VCC",
            (10.0, 10.0),
        ));
        let mut target = Project::new("demo", target_sheet);
        target.reindex();

        let plan = diff(&existing, &target);
        let sheet_plan = &plan.sheets[0];
        assert!(sheet_plan
            .labels
            .iter()
            .any(|op| matches!(op, LabelOp::Remove(uuid) if uuid.as_str() == "lbl")));
    }

    #[test]
    fn duplicate_property_on_existing_side_surfaces_a_plan_warning() {
        let mut old_r1 = resistor("r1", "R1", "10k");
        old_r1.properties.mark_duplicated("MPN");
        let existing = project_with(vec![old_r1]);
        let target = project_with(vec![resistor("r1", "R1", "10k")]);
        let plan = diff(&existing, &target);
        assert!(plan.warnings.iter().any(|w| matches!(
            w,
            PlanWarning::DuplicateProperty { reference, key } if reference == "R1" && key == "MPN"
        )));
    }

    #[test]
    fn power_symbol_insertion_and_removal_are_matched_by_position_and_net() {
        let mut existing_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        existing_sheet.power_symbols.push(PowerSymbol {
            uuid: Uuid::new("pwr1"),
            reference: "#PWR01".to_string(),
            net_name: "GND".to_string(),
            position: (5.0, 5.0),
        });
        let existing = Project::new("demo", existing_sheet);

        let mut target_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        target_sheet.power_symbols.push(PowerSymbol {
            uuid: Uuid::new("pwr1"),
            reference: "#PWR01".to_string(),
            net_name: "GND".to_string(),
            position: (5.0, 5.0),
        });
        target_sheet.power_symbols.push(PowerSymbol {
            uuid: Uuid::new("pwr2"),
            reference: "#PWR02".to_string(),
            net_name: "VCC".to_string(),
            position: (15.0, 5.0),
        });
        let target = Project::new("demo", target_sheet);

        let plan = diff(&existing, &target);
        let sheet_plan = &plan.sheets[0];
        assert_eq!(sheet_plan.power_symbols.len(), 1);
        assert!(matches!(&sheet_plan.power_symbols[0], PowerSymbolOp::Insert(p) if p.reference == "#PWR02"));
    }

    #[test]
    fn matched_port_with_changed_electrical_type_emits_update_port() {
        let mut existing_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        existing_sheet.ports.push(HierarchicalPort {
            uuid: Uuid::new("port1"),
            name: "DATA".to_string(),
            electrical_type: ElectricalType::Input,
            position: (0.0, 0.0),
        });
        let existing = Project::new("demo", existing_sheet);

        let mut target_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        target_sheet.ports.push(HierarchicalPort {
            uuid: Uuid::new("port1"),
            name: "DATA".to_string(),
            electrical_type: ElectricalType::Bidirectional,
            position: (0.0, 0.0),
        });
        let target = Project::new("demo", target_sheet);

        let plan = diff(&existing, &target);
        assert!(plan.sheet_ops.iter().any(|op| matches!(
            op,
            SheetOp::UpdatePort { port, .. } if port.electrical_type == ElectricalType::Bidirectional
        )));
    }

    #[test]
    fn unchanged_port_produces_no_update_op() {
        let mut existing_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        existing_sheet.ports.push(HierarchicalPort {
            uuid: Uuid::new("port1"),
            name: "DATA".to_string(),
            electrical_type: ElectricalType::Input,
            position: (0.0, 0.0),
        });
        let existing = Project::new("demo", existing_sheet);

        let mut target_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        target_sheet.ports.push(HierarchicalPort {
            uuid: Uuid::new("port1"),
            name: "DATA".to_string(),
            electrical_type: ElectricalType::Input,
            position: (0.0, 0.0),
        });
        let target = Project::new("demo", target_sheet);

        let plan = diff(&existing, &target);
        assert!(plan.sheet_ops.is_empty());
    }

    #[test]
    fn duplicate_global_labels_after_edit_warn_about_net_ambiguity() {
        let mut existing_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        existing_sheet.components = vec![resistor("r1", "R1", "10k")];
        existing_sheet.labels.push(circuit_model::Label::new(
            Uuid::new("lbl1"),
            LabelKind::Global,
            "VCC",
            (1.0, 1.0),
        ));
        let mut existing = Project::new("demo", existing_sheet);
        existing.reindex();

        let mut target_sheet = Sheet::new(Uuid::new("root"), "root.kicad_sch", "root");
        target_sheet.components = vec![resistor("r1", "R1", "10k")];
        target_sheet.labels.push(circuit_model::Label::new(
            Uuid::new("lbl1"),
            LabelKind::Global,
            "VCC",
            (1.0, 1.0),
        ));
        // A second label naming the same net, added somewhere else on the
        // sheet by this edit — ambiguous which group a reader should treat
        // as authoritative.
        target_sheet.labels.push(circuit_model::Label::new(
            Uuid::new("lbl2"),
            LabelKind::Global,
            "VCC",
            (5.0, 5.0),
        ));
        let mut target = Project::new("demo", target_sheet);
        target.reindex();

        let plan = diff(&existing, &target);
        assert!(plan.warnings.iter().any(|w| matches!(
            w,
            PlanWarning::AmbiguousNetMerge { net, candidates }
                if net == "VCC" && candidates.len() == 2
        )));
    }
}
