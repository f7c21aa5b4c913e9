//! Canonical in-memory representation of a KiCad schematic hierarchy:
//! `Project` owns a tree of `Sheet`s, each holding `Component`s, `Label`s,
//! power symbols, and wires. Nets are never stored directly — they are
//! derived by [`Project::reindex`] from pin connections and label text, so
//! the model can never drift out of sync with its own connectivity.

mod component;
mod errors;
mod identity;
mod label;
mod net;
mod pin;
mod project;
mod sheet;
mod warning;

pub use component::{Component, Mirror, Placement, PropertyBag, Rotation};
pub use errors::{CircuitModelError, Result};
pub use identity::{Fingerprint, Reference, Uuid};
pub use label::{Justify, Label, LabelKind, PowerSymbol, Wire};
pub use net::{anonymous_net_name, Net, NetIndex, NetScope, PinRef};
pub use pin::{ElectricalType, PinConnection};
pub use project::{PortBinding, Project, ProjectMetadata};
pub use sheet::{HierarchicalPort, Sheet, SheetInstance};
pub use warning::Warning;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use symbol_library::{LibraryCache, SymbolLibrary};

    fn device_lib(dir: &std::path::Path) {
        let path = dir.join("Device.kicad_sym");
        let mut f = std::fs::File::create(path).unwrap();
        write!(
            f,
            r#"(kicad_symbol_lib (version 20231120) (generator kicad)
  (symbol "R"
    (property "Footprint" "Resistor_SMD:R_0603")
    (symbol "R_0_1"
      (pin passive line (at 0 3.81 270) (length 1.27) (name "~") (number "1"))
      (pin passive line (at 0 -3.81 90) (length 1.27) (name "~") (number "2"))
    )
  )
)
"#
        )
        .unwrap();
    }

    fn make_project() -> (Project, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        device_lib(dir.path());
        let root = Sheet::new(Uuid::generate(), "root.kicad_sch", "root");
        (Project::new("Demo", root), dir)
    }

    #[test]
    fn connecting_two_pins_by_name_produces_one_net() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);

        let root_uuid = project.root_sheet().uuid.clone();
        let r1 = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "10k");
        let r2 = Component::new(Uuid::generate(), Reference::new("R2"), "Device:R", "4k7");
        let r1_uuid = r1.uuid.clone();
        let r2_uuid = r2.uuid.clone();
        project.add_component(&root_uuid, r1, &symbols).unwrap();
        project.add_component(&root_uuid, r2, &symbols).unwrap();

        project.connect_named(&root_uuid, &r1_uuid, "2", "VCC").unwrap();
        project.connect_named(&root_uuid, &r2_uuid, "1", "VCC").unwrap();

        let net = project.net_index().get("VCC").expect("net exists");
        assert_eq!(net.members.len(), 2);
    }

    #[test]
    fn duplicate_reference_is_rejected() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);
        let root_uuid = project.root_sheet().uuid.clone();

        let r1 = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "10k");
        project.add_component(&root_uuid, r1, &symbols).unwrap();

        let r1_again = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "4k7");
        let err = project.add_component(&root_uuid, r1_again, &symbols).unwrap_err();
        assert!(matches!(err, CircuitModelError::ReferenceConflict { .. }));
    }

    #[test]
    fn unknown_pin_is_rejected_at_connect_time() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);
        let root_uuid = project.root_sheet().uuid.clone();

        let r1 = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "10k");
        let err = project
            .add_component(
                &root_uuid,
                {
                    let mut r1 = r1;
                    r1.connect(PinConnection::new("99", "VCC"));
                    r1
                },
                &symbols,
            )
            .unwrap_err();
        assert!(matches!(err, CircuitModelError::UnknownPin { .. }));
    }

    #[test]
    fn global_label_merges_nets_across_sheets() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);
        let root_uuid = project.root_sheet().uuid.clone();

        let child = Sheet::new(Uuid::generate(), "child.kicad_sch", "child");
        let child_uuid = child.uuid.clone();
        let instance = SheetInstance {
            uuid: Uuid::generate(),
            sheet_uuid: child_uuid.clone(),
            path: "/child/".to_string(),
            position: (0.0, 0.0),
        };
        project.add_sheet(&root_uuid, child, instance).unwrap();

        let r1 = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "10k");
        let r1_uuid = r1.uuid.clone();
        project.add_component(&root_uuid, r1, &symbols).unwrap();
        project.connect_named(&root_uuid, &r1_uuid, "1", "VCC").unwrap();
        project
            .add_label(
                &root_uuid,
                Label::new(Uuid::generate(), LabelKind::Global, "VCC", (10.0, 10.0)),
            )
            .unwrap();

        let r2 = Component::new(Uuid::generate(), Reference::new("R2"), "Device:R", "4k7");
        let r2_uuid = r2.uuid.clone();
        project.add_component(&child_uuid, r2, &symbols).unwrap();
        project.connect_named(&child_uuid, &r2_uuid, "2", "VCC").unwrap();
        project
            .add_label(
                &child_uuid,
                Label::new(Uuid::generate(), LabelKind::Global, "VCC", (5.0, 5.0)),
            )
            .unwrap();

        let net = project.net_index().get("VCC").expect("merged global net");
        assert_eq!(net.scope, NetScope::Global);
        assert_eq!(net.members.len(), 2);
    }

    #[test]
    fn unplaced_component_produces_origin_warning() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);
        let root_uuid = project.root_sheet().uuid.clone();

        let r1 = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "10k");
        project.add_component(&root_uuid, r1, &symbols).unwrap();

        let warnings = project.validate(&symbols);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::ComponentAtOrigin { reference } if reference == "R1")));
    }

    #[test]
    fn unmatched_hierarchical_port_is_warned_not_fatal() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);
        let root_uuid = project.root_sheet().uuid.clone();

        let mut child = Sheet::new(Uuid::generate(), "child.kicad_sch", "child");
        child.ports.push(HierarchicalPort {
            uuid: Uuid::generate(),
            name: "DATA".to_string(),
            electrical_type: ElectricalType::Bidirectional,
            position: (0.0, 0.0),
        });
        let child_uuid = child.uuid.clone();
        let instance = SheetInstance {
            uuid: Uuid::generate(),
            sheet_uuid: child_uuid,
            path: "/child/".to_string(),
            position: (0.0, 0.0),
        };
        project.add_sheet(&root_uuid, child, instance).unwrap();

        let warnings = project.validate(&symbols);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::UnmatchedHierarchicalPort { .. })));
    }

    #[test]
    fn duplicate_reference_is_flagged_even_without_going_through_add_component() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);

        // `add_component` itself rejects a duplicate reference; this
        // exercises the path a hand-edited or externally-written schematic
        // takes, where two components land on the same sheet list with no
        // such check in between (see `kicad_io::reader::load_symbol`).
        let mut r1 = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "10k");
        r1.placement = Some(Placement::at(1.0, 1.0));
        let mut r1_dup = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "4k7");
        r1_dup.placement = Some(Placement::at(2.0, 2.0));
        project.root_sheet_mut().components.push(r1);
        project.root_sheet_mut().components.push(r1_dup);
        project.reindex();

        let warnings = project.validate(&symbols);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::DuplicateReference { reference } if reference == "R1")));
    }

    #[test]
    fn pin_not_declared_on_symbol_is_flagged() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);

        let mut r1 = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "10k");
        r1.placement = Some(Placement::at(1.0, 1.0));
        r1.connect(PinConnection::new("1", "VCC"));
        r1.connect(PinConnection::new("2", "GND"));
        // "Device:R" only declares pins 1 and 2; this one doesn't exist.
        r1.connect(PinConnection::new("3", "EXTRA"));
        project.root_sheet_mut().components.push(r1);
        project.reindex();

        let warnings = project.validate(&symbols);
        assert!(warnings.iter().any(
            |w| matches!(w, Warning::PinNotInSymbol { pin_number, .. } if pin_number == "3")
        ));
    }

    #[test]
    fn pin_missing_from_component_is_reported_as_uncovered() {
        let (mut project, dir) = make_project();
        let cache = LibraryCache::new();
        let paths = vec![dir.path().to_path_buf()];
        let symbols = SymbolLibrary::new(&paths, &cache);

        let mut r1 = Component::new(Uuid::generate(), Reference::new("R1"), "Device:R", "10k");
        r1.placement = Some(Placement::at(1.0, 1.0));
        r1.connect(PinConnection::new("1", "VCC"));
        // pin "2" never shows up at all, connected or unconnected.
        project.root_sheet_mut().components.push(r1);
        project.reindex();

        let warnings = project.validate(&symbols);
        assert!(warnings.iter().any(
            |w| matches!(w, Warning::UncoveredPin { pin_number, .. } if pin_number == "2")
        ));
    }
}
