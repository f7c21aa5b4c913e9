//! Lifts a parsed `.kicad_sch` tree into a `circuit_model::Sheet`/`Project`,
//! recursively following child sheet files. Recognises the tokens listed in
//! spec §4.4 structurally; everything else is left untouched in the
//! `PreservedTree` and never interpreted.
//!
//! Net membership is recovered from the `(net "NAME")` child this
//! implementation writes under each `(pin "N" ...)` usage, not from wire
//! endpoint geometry: spec §4.3 derives nets primarily from "the net name
//! assigned at construction time", and wires are explicitly "optional
//! detail" layered on top. Wires still round-trip losslessly; they just
//! don't independently drive the connectivity graph.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sexpr_codec::ListNode;

use circuit_model::{
    Component, HierarchicalPort, Justify, Label, LabelKind, Mirror, Placement, PinConnection,
    PortBinding, PowerSymbol, Project, Reference, Rotation, Sheet, SheetInstance, Uuid, Wire,
};
use symbol_library::{ElectricalType, SymbolLibrary};

use crate::error::{KicadIoError, Result};
use crate::preserved::PreservedTree;

/// Top-level tokens this reader interprets structurally; passed to
/// `PreservedTree::unrecognized` so callers can inspect what was preserved
/// verbatim without being parsed.
pub const RECOGNIZED_TOKENS: &[&str] = &[
    "symbol",
    "wire",
    "label",
    "global_label",
    "hierarchical_label",
    "sheet",
    "sheet_instances",
    "version",
    "generator",
    "uuid",
    "paper",
    "title_block",
];

pub struct LoadedSheet {
    pub sheet: Sheet,
    pub preserved: PreservedTree,
    pub bindings: Vec<(Uuid, PortBinding)>,
}

/// Read one `.kicad_sch` file (and, transitively, every child sheet file it
/// references) into a full `Project`. Discards each sheet's preserved tree;
/// use [`load_project_with_preserved`] when the caller (the synchronizer)
/// needs to reuse untouched bytes on a subsequent write.
pub fn load_project(dir: &Path, root_filename: &str, symbols: &SymbolLibrary) -> Result<Project> {
    Ok(load_project_with_preserved(dir, root_filename, symbols)?.0)
}

/// Same as [`load_project`], but also returns each loaded sheet's
/// [`PreservedTree`], keyed by filename, so the synchronizer can emit
/// byte-identical output for everything an edit plan left untouched.
pub fn load_project_with_preserved(
    dir: &Path,
    root_filename: &str,
    symbols: &SymbolLibrary,
) -> Result<(Project, HashMap<String, PreservedTree>)> {
    let mut loaded: HashMap<String, LoadedSheet> = HashMap::new();
    load_sheet_recursive(dir, root_filename, symbols, &mut loaded)?;

    let mut preserved: HashMap<String, PreservedTree> = loaded
        .iter()
        .map(|(filename, sheet)| (filename.clone(), sheet.preserved.clone()))
        .collect();

    let root_loaded = loaded
        .remove(root_filename)
        .ok_or_else(|| KicadIoError::malformed(root_filename, "root sheet failed to load"))?;
    let title = root_loaded.sheet.name.clone();
    let root_instances = root_loaded.sheet.child_instances.clone();
    let root_uuid = root_loaded.sheet.uuid.clone();
    let root_filename_owned = root_loaded.sheet.filename.clone();

    let mut project = Project::new(title, root_loaded.sheet);

    // Breadth-first walk over child_instances, adding each child sheet once
    // its parent already exists in the project.
    let mut frontier: Vec<(Uuid, SheetInstance)> = root_instances
        .into_iter()
        .map(|inst| (root_uuid.clone(), inst))
        .collect();
    let mut pending_bindings: Vec<(String, Vec<(Uuid, PortBinding)>)> =
        vec![(root_filename_owned, root_loaded.bindings)];

    while let Some((parent_uuid, instance)) = frontier.pop() {
        let filename = find_filename_for_sheet(&loaded, &instance.sheet_uuid);
        let Some(filename) = filename else { continue };
        let Some(child) = loaded.remove(&filename) else { continue };

        frontier.extend(
            child
                .sheet
                .child_instances
                .iter()
                .cloned()
                .map(|inst| (child.sheet.uuid.clone(), inst)),
        );
        pending_bindings.push((filename, child.bindings.clone()));

        project
            .add_sheet(&parent_uuid, child.sheet, instance)
            .map_err(KicadIoError::Model)?;
    }

    for (filename, bindings) in pending_bindings {
        let parent_uuid = if filename == root_filename {
            project.root_sheet().uuid.clone()
        } else {
            match project
                .sheets
                .iter()
                .find(|s| s.filename == filename)
                .map(|s| s.uuid.clone())
            {
                Some(uuid) => uuid,
                None => continue,
            }
        };
        for (instance_uuid, binding) in bindings {
            project.bind_hierarchical_port(&parent_uuid, &instance_uuid, binding);
        }
    }

    preserved.retain(|filename, _| project.sheets.iter().any(|s| &s.filename == filename));
    Ok((project, preserved))
}

fn find_filename_for_sheet(loaded: &HashMap<String, LoadedSheet>, sheet_uuid: &Uuid) -> Option<String> {
    loaded
        .iter()
        .find(|(_, s)| &s.sheet.uuid == sheet_uuid)
        .map(|(filename, _)| filename.clone())
}

fn load_sheet_recursive(
    dir: &Path,
    filename: &str,
    symbols: &SymbolLibrary,
    loaded: &mut HashMap<String, LoadedSheet>,
) -> Result<()> {
    if loaded.contains_key(filename) {
        return Ok(());
    }
    let path = dir.join(filename);
    let source = std::fs::read_to_string(&path)
        .map_err(|e| KicadIoError::io(path.display().to_string(), e))?;
    let tree = sexpr_codec::parse(&source).map_err(|source| KicadIoError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let root_list = tree
        .root
        .as_list()
        .ok_or_else(|| KicadIoError::malformed(filename, "root is not a list"))?;

    let sheet_uuid = root_list
        .field("uuid")
        .and_then(|l| l.atom(1))
        .map(|a| Uuid::new(a.as_str()))
        .unwrap_or_else(Uuid::generate);

    let mut sheet = Sheet::new(sheet_uuid, filename, sheet_display_name(filename));

    for symbol in root_list.fields("symbol") {
        load_symbol(symbol, symbols, &mut sheet)?;
    }
    for wire in root_list.fields("wire") {
        sheet.wires.push(load_wire(wire));
    }
    for label in root_list.fields("label") {
        sheet.labels.push(load_label(label, LabelKind::Local));
    }
    for label in root_list.fields("global_label") {
        sheet.labels.push(load_label(label, LabelKind::Global));
    }
    for label in root_list.fields("hierarchical_label") {
        sheet.labels.push(load_label(label, LabelKind::Hierarchical));
        sheet.ports.push(load_port(label));
    }

    let mut child_paths: Vec<(SheetInstance, String, Vec<(Uuid, PortBinding)>)> = Vec::new();
    for sheet_node in root_list.fields("sheet") {
        let (instance, child_filename, bindings) = load_sheet_instance(sheet_node)?;
        child_paths.push((instance, child_filename, bindings));
    }

    let preserved = PreservedTree::new(tree);
    let mut pending_bindings = Vec::new();

    loaded.insert(
        filename.to_string(),
        LoadedSheet {
            sheet,
            preserved,
            bindings: Vec::new(),
        },
    );

    for (instance, child_filename, bindings) in child_paths {
        load_sheet_recursive(dir, &child_filename, symbols, loaded)?;
        if let Some(child) = loaded.get(&child_filename) {
            let child_uuid = child.sheet.uuid.clone();
            let mut instance = instance;
            instance.sheet_uuid = child_uuid;
            pending_bindings.push((filename.to_string(), instance, bindings));
        }
    }

    if let Some(entry) = loaded.get_mut(filename) {
        for (_, instance, bindings) in &pending_bindings {
            entry.sheet.child_instances.push(instance.clone());
            entry
                .bindings
                .extend(bindings.iter().map(|(uuid, b)| (uuid.clone(), b.clone())));
        }
    }

    Ok(())
}

fn sheet_display_name(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string())
}

fn load_symbol(node: &ListNode, symbols: &SymbolLibrary, sheet: &mut Sheet) -> Result<()> {
    let lib_id = node
        .field("lib_id")
        .and_then(|l| l.atom(1))
        .map(|a| a.as_str().to_string())
        .ok_or_else(|| KicadIoError::malformed(&sheet.filename, "symbol missing lib_id"))?;

    let uuid = node
        .field("uuid")
        .and_then(|l| l.atom(1))
        .map(|a| Uuid::new(a.as_str()))
        .unwrap_or_else(Uuid::generate);

    let reference = node
        .fields("property")
        .find(|p| p.atom(1).map(|a| a.as_str() == "Reference").unwrap_or(false))
        .and_then(|p| p.atom(2))
        .map(|a| a.as_str().to_string())
        .unwrap_or_default();

    let value = node
        .fields("property")
        .find(|p| p.atom(1).map(|a| a.as_str() == "Value").unwrap_or(false))
        .and_then(|p| p.atom(2))
        .map(|a| a.as_str().to_string())
        .unwrap_or_default();

    let placement = node.field("at").map(|at| {
        let x = at.atom(1).and_then(|a| a.as_f64()).unwrap_or(0.0);
        let y = at.atom(2).and_then(|a| a.as_f64()).unwrap_or(0.0);
        let deg = at.atom(3).and_then(|a| a.as_f64()).unwrap_or(0.0);
        Placement {
            x,
            y,
            rotation: Rotation::from_degrees(deg).unwrap_or(Rotation::R0),
            mirror: node
                .field("mirror")
                .and_then(|m| m.atom(1))
                .map(|a| match a.as_str() {
                    "x" => Mirror::X,
                    "y" => Mirror::Y,
                    _ => Mirror::None,
                })
                .unwrap_or(Mirror::None),
            unit: node
                .field("unit")
                .and_then(|u| u.atom(1))
                .and_then(|a| a.as_i64())
                .map(|v| v as u32)
                .unwrap_or(1),
        }
    });

    if reference.starts_with("#PWR") {
        sheet.power_symbols.push(PowerSymbol {
            uuid,
            reference,
            net_name: value,
            position: placement.map(|p| (p.x, p.y)).unwrap_or((0.0, 0.0)),
        });
        return Ok(());
    }

    let mut component = Component::new(uuid, Reference::new(reference), lib_id.clone(), value);
    component.placement = placement;
    component.properties.dnp = node
        .field("dnp")
        .and_then(|d| d.atom(1))
        .and_then(|a| a.as_bool())
        .unwrap_or(false);

    if let Some(footprint) = node
        .fields("property")
        .find(|p| p.atom(1).map(|a| a.as_str() == "Footprint").unwrap_or(false))
        .and_then(|p| p.atom(2))
    {
        component.footprint = footprint.as_str().to_string();
    }
    if let Some(datasheet) = node
        .fields("property")
        .find(|p| p.atom(1).map(|a| a.as_str() == "Datasheet").unwrap_or(false))
        .and_then(|p| p.atom(2))
    {
        component.properties.datasheet = Some(datasheet.as_str().to_string());
    }
    // spec §9 open question: duplicate `(property ...)` entries for the same
    // name are preserved here (the later one wins, matching a plain
    // left-to-right fold) but flagged so the synchronizer can warn instead
    // of silently collapsing them.
    let mut seen_names: Vec<&str> = Vec::new();
    for prop in node.fields("property") {
        let Some(name) = prop.atom(1).map(|a| a.as_str()) else { continue };
        if seen_names.contains(&name) {
            component.properties.mark_duplicated(name);
        } else {
            seen_names.push(name);
        }
        if matches!(name, "Reference" | "Value" | "Footprint" | "Datasheet") {
            continue;
        }
        if let Some(val) = prop.atom(2) {
            component.properties.set_other(name, val.as_str());
        }
    }

    for pin in node.fields("pin") {
        let Some(number) = pin.atom(1).map(|a| a.as_str().to_string()) else { continue };
        match pin.field("net").and_then(|n| n.atom(1)) {
            Some(net) => component.connect(PinConnection::new(number, net.as_str())),
            None => component.connect(PinConnection::unconnected(number)),
        }
    }

    let _ = symbols;
    sheet.components.push(component);
    Ok(())
}

fn load_wire(node: &ListNode) -> Wire {
    let uuid = node
        .field("uuid")
        .and_then(|l| l.atom(1))
        .map(|a| Uuid::new(a.as_str()))
        .unwrap_or_else(Uuid::generate);
    let points = node
        .field("pts")
        .map(|pts| {
            pts.fields("xy")
                .map(|xy| {
                    let x = xy.atom(1).and_then(|a| a.as_f64()).unwrap_or(0.0);
                    let y = xy.atom(2).and_then(|a| a.as_f64()).unwrap_or(0.0);
                    (x, y)
                })
                .collect()
        })
        .unwrap_or_default();
    Wire { uuid, points }
}

fn load_label(node: &ListNode, kind: LabelKind) -> Label {
    let uuid = node
        .field("uuid")
        .and_then(|l| l.atom(1))
        .map(|a| Uuid::new(a.as_str()))
        .unwrap_or_else(Uuid::generate);
    let text = node.atom(1).map(|a| a.as_str().to_string()).unwrap_or_default();
    let (x, y) = node
        .field("at")
        .map(|at| {
            let x = at.atom(1).and_then(|a| a.as_f64()).unwrap_or(0.0);
            let y = at.atom(2).and_then(|a| a.as_f64()).unwrap_or(0.0);
            (x, y)
        })
        .unwrap_or((0.0, 0.0));
    let mut label = Label::new(uuid, kind, text, (x, y));
    label.justify = node
        .field("effects")
        .and_then(|e| e.field("justify"))
        .and_then(|j| j.atom(1))
        .map(|a| match a.as_str() {
            "left" => Justify::Left,
            "right" => Justify::Right,
            _ => Justify::Center,
        });
    label
}

fn load_port(node: &ListNode) -> HierarchicalPort {
    let uuid = node
        .field("uuid")
        .and_then(|l| l.atom(1))
        .map(|a| Uuid::new(a.as_str()))
        .unwrap_or_else(Uuid::generate);
    let name = node.atom(1).map(|a| a.as_str().to_string()).unwrap_or_default();
    let electrical_type = node
        .atom(2)
        .map(|a| ElectricalType::from_kicad_str(a.as_str()))
        .unwrap_or(ElectricalType::Unspecified);
    let position = node
        .field("at")
        .map(|at| {
            let x = at.atom(1).and_then(|a| a.as_f64()).unwrap_or(0.0);
            let y = at.atom(2).and_then(|a| a.as_f64()).unwrap_or(0.0);
            (x, y)
        })
        .unwrap_or((0.0, 0.0));
    HierarchicalPort {
        uuid,
        name,
        electrical_type,
        position,
    }
}

/// Returns the sheet instance stub (sheet_uuid left blank, filled in by the
/// caller once the child is loaded), the child's filename, and the explicit
/// `(pin "NAME" (net_label_uuid "..."))` bindings recorded on the sheet
/// symbol, if any.
fn load_sheet_instance(node: &ListNode) -> Result<(SheetInstance, String, Vec<(Uuid, PortBinding)>)> {
    let uuid = node
        .field("uuid")
        .and_then(|l| l.atom(1))
        .map(|a| Uuid::new(a.as_str()))
        .unwrap_or_else(Uuid::generate);
    let filename = node
        .fields("property")
        .find(|p| p.atom(1).map(|a| a.as_str() == "Sheetfile").unwrap_or(false))
        .and_then(|p| p.atom(2))
        .map(|a| a.as_str().to_string())
        .ok_or_else(|| KicadIoError::malformed("sheet", "missing Sheetfile property"))?;
    let position = node
        .field("at")
        .map(|at| {
            let x = at.atom(1).and_then(|a| a.as_f64()).unwrap_or(0.0);
            let y = at.atom(2).and_then(|a| a.as_f64()).unwrap_or(0.0);
            (x, y)
        })
        .unwrap_or((0.0, 0.0));

    let mut bindings = Vec::new();
    for pin in node.fields("pin") {
        let Some(port_name) = pin.atom(1).map(|a| a.as_str().to_string()) else { continue };
        let parent_label_uuid = pin
            .field("net_label_uuid")
            .and_then(|l| l.atom(1))
            .map(|a| Uuid::new(a.as_str()));
        bindings.push((
            uuid.clone(),
            PortBinding {
                port_name,
                parent_label_uuid,
            },
        ));
    }

    let instance = SheetInstance {
        uuid,
        sheet_uuid: Uuid::new(""),
        path: String::new(),
        position,
    };
    Ok((instance, filename, bindings))
}

pub fn default_search_paths(dir: &Path) -> Vec<PathBuf> {
    vec![dir.to_path_buf()]
}
