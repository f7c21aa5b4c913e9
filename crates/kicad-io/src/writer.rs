//! Projects model entities back into fresh S-expression nodes (spec §4.5).
//!
//! Each `render_*` function here always produces a *fresh* node (`span:
//! None`); deciding whether an entity should instead be emitted by copying an
//! untouched `PreservedTree` subtree is the synchronizer's job; it calls
//! these functions only for entities it has decided need re-rendering and
//! assembles the final per-sheet tree itself. `render_project_fresh` is the
//! simple case used by `generate()`, where there is no preserved tree at all.

use sexpr_codec::{Atom, ListNode, Node, Tree};

use circuit_model::{
    Component, HierarchicalPort, Justify, Label, LabelKind, Mirror, PortBinding, PowerSymbol,
    Project, Rotation, Sheet, SheetInstance, Wire,
};

pub fn render_project_fresh(project: &Project, kicad_version: &str) -> Vec<(String, Tree)> {
    project
        .sheets
        .iter()
        .map(|sheet| (sheet.filename.clone(), render_sheet_fresh(project, sheet, kicad_version)))
        .collect()
}

pub fn render_sheet_fresh(project: &Project, sheet: &Sheet, kicad_version: &str) -> Tree {
    let mut children = vec![
        Node::Atom(Atom::symbol("kicad_sch")),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("version")),
            Node::Atom(Atom::symbol(kicad_version.to_string())),
        ])),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("generator")),
            Node::Atom(Atom::string("kicad_sync")),
        ])),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("uuid")),
            Node::Atom(Atom::string(sheet.uuid.as_str())),
        ])),
    ];

    for component in &sheet.components {
        children.push(Node::List(render_component(component)));
    }
    for power in &sheet.power_symbols {
        children.push(Node::List(render_power_symbol(power)));
    }
    for wire in &sheet.wires {
        children.push(Node::List(render_wire(wire)));
    }
    for label in &sheet.labels {
        children.push(Node::List(render_label(label)));
    }
    for instance in &sheet.child_instances {
        let child_sheet = project.sheet(&instance.sheet_uuid);
        let ports = child_sheet.map(|s| s.ports.clone()).unwrap_or_default();
        let bindings: Vec<PortBinding> = project
            .port_bindings_for(&sheet.uuid)
            .iter()
            .filter(|(inst_uuid, _)| inst_uuid == &instance.uuid)
            .map(|(_, b)| b.clone())
            .collect();
        children.push(Node::List(render_sheet_instance(
            instance,
            child_sheet.map(|s| s.filename.as_str()).unwrap_or(""),
            child_sheet.map(|s| s.name.as_str()).unwrap_or(""),
            &ports,
            &bindings,
        )));
    }

    Tree::fresh(Node::List(ListNode::new(children)))
}

pub fn render_component(component: &Component) -> ListNode {
    let mut children = vec![
        Node::Atom(Atom::symbol("symbol")),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("lib_id")),
            Node::Atom(Atom::string(component.lib_id.clone())),
        ])),
    ];

    if let Some(placement) = &component.placement {
        let mut at = vec![
            Node::Atom(Atom::symbol("at")),
            Node::Atom(Atom::number(placement.x)),
            Node::Atom(Atom::number(placement.y)),
        ];
        if placement.rotation.degrees() != 0.0 {
            at.push(Node::Atom(Atom::number(placement.rotation.degrees())));
        }
        children.push(Node::List(ListNode::new(at)));
        if placement.mirror != Mirror::None {
            children.push(Node::List(ListNode::new(vec![
                Node::Atom(Atom::symbol("mirror")),
                Node::Atom(Atom::symbol(match placement.mirror {
                    Mirror::X => "x",
                    Mirror::Y => "y",
                    Mirror::None => unreachable!(),
                })),
            ])));
        }
        children.push(Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("unit")),
            Node::Atom(Atom::number(placement.unit as f64)),
        ])));
    }

    children.push(Node::List(ListNode::new(vec![
        Node::Atom(Atom::symbol("uuid")),
        Node::Atom(Atom::string(component.uuid.as_str())),
    ])));

    if component.properties.dnp {
        children.push(Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("dnp")),
            Node::Atom(Atom::symbol("yes")),
        ])));
    }

    children.push(property("Reference", component.reference.as_str()));
    children.push(property("Value", &component.value));
    children.push(property("Footprint", &component.footprint));
    if let Some(datasheet) = &component.properties.datasheet {
        children.push(property("Datasheet", datasheet));
    }
    for (key, value) in component.properties.other_in_order() {
        children.push(property(key, value));
    }

    for pin in &component.pins {
        let mut pin_children = vec![
            Node::Atom(Atom::symbol("pin")),
            Node::Atom(Atom::string(pin.pin_number.clone())),
        ];
        if let Some(net) = &pin.net {
            pin_children.push(Node::List(ListNode::new(vec![
                Node::Atom(Atom::symbol("net")),
                Node::Atom(Atom::string(net.clone())),
            ])));
        }
        children.push(Node::List(ListNode::new(pin_children)));
    }

    ListNode::new(children)
}

pub fn render_power_symbol(power: &PowerSymbol) -> ListNode {
    let children = vec![
        Node::Atom(Atom::symbol("symbol")),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("lib_id")),
            Node::Atom(Atom::string(format!("power:{}", power.net_name))),
        ])),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("at")),
            Node::Atom(Atom::number(power.position.0)),
            Node::Atom(Atom::number(power.position.1)),
        ])),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("uuid")),
            Node::Atom(Atom::string(power.uuid.as_str())),
        ])),
        property("Reference", &power.reference),
        property("Value", &power.net_name),
    ];
    ListNode::new(children)
}

pub fn render_wire(wire: &Wire) -> ListNode {
    let pts: Vec<Node> = wire
        .points
        .iter()
        .map(|(x, y)| {
            Node::List(ListNode::new(vec![
                Node::Atom(Atom::symbol("xy")),
                Node::Atom(Atom::number(*x)),
                Node::Atom(Atom::number(*y)),
            ]))
        })
        .collect();

    ListNode::new(vec![
        Node::Atom(Atom::symbol("wire")),
        Node::List(ListNode::new({
            let mut children = vec![Node::Atom(Atom::symbol("pts"))];
            children.extend(pts);
            children
        })),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("uuid")),
            Node::Atom(Atom::string(wire.uuid.as_str())),
        ])),
    ])
}

pub fn render_label(label: &Label) -> ListNode {
    let head = match label.kind {
        LabelKind::Local => "label",
        LabelKind::Global => "global_label",
        LabelKind::Hierarchical => "hierarchical_label",
    };

    let mut children = vec![
        Node::Atom(Atom::symbol(head)),
        Node::Atom(Atom::string(label.text.clone())),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("at")),
            Node::Atom(Atom::number(label.position.0)),
            Node::Atom(Atom::number(label.position.1)),
        ])),
    ];

    if let Some(justify) = label.justify {
        children.push(Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("effects")),
            Node::List(ListNode::new(vec![
                Node::Atom(Atom::symbol("justify")),
                Node::Atom(Atom::symbol(match justify {
                    Justify::Left => "left",
                    Justify::Right => "right",
                    Justify::Center => "center",
                })),
            ])),
        ])));
    }

    children.push(Node::List(ListNode::new(vec![
        Node::Atom(Atom::symbol("uuid")),
        Node::Atom(Atom::string(label.uuid.as_str())),
    ])));

    ListNode::new(children)
}

pub fn render_port(port: &HierarchicalPort) -> ListNode {
    ListNode::new(vec![
        Node::Atom(Atom::symbol("hierarchical_label")),
        Node::Atom(Atom::string(port.name.clone())),
        Node::Atom(Atom::symbol(electrical_type_str(port.electrical_type))),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("at")),
            Node::Atom(Atom::number(port.position.0)),
            Node::Atom(Atom::number(port.position.1)),
        ])),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("uuid")),
            Node::Atom(Atom::string(port.uuid.as_str())),
        ])),
    ])
}

pub fn render_sheet_instance(
    instance: &SheetInstance,
    filename: &str,
    sheetname: &str,
    ports: &[HierarchicalPort],
    bindings: &[PortBinding],
) -> ListNode {
    let mut children = vec![
        Node::Atom(Atom::symbol("sheet")),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("at")),
            Node::Atom(Atom::number(instance.position.0)),
            Node::Atom(Atom::number(instance.position.1)),
        ])),
        Node::List(ListNode::new(vec![
            Node::Atom(Atom::symbol("uuid")),
            Node::Atom(Atom::string(instance.uuid.as_str())),
        ])),
        property("Sheetname", sheetname),
        property("Sheetfile", filename),
    ];

    for port in ports {
        let binding = bindings.iter().find(|b| b.port_name == port.name);
        let mut pin_children = vec![
            Node::Atom(Atom::symbol("pin")),
            Node::Atom(Atom::string(port.name.clone())),
            Node::Atom(Atom::symbol(electrical_type_str(port.electrical_type))),
        ];
        if let Some(binding) = binding {
            if let Some(label_uuid) = &binding.parent_label_uuid {
                pin_children.push(Node::List(ListNode::new(vec![
                    Node::Atom(Atom::symbol("net_label_uuid")),
                    Node::Atom(Atom::string(label_uuid.as_str())),
                ])));
            }
        }
        children.push(Node::List(ListNode::new(pin_children)));
    }

    ListNode::new(children)
}

fn property(name: &str, value: &str) -> Node {
    Node::List(ListNode::new(vec![
        Node::Atom(Atom::symbol("property")),
        Node::Atom(Atom::string(name.to_string())),
        Node::Atom(Atom::string(value.to_string())),
    ]))
}

fn electrical_type_str(t: symbol_library::ElectricalType) -> &'static str {
    use symbol_library::ElectricalType::*;
    match t {
        Input => "input",
        Output => "output",
        Bidirectional => "bidirectional",
        TriState => "tri_state",
        Passive => "passive",
        Unspecified => "unspecified",
        PowerIn => "power_in",
        PowerOut => "power_out",
        OpenCollector => "open_collector",
        OpenEmitter => "open_emitter",
        Unconnected => "unconnected",
    }
}
