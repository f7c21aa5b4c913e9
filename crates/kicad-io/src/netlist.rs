//! `.net` netlist export, derived from a `Project`'s net index (spec §6):
//! `(export (components ...) (nets (net (code N) (name S) (node (ref R) (pin
//! P)) ...) ...))`. Read-derived only; the core never reads `.net` files
//! back in.

use sexpr_codec::{Atom, ListNode, Node, Tree};

use circuit_model::Project;

pub fn render_netlist(project: &Project) -> Tree {
    let components = Node::List(ListNode::new({
        let mut children = vec![Node::Atom(Atom::symbol("components"))];
        for component in project.all_components() {
            children.push(Node::List(ListNode::new(vec![
                Node::Atom(Atom::symbol("comp")),
                field("ref", component.reference.as_str()),
                field("value", &component.value),
                field("footprint", &component.footprint),
            ])));
        }
        children
    }));

    let nets = Node::List(ListNode::new({
        let mut children = vec![Node::Atom(Atom::symbol("nets"))];
        for (code, net) in project.net_index().nets().enumerate() {
            let mut net_children = vec![
                Node::Atom(Atom::symbol("net")),
                Node::List(ListNode::new(vec![
                    Node::Atom(Atom::symbol("code")),
                    Node::Atom(Atom::number(code as f64)),
                ])),
                field("name", &net.name),
            ];
            for member in &net.members {
                net_children.push(Node::List(ListNode::new(vec![
                    Node::Atom(Atom::symbol("node")),
                    field("ref", member_reference(project, &member.component_uuid)),
                    field("pin", &member.pin_number),
                ])));
            }
            children.push(Node::List(ListNode::new(net_children)));
        }
        children
    }));

    Tree::fresh(Node::List(ListNode::new(vec![
        Node::Atom(Atom::symbol("export")),
        components,
        nets,
    ])))
}

fn field(name: &str, value: &str) -> Node {
    Node::List(ListNode::new(vec![
        Node::Atom(Atom::symbol(name)),
        Node::Atom(Atom::string(value.to_string())),
    ]))
}

fn member_reference<'a>(project: &'a Project, uuid: &circuit_model::Uuid) -> &'a str {
    if let Some((_, c)) = project.find_component(uuid) {
        return c.reference.as_str();
    }
    project
        .sheets
        .iter()
        .flat_map(|s| s.power_symbols.iter())
        .find(|p| &p.uuid == uuid)
        .map(|p| p.reference.as_str())
        .unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_model::{Component, PinConnection, Placement, Reference, Sheet, Uuid as ModelUuid};

    fn two_resistor_project() -> Project {
        let root = Sheet::new(ModelUuid::generate(), "root.kicad_sch", "root");
        let mut project = Project::new("Demo", root);
        let root_uuid = project.root_sheet().uuid.clone();

        let mut r1 = Component::new(ModelUuid::generate(), Reference::new("R1"), "Device:R", "10k");
        r1.footprint = "Resistor_SMD:R_0603".to_string();
        r1.placement = Some(Placement::at(100.0, 50.0));
        r1.connect(PinConnection::new("1", "VCC"));
        r1.connect(PinConnection::new("2", "GND"));

        let mut r2 = Component::new(ModelUuid::generate(), Reference::new("R2"), "Device:R", "4k7");
        r2.footprint = "Resistor_SMD:R_0603".to_string();
        r2.placement = Some(Placement::at(200.0, 50.0));
        r2.connect(PinConnection::new("1", "VCC"));
        r2.connect(PinConnection::new("2", "GND"));

        project.sheets[0].components.push(r1);
        project.sheets[0].components.push(r2);
        project.reindex();
        let _ = root_uuid;
        project
    }

    #[test]
    fn netlist_lists_every_component_and_net() {
        let project = two_resistor_project();
        let tree = render_netlist(&project);
        let out = sexpr_codec::format(&tree);

        assert!(out.contains("(export"));
        assert!(out.contains("(comp (ref \"R1\") (value \"10k\") (footprint \"Resistor_SMD:R_0603\"))"));
        assert!(out.contains("(comp (ref \"R2\") (value \"4k7\") (footprint \"Resistor_SMD:R_0603\"))"));
        assert!(out.contains("(name \"VCC\")"));
        assert!(out.contains("(name \"GND\")"));
    }

    #[test]
    fn netlist_nodes_reference_both_components_on_a_shared_net() {
        let project = two_resistor_project();
        let tree = render_netlist(&project);
        let out = sexpr_codec::format(&tree);

        let vcc_start = out.find("(name \"VCC\")").unwrap();
        let vcc_section = &out[vcc_start..];
        let vcc_end = vcc_section[1..].find("(net ").map(|i| i + 1).unwrap_or(vcc_section.len());
        let vcc_block = &vcc_section[..vcc_end];
        assert!(vcc_block.contains("(ref \"R1\")"));
        assert!(vcc_block.contains("(ref \"R2\")"));
    }

    #[test]
    fn netlist_is_export_only_and_reparses_as_a_generic_tree() {
        let project = two_resistor_project();
        let tree = render_netlist(&project);
        let out = sexpr_codec::format(&tree);
        let reparsed = sexpr_codec::parse(&out).unwrap();
        assert!(reparsed.root.as_list().is_some());
    }
}
