//! The raw tree parsed from one `.kicad_sch` file, retained alongside the
//! lifted `Sheet` so the writer can copy untouched bytes for any entity the
//! synchronizer decided not to change (spec §3, "PreservedTree").

use sexpr_codec::{ListNode, Node, Tree};

#[derive(Debug, Clone)]
pub struct PreservedTree {
    pub tree: Tree,
}

impl PreservedTree {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    fn root_list(&self) -> Option<&ListNode> {
        self.tree.root.as_list()
    }

    /// Find a direct child list (`symbol`, `wire`, `sheet`, ...) carrying a
    /// `(uuid "...")` field equal to `uuid`.
    pub fn find_by_uuid(&self, head: &str, uuid: &str) -> Option<&ListNode> {
        self.root_list()?.fields(head).find(|list| {
            list.field("uuid")
                .and_then(|u| u.atom(1))
                .map(|a| a.as_str() == uuid)
                .unwrap_or(false)
        })
    }

    /// Find a `(label ...)`/`(global_label ...)`/`(hierarchical_label ...)`
    /// list by its text (the first atom after the head) and position.
    pub fn find_label(&self, head: &str, text: &str, position: (f64, f64)) -> Option<&ListNode> {
        self.root_list()?.fields(head).find(|list| {
            let text_matches = list.atom(1).map(|a| a.as_str() == text).unwrap_or(false);
            let pos_matches = list
                .field("at")
                .map(|at| position_matches(at, position))
                .unwrap_or(false);
            text_matches && pos_matches
        })
    }

    /// Every direct child of the root list, atoms and lists alike, in
    /// original file order — the merge driver walks these to decide, per
    /// child, whether to keep it byte-identical, patch it in place, or drop
    /// it, before appending newly inserted entities at the end.
    pub fn root_children(&self) -> &[Node] {
        self.root_list().map(|l| l.children.as_slice()).unwrap_or(&[])
    }

    pub fn top_level_lists(&self) -> impl Iterator<Item = &ListNode> {
        self.root_list()
            .into_iter()
            .flat_map(|l| l.children.iter())
            .filter_map(|c| c.as_list())
    }

    /// Any top-level list whose head is not one of the structurally
    /// recognised tokens (spec §4.4): preserved verbatim, never interpreted.
    pub fn unrecognized(&self, recognized: &[&str]) -> Vec<&Node> {
        self.root_list()
            .map(|l| {
                l.children
                    .iter()
                    .filter(|c| match c {
                        Node::List(inner) => inner
                            .head_atom()
                            .map(|h| !recognized.contains(&h))
                            .unwrap_or(true),
                        Node::Atom(_) => true,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn position_matches(at: &ListNode, position: (f64, f64)) -> bool {
    let x = at.atom(1).and_then(|a| a.as_f64());
    let y = at.atom(2).and_then(|a| a.as_f64());
    match (x, y) {
        (Some(x), Some(y)) => (x - position.0).abs() < 1e-6 && (y - position.1).abs() < 1e-6,
        _ => false,
    }
}
