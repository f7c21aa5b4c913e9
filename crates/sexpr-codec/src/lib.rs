//! Lossless tokenizer, parser, and formatter for KiCad's native S-expression
//! file format (`.kicad_sch`, `.kicad_pcb`, `.kicad_pro`, `.kicad_sym`).
//!
//! The central guarantee is `format(parse(x)) == x` byte-for-byte for any
//! valid input, and that a tree built by mutating a parsed tree in place
//! reproduces every untouched byte verbatim while re-rendering only the
//! parts that actually changed. See [`node`] for how that's represented.

mod error;
mod formatter;
mod node;
mod parser;

pub use error::ParseError;
pub use node::{Atom, ListNode, Node, Span, Tree};

/// Parse a complete S-expression document.
pub fn parse(source: &str) -> Result<Tree, ParseError> {
    parser::parse(source)
}

/// Render a tree back to bytes. Reuses `tree.source` verbatim for any
/// subtree still carrying a `Span`; renders everything else in KiCad's
/// de facto fresh style.
pub fn format(tree: &Tree) -> String {
    formatter::format(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use node::{Atom as AtomNode, ListNode as ListNodeT};
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrips_simple_list() {
        let src = "(kicad_sch (version 20231120) (generator eeschema))\n";
        let tree = parse(src).expect("parse");
        assert_eq!(format(&tree), src);
    }

    #[test]
    fn preserves_numeric_literal_form() {
        let src = "(at 3.1 1.0e-3 0)\n";
        let tree = parse(src).expect("parse");
        assert_eq!(format(&tree), src);
        let list = tree.root.as_list().unwrap();
        assert_eq!(list.atom(1).unwrap().as_f64(), Some(3.1));
        assert_eq!(list.atom(1).unwrap().as_str(), "3.1");
    }

    #[test]
    fn preserves_quoting_and_escapes() {
        let src = "(property \"Reference\" \"R1\\\"x\")\n";
        let tree = parse(src).expect("parse");
        assert_eq!(format(&tree), src);
    }

    #[test]
    fn preserves_whitespace_and_indentation() {
        let src = "(a\n  (b 1)\n  (c 2)\n)\n";
        let tree = parse(src).expect("parse");
        assert_eq!(format(&tree), src);
    }

    #[test]
    fn parse_error_reports_position() {
        let err = parse("(a (b)").unwrap_err();
        assert_eq!(err.expected, "')'");
    }

    #[test]
    fn unknown_tokens_preserved_structurally() {
        let src = "(kicad_sch (totally_unknown_token 1 2 (nested yes)))\n";
        let tree = parse(src).expect("parse");
        assert_eq!(format(&tree), src);
    }

    #[test]
    fn mutating_one_atom_leaves_siblings_byte_identical() {
        let src = "(symbol (property \"Value\" \"10k\") (property \"Footprint\" \"R_0603\"))\n";
        let mut tree = parse(src).expect("parse");
        let root = tree.root.as_list_mut().unwrap();
        // Rebuild the first `property` list fresh, replacing only its value
        // atom, while the second `property` list keeps its span untouched.
        let value_prop = root.children[0].as_list().unwrap().clone();
        let mut new_children = value_prop.children.clone();
        new_children[2] = node::Node::Atom(AtomNode::string("47k"));
        root.children[0] = node::Node::List(ListNodeT::new(new_children));

        let out = format(&tree);
        assert!(out.contains("\"47k\""));
        assert!(out.contains("(property \"Footprint\" \"R_0603\")"));
    }

    #[test]
    fn fresh_list_wraps_when_too_wide() {
        let children: Vec<node::Node> = (0..20)
            .map(|i| node::Node::Atom(AtomNode::string(format!("child_{i}_value"))))
            .collect();
        let mut list = ListNodeT::new(children);
        list.children.insert(0, node::Node::Atom(AtomNode::symbol("wide_list")));
        let tree = Tree::fresh(node::Node::List(list));
        let out = format(&tree);
        assert!(out.contains('\n'));
    }
}
