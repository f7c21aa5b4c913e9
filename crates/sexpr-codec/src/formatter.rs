//! Two-mode formatter: preserve (byte-copy from the original buffer for any
//! node that still carries a `Span`) and fresh (KiCad's de facto two-space,
//! 80-column-wrap style for nodes built in memory).

use crate::node::{Atom, ListNode, Node, Tree};

const FRESH_WIDTH_LIMIT: usize = 80;
const FRESH_INDENT: &str = "  ";

/// Render a full tree back to bytes, reusing `tree.source` verbatim for any
/// subtree that is still marked unchanged.
pub fn format(tree: &Tree) -> String {
    let mut out = String::with_capacity(tree.source.len());
    out.push_str(&tree.leading);
    format_node(&tree.root, &tree.source, 0, &mut out);
    out.push_str(&tree.trailing);
    out
}

fn format_node(node: &Node, source: &str, indent: usize, out: &mut String) {
    match node {
        Node::Atom(a) => format_atom(a, source, out),
        Node::List(l) => format_list(l, source, indent, out),
    }
}

fn format_atom(atom: &Atom, source: &str, out: &mut String) {
    if let Some(span) = atom.span {
        out.push_str(&source[span.start..span.end]);
        return;
    }
    if atom.quoted {
        out.push('"');
        out.push_str(&escape(&atom.text));
        out.push('"');
    } else {
        out.push_str(&atom.text);
    }
}

fn format_list(list: &ListNode, source: &str, indent: usize, out: &mut String) {
    if let Some(span) = list.span {
        out.push_str(&source[span.start..span.end]);
        return;
    }
    // Fresh mode: try single-line first, fall back to one-child-per-line if
    // that would exceed the column budget or a child is itself multi-line.
    let flat = render_flat(list, source);
    if flat.len() + indent * FRESH_INDENT.len() <= FRESH_WIDTH_LIMIT && !flat.contains('\n') {
        out.push_str(&flat);
        return;
    }

    out.push('(');
    for (i, child) in list.children.iter().enumerate() {
        if i == 0 {
            format_node(child, source, indent, out);
        } else {
            out.push('\n');
            out.push_str(&FRESH_INDENT.repeat(indent + 1));
            format_node(child, source, indent + 1, out);
        }
    }
    // Real KiCad files close a multi-line list on its own line, indented to
    // match the opening paren, not flush against the last child.
    if list.children.len() > 1 {
        out.push('\n');
        out.push_str(&FRESH_INDENT.repeat(indent));
    }
    out.push(')');
}

/// Render a list on a single line, used both as the fast path and to measure
/// whether the fast path fits.
fn render_flat(list: &ListNode, source: &str) -> String {
    let mut s = String::from("(");
    for (i, child) in list.children.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        match child {
            Node::Atom(a) => {
                if let Some(span) = a.span {
                    s.push_str(&source[span.start..span.end]);
                } else if a.quoted {
                    s.push('"');
                    s.push_str(&escape(&a.text));
                    s.push('"');
                } else {
                    s.push_str(&a.text);
                }
            }
            Node::List(l) => {
                if let Some(span) = l.span {
                    s.push_str(&source[span.start..span.end]);
                } else {
                    s.push_str(&render_flat(l, source));
                }
            }
        }
    }
    s.push(')');
    s
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
