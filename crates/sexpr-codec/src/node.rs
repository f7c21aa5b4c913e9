//! The recursive S-expression tree: `Atom(text, span)` | `List(children, span)`.
//!
//! A node that still carries its original `Span` is reproduced byte-for-byte
//! by the formatter in preserve mode. A node built or rebuilt in memory
//! carries `span: None` and is rendered in fresh style. Mixing the two in one
//! tree — some children preserved, some fresh — is how a single changed
//! property survives without reformatting its siblings.

/// A byte range into the original source buffer, plus the line/column of its
/// start for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

/// A leaf token: a bare symbol, a number, or a quoted string.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atom {
    /// Exact literal text as written, e.g. `"3.1"`, `1.0e-3`, `"R1"` (without
    /// quotes — see `quoted`). Never renormalized.
    pub text: String,
    /// Whether this atom was written with surrounding double quotes.
    pub quoted: bool,
    /// Present iff this atom is untouched from the parsed source; `span`
    /// covers this atom's own leading trivia through its last byte.
    pub span: Option<Span>,
}

impl Atom {
    /// A fresh, unquoted bare symbol (e.g. `yes`, `kicad_sch`).
    pub fn symbol(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
            span: None,
        }
    }

    /// A fresh quoted string atom.
    pub fn string(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
            span: None,
        }
    }

    /// A fresh numeric atom, formatted with Rust's default float/int display.
    pub fn number(value: f64) -> Self {
        Self {
            text: format_number(value),
            quoted: false,
            span: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Parse the atom's literal text as `f64`. Does not mutate or cache the
    /// stored text — the original literal form is never normalized.
    pub fn as_f64(&self) -> Option<f64> {
        self.text.parse().ok()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.text.parse().ok()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.text.as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let s = format!("{value}");
        s
    }
}

/// A parenthesized list of child nodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListNode {
    pub children: Vec<Node>,
    /// Present iff this list (and everything under it) is untouched from the
    /// parsed source.
    pub span: Option<Span>,
}

impl ListNode {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            span: None,
        }
    }

    /// The symbol naming this list, e.g. `symbol` in `(symbol ...)`.
    pub fn head_atom(&self) -> Option<&str> {
        match self.children.first() {
            Some(Node::Atom(a)) => Some(a.text.as_str()),
            _ => None,
        }
    }

    /// The first child list whose head atom equals `name`, if any.
    pub fn field(&self, name: &str) -> Option<&ListNode> {
        self.children.iter().find_map(|c| match c {
            Node::List(l) if l.head_atom() == Some(name) => Some(l),
            _ => None,
        })
    }

    /// Mutable version of [`field`](Self::field), for in-place patching.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut ListNode> {
        self.children.iter_mut().find_map(|c| match c {
            Node::List(l) if l.head_atom() == Some(name) => Some(l),
            _ => None,
        })
    }

    pub fn fields<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ListNode> + 'a {
        self.children.iter().filter_map(move |c| match c {
            Node::List(l) if l.head_atom() == Some(name) => Some(l),
            _ => None,
        })
    }

    /// The atom at position `index` (0 is the head), if the child is a bare
    /// atom rather than a nested list.
    pub fn atom(&self, index: usize) -> Option<&Atom> {
        match self.children.get(index) {
            Some(Node::Atom(a)) => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    Atom(Atom),
    List(ListNode),
}

impl Node {
    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Node::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListNode> {
        match self {
            Node::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Node::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        match self {
            Node::Atom(a) => a.span.is_some(),
            Node::List(l) => l.span.is_some(),
        }
    }

    /// Strip spans from this node and every descendant, forcing the
    /// formatter to re-render it in fresh style even if nothing else about
    /// it changed. Used by the writer when an entity's shape (not just an
    /// attribute) needs to change.
    pub fn mark_fresh(&mut self) {
        match self {
            Node::Atom(a) => a.span = None,
            Node::List(l) => {
                l.span = None;
                for child in &mut l.children {
                    child.mark_fresh();
                }
            }
        }
    }
}

/// A parsed tree plus the original buffer its spans index into, and the raw
/// bytes following the top-level form (typically a single trailing newline).
#[derive(Debug, Clone)]
pub struct Tree {
    pub root: Node,
    pub source: String,
    /// Raw bytes before the top-level form (normally empty).
    pub leading: String,
    /// Raw bytes following the top-level form (typically a trailing
    /// newline).
    pub trailing: String,
}

impl Tree {
    /// Slice of `source` covered by `span`, including leading trivia.
    pub fn slice(&self, span: Span) -> &str {
        &self.source[span.start..span.end]
    }

    /// Build a tree with no backing source, for a file created from
    /// scratch. Every node in `root` must be fresh (`span: None`).
    pub fn fresh(root: Node) -> Self {
        Self {
            root,
            source: String::new(),
            leading: String::new(),
            trailing: "\n".to_string(),
        }
    }
}
