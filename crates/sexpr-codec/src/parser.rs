//! Hand-written recursive descent parser with one-character lookahead.
//!
//! States: top-level, in-list, in-atom, in-quoted-string, in-escape. There is
//! no error recovery — the first parse error aborts the whole parse, which
//! is the right tradeoff for a format the writer is about to regenerate from
//! scratch on the next `sync()` anyway.

use crate::error::ParseError;
use crate::node::{Atom, ListNode, Node, Span, Tree};

pub fn parse(source: &str) -> Result<Tree, ParseError> {
    let mut cursor = Cursor::new(source);
    cursor.skip_trivia();
    let leading = source[..cursor.pos].to_string();
    let root = cursor.parse_node()?;
    let trailing_start = cursor.pos;
    cursor.skip_trivia();
    if cursor.pos != source.len() {
        let (found, _) = cursor.peek_display();
        return Err(cursor.error("end of file", found));
    }
    let trailing = source[trailing_start..].to_string();
    Ok(Tree {
        root,
        source: source.to_string(),
        leading,
        trailing,
    })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

struct Cursor<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_display(&self) -> (String, u8) {
        match self.peek() {
            Some(b) => (format!("'{}'", b as char), b),
            None => ("end of file".to_string(), 0),
        }
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn error(&self, expected: impl Into<String>, found: impl Into<String>) -> ParseError {
        ParseError::new(self.pos, self.line, self.column, expected, found)
    }

    fn span_from(&self, start: usize, start_line: usize, start_col: usize) -> Span {
        Span {
            start,
            end: self.pos,
            line: start_line,
            column: start_col,
        }
    }

    /// Skip whitespace and `;`-style line comments (KiCad files do not
    /// normally carry these, but stray ones must not abort the parse).
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b';') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_node(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        let (start_line, start_col) = (self.line, self.column);
        match self.peek() {
            Some(b'(') => {
                let list = self.parse_list()?;
                let span = self.span_from(start, start_line, start_col);
                Ok(Node::List(ListNode {
                    children: list,
                    span: Some(span),
                }))
            }
            Some(b'"') => {
                let text = self.parse_quoted_string()?;
                let span = self.span_from(start, start_line, start_col);
                Ok(Node::Atom(Atom {
                    text,
                    quoted: true,
                    span: Some(span),
                }))
            }
            Some(_) => {
                let text = self.parse_bare_atom()?;
                let span = self.span_from(start, start_line, start_col);
                Ok(Node::Atom(Atom {
                    text,
                    quoted: false,
                    span: Some(span),
                }))
            }
            None => {
                let (found, _) = self.peek_display();
                Err(self.error("an atom or '('", found))
            }
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Node>, ParseError> {
        // Consume '('.
        self.advance();
        let mut children = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b')') => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    children.push(self.parse_node()?);
                }
                None => {
                    return Err(self.error("')'", "end of file"));
                }
            }
        }
        Ok(children)
    }

    fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        // Consume opening quote.
        self.advance();
        let content_start = self.pos;
        let mut has_escapes = false;
        loop {
            match self.peek() {
                Some(b'"') => {
                    let content_end = self.pos;
                    self.advance();
                    let raw = &self.source[content_start..content_end];
                    return Ok(if has_escapes {
                        unescape(raw)
                    } else {
                        raw.to_string()
                    });
                }
                Some(b'\\') => {
                    has_escapes = true;
                    self.advance();
                    if self.advance().is_none() {
                        return Err(self.error("escape sequence", "end of file"));
                    }
                }
                Some(_) => {
                    self.advance();
                }
                None => return Err(self.error("closing '\"'", "end of file")),
            }
        }
    }

    fn parse_bare_atom(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() || b == b'(' || b == b')' => break,
                Some(_) => {
                    self.advance();
                }
                None => break,
            }
        }
        if self.pos == start {
            let (found, _) = self.peek_display();
            return Err(self.error("an atom", found));
        }
        Ok(self.source[start..self.pos].to_string())
    }
}
