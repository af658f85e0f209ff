//! C front end: parses a compilation unit with tree-sitter and lowers it into
//! an owned cursor tree.
//!
//! The recognizers in [`crate::visitor`] and [`crate::extract`] only see
//! [`Cursor`]s, so they stay independent of the tree-sitter node API. Call
//! expressions keep the callee as their first child, followed by the
//! arguments.

use std::borrow::Cow;
use std::ops::Range;

use tree_sitter::{Node, Parser};

use crate::error::ParseFailure;
use crate::locator::{SourceFile, decode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    TranslationUnit,
    /// A function definition; prototypes are not lowered.
    FunctionDecl,
    /// A declarator with an initializer.
    VarDecl,
    InitList,
    /// `.field = value` inside an initializer list.
    Designated,
    CStyleCast,
    /// Parentheses and other transparent single-child wrappers.
    Unexposed,
    StringLiteral,
    DeclRef,
    Literal,
    CallExpr,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub kind: CursorKind,
    pub spelling: String,
    /// Declared type of a `VarDecl`, e.g. `PyMethodDef`.
    pub type_name: Option<String>,
    pub extent: Range<usize>,
    pub children: Vec<Cursor>,
}

impl Cursor {
    pub fn new(kind: CursorKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            type_name: None,
            extent: 0..0,
            children: Vec::new(),
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Cursor>) -> Self {
        self.children = children;
        self
    }

    pub fn is(&self, kind: CursorKind) -> bool {
        self.kind == kind
    }
}

/// Turns the bytes of one compilation unit into a cursor tree.
pub trait Frontend {
    fn parse(&self, file: &SourceFile) -> Result<Cursor, ParseFailure>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterFrontend {
    max_errors: usize,
}

impl TreeSitterFrontend {
    /// `max_errors` is the number of `ERROR`/`MISSING` nodes tolerated before
    /// the unit is rejected.
    pub fn new(max_errors: usize) -> Self {
        Self { max_errors }
    }
}

impl Frontend for TreeSitterFrontend {
    fn parse(&self, file: &SourceFile) -> Result<Cursor, ParseFailure> {
        let source = expand_head_init_macros(file.bytes());

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .map_err(|e| ParseFailure::new(file.path(), format!("C grammar unavailable: {e}")))?;
        let tree = parser
            .parse(source.as_ref(), None)
            .ok_or_else(|| ParseFailure::new(file.path(), "parser returned no tree"))?;
        let root = tree.root_node();

        let errors = count_diagnostics(&root);
        if errors > self.max_errors {
            return Err(ParseFailure::new(
                file.path(),
                format!("{errors} syntax errors (limit {})", self.max_errors),
            ));
        }

        Ok(Cursor {
            kind: CursorKind::TranslationUnit,
            spelling: file.path_string(),
            type_name: None,
            extent: root.byte_range(),
            children: lower_children(&root, &source),
        })
    }
}

fn count_diagnostics(node: &Node) -> usize {
    let own = usize::from(node.is_error() || node.is_missing());
    let mut cursor = node.walk();
    own + node
        .children(&mut cursor)
        .map(|child| count_diagnostics(&child))
        .sum::<usize>()
}

fn lower_children(node: &Node, source: &[u8]) -> Vec<Cursor> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        lower_into(&child, source, &mut out);
    }
    out
}

fn lower_into(node: &Node, source: &[u8], out: &mut Vec<Cursor>) {
    match node.kind() {
        "comment" => {}
        // Recovered regions are spliced into the parent so positional
        // initializer fields keep their order.
        "ERROR" => out.extend(lower_children(node, source)),
        "declaration" => out.extend(lower_declaration(node, source)),
        _ => out.push(lower(node, source)),
    }
}

fn lower(node: &Node, source: &[u8]) -> Cursor {
    let text = || node_text(node, source);
    let base = |kind: CursorKind, spelling: String| Cursor {
        kind,
        spelling,
        type_name: None,
        extent: node.byte_range(),
        children: Vec::new(),
    };

    match node.kind() {
        "function_definition" => {
            let name = node
                .child_by_field_name("declarator")
                .and_then(|d| declarator_name(&d, source))
                .unwrap_or_default();
            let body = node
                .child_by_field_name("body")
                .map(|b| vec![lower(&b, source)])
                .unwrap_or_default();
            base(CursorKind::FunctionDecl, name).with_children(body)
        }
        "initializer_list" => {
            base(CursorKind::InitList, String::new()).with_children(lower_children(node, source))
        }
        "initializer_pair" => {
            let field = node
                .child_by_field_name("designator")
                .and_then(|d| d.named_child(0))
                .map(|f| node_text(&f, source))
                .unwrap_or_default();
            let value = node
                .child_by_field_name("value")
                .map(|v| vec![lower(&v, source)])
                .unwrap_or_default();
            base(CursorKind::Designated, field).with_children(value)
        }
        "cast_expression" => {
            let value = node
                .child_by_field_name("value")
                .map(|v| vec![lower(&v, source)])
                .unwrap_or_default();
            base(CursorKind::CStyleCast, String::new()).with_children(value)
        }
        "parenthesized_expression" => {
            base(CursorKind::Unexposed, String::new()).with_children(lower_children(node, source))
        }
        "string_literal" => base(CursorKind::StringLiteral, text()),
        "concatenated_string" => {
            base(CursorKind::StringLiteral, join_string_pieces(node, source))
        }
        // `&PyLong_Type` names the same object as `PyLong_Type`.
        "pointer_expression"
            if node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "&") =>
        {
            let argument = node
                .child_by_field_name("argument")
                .map(|a| vec![lower(&a, source)])
                .unwrap_or_default();
            base(CursorKind::Unexposed, String::new()).with_children(argument)
        }
        "identifier" => base(CursorKind::DeclRef, text()),
        "number_literal" | "char_literal" | "true" | "false" | "null" => {
            base(CursorKind::Literal, text())
        }
        "call_expression" => {
            let mut children = Vec::new();
            let mut callee = String::new();
            if let Some(function) = node.child_by_field_name("function") {
                callee = node_text(&function, source);
                children.push(lower(&function, source));
            }
            if let Some(arguments) = node.child_by_field_name("arguments") {
                children.extend(lower_children(&arguments, source));
            }
            base(CursorKind::CallExpr, callee).with_children(children)
        }
        _ => base(CursorKind::Other, String::new()).with_children(lower_children(node, source)),
    }
}

/// One `VarDecl` per initialized declarator. A declaration with a single
/// declarator keeps the extent of the whole declaration, storage class and
/// trailing semicolon included.
fn lower_declaration(node: &Node, source: &[u8]) -> Vec<Cursor> {
    let type_name = node
        .child_by_field_name("type")
        .map(|t| declared_type_name(&t, source));

    let mut cursor = node.walk();
    let declarators: Vec<Node> = node
        .children_by_field_name("declarator", &mut cursor)
        .collect();
    let single = declarators.len() == 1;

    let mut out = Vec::new();
    for declarator in declarators {
        if declarator.kind() != "init_declarator" {
            continue;
        }
        let name = declarator_name(&declarator, source).unwrap_or_default();
        let value = declarator
            .child_by_field_name("value")
            .map(|v| vec![lower(&v, source)])
            .unwrap_or_default();
        let extent = if single {
            node.byte_range()
        } else {
            declarator.byte_range()
        };
        out.push(Cursor {
            kind: CursorKind::VarDecl,
            spelling: name,
            type_name: type_name.clone(),
            extent,
            children: value,
        });
    }
    out
}

fn declared_type_name(node: &Node, source: &[u8]) -> String {
    match node.kind() {
        "struct_specifier" | "union_specifier" | "enum_specifier" => node
            .child_by_field_name("name")
            .map(|n| node_text(&n, source))
            .unwrap_or_else(|| node_text(node, source)),
        _ => node_text(node, source),
    }
}

fn declarator_name(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" => Some(node_text(node, source)),
        _ => {
            if let Some(inner) = node.child_by_field_name("declarator") {
                return declarator_name(&inner, source);
            }
            let mut cursor = node.walk();
            let found = node
                .named_children(&mut cursor)
                .find_map(|child| declarator_name(&child, source));
            found
        }
    }
}

/// `"a" "b"` becomes the single literal `"ab"`. Macro pieces between the
/// literals are dropped.
fn join_string_pieces(node: &Node, source: &[u8]) -> String {
    let mut joined = String::from("\"");
    let mut cursor = node.walk();
    for piece in node.named_children(&mut cursor) {
        if piece.kind() != "string_literal" {
            continue;
        }
        let text = node_text(&piece, source);
        let inner = text
            .find('"')
            .zip(text.rfind('"'))
            .filter(|(open, close)| open < close)
            .map_or("", |(open, close)| &text[open + 1..close]);
        joined.push_str(inner);
    }
    joined.push('"');
    joined
}

fn node_text(node: &Node, source: &[u8]) -> String {
    source
        .get(node.byte_range())
        .map(decode)
        .unwrap_or_default()
}

const HEAD_INIT_MACROS: [&str; 2] = ["PyVarObject_HEAD_INIT(", "PyObject_HEAD_INIT("];

/// Rewrites `PyObject_HEAD_INIT(t)` into `1, t,` and
/// `PyVarObject_HEAD_INIT(t, n)` into `1, t, n,`, padded with spaces to the
/// original length. These macros expand to leading positional fields that end
/// with a comma, which the grammar cannot see without a preprocessor.
pub fn expand_head_init_macros(source: &[u8]) -> Cow<'_, [u8]> {
    let mut out: Option<Vec<u8>> = None;
    let mut pos = 0usize;

    while pos < source.len() {
        let Some((start, macro_len)) = find_next_macro(source, pos) else {
            break;
        };
        let open = start + macro_len - 1;
        let Some(close) = matching_paren(source, open) else {
            break;
        };
        if !in_directive(source, start) {
            let args = &source[open + 1..close];
            let mut replacement = Vec::with_capacity(close + 1 - start);
            replacement.extend_from_slice(b"1, ");
            replacement.extend_from_slice(args);
            replacement.push(b',');
            let original_len = close + 1 - start;
            if replacement.len() <= original_len {
                replacement.resize(original_len, b' ');
                let buf = out.get_or_insert_with(|| source.to_vec());
                buf[start..=close].copy_from_slice(&replacement);
            }
        }
        pos = close + 1;
    }

    match out {
        Some(buf) => Cow::Owned(buf),
        None => Cow::Borrowed(source),
    }
}

fn find_next_macro(source: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for name in HEAD_INIT_MACROS {
        let needle = name.as_bytes();
        let mut at = from;
        while let Some(rel) = find_bytes(&source[at..], needle) {
            let idx = at + rel;
            let preceded_by_ident =
                idx > 0 && (source[idx - 1].is_ascii_alphanumeric() || source[idx - 1] == b'_');
            if !preceded_by_ident {
                if best.is_none_or(|(b, _)| idx < b) {
                    best = Some((idx, needle.len()));
                }
                break;
            }
            at = idx + 1;
        }
    }
    best
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn matching_paren(source: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in source.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn in_directive(source: &[u8], at: usize) -> bool {
    let line_start = source[..at]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    source[line_start..at]
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'#')
}
