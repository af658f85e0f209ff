//! Turns recognized cursors into index records.

use crate::locator::SourceFile;
use crate::store::{FileRecords, MethodMap, ModuleRecord, SourceRecord, TypeRecord};
use crate::syntax::{Cursor, CursorKind};
use crate::visitor::{Shape, visit};

/// Structural value of an initializer expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A string literal, quotes included.
    Str(String),
    /// An identifier reference.
    Ident(String),
    /// Any other literal token.
    Token(String),
    List(Vec<Value>),
    Null,
}

impl Value {
    pub fn unquoted(&self) -> Option<&str> {
        match self {
            Value::Str(s) => strip_quotes(s),
            _ => None,
        }
    }

    pub fn ident(&self) -> Option<&str> {
        match self {
            Value::Ident(s) => Some(s),
            _ => None,
        }
    }

    fn unquoted_owned(self) -> Option<String> {
        self.unquoted().map(str::to_string)
    }

    fn ident_owned(self) -> Option<String> {
        self.ident().map(str::to_string)
    }

    fn text(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Ident(s) | Value::Token(s) => Some(s),
            Value::List(_) | Value::Null => None,
        }
    }

    fn fields(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            _ => &[],
        }
    }
}

/// Resolves through casts and single-child wrappers down to literal tokens.
pub fn resolve(cursor: &Cursor) -> Value {
    match cursor.kind {
        CursorKind::InitList => Value::List(cursor.children.iter().map(resolve).collect()),
        CursorKind::CStyleCast | CursorKind::Designated => {
            cursor.children.last().map_or(Value::Null, resolve)
        }
        CursorKind::Unexposed => match cursor.children.as_slice() {
            [] => Value::Token(cursor.spelling.clone()),
            [only] => resolve(only),
            many => Value::List(many.iter().map(resolve).collect()),
        },
        CursorKind::StringLiteral => Value::Str(cursor.spelling.clone()),
        CursorKind::DeclRef => Value::Ident(cursor.spelling.clone()),
        CursorKind::Literal => Value::Token(cursor.spelling.clone()),
        _ => Value::Null,
    }
}

pub fn extract_file(unit: &Cursor, file: &SourceFile) -> FileRecords {
    let mut records = FileRecords::default();
    visit(unit, &mut |cursor, shape| match shape {
        Shape::Function => {
            if let Some((name, record)) = parse_function(cursor, file) {
                records.methods.insert(name, record);
            }
        }
        Shape::MethodTable => {
            if let Some((name, map)) = parse_method_table(cursor) {
                records.method_names.insert(name, map);
            }
        }
        Shape::TypeObject => {
            if let Some((name, record)) = parse_type_object(cursor, file) {
                records.objects.insert(name, record);
            }
        }
        Shape::ModuleInit | Shape::ModuleDef => {
            let parsed = if shape == Shape::ModuleInit {
                parse_module_init(cursor, file)
            } else {
                parse_module_def(cursor, file)
            };
            if let Some((name, record)) = parsed {
                merge_module(&mut records, name, record);
            }
        }
    });
    records
}

/// Both registration styles often sit side by side behind `#if`; their
/// method tables are combined.
fn merge_module(records: &mut FileRecords, name: String, record: ModuleRecord) {
    match records.modules.get_mut(&name) {
        Some(existing) => {
            for map in record.method_maps {
                if !existing.method_maps.contains(&map) {
                    existing.method_maps.push(map);
                }
            }
        }
        None => {
            records.modules.insert(name, record);
        }
    }
}

pub fn parse_function(cursor: &Cursor, file: &SourceFile) -> Option<(String, SourceRecord)> {
    if cursor.spelling.is_empty() {
        return None;
    }
    Some((
        cursor.spelling.clone(),
        SourceRecord {
            source: file.span(cursor.extent.start, cursor.extent.end),
            path: file.path_string(),
        },
    ))
}

/// Keeps only four-field entries whose first field is a string literal.
/// The `{NULL, NULL, 0, NULL}` sentinel is dropped that way.
pub fn parse_method_table(cursor: &Cursor) -> Option<(String, MethodMap)> {
    let initializer = cursor.children.first()?;
    let mut map = MethodMap::new();

    for entry in resolve(initializer).fields() {
        let [py_name, c_name, _, _] = entry.fields() else {
            continue;
        };
        let (Some(py_name), Some(c_name)) = (py_name.unquoted(), c_name.text()) else {
            continue;
        };
        map.insert(py_name.to_string(), c_name.to_string());
    }

    Some((cursor.spelling.clone(), map))
}

/// A designated `tp_name` wins; otherwise the name sits in positional field
/// 3, after the three fields the head-init macro expands to. References are
/// identifiers in later positional fields plus a designated `tp_base`.
pub fn parse_type_object(cursor: &Cursor, file: &SourceFile) -> Option<(String, TypeRecord)> {
    let initializer = cursor.children.first()?;
    let fields = positional(initializer);

    let name = designated(initializer, "tp_name")
        .and_then(Value::unquoted_owned)
        .or_else(|| fields.get(3).and_then(Value::unquoted).map(str::to_string))?;

    let mut references: Vec<String> = fields
        .iter()
        .skip(4)
        .filter_map(Value::ident)
        .map(str::to_string)
        .collect();
    if let Some(base) = designated(initializer, "tp_base").and_then(Value::ident_owned)
        && !references.contains(&base)
    {
        references.push(base);
    }

    Some((
        name,
        TypeRecord {
            source: file.span(cursor.extent.start, cursor.extent.end),
            path: file.path_string(),
            references,
        },
    ))
}

/// `Py_InitModule("name", methods)`: child 0 is the callee, so the name is
/// child 1 and the method table child 2.
pub fn parse_module_init(cursor: &Cursor, file: &SourceFile) -> Option<(String, ModuleRecord)> {
    let name_arg = cursor.children.get(1)?;
    let token = first_token(name_arg)?;
    let name = strip_quotes(token)?;

    let method_maps = cursor
        .children
        .get(2)
        .map(resolve)
        .and_then(|v| v.ident().map(str::to_string))
        .into_iter()
        .collect();

    Some((name.to_string(), module_record(file, method_maps)))
}

/// `{PyModuleDef_HEAD_INIT, "name", doc, size, methods, ...}`, or the
/// designated `m_name` / `m_methods` fields.
pub fn parse_module_def(cursor: &Cursor, file: &SourceFile) -> Option<(String, ModuleRecord)> {
    let initializer = cursor.children.first()?;
    let fields = positional(initializer);

    let name = designated(initializer, "m_name")
        .and_then(Value::unquoted_owned)
        .or_else(|| fields.get(1).and_then(Value::unquoted).map(str::to_string))?;

    let methods = designated(initializer, "m_methods")
        .and_then(Value::ident_owned)
        .or_else(|| fields.get(4).and_then(Value::ident).map(str::to_string));

    Some((name, module_record(file, methods.into_iter().collect())))
}

fn module_record(file: &SourceFile, method_maps: Vec<String>) -> ModuleRecord {
    ModuleRecord {
        source: file.text(),
        path: file.path_string(),
        method_maps,
    }
}

/// Initializer entries without a designator, in order. Designated entries
/// do not occupy a positional slot.
fn positional(initializer: &Cursor) -> Vec<Value> {
    if !initializer.is(CursorKind::InitList) {
        return Vec::new();
    }
    initializer
        .children
        .iter()
        .filter(|c| !c.is(CursorKind::Designated))
        .map(resolve)
        .collect()
}

fn designated(initializer: &Cursor, field: &str) -> Option<Value> {
    initializer
        .children
        .iter()
        .find(|c| c.is(CursorKind::Designated) && c.spelling == field)
        .map(resolve)
}

fn first_token(cursor: &Cursor) -> Option<&str> {
    match cursor.children.first() {
        Some(child) if !cursor.is(CursorKind::StringLiteral) => first_token(child),
        _ if !cursor.spelling.is_empty() => Some(&cursor.spelling),
        _ => None,
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    s.strip_prefix('"')?.strip_suffix('"')
}
