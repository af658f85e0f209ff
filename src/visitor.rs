//! Recognizes the cursor shapes that matter for indexing.
//!
//! These are coding conventions of CPython extension modules rather than
//! grammar rules, so every check is a heuristic on a cursor's kind, spelling,
//! declared type and immediate children.

use crate::syntax::{Cursor, CursorKind};

pub const METHOD_TABLE_TYPE: &str = "PyMethodDef";
pub const TYPE_OBJECT_TYPE: &str = "PyTypeObject";
pub const MODULE_DEF_TYPE: &str = "PyModuleDef";
pub const MODULE_INIT_PREFIX: &str = "Py_InitModule";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Function,
    MethodTable,
    TypeObject,
    /// `Py_InitModule*("name", methods, ...)`
    ModuleInit,
    /// `struct PyModuleDef def = {PyModuleDef_HEAD_INIT, "name", ...}`
    ModuleDef,
}

pub fn classify(cursor: &Cursor) -> Option<Shape> {
    match cursor.kind {
        CursorKind::FunctionDecl if !cursor.spelling.is_empty() => Some(Shape::Function),
        CursorKind::VarDecl => classify_var_decl(cursor),
        CursorKind::CallExpr if cursor.spelling.starts_with(MODULE_INIT_PREFIX) => {
            Some(Shape::ModuleInit)
        }
        _ => None,
    }
}

fn classify_var_decl(cursor: &Cursor) -> Option<Shape> {
    let initializer = cursor.children.first()?;
    match cursor.type_name.as_deref()? {
        METHOD_TABLE_TYPE if initializer.is(CursorKind::InitList) => Some(Shape::MethodTable),
        TYPE_OBJECT_TYPE => Some(Shape::TypeObject),
        MODULE_DEF_TYPE if initializer.is(CursorKind::InitList) => Some(Shape::ModuleDef),
        _ => None,
    }
}

/// Pre-order walk over every cursor. Children are visited whether or not
/// their parent matched; a module-init call lives inside a function body.
pub fn visit<F>(cursor: &Cursor, f: &mut F)
where
    F: FnMut(&Cursor, Shape),
{
    if let Some(shape) = classify(cursor) {
        f(cursor, shape);
    }
    for child in &cursor.children {
        visit(child, f);
    }
}
