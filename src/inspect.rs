//! Entry points for embedding hosts: hand over a live object, get back the
//! C source (or file) implementing it.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::default_index_path;
use crate::object::{Introspect, classify};
use crate::reader::Reader;

/// Source of `obj`, or an empty string when the index has no entry for it.
///
/// Objects with native source never touch the index. Without an explicit
/// `index_path` the default index in the home directory is used.
pub fn getsource(obj: &dyn Introspect, index_path: Option<&Path>) -> Result<String> {
    let classified = classify(obj)?;
    Ok(reader(index_path)?.get_source(&classified)?)
}

/// File defining `obj`, or an empty path when the index has no entry for it.
pub fn getfile(obj: &dyn Introspect, index_path: Option<&Path>) -> Result<PathBuf> {
    let classified = classify(obj)?;
    Ok(reader(index_path)?.get_file(&classified)?)
}

fn reader(index_path: Option<&Path>) -> Result<Reader> {
    let path = match index_path {
        Some(p) => p.to_path_buf(),
        None => default_index_path()?,
    };
    Ok(Reader::new(path))
}
