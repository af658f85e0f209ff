//! Looks classified objects up in an existing index.
//!
//! A missing index is an error. A symbol missing from an existing index is
//! a soft miss and resolves to an empty source or path.

use std::path::PathBuf;

use crate::error::Result;
use crate::object::InspectObject;
use crate::store::{IndexData, IndexStore, SourceRecord};

#[derive(Debug, Clone)]
pub struct Reader {
    store: IndexStore,
}

impl Reader {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            store: IndexStore::new(index_path),
        }
    }

    pub fn get_source(&self, obj: &InspectObject) -> Result<String> {
        if let InspectObject::Plain { native, .. } = obj {
            return Ok(native.source.clone());
        }
        Ok(self.lookup(obj)?.map(|r| r.source).unwrap_or_default())
    }

    pub fn get_file(&self, obj: &InspectObject) -> Result<PathBuf> {
        if let InspectObject::Plain { native, .. } = obj {
            return Ok(native.file.clone());
        }
        Ok(self
            .lookup(obj)?
            .map(|r| PathBuf::from(r.path))
            .unwrap_or_default())
    }

    /// `Ok(None)` is a soft miss.
    pub fn lookup(&self, obj: &InspectObject) -> Result<Option<SourceRecord>> {
        let data = self.store.load_existing()?;
        Ok(find_record(&data, obj))
    }
}

pub fn find_record(data: &IndexData, obj: &InspectObject) -> Option<SourceRecord> {
    match obj {
        InspectObject::Plain { native, .. } => Some(SourceRecord {
            source: native.source.clone(),
            path: native.file.to_string_lossy().to_string(),
        }),
        InspectObject::Type { name, .. } => data.objects.get(name).map(|r| SourceRecord {
            source: r.source.clone(),
            path: r.path.clone(),
        }),
        InspectObject::Module { name } => data.modules.get(name).map(|r| SourceRecord {
            source: r.source.clone(),
            path: r.path.clone(),
        }),
        InspectObject::BuiltinFunction { .. }
        | InspectObject::BuiltinMethod { .. }
        | InspectObject::MethodDescriptor { .. } => {
            find_method(data, obj.name(), obj.type_name(), obj.module_name()).cloned()
        }
    }
}

/// Scans method maps in key order and settles on the first map that lists
/// `name` with an implementation whose C name starts with the enclosing
/// type's name and with the module name (leading underscores dropped).
///
/// This is a heuristic. When several maps pass the prefix checks the choice
/// depends on map order alone.
pub fn find_method<'a>(
    data: &'a IndexData,
    name: &str,
    type_name: Option<&str>,
    module: Option<&str>,
) -> Option<&'a SourceRecord> {
    let c_name = data.method_names.values().find_map(|group| {
        let c_name = group.get(name)?;
        if let Some(type_name) = type_name
            && !c_name.starts_with(type_name)
        {
            return None;
        }
        if let Some(module) = module
            && !c_name.starts_with(module.trim_start_matches('_'))
        {
            return None;
        }
        Some(c_name)
    })?;
    data.methods.get(c_name)
}
