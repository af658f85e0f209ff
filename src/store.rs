//! Persistent index of C definitions.
//!
//! The index is a single pretty-printed JSON document with five top-level
//! mappings: `objects`, `modules`, `method_names`, `methods` and `hashes`.
//! It is read whole, mutated in memory and written back whole. Two indexing
//! runs against the same file are not coordinated; the last writer wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CinspectError, Result};

/// A function definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: String,
    pub path: String,
}

/// A type-descriptor literal, keyed by the type's Python-visible name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub source: String,
    pub path: String,
    #[serde(default)]
    pub references: Vec<String>,
}

/// A module registration. `source` is the whole compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub source: String,
    pub path: String,
    #[serde(default)]
    pub method_maps: Vec<String>,
}

/// Python-visible method name -> C function name.
pub type MethodMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexData {
    #[serde(default)]
    pub objects: BTreeMap<String, TypeRecord>,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleRecord>,
    #[serde(default)]
    pub method_names: BTreeMap<String, MethodMap>,
    #[serde(default)]
    pub methods: BTreeMap<String, SourceRecord>,
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
}

/// Everything one compilation unit contributes to the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecords {
    pub objects: BTreeMap<String, TypeRecord>,
    pub modules: BTreeMap<String, ModuleRecord>,
    pub method_names: BTreeMap<String, MethodMap>,
    pub methods: BTreeMap<String, SourceRecord>,
}

impl FileRecords {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
            && self.modules.is_empty()
            && self.method_names.is_empty()
            && self.methods.is_empty()
    }
}

impl IndexData {
    pub fn hash_of(&self, path: &str) -> Option<&str> {
        self.hashes.get(path).map(String::as_str)
    }

    /// Drops every record previously contributed by `path`, then merges the
    /// fresh ones over the existing mappings. Method maps carry no path; a
    /// map goes with the file when every C name it lists was defined there.
    pub fn replace_file(&mut self, path: &str, records: FileRecords, hash: String) {
        let methods = &self.methods;
        self.method_names.retain(|_, group| {
            group.is_empty()
                || !group
                    .values()
                    .all(|c_name| methods.get(c_name).is_some_and(|r| r.path == path))
        });
        self.objects.retain(|_, r| r.path != path);
        self.modules.retain(|_, r| r.path != path);
        self.methods.retain(|_, r| r.path != path);

        self.objects.extend(records.objects);
        self.modules.extend(records.modules);
        self.method_names.extend(records.method_names);
        self.methods.extend(records.methods);
        self.hashes.insert(path.to_string(), hash);
    }

    pub fn stats(&self, index_path: &Path) -> IndexStats {
        IndexStats {
            index_path: index_path.to_string_lossy().to_string(),
            objects: self.objects.len() as u64,
            modules: self.modules.len() as u64,
            method_maps: self.method_names.len() as u64,
            methods: self.methods.len() as u64,
            indexed_files: self.hashes.len() as u64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the index, treating a missing file as an empty index.
    pub fn load(&self) -> Result<IndexData> {
        if !self.exists() {
            return Ok(IndexData::default());
        }
        self.read()
    }

    /// Reads the index, failing with `IndexNotFound` when it is absent.
    pub fn load_existing(&self) -> Result<IndexData> {
        if !self.exists() {
            return Err(CinspectError::IndexNotFound(self.path.clone()));
        }
        self.read()
    }

    pub fn save(&self, data: &IndexData) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CinspectError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(data).map_err(|e| CinspectError::Json {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(|e| CinspectError::io(&self.path, e))
    }

    fn read(&self) -> Result<IndexData> {
        let raw =
            std::fs::read_to_string(&self.path).map_err(|e| CinspectError::io(&self.path, e))?;
        serde_json::from_str(&raw).map_err(|e| CinspectError::Json {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub index_path: String,
    pub objects: u64,
    pub modules: u64,
    pub method_maps: u64,
    pub methods: u64,
    pub indexed_files: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexData {
        let mut data = IndexData::default();
        data.objects.insert(
            "list".to_string(),
            TypeRecord {
                source: "PyTypeObject PyList_Type = {...};".to_string(),
                path: "/src/listobject.c".to_string(),
                references: vec!["list_dealloc".to_string()],
            },
        );
        data.modules.insert(
            "hello".to_string(),
            ModuleRecord {
                source: "#include <Python.h>\n".to_string(),
                path: "/src/hellomodule.c".to_string(),
                method_maps: vec!["HelloMethods".to_string()],
            },
        );
        data.method_names.insert(
            "HelloMethods".to_string(),
            MethodMap::from([("say_hello".to_string(), "say_hello".to_string())]),
        );
        data.methods.insert(
            "say_hello".to_string(),
            SourceRecord {
                source: "static PyObject*\nsay_hello(void)\n{}".to_string(),
                path: "/src/hellomodule.c".to_string(),
            },
        );
        data.hashes.insert("/src/hellomodule.c".to_string(), "abc123".to_string());
        data
    }

    #[test]
    fn write_then_read_preserves_every_mapping() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = IndexStore::new(dir.path().join("nested").join("index.json"));
        let data = sample();
        store.save(&data)?;

        let back = store.load()?;
        assert_eq!(back.objects, data.objects);
        assert_eq!(back.modules, data.modules);
        assert_eq!(back.method_names, data.method_names);
        assert_eq!(back.methods, data.methods);
        assert_eq!(back.hashes, data.hashes);
        Ok(())
    }

    #[test]
    fn saved_index_is_indented_json() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = IndexStore::new(dir.path().join("index.json"));
        store.save(&sample())?;
        let raw = std::fs::read_to_string(store.path())?;
        assert!(raw.contains("\n  \"objects\": {"));
        Ok(())
    }

    #[test]
    fn missing_file_loads_empty_but_load_existing_fails() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = IndexStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load()?, IndexData::default());
        assert!(matches!(
            store.load_existing(),
            Err(CinspectError::IndexNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn partial_documents_read_permissively() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"methods": {"f": {"source": "void f(void) {}", "path": "a.c"}}}"#,
        )?;
        let data = IndexStore::new(&path).load()?;
        assert_eq!(data.methods["f"].path, "a.c");
        assert!(data.objects.is_empty());
        assert!(data.hashes.is_empty());
        Ok(())
    }

    #[test]
    fn replace_file_drops_stale_records_of_that_file_only() {
        let mut data = sample();
        data.methods.insert(
            "other".to_string(),
            SourceRecord {
                source: "void other(void) {}".to_string(),
                path: "/src/other.c".to_string(),
            },
        );

        let mut fresh = FileRecords::default();
        fresh.methods.insert(
            "say_goodbye".to_string(),
            SourceRecord {
                source: "void say_goodbye(void) {}".to_string(),
                path: "/src/hellomodule.c".to_string(),
            },
        );
        data.replace_file("/src/hellomodule.c", fresh, "def456".to_string());

        assert!(!data.methods.contains_key("say_hello"));
        assert!(!data.modules.contains_key("hello"));
        assert!(data.methods.contains_key("say_goodbye"));
        assert!(data.methods.contains_key("other"));
        assert!(data.objects.contains_key("list"));
        assert_eq!(data.hash_of("/src/hellomodule.c"), Some("def456"));
    }

    #[test]
    fn replace_file_drops_method_maps_defined_only_by_that_file() {
        let mut data = sample();
        data.methods.insert(
            "other".to_string(),
            SourceRecord {
                source: "void other(void) {}".to_string(),
                path: "/src/other.c".to_string(),
            },
        );
        data.method_names.insert(
            "OtherMethods".to_string(),
            MethodMap::from([("other".to_string(), "other".to_string())]),
        );
        data.method_names.insert(
            "SharedMethods".to_string(),
            MethodMap::from([
                ("say_hello".to_string(), "say_hello".to_string()),
                ("other".to_string(), "other".to_string()),
            ]),
        );

        data.replace_file("/src/hellomodule.c", FileRecords::default(), "def456".to_string());
        assert!(!data.method_names.contains_key("HelloMethods"));
        assert!(data.method_names.contains_key("OtherMethods"));
        assert!(data.method_names.contains_key("SharedMethods"));

        let mut fresh = FileRecords::default();
        fresh.method_names.insert(
            "HelloMethods".to_string(),
            MethodMap::from([("say_hi".to_string(), "say_hi".to_string())]),
        );
        data.replace_file("/src/hellomodule.c", fresh, "0ff1ce".to_string());
        assert_eq!(data.method_names["HelloMethods"]["say_hi"], "say_hi");
    }

    #[test]
    fn stats_counts_each_mapping() {
        let stats = sample().stats(Path::new("/tmp/index.json"));
        assert_eq!(stats.objects, 1);
        assert_eq!(stats.modules, 1);
        assert_eq!(stats.method_maps, 1);
        assert_eq!(stats.methods, 1);
        assert_eq!(stats.indexed_files, 1);
    }
}
