//! Builds and refreshes the index from a C source tree.
//!
//! Files are re-parsed only when their SHA-256 differs from the hash recorded
//! by the previous run. A file that fails to parse is skipped and keeps
//! whatever it contributed before; the run carries on with the next file.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CinspectError, Result};
use crate::extract::extract_file;
use crate::locator::SourceFile;
use crate::scan::scan_sources;
use crate::store::{IndexData, IndexStore};
use crate::syntax::{Frontend, TreeSitterFrontend};

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexerOptions {
    /// Syntax errors tolerated per file before it counts as a parse failure.
    pub max_errors: usize,
    /// Report parse failures as warnings instead of debug events.
    pub verbose: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct IndexReport {
    pub root: String,
    pub scanned_files: usize,
    pub indexed_files: usize,
    pub unchanged_files: usize,
    pub failed_files: usize,
}

pub struct Indexer<F = TreeSitterFrontend> {
    store: IndexStore,
    frontend: F,
    verbose: bool,
}

impl Indexer<TreeSitterFrontend> {
    pub fn new(index_path: impl Into<PathBuf>, options: IndexerOptions) -> Self {
        Self::with_frontend(
            index_path,
            TreeSitterFrontend::new(options.max_errors),
            options.verbose,
        )
    }
}

impl<F: Frontend> Indexer<F> {
    pub fn with_frontend(index_path: impl Into<PathBuf>, frontend: F, verbose: bool) -> Self {
        Self {
            store: IndexStore::new(index_path),
            frontend,
            verbose,
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Indexes a single file or every C file below a directory, then writes
    /// the index back once.
    ///
    /// Not safe to run concurrently against the same index file.
    pub fn index(&self, path: &Path) -> Result<IndexReport> {
        if !path.exists() {
            return Err(CinspectError::PathNotFound(path.to_path_buf()));
        }
        let root = std::fs::canonicalize(path).map_err(|e| CinspectError::io(path, e))?;

        let mut data = self.store.load()?;
        let mut report = IndexReport {
            root: root.to_string_lossy().to_string(),
            ..IndexReport::default()
        };

        if root.is_dir() {
            for source in scan_sources(&root) {
                self.update_file(&source, &mut data, &mut report);
            }
        } else {
            self.update_file(&root, &mut data, &mut report);
        }

        self.store.save(&data)?;
        info!(
            root = %report.root,
            scanned = report.scanned_files,
            indexed = report.indexed_files,
            unchanged = report.unchanged_files,
            failed = report.failed_files,
            "index updated"
        );
        Ok(report)
    }

    pub fn index_all<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<IndexReport>> {
        paths.iter().map(|p| self.index(p.as_ref())).collect()
    }

    fn update_file(&self, path: &Path, data: &mut IndexData, report: &mut IndexReport) {
        report.scanned_files += 1;

        let file = match SourceFile::read(path) {
            Ok(file) => file,
            Err(err) => {
                self.report_failure(&err.to_string());
                report.failed_files += 1;
                return;
            }
        };
        let key = file.path_string();
        let current_hash = hash_bytes(file.bytes());

        if data.hash_of(&key) == Some(current_hash.as_str()) {
            debug!(path = %key, "unchanged, skipping");
            report.unchanged_files += 1;
            return;
        }

        match self.frontend.parse(&file) {
            Ok(unit) => {
                let records = extract_file(&unit, &file);
                if records.is_empty() {
                    debug!(path = %key, "no definitions found");
                }
                debug!(
                    path = %key,
                    functions = records.methods.len(),
                    method_maps = records.method_names.len(),
                    types = records.objects.len(),
                    modules = records.modules.len(),
                    "indexed"
                );
                data.replace_file(&key, records, current_hash);
                report.indexed_files += 1;
            }
            Err(failure) => {
                self.report_failure(&failure.to_string());
                report.failed_files += 1;
            }
        }
    }

    fn report_failure(&self, message: &str) {
        if self.verbose {
            warn!("{message}");
        } else {
            debug!("{message}");
        }
    }
}

pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseFailure;
    use crate::syntax::Cursor;

    /// Stands in for a front end that cannot parse anything.
    struct BrokenFrontend;

    impl Frontend for BrokenFrontend {
        fn parse(&self, file: &SourceFile) -> std::result::Result<Cursor, ParseFailure> {
            Err(ParseFailure::new(file.path(), "broken"))
        }
    }

    const GREET: &str = "static PyObject*\ngreet(PyObject* self)\n{\n    Py_RETURN_NONE;\n}\n";
    const FAREWELL: &str =
        "static PyObject*\nfarewell(PyObject* self)\n{\n    Py_RETURN_NONE;\n}\n";

    #[test]
    fn missing_path_is_fatal() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let indexer = Indexer::new(dir.path().join("index.json"), IndexerOptions::default());
        let err = indexer.index(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, CinspectError::PathNotFound(_)));
        Ok(())
    }

    #[test]
    fn unchanged_file_is_not_reparsed() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let index_path = dir.path().join("index.json");
        let source = dir.path().join("greet.c");
        std::fs::write(&source, GREET)?;

        Indexer::new(&index_path, IndexerOptions::default()).index(&source)?;
        let before = IndexStore::new(&index_path).load()?;
        assert!(before.methods.contains_key("greet"));

        let report = Indexer::with_frontend(&index_path, BrokenFrontend, false).index(&source)?;
        assert_eq!(report.unchanged_files, 1);
        assert_eq!(report.failed_files, 0);
        assert_eq!(IndexStore::new(&index_path).load()?, before);
        Ok(())
    }

    #[test]
    fn parse_failure_keeps_previous_records_and_hash() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let index_path = dir.path().join("index.json");
        let source = dir.path().join("greet.c");
        std::fs::write(&source, GREET)?;
        Indexer::new(&index_path, IndexerOptions::default()).index(&source)?;
        let before = IndexStore::new(&index_path).load()?;

        std::fs::write(&source, FAREWELL)?;
        let report = Indexer::with_frontend(&index_path, BrokenFrontend, true).index(&source)?;
        assert_eq!(report.failed_files, 1);
        assert_eq!(IndexStore::new(&index_path).load()?, before);
        Ok(())
    }

    #[test]
    fn changed_file_replaces_only_its_own_records() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let index_path = dir.path().join("index.json");
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src)?;
        std::fs::write(src.join("a.c"), GREET)?;
        std::fs::write(src.join("b.c"), "int other(void)\n{\n    return 1;\n}\n")?;

        let indexer = Indexer::new(&index_path, IndexerOptions::default());
        let first = indexer.index(&src)?;
        assert_eq!(first.indexed_files, 2);

        std::fs::write(src.join("a.c"), FAREWELL)?;
        let second = indexer.index(&src)?;
        assert_eq!(second.indexed_files, 1);
        assert_eq!(second.unchanged_files, 1);

        let data = indexer.store().load()?;
        assert!(!data.methods.contains_key("greet"));
        assert!(data.methods["farewell"].source.starts_with("static PyObject*"));
        assert!(data.methods.contains_key("other"));
        assert_eq!(data.hashes.len(), 2);
        Ok(())
    }

    #[test]
    fn directory_failures_do_not_abort_the_run() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src)?;
        std::fs::write(src.join("bad.c"), "int f( { ;;; }}} )))\n")?;
        std::fs::write(src.join("good.c"), GREET)?;

        let indexer = Indexer::new(dir.path().join("index.json"), IndexerOptions::default());
        let report = indexer.index(&src)?;
        assert_eq!(report.scanned_files, 2);
        assert_eq!(report.failed_files, 1);
        assert_eq!(report.indexed_files, 1);

        let data = indexer.store().load()?;
        assert!(data.methods.contains_key("greet"));
        assert_eq!(data.hashes.len(), 1);
        Ok(())
    }

    #[test]
    fn hash_bytes_is_hex_sha256() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
