use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub const SOURCE_EXTENSION: &str = "c";

pub fn is_c_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

/// Every C source below `base_path`, each directory's entries in file-name
/// order. Ignore files are not honoured; a vendored tree is indexed in full.
pub fn scan_sources(base_path: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut sources = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_some_and(|t| t.is_file()) && is_c_source(path) {
                    sources.push(path.to_path_buf());
                }
            }
            Err(err) => tracing::debug!("skipping unreadable entry: {err}"),
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_sources_finds_c_files_in_sorted_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        fs::create_dir_all(root.join("Modules"))?;
        fs::write(root.join("b.c"), "")?;
        fs::write(root.join("a.C"), "")?;
        fs::write(root.join("a.h"), "")?;
        fs::write(root.join("Modules").join("gcmodule.c"), "")?;
        fs::write(root.join(".gitignore"), "*.c\n")?;

        let found: Vec<String> = scan_sources(root)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(found, vec!["Modules/gcmodule.c", "a.C", "b.c"]);
        Ok(())
    }

    #[test]
    fn is_c_source_ignores_headers() {
        assert!(is_c_source(Path::new("x/listobject.c")));
        assert!(!is_c_source(Path::new("x/listobject.h")));
        assert!(!is_c_source(Path::new("Makefile")));
    }
}
