use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::ZipArchive;

pub const ARCHIVE_URL: &str = "https://github.com/punchagan/cinspect-data/archive/master.zip";

/// Downloads the prebuilt index archive and unpacks its JSON indexes into
/// `target_dir`. Returns the files written.
pub fn download_indexes(
    url: &str,
    target_dir: &Path,
    confirm: &mut dyn FnMut(&Path) -> bool,
) -> Result<Vec<PathBuf>> {
    let scratch = std::env::temp_dir().join(format!("cinspect-download-{}", std::process::id()));
    std::fs::create_dir_all(&scratch)
        .with_context(|| format!("Failed to create directory: {}", scratch.display()))?;

    let archive = scratch.join("master.zip");
    let result =
        fetch_archive(url, &archive).and_then(|()| install_indexes(&archive, target_dir, confirm));
    let _ = std::fs::remove_dir_all(&scratch);
    result
}

pub fn fetch_archive(url: &str, target_path: &Path) -> Result<()> {
    eprintln!("[cinspect] downloading {url} to {}", target_path.display());
    let status = std::process::Command::new("curl")
        .args([
            "-L",
            "--fail",
            "--silent",
            "--show-error",
            "-o",
            target_path
                .to_str()
                .context("archive target path is not valid UTF-8")?,
            url,
        ])
        .status()
        .context("Failed to execute curl (ensure curl is installed)")?;

    if !status.success() {
        anyhow::bail!("Failed to download index archive from {url} (exit status: {status})");
    }
    Ok(())
}

/// Copies every `*.json` entry of the archive into `target_dir`, flattening
/// the archive's directory layout. Existing files are replaced only when
/// `confirm` agrees.
pub fn install_indexes(
    archive_path: &Path,
    target_dir: &Path,
    confirm: &mut dyn FnMut(&Path) -> bool,
) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    // SAFETY: the file is opened read-only and outlives the map.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap archive: {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read zip archive: {}", archive_path.display()))?;

    std::fs::create_dir_all(target_dir)
        .with_context(|| format!("Failed to create directory: {}", target_dir.display()))?;

    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().ends_with(".json") {
            continue;
        }
        let Some(file_name) = Path::new(entry.name()).file_name().map(|n| n.to_os_string())
        else {
            continue;
        };

        let dst = target_dir.join(file_name);
        if dst.exists() && !confirm(&dst) {
            info!(path = %dst.display(), "kept existing index");
            continue;
        }

        let mut out = File::create(&dst)
            .with_context(|| format!("Failed to create file: {}", dst.display()))?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to write file: {}", dst.display()))?;
        info!(path = %dst.display(), "installed index");
        written.push(dst);
    }
    Ok(written)
}

/// Asks on stderr, reads the answer from stdin. Anything but `y...` is no.
pub fn prompt_overwrite(path: &Path) -> bool {
    eprint!("{} exists. Overwrite? [y/N] ", path.display());
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with('y')
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::FileOptions;

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
        let file = File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }

        zip.finish()?;
        Ok(())
    }

    #[test]
    fn installs_only_json_entries() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let archive = dir.path().join("master.zip");
        write_archive(
            &archive,
            &[
                ("cinspect-data-master/index-2.7.json", b"{}"),
                ("cinspect-data-master/index-3.5.json", b"{\"objects\": {}}"),
                ("cinspect-data-master/README.md", b"# data"),
            ],
        )?;

        let target = dir.path().join(".cinspect");
        let written = install_indexes(&archive, &target, &mut |_| true)?;
        assert_eq!(written.len(), 2);
        assert!(target.join("index-2.7.json").is_file());
        assert!(!target.join("README.md").exists());
        assert_eq!(std::fs::read_to_string(target.join("index-3.5.json"))?, "{\"objects\": {}}");
        Ok(())
    }

    #[test]
    fn declined_overwrite_keeps_existing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let archive = dir.path().join("master.zip");
        write_archive(&archive, &[("data/index.json", b"new")])?;
        let target = dir.path().join("out");
        std::fs::create_dir_all(&target)?;
        std::fs::write(target.join("index.json"), "old")?;

        let mut asked = Vec::new();
        let written = install_indexes(&archive, &target, &mut |p| {
            asked.push(p.to_path_buf());
            false
        })?;
        assert!(written.is_empty());
        assert_eq!(asked, vec![target.join("index.json")]);
        assert_eq!(std::fs::read_to_string(target.join("index.json"))?, "old");

        install_indexes(&archive, &target, &mut |_| true)?;
        assert_eq!(std::fs::read_to_string(target.join("index.json"))?, "new");
        Ok(())
    }

    #[test]
    fn only_y_answers_confirm() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" Yes "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }
}
