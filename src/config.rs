use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

pub const INDEX_ENV: &str = "CINSPECT_INDEX";
pub const INDEX_FILE_NAME: &str = ".index.json";

pub fn resolve_index_path(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = flag {
        return Ok(p.to_path_buf());
    }

    if let Some(p) = env::var_os(INDEX_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }

    default_index_path()
}

pub fn default_index_path() -> Result<PathBuf> {
    Ok(home()?.join(INDEX_FILE_NAME))
}

/// Where downloaded index data is unpacked.
pub fn cinspect_home() -> Result<PathBuf> {
    Ok(home()?.join(".cinspect"))
}

fn home() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to resolve home directory"))
}
