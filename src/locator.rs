//! Exact source text for byte ranges of a file.
//!
//! Decoding never fails: bytes are tried as UTF-8, then as ISO-8859-15, and
//! only then decoded lossily.

use std::path::{Path, PathBuf};

use crate::error::{CinspectError, Result};

/// Raw bytes of a source file, read once and sliced many times.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl SourceFile {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| CinspectError::io(path, e))?;
        Ok(Self::from_bytes(path, bytes))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Text of `start..end`, clamped to the file length.
    pub fn span(&self, start: usize, end: usize) -> String {
        let end = end.min(self.bytes.len());
        let start = start.min(end);
        decode(&self.bytes[start..end])
    }

    pub fn text(&self) -> String {
        decode(&self.bytes)
    }
}

pub fn decode(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    if let Some(text) = decode_latin9(bytes) {
        return text;
    }
    String::from_utf8_lossy(bytes).to_string()
}

/// ISO-8859-15: Latin-1 with eight code points replaced.
fn decode_latin9(bytes: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        let c = match b {
            0xA4 => '\u{20AC}',
            0xA6 => '\u{0160}',
            0xA8 => '\u{0161}',
            0xB4 => '\u{017D}',
            0xB8 => '\u{017E}',
            0xBC => '\u{0152}',
            0xBD => '\u{0153}',
            0xBE => '\u{0178}',
            _ => char::from_u32(u32::from(b))?,
        };
        out.push(c);
    }
    Some(out)
}
