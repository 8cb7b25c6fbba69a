//! File helpers for reading inputs and persisting staged outputs

use std::{
    fs::{self, File},
    io::{Read, Write},
    path::Path,
};

use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Reads the entire contents of a file into a byte vector.
#[instrument]
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Writes a byte slice to a file, creating or overwriting it, and syncs it.
#[instrument(skip(data), fields(len = data.len()))]
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

/// Checks if a path is a regular readable file.
pub fn is_readable_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Ensures parent directory exists for a file path.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Moves a file, overwriting the target. Falls back to copy and remove when
/// a rename is not possible, e.g. across filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if !is_readable_file(from) {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a file", from.display()),
        )));
    }
    ensure_parent_dir(to)?;
    if to.exists() {
        fs::remove_file(to)?;
    }
    if let Err(e) = fs::rename(from, to) {
        debug!("rename {} -> {} failed ({}), copying", from.display(), to.display(), e);
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}
