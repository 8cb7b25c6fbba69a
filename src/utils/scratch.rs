//! Per-invocation scratch directories
//!
//! Each notarization gets its own uniquely named directory. It is removed
//! when the [`ScratchSpace`] is dropped, on success and failure alike.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ScratchConfig;
use crate::error::{Error, Result};

pub struct ScratchSpace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchSpace {
    /// Creates `<root>/<prefix><uuid>-XXXXXX`, with the system temp dir as default root
    pub fn create(config: &ScratchConfig) -> Result<Self> {
        let prefix = format!("{}{}-", config.prefix, Uuid::new_v4());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match &config.root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        debug!("created scratch directory {}", path.display());
        Ok(Self { dir: Some(dir), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `name` inside the scratch directory. Names with path
    /// separators or parent components are rejected.
    pub fn file(&self, name: &str) -> Result<PathBuf> {
        let candidate = Path::new(name);
        let plain = candidate.components().count() == 1 && candidate.file_name().is_some();
        if !plain {
            return Err(Error::Config(format!("'{}' is not a plain file name", name)));
        }
        Ok(self.path.join(name))
    }

    /// Removes the directory now and reports the outcome
    pub fn close(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => Ok(dir.close()?),
            None => Ok(()),
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!("failed to remove scratch directory {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &Path) -> ScratchConfig {
        ScratchConfig {
            root: Some(root.to_path_buf()),
            prefix: "test-".into(),
        }
    }

    #[test]
    fn test_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchSpace::create(&config(root.path())).unwrap();
            fs::write(scratch.file("a.pdf").unwrap(), b"x").unwrap();
            assert!(scratch.path().starts_with(root.path()));
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_unique_names_and_close() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchSpace::create(&config(root.path())).unwrap();
        let b = ScratchSpace::create(&config(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
        let a_path = a.path().to_path_buf();
        a.close().unwrap();
        assert!(!a_path.exists());
        assert!(b.path().exists());
    }

    #[test]
    fn test_rejects_nested_names() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::create(&config(root.path())).unwrap();
        assert!(scratch.file("../escape.pdf").is_err());
        assert!(scratch.file("a/b.pdf").is_err());
        assert!(scratch.file("ok.raw.pdf").is_ok());
    }
}
