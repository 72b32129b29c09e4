//! Per-task scratch directories

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory owned by one analysis
///
/// The directory and everything written into it are removed when the value
/// is dropped or [`ScratchDir::close`] is called.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a scratch directory under the system temp dir
    pub fn new(prefix: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self { dir })
    }

    /// Create a scratch directory under `root`, or the system temp dir when `None`
    pub fn new_in(root: Option<&Path>, prefix: &str) -> io::Result<Self> {
        match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(root)?;
                Ok(Self { dir })
            }
            None => Self::new(prefix),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Destination for the extracted audio track
    #[must_use]
    pub fn audio_path(&self) -> PathBuf {
        self.dir.path().join("audio.wav")
    }

    /// Remove the directory, reporting any failure
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}
