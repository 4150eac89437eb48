//! Whole-file buffer read at the start of encoding and written at the end of
//! restoring.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Cannot read {}: {source}", path.display())]
    Read { path: PathBuf, #[source] source: io::Error },
    #[error("Cannot write {}: {source}", path.display())]
    Write { path: PathBuf, #[source] source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBuffer {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl FileBuffer {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self { path: path.into(), data }
    }

    /// Read the whole file into memory.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| FileError::Read { path: path.to_path_buf(), source })?;
        Ok(Self::new(path, data))
    }

    /// Write the buffer to `self.path`, creating missing parent directories.
    pub fn write(&self) -> Result<(), FileError> {
        let err = |source: io::Error| FileError::Write { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(err)?;
        }
        fs::write(&self.path, &self.data).map_err(err)
    }

    /// Lowercase hex of the contents; the payload alphabet never contains the
    /// record padding character.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }

    /// File name for logs, falling back to the full path.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_parents_and_read_restores() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/result.bin");
        FileBuffer::new(&path, vec![0, 1, 0xfe]).write().unwrap();
        let back = FileBuffer::read(&path).unwrap();
        assert_eq!(back.data, vec![0, 1, 0xfe]);
        assert_eq!(back.to_hex(), "0001fe");
        assert_eq!(back.name(), "result.bin");
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = FileBuffer::read("/nonexistent/qrfile/input").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/qrfile/input"));
    }
}
