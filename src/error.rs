use thiserror::Error;

use crate::chunk::ChunkError;
use crate::collect::{CollectError, CollectReport};
use crate::emit::EmitError;
use crate::file::FileError;
use crate::reassemble::{MaterializeError, ValidateError};
use crate::record::RecordError;

/// Any failure of a whole encode or restore run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error(transparent)]
    Validate(#[from] ValidateError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error("Scratch directory error: {0}")]
    Scratch(#[from] std::io::Error),
    #[error("Restored data differs from the input ({restored} of {original} bytes, first difference at {offset})")]
    VerifyMismatch { original: usize, restored: usize, offset: usize },
}

impl Error {
    /// Collector report attached to a failed restore, if any.
    pub fn collect_report(&self) -> Option<&CollectReport> {
        match self {
            Error::Collect(e) => e.report(),
            _ => None,
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;
