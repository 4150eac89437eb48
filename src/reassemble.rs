//! Reassembly: validate a collected chunk set, then materialize the bytes.
//!
//! Validation runs these checks in order, on a copy sorted by index:
//!
//! 1. every chunk agrees on `total_index`   → `InconsistentTotal`
//! 2. at least `total_index + 1` chunks      → `IncompleteSet`
//! 3. no two chunks share an index           → `DuplicateElement`
//! 4. every index lies in `0..=total_index`  → `IndexOutOfRange`
//!
//! Passing all four means the set is exactly `0..=total_index`, in order.

use thiserror::Error;
use crate::chunk::ChunkSet;
use crate::record::Chunk;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidateError {
    #[error("Chunk set is empty")]
    Empty,
    #[error("Chunk {index} declares total index {found}, other chunks declare {expected}")]
    InconsistentTotal { index: u64, expected: u64, found: u64 },
    #[error("Incomplete set: expected {expected} chunk(s), got {found}")]
    IncompleteSet { expected: u64, found: usize },
    #[error("Duplicate chunk index {index}")]
    DuplicateElement { index: u64 },
    #[error("Chunk index {index} is beyond total index {total_index}")]
    IndexOutOfRange { index: u64, total_index: u64 },
}

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Chunk {index}: payload is not valid hex: {source}")]
    HexDecode { index: u64, #[source] source: hex::FromHexError },
}

/// A chunk set proven to be exactly `0..=total_index`, sorted.
///
/// Only [`validate`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedChunkSet {
    chunks: Vec<Chunk>,
}

impl SortedChunkSet {
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn into_inner(self) -> Vec<Chunk> { self.chunks }
}

/// Sort `set` by index and prove it complete and duplicate-free.
pub fn validate(set: ChunkSet) -> Result<SortedChunkSet, ValidateError> {
    let mut chunks = set.chunks;
    let first = chunks.first().ok_or(ValidateError::Empty)?;
    let total_index = first.total_index;
    let expected    = first.expected_count();

    // The first chunk is the reference; any disagreement fails the set.
    if let Some(odd) = chunks.iter().find(|c| c.total_index != total_index) {
        return Err(ValidateError::InconsistentTotal {
            index:    odd.index,
            expected: total_index,
            found:    odd.total_index,
        });
    }

    chunks.sort_by_key(|c| c.index);

    if (chunks.len() as u64) < expected {
        return Err(ValidateError::IncompleteSet { expected, found: chunks.len() });
    }

    if let Some(pair) = chunks.windows(2).find(|w| w[0].index == w[1].index) {
        return Err(ValidateError::DuplicateElement { index: pair[0].index });
    }

    if let Some(last) = chunks.last().filter(|c| c.index > total_index) {
        return Err(ValidateError::IndexOutOfRange { index: last.index, total_index });
    }

    tracing::debug!(chunks = chunks.len(), "chunk set validated");
    Ok(SortedChunkSet { chunks })
}

/// Concatenate the hex-decoded payloads, in index order.
pub fn materialize(set: &SortedChunkSet) -> Result<Vec<u8>, MaterializeError> {
    let mut out = Vec::with_capacity(set.chunks.iter().map(|c| c.payload.len() / 2).sum());
    for chunk in &set.chunks {
        let bytes = hex::decode(&chunk.payload)
            .map_err(|source| MaterializeError::HexDecode { index: chunk.index, source })?;
        out.extend_from_slice(&bytes);
    }
    Ok(out)
}
