//! Deterministic partitioning of a hex payload into chunks.

use thiserror::Error;
use crate::record::{Chunk, RecordLayout};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// A slice larger than the layout capacity. Indicates a mismatch between
    /// the size constants, never bad input.
    #[error("Chunk {index}: payload of {len} characters exceeds capacity {capacity}")]
    PayloadTooLarge { index: u64, len: usize, capacity: usize },
    #[error("Chunk {index}: declared payload length {declared} but carries {actual} characters")]
    LengthMismatch { index: u64, declared: u64, actual: usize },
    #[error("Payload byte {offset} is not ASCII")]
    NonAscii { offset: usize },
}

/// An ordered collection of chunks owned by exactly one pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSet {
    pub chunks: Vec<Chunk>,
}

impl ChunkSet {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> { self.chunks.iter() }
}

impl IntoIterator for ChunkSet {
    type Item = Chunk;
    type IntoIter = std::vec::IntoIter<Chunk>;
    fn into_iter(self) -> Self::IntoIter { self.chunks.into_iter() }
}

impl FromIterator<Chunk> for ChunkSet {
    fn from_iter<I: IntoIterator<Item = Chunk>>(iter: I) -> Self {
        Self { chunks: iter.into_iter().collect() }
    }
}

/// Number of chunks `payload_len` characters split into; an empty payload
/// still yields one (empty) chunk so `total_index` stays defined.
pub fn chunk_count(payload_len: usize, capacity: usize) -> usize {
    payload_len.div_ceil(capacity).max(1)
}

/// Split a hex payload into `ceil(len / capacity)` chunks.
///
/// Every chunk but the last carries exactly `capacity` characters; the last
/// carries the remainder.  A zero-length payload produces a single chunk
/// with `payload_length = 0`.
pub fn split(payload: &str, layout: &RecordLayout) -> Result<ChunkSet, ChunkError> {
    if let Some(offset) = payload.bytes().position(|b| !b.is_ascii()) {
        return Err(ChunkError::NonAscii { offset });
    }
    let capacity    = layout.capacity();
    let count       = chunk_count(payload.len(), capacity);
    let total_index = (count - 1) as u64;

    let mut chunks = Vec::with_capacity(count);
    for i in 0..count {
        let start = (i * capacity).min(payload.len());
        let end   = (start + capacity).min(payload.len());
        chunks.push(make_chunk(i as u64, total_index, &payload[start..end], capacity)?);
    }
    tracing::debug!(chunks = count, capacity, "split payload");
    Ok(ChunkSet::new(chunks))
}

fn make_chunk(index: u64, total_index: u64, slice: &str, capacity: usize) -> Result<Chunk, ChunkError> {
    let chunk = Chunk {
        index,
        total_index,
        payload_length: slice.len() as u64,
        payload:        slice.to_string(),
    };
    check_fits(&chunk, capacity)?;
    Ok(chunk)
}

/// Reject a chunk whose payload would not fit a record of `capacity`
/// characters, or whose declared length disagrees with its payload.
pub fn check_fits(chunk: &Chunk, capacity: usize) -> Result<(), ChunkError> {
    let len = chunk.payload.len();
    if len > capacity {
        return Err(ChunkError::PayloadTooLarge { index: chunk.index, len, capacity });
    }
    if chunk.payload_length != len as u64 {
        return Err(ChunkError::LengthMismatch { index: chunk.index, declared: chunk.payload_length, actual: len });
    }
    Ok(())
}
