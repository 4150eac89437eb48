//! Fixed-width text record: the unit handed to and read back from the
//! external symbol codec.
//!
//! # Layout
//! ```text
//! offset  0  index          20 chars, decimal, right-justified, space padded
//! offset 20  total_index    20 chars, decimal, right-justified, space padded
//! offset 40  payload_length 20 chars, decimal, right-justified, space padded
//! offset 60  payload        capacity chars, hex, right-justified, space padded
//! ```
//! The total width is the layout's `record_width` (1608 by default).  A
//! record of any other length is rejected before any field is parsed; that
//! check is the first line of defence against truncated scans.
//!
//! Twenty characters hold every `u64`, so no index the chunker can produce
//! overflows its field.

use thiserror::Error;

/// Width of one numeric header field.
pub const FIELD_WIDTH:  usize = 20;
/// Three numeric fields.
pub const HEADER_WIDTH: usize = 3 * FIELD_WIDTH;
/// Default record width; fits a version 40 QR code in byte mode at levels
/// L, M and Q.  Level H holds at most 1273 characters.
pub const DEFAULT_RECORD_WIDTH: usize = 1608;
/// Payload characters per record with the default layout.
pub const DEFAULT_CAPACITY: usize = DEFAULT_RECORD_WIDTH - HEADER_WIDTH;

const INDEX_POS:          usize = 0;
const TOTAL_INDEX_POS:    usize = FIELD_WIDTH;
const PAYLOAD_LENGTH_POS: usize = 2 * FIELD_WIDTH;
const PAYLOAD_POS:        usize = HEADER_WIDTH;

const PAD: char = ' ';

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Size mismatch: expected {expected} characters, got {found}")]
    SizeMismatch { expected: usize, found: usize },
    #[error("Malformed integer in {field} field: {value:?}")]
    MalformedInteger { field: &'static str, value: String },
    #[error("Payload length {declared} does not match payload field (capacity {capacity})")]
    PayloadLengthMismatch { declared: u64, capacity: usize },
    #[error("Invalid record layout: width {record_width} leaves capacity {capacity}; capacity must be even and non-zero")]
    InvalidLayout { record_width: usize, capacity: usize },
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Record geometry shared by the chunker and the record codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    record_width: usize,
}

impl RecordLayout {
    /// Build a layout with the given total record width.
    ///
    /// The capacity left after the header must be even and non-zero so that
    /// every chunk carries whole hex-encoded bytes.
    pub fn new(record_width: usize) -> Result<Self, RecordError> {
        let capacity = record_width.saturating_sub(HEADER_WIDTH);
        if capacity == 0 || capacity % 2 != 0 {
            return Err(RecordError::InvalidLayout { record_width, capacity });
        }
        Ok(Self { record_width })
    }

    #[inline]
    pub fn record_width(&self) -> usize { self.record_width }

    /// Payload characters available per record.
    #[inline]
    pub fn capacity(&self) -> usize { self.record_width - HEADER_WIDTH }
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self { record_width: DEFAULT_RECORD_WIDTH }
    }
}

// ── Chunk ────────────────────────────────────────────────────────────────────

/// One self-describing slice of a hex-encoded file.
///
/// `payload` holds only the meaningful characters; padding exists solely in
/// the record text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index:          u64,
    /// Index of the last chunk of the file; identical across one file.
    pub total_index:    u64,
    pub payload_length: u64,
    pub payload:        String,
}

impl Chunk {
    /// Number of chunks the file this chunk belongs to was split into.
    #[inline]
    pub fn expected_count(&self) -> u64 {
        self.total_index.saturating_add(1)
    }
}

// ── Codec ────────────────────────────────────────────────────────────────────

/// Serialize `chunk` into exactly `layout.record_width()` characters.
///
/// The caller guarantees `chunk.payload` fits the layout's capacity; the
/// chunker enforces this when building chunks.
pub fn encode_record(chunk: &Chunk, layout: &RecordLayout) -> String {
    format!(
        "{:>fw$}{:>fw$}{:>fw$}{:>pw$}",
        chunk.index,
        chunk.total_index,
        chunk.payload_length,
        chunk.payload,
        fw = FIELD_WIDTH,
        pw = layout.capacity(),
    )
}

/// Parse a record produced by [`encode_record`].
pub fn decode_record(text: &str, layout: &RecordLayout) -> Result<Chunk, RecordError> {
    // Byte length equals character length for every valid record; a
    // multi-byte character anywhere makes the slicing below unsafe, so it is
    // reported as a size mismatch on the character count.
    if text.len() != layout.record_width() || !text.is_ascii() {
        return Err(RecordError::SizeMismatch {
            expected: layout.record_width(),
            found:    text.chars().count(),
        });
    }

    let index          = parse_field(text, INDEX_POS, "index")?;
    let total_index    = parse_field(text, TOTAL_INDEX_POS, "total_index")?;
    let payload_length = parse_field(text, PAYLOAD_LENGTH_POS, "payload_length")?;

    let capacity = layout.capacity();
    let field    = &text[PAYLOAD_POS..];
    let declared = usize::try_from(payload_length)
        .ok()
        .filter(|&n| n <= capacity)
        .ok_or(RecordError::PayloadLengthMismatch { declared: payload_length, capacity })?;

    let (padding, payload) = field.split_at(capacity - declared);
    if !padding.chars().all(|c| c == PAD) {
        return Err(RecordError::PayloadLengthMismatch { declared: payload_length, capacity });
    }

    Ok(Chunk {
        index,
        total_index,
        payload_length,
        payload: payload.to_string(),
    })
}

fn parse_field(text: &str, pos: usize, field: &'static str) -> Result<u64, RecordError> {
    let raw    = &text[pos..pos + FIELD_WIDTH];
    let digits = raw.trim_start_matches(PAD);
    let malformed = || RecordError::MalformedInteger { field, value: raw.to_string() };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    digits.parse::<u64>().map_err(|_| malformed())
}
