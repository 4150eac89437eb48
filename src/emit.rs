//! Parallel emitter: one artifact per chunk.
//!
//! Every chunk is rendered independently on the worker pool.  The call
//! returns only after all workers have reported; failures are gathered into
//! a single [`AggregatedError`] ordered by chunk index, so one run surfaces
//! every defective chunk.  Artifacts written by successful workers are left
//! in place even when others fail.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::chunk::{check_fits, ChunkError, ChunkSet};
use crate::pool::{run_bounded, PoolError};
use crate::record::{encode_record, Chunk, RecordLayout};
use crate::symbol::{artifact_name, SymbolCodec, SymbolError};

/// Default artifact file name prefix.
pub const DEFAULT_PREFIX: &str = "img_";

#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub prefix: String,
    /// Worker limit; 0 means one per CPU.
    pub jobs:   usize,
    pub layout: RecordLayout,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            jobs:   0,
            layout: RecordLayout::default(),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Why one chunk could not be emitted.
#[derive(Error, Debug)]
pub enum ChunkFailureKind {
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, #[source] source: io::Error },
}

#[derive(Debug)]
pub struct ChunkFailure {
    pub index: u64,
    pub kind:  ChunkFailureKind,
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk {}: {}", self.index, self.kind)
    }
}

/// Every per-chunk failure of one emit run, in chunk index order.
#[derive(Debug)]
pub struct AggregatedError {
    pub attempted: usize,
    pub failures:  Vec<ChunkFailure>,
}

impl AggregatedError {
    pub fn failed_indices(&self) -> Vec<u64> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

impl fmt::Display for AggregatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} chunk(s) failed", self.failures.len(), self.attempted)?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregatedError {}

#[derive(Error, Debug)]
pub enum EmitError {
    #[error(transparent)]
    Aggregated(#[from] AggregatedError),
    #[error("Cannot prepare output directory {}: {source}", path.display())]
    OutputDir { path: PathBuf, #[source] source: io::Error },
    #[error("Records of {record_width} characters exceed the {codec} codec limit of {limit}")]
    RecordTooWide { record_width: usize, limit: usize, codec: &'static str },
    #[error(transparent)]
    Pool(#[from] PoolError),
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EmittedArtifact {
    pub index:         u64,
    pub path:          PathBuf,
    /// BLAKE3 of the record text.  Stable across runs for the same chunk,
    /// whatever the codec does with the text.
    pub record_digest: String,
    pub bytes:         u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmitReport {
    pub run_id:      Uuid,
    pub codec:       String,
    pub started_at:  i64,
    pub finished_at: i64,
    pub artifacts:   Vec<EmittedArtifact>,
}

impl EmitReport {
    pub fn summary(&self) -> String {
        let bytes: u64 = self.artifacts.iter().map(|a| a.bytes).sum();
        format!(
            "{} artifact(s) written with the {} codec, {} byte(s) total",
            self.artifacts.len(), self.codec, bytes,
        )
    }
}

// ── Emitter ──────────────────────────────────────────────────────────────────

/// Render every chunk of `set` into `output_dir/<prefix><index>.<ext>`.
pub fn emit_all(
    set:        ChunkSet,
    output_dir: &Path,
    codec:      &dyn SymbolCodec,
    opts:       &EmitOptions,
) -> Result<EmitReport, EmitError> {
    let started_at = Utc::now().timestamp();
    let record_width = opts.layout.record_width();
    if let Some(limit) = codec.max_record_width().filter(|&l| record_width > l) {
        return Err(EmitError::RecordTooWide { record_width, limit, codec: codec.name() });
    }
    fs::create_dir_all(output_dir).map_err(|source| EmitError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let attempted = set.len();
    tracing::info!(chunks = attempted, dir = %output_dir.display(), codec = codec.name(), "emitting artifacts");

    let results = run_bounded(set.chunks, opts.jobs, |chunk| {
        emit_one(&chunk, output_dir, codec, opts).map_err(|kind| {
            tracing::warn!(index = chunk.index, error = %kind, "chunk emit failed");
            ChunkFailure { index: chunk.index, kind }
        })
    })?;

    let mut artifacts = Vec::with_capacity(attempted);
    let mut failures  = Vec::new();
    for r in results {
        match r {
            Ok(a)  => artifacts.push(a),
            Err(f) => failures.push(f),
        }
    }
    if !failures.is_empty() {
        failures.sort_by_key(|f| f.index);
        return Err(AggregatedError { attempted, failures }.into());
    }

    Ok(EmitReport {
        run_id:      Uuid::new_v4(),
        codec:       codec.name().to_string(),
        started_at,
        finished_at: Utc::now().timestamp(),
        artifacts,
    })
}

fn emit_one(
    chunk:      &Chunk,
    output_dir: &Path,
    codec:      &dyn SymbolCodec,
    opts:       &EmitOptions,
) -> Result<EmittedArtifact, ChunkFailureKind> {
    check_fits(chunk, opts.layout.capacity())?;
    let text  = encode_record(chunk, &opts.layout);
    let image = codec.encode(&text)?;
    let path  = output_dir.join(artifact_name(&opts.prefix, chunk.index, codec.extension()));
    fs::write(&path, &image).map_err(|source| ChunkFailureKind::Write { path: path.clone(), source })?;
    tracing::debug!(index = chunk.index, path = %path.display(), "artifact written");
    Ok(EmittedArtifact {
        index:         chunk.index,
        path,
        record_digest: blake3::hash(text.as_bytes()).to_hex().to_string(),
        bytes:         image.len() as u64,
    })
}
