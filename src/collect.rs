//! Parallel collector: artifacts back to chunks.
//!
//! # How it works
//!
//! Directory entries are filtered by the artifact naming convention first;
//! only matching files are dispatched to the worker pool.  Each worker reads
//! its artifact, runs the symbol decoder and parses the record.  A worker
//! that fails contributes no chunk: the failure is logged and recorded in the
//! [`CollectReport`], never propagated on its own.  Whether the surviving
//! chunks are usable is decided later by [`crate::reassemble::validate`].
//!
//! ## Entry outcomes
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Decoded` | Artifact decoded into a chunk |
//! | `Skipped` | Name does not match `<prefix>*.<ext>`, or not a regular file |
//! | `Failed` | Matching artifact that could not be read, scanned or parsed |
//!
//! Skipped and failed entries are kept apart in both the logs (`debug` vs
//! `warn`) and the report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::chunk::ChunkSet;
use crate::emit::DEFAULT_PREFIX;
use crate::pool::{run_bounded, PoolError};
use crate::record::{decode_record, Chunk, RecordError, RecordLayout};
use crate::symbol::{is_artifact_name, SymbolCodec, SymbolError};

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub prefix: String,
    /// Worker limit; 0 means one per CPU.
    pub jobs:   usize,
    pub layout: RecordLayout,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            jobs:   0,
            layout: RecordLayout::default(),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Cannot list {}: {source}", path.display())]
    ReadDir { path: PathBuf, #[source] source: io::Error },
    #[error("No chunk could be extracted ({dispatched} artifact(s) tried)")]
    NoElementsExtracted { dispatched: usize, report: Box<CollectReport> },
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl CollectError {
    /// The per-entry report, when the run got far enough to produce one.
    pub fn report(&self) -> Option<&CollectReport> {
        match self {
            CollectError::NoElementsExtracted { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

/// Why one artifact yielded no chunk.
#[derive(Error, Debug)]
enum ArtifactFailure {
    #[error("read failed: {0}")]
    Read(#[from] io::Error),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Decoded { index: u64 },
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEntry {
    pub path:    PathBuf,
    #[serde(flatten)]
    pub outcome: ArtifactOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectReport {
    pub run_id:      Uuid,
    pub codec:       String,
    pub started_at:  i64,
    pub finished_at: i64,
    pub entries:     Vec<ArtifactEntry>,
}

impl CollectReport {
    fn count(&self, pred: impl Fn(&ArtifactOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    pub fn decoded(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Decoded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Failed { .. }))
    }

    pub fn failed_paths(&self) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, ArtifactOutcome::Failed { .. }))
            .map(|e| e.path.as_path())
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} decoded, {} failed, {} skipped ({} entries, {} codec)",
            self.decoded(), self.failed(), self.skipped(), self.entries.len(), self.codec,
        )
    }
}

// ── Collector ────────────────────────────────────────────────────────────────

/// Decode every `<prefix>*.<ext>` artifact in `input_dir`.
///
/// Returns the decoded chunks in no particular order together with a report
/// covering every directory entry.
pub fn collect_all(
    input_dir: &Path,
    codec:     &dyn SymbolCodec,
    opts:      &CollectOptions,
) -> Result<(ChunkSet, CollectReport), CollectError> {
    let read_dir_err = |source: io::Error| CollectError::ReadDir { path: input_dir.to_path_buf(), source };

    let mut listing = Vec::new();
    for entry in fs::read_dir(input_dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        listing.push((entry.path(), is_file));
    }
    listing.sort();

    let mut skipped  = Vec::new();
    let mut selected = Vec::new();
    for (path, is_file) in listing {
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| is_artifact_name(n, &opts.prefix, codec.extension()));
        if matches && is_file {
            selected.push(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping non-artifact entry");
            skipped.push(ArtifactEntry { path, outcome: ArtifactOutcome::Skipped });
        }
    }
    tracing::info!(
        dir = %input_dir.display(),
        artifacts = selected.len(),
        skipped = skipped.len(),
        "collecting artifacts"
    );

    let dispatched = selected.len();
    let (chunks, mut report) = decode_paths(selected, codec, opts)?;
    report.entries.extend(skipped);
    report.entries.sort_by(|a, b| a.path.cmp(&b.path));
    finish(chunks, report, dispatched)
}

/// Decode an explicit list of artifact paths.  No name filtering applies.
pub fn collect_files(
    paths: Vec<PathBuf>,
    codec: &dyn SymbolCodec,
    opts:  &CollectOptions,
) -> Result<(ChunkSet, CollectReport), CollectError> {
    let dispatched = paths.len();
    let (chunks, report) = decode_paths(paths, codec, opts)?;
    finish(chunks, report, dispatched)
}

fn decode_paths(
    paths: Vec<PathBuf>,
    codec: &dyn SymbolCodec,
    opts:  &CollectOptions,
) -> Result<(Vec<Chunk>, CollectReport), CollectError> {
    let started_at = Utc::now().timestamp();

    let results = run_bounded(paths, opts.jobs, |path| {
        let outcome = decode_one(&path, codec, &opts.layout);
        (path, outcome)
    })?;

    let mut chunks  = Vec::with_capacity(results.len());
    let mut entries = Vec::with_capacity(results.len());
    for (path, outcome) in results {
        match outcome {
            Ok(chunk) => {
                tracing::debug!(path = %path.display(), index = chunk.index, "artifact decoded");
                entries.push(ArtifactEntry { path, outcome: ArtifactOutcome::Decoded { index: chunk.index } });
                chunks.push(chunk);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "artifact could not be decoded");
                entries.push(ArtifactEntry { path, outcome: ArtifactOutcome::Failed { reason: e.to_string() } });
            }
        }
    }

    let report = CollectReport {
        run_id:      Uuid::new_v4(),
        codec:       codec.name().to_string(),
        started_at,
        finished_at: Utc::now().timestamp(),
        entries,
    };
    Ok((chunks, report))
}

fn finish(chunks: Vec<Chunk>, report: CollectReport, dispatched: usize) -> Result<(ChunkSet, CollectReport), CollectError> {
    tracing::info!("{}", report.summary());
    if chunks.is_empty() {
        return Err(CollectError::NoElementsExtracted { dispatched, report: Box::new(report) });
    }
    Ok((ChunkSet::new(chunks), report))
}

fn decode_one(path: &Path, codec: &dyn SymbolCodec, layout: &RecordLayout) -> Result<Chunk, ArtifactFailure> {
    let bytes = fs::read(path)?;
    let text  = codec.decode(&bytes)?;
    Ok(decode_record(&text, layout)?)
}
