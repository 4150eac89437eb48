//! End-to-end runs: file to artifacts, artifacts to file, and a self-check
//! doing both in a scratch directory.

use std::path::{Path, PathBuf};

use crate::chunk::split;
use crate::collect::{collect_all, collect_files, CollectOptions, CollectReport};
use crate::emit::{emit_all, EmitOptions, EmitReport};
use crate::error::{Error, Result};
use crate::file::FileBuffer;
use crate::reassemble::{materialize, validate};
use crate::symbol::SymbolCodec;

/// Where restore looks for artifacts.
#[derive(Debug, Clone)]
pub enum Source {
    /// Every `<prefix>*.<ext>` file in a directory.
    Directory(PathBuf),
    /// An explicit list of artifacts, taken as-is.
    Files(Vec<PathBuf>),
}

impl From<&EmitOptions> for CollectOptions {
    fn from(opts: &EmitOptions) -> Self {
        Self {
            prefix: opts.prefix.clone(),
            jobs:   opts.jobs,
            layout: opts.layout,
        }
    }
}

/// Split `input` into chunks and write one artifact per chunk into
/// `output_dir`.
pub fn encode_file(
    input:      &Path,
    output_dir: &Path,
    codec:      &dyn SymbolCodec,
    opts:       &EmitOptions,
) -> Result<EmitReport> {
    let file = FileBuffer::read(input)?;
    tracing::info!(
        file = %file.name(),
        bytes = file.data.len(),
        dir = %output_dir.display(),
        prefix = %opts.prefix,
        "encoding file"
    );
    let set = split(&file.to_hex(), &opts.layout)?;
    let report = emit_all(set, output_dir, codec, opts)?;
    tracing::info!("{}", report.summary());
    Ok(report)
}

/// Collect artifacts, validate them and write the reassembled file.
pub fn restore_file(
    source: &Source,
    output: &Path,
    codec:  &dyn SymbolCodec,
    opts:   &CollectOptions,
) -> Result<CollectReport> {
    let (set, report) = match source {
        Source::Directory(dir) => collect_all(dir, codec, opts)?,
        Source::Files(paths)   => collect_files(paths.clone(), codec, opts)?,
    };
    let sorted = validate(set)?;
    let data   = materialize(&sorted)?;
    tracing::info!(chunks = sorted.len(), bytes = data.len(), output = %output.display(), "writing restored file");
    FileBuffer::new(output, data).write()?;
    Ok(report)
}

/// Outcome of [`verify_file`].
#[derive(Debug)]
pub struct Verification {
    pub emit:    EmitReport,
    pub collect: CollectReport,
    pub bytes:   usize,
}

/// Encode `input`, restore it again from the artifacts and compare.
///
/// Artifacts live in a temporary directory owned by this call; it is
/// removed on every return path.
pub fn verify_file(input: &Path, codec: &dyn SymbolCodec, opts: &EmitOptions) -> Result<Verification> {
    let scratch  = tempfile::Builder::new().prefix("qrfile-verify-").tempdir()?;
    let restored = scratch.path().join("restored.bin");
    tracing::debug!(scratch = %scratch.path().display(), "verify scratch directory");

    let emit    = encode_file(input, scratch.path(), codec, opts)?;
    let collect = restore_file(
        &Source::Directory(scratch.path().to_path_buf()),
        &restored,
        codec,
        &CollectOptions::from(opts),
    )?;

    let original = FileBuffer::read(input)?.data;
    let back     = FileBuffer::read(&restored)?.data;
    if original != back {
        let offset = original
            .iter()
            .zip(&back)
            .position(|(a, b)| a != b)
            .unwrap_or(original.len().min(back.len()));
        return Err(Error::VerifyMismatch { original: original.len(), restored: back.len(), offset });
    }
    Ok(Verification { emit, collect, bytes: original.len() })
}
