//! Symbol codec seam: turns record text into an artifact and back.
//!
//! The optical symbology itself is an external concern.  The pipeline only
//! needs [`SymbolCodec`]; two implementations ship with the crate:
//!
//! | Codec | Artifact | Description |
//! |-------|----------|-------------|
//! | [`TextCodec`] | `.txt` | Record text stored verbatim; deterministic |
//! | [`CommandCodec`] | `.png` | QR code via `qrencode` / `zbarimg` child processes |
//!
//! Both are `Send + Sync` so one instance can be shared by every worker.

mod command;

use std::io;
use std::time::Duration;
use thiserror::Error;

pub use command::{CommandCodec, DEFAULT_DECODER, DEFAULT_ENCODER};

// ── Redundancy level ─────────────────────────────────────────────────────────

/// QR error-correction level handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EcLevel {
    #[default]
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    pub fn name(self) -> &'static str {
        match self {
            EcLevel::L => "L",
            EcLevel::M => "M",
            EcLevel::Q => "Q",
            EcLevel::H => "H",
        }
    }

    /// Byte-mode capacity of a version 40 symbol at this level.
    pub fn max_record_width(self) -> usize {
        match self {
            EcLevel::L => 2953,
            EcLevel::M => 2331,
            EcLevel::Q => 1663,
            EcLevel::H => 1273,
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Encoder failed: {0}")]
    Encode(String),
    #[error("Decoder failed: {0}")]
    Decode(String),
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("Failed to run {program}: {source}")]
    Spawn { program: String, #[source] source: io::Error },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait SymbolCodec: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
    /// Artifact file extension, without the dot.
    fn extension(&self) -> &str;
    /// Render one record into artifact bytes.
    fn encode(&self, text: &str) -> Result<Vec<u8>, SymbolError>;
    /// Recover the record text from artifact bytes.
    fn decode(&self, artifact: &[u8]) -> Result<String, SymbolError>;
    /// Longest record one symbol can hold, if the codec has a limit.
    fn max_record_width(&self) -> Option<usize> {
        None
    }
}

// ── Built-in text codec ──────────────────────────────────────────────────────

/// Stores the record text as-is.  Useful wherever an optical round trip is
/// not wanted, such as tests and transport over text channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl SymbolCodec for TextCodec {
    fn name(&self) -> &'static str { "text" }
    fn extension(&self) -> &str { "txt" }
    fn encode(&self, text: &str) -> Result<Vec<u8>, SymbolError> {
        Ok(text.as_bytes().to_vec())
    }
    fn decode(&self, artifact: &[u8]) -> Result<String, SymbolError> {
        String::from_utf8(artifact.to_vec()).map_err(|e| SymbolError::Decode(e.to_string()))
    }
}

/// Artifact file name for chunk `index`: `<prefix><index>.<ext>`, no zero
/// padding.
pub fn artifact_name(prefix: &str, index: u64, extension: &str) -> String {
    format!("{prefix}{index}.{extension}")
}

/// True when `name` follows the artifact naming convention for `prefix` and
/// `extension`.  Only the prefix and the extension are checked; the index
/// part is validated by the record itself.
pub fn is_artifact_name(name: &str, prefix: &str, extension: &str) -> bool {
    name.len() > prefix.len() + extension.len() + 1
        && name.starts_with(prefix)
        && name
            .strip_suffix(extension)
            .is_some_and(|rest| rest.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_codec_is_identity() {
        let codec = TextCodec;
        let bytes = codec.encode("   1   2 ab").unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), "   1   2 ab");
        assert!(codec.decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn artifact_naming() {
        assert_eq!(artifact_name("img_", 12, "png"), "img_12.png");
        assert!(is_artifact_name("img_12.png", "img_", "png"));
        assert!(!is_artifact_name("img_12.txt", "img_", "png"));
        assert!(!is_artifact_name("other_1.png", "img_", "png"));
        assert!(!is_artifact_name("img_.png", "img_", "png"));
        assert!(!is_artifact_name("img_1png", "img_", "png"));
    }

    #[test]
    fn level_names() {
        use clap::ValueEnum;
        assert_eq!(EcLevel::from_str("q", true), Ok(EcLevel::Q));
        assert!(EcLevel::from_str("x", true).is_err());
        assert_eq!(EcLevel::default().name(), "L");
    }

    #[test]
    fn default_record_fits_every_level_but_h() {
        use crate::record::DEFAULT_RECORD_WIDTH;
        for level in [EcLevel::L, EcLevel::M, EcLevel::Q] {
            assert!(DEFAULT_RECORD_WIDTH <= level.max_record_width(), "{}", level.name());
        }
        assert!(DEFAULT_RECORD_WIDTH > EcLevel::H.max_record_width());
        assert_eq!(TextCodec.max_record_width(), None);
    }
}
