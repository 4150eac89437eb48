use clap::{Args, Parser, Subcommand, ValueEnum};
use qrfile::collect::CollectOptions;
use qrfile::emit::{EmitOptions, DEFAULT_PREFIX};
use qrfile::record::{RecordLayout, DEFAULT_RECORD_WIDTH};
use qrfile::symbol::{CommandCodec, EcLevel, SymbolCodec, TextCodec};
use qrfile::{encode_file, restore_file, verify_file, Source};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "qrfile", about = "Store files as sequences of QR codes and restore them")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(flatten)]
    codec: CodecArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CodecArgs {
    /// Artifact codec
    #[arg(long, value_enum, default_value_t = CodecKind::Qr, global = true)]
    codec: CodecKind,
    /// QR error-correction level
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = EcLevel::L, global = true)]
    level: EcLevel,
    /// Kill an encoder/decoder invocation after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Encoder program
    #[arg(long, default_value = qrfile::symbol::DEFAULT_ENCODER, global = true)]
    encoder: PathBuf,
    /// Decoder program
    #[arg(long, default_value = qrfile::symbol::DEFAULT_DECODER, global = true)]
    decoder: PathBuf,
    /// Maximum concurrent workers (0 = one per CPU)
    #[arg(short, long, default_value = "0", global = true)]
    jobs: usize,
    /// Characters per record, header included
    #[arg(long, default_value_t = DEFAULT_RECORD_WIDTH, global = true)]
    record_width: usize,
    /// Write the run report as JSON to this path
    #[arg(long, global = true)]
    report: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CodecKind {
    /// QR codes through qrencode / zbarimg
    Qr,
    /// Plain text records
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into QR code images
    Encode {
        input: PathBuf,
        #[arg(short = 'd', long, default_value = "./img_dir")]
        image_dir: PathBuf,
        #[arg(short, long, default_value = DEFAULT_PREFIX)]
        prefix: String,
    },
    /// Restore a file from QR code images
    Decode {
        /// Images to read; when empty, every matching image in --image-dir
        files: Vec<PathBuf>,
        #[arg(short = 'd', long, default_value = "./img_dir")]
        image_dir: PathBuf,
        #[arg(short, long, default_value = DEFAULT_PREFIX)]
        prefix: String,
        #[arg(short = 'C', long, default_value = "./output_dir")]
        output_dir: PathBuf,
        #[arg(short, long, default_value = "result")]
        out: PathBuf,
    },
    /// Encode a file into a scratch directory and check it restores intact
    Verify {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let codec  = build_codec(&cli.codec);
    let layout = RecordLayout::new(cli.codec.record_width)?;

    match cli.command {

        // ── Encode ───────────────────────────────────────────────────────────
        Commands::Encode { input, image_dir, prefix } => {
            let opts = EmitOptions { prefix, jobs: cli.codec.jobs, layout };
            let report = encode_file(&input, &image_dir, codec.as_ref(), &opts)?;
            write_report(cli.codec.report.as_deref(), &report)?;
            println!("Created {} image(s) in {}", report.artifacts.len(), image_dir.display());
        }

        // ── Decode ───────────────────────────────────────────────────────────
        Commands::Decode { files, image_dir, prefix, output_dir, out } => {
            let opts   = CollectOptions { prefix, jobs: cli.codec.jobs, layout };
            let source = if files.is_empty() { Source::Directory(image_dir) } else { Source::Files(files) };
            let output = output_dir.join(out);
            let report = restore_file(&source, &output, codec.as_ref(), &opts)
                .inspect_err(|e| write_failed_report(cli.codec.report.as_deref(), e))?;
            write_report(cli.codec.report.as_deref(), &report)?;
            println!("Restored {} ({})", output.display(), report.summary());
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let opts = EmitOptions { jobs: cli.codec.jobs, layout, ..EmitOptions::default() };
            let v = verify_file(&input, codec.as_ref(), &opts)
                .inspect_err(|e| write_failed_report(cli.codec.report.as_deref(), e))?;
            write_report(cli.codec.report.as_deref(), &v.collect)?;
            println!(
                "OK: {} byte(s) survived a round trip through {} artifact(s)",
                v.bytes, v.emit.artifacts.len(),
            );
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default.into())
                .from_env_lossy(),
        )
        .init();
}

fn build_codec(args: &CodecArgs) -> Box<dyn SymbolCodec> {
    match args.codec {
        CodecKind::Text => Box::new(TextCodec),
        CodecKind::Qr => Box::new(CommandCodec {
            encoder: args.encoder.clone(),
            decoder: args.decoder.clone(),
            level:   args.level,
            timeout: args.timeout.map(Duration::from_secs),
        }),
    }
}

fn write_report<T: Serialize>(path: Option<&Path>, report: &T) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        std::fs::write(path, serde_json::to_vec_pretty(report)?)?;
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn write_failed_report(path: Option<&Path>, err: &qrfile::Error) {
    if let Some(report) = err.collect_report() {
        if let Err(e) = write_report(path, report) {
            tracing::warn!(error = %e, "could not write report");
        }
    }
}
