//! QR rendering and scanning through external programs.
//!
//! Encoding pipes the record text into `qrencode` and reads a PNG from its
//! stdout.  Decoding stages the image in a temporary file and runs `zbarimg`
//! on it, since zbar reads images from paths only.  Both tools must be
//! reachable through `PATH` unless absolute program paths are configured.
//!
//! Every invocation can be bounded by a timeout.  A child that outlives it
//! is killed and the call fails with [`SymbolError::Timeout`]; the worker
//! that issued it reports that single chunk as failed.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use super::{EcLevel, SymbolCodec, SymbolError};

pub const DEFAULT_ENCODER: &str = "qrencode";
pub const DEFAULT_DECODER: &str = "zbarimg";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct CommandCodec {
    pub encoder: PathBuf,
    pub decoder: PathBuf,
    pub level:   EcLevel,
    pub timeout: Option<Duration>,
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self {
            encoder: PathBuf::from(DEFAULT_ENCODER),
            decoder: PathBuf::from(DEFAULT_DECODER),
            level:   EcLevel::default(),
            timeout: None,
        }
    }
}

impl CommandCodec {
    pub fn new(level: EcLevel, timeout: Option<Duration>) -> Self {
        Self { level, timeout, ..Self::default() }
    }

    fn encoder_command(&self) -> Command {
        let mut cmd = Command::new(&self.encoder);
        cmd.args(["-8", "-l", self.level.name(), "-t", "PNG", "-o", "-"]);
        cmd
    }

    fn decoder_command(&self, image: &Path) -> Command {
        let mut cmd = Command::new(&self.decoder);
        cmd.args(["--quiet", "--raw", "-Sdisable", "-Sqrcode.enable"]).arg(image);
        cmd
    }
}

impl SymbolCodec for CommandCodec {
    fn name(&self) -> &'static str { "qr" }

    fn extension(&self) -> &str { "png" }

    fn max_record_width(&self) -> Option<usize> {
        Some(self.level.max_record_width())
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, SymbolError> {
        let out = run(self.encoder_command(), Some(text.as_bytes()), self.timeout)?;
        if !out.success {
            return Err(SymbolError::Encode(out.stderr_lossy()));
        }
        if out.stdout.is_empty() {
            return Err(SymbolError::Encode("encoder produced no image".into()));
        }
        Ok(out.stdout)
    }

    fn decode(&self, artifact: &[u8]) -> Result<String, SymbolError> {
        let mut staged = NamedTempFile::new()?;
        staged.write_all(artifact)?;
        staged.flush()?;

        let out = run(self.decoder_command(staged.path()), None, self.timeout)?;
        if !out.success {
            return Err(SymbolError::Decode(format!("no readable QR code ({})", out.stderr_lossy())));
        }
        let text = String::from_utf8(out.stdout).map_err(|e| SymbolError::Decode(e.to_string()))?;
        // --raw output ends with one newline per symbol.
        let text = text.strip_suffix('\n').unwrap_or(&text);
        let text = text.strip_suffix('\r').unwrap_or(text);
        Ok(text.to_string())
    }
}

// ── Child process plumbing ───────────────────────────────────────────────────

struct Output {
    success: bool,
    stdout:  Vec<u8>,
    stderr:  Vec<u8>,
}

impl Output {
    fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

fn run(mut cmd: Command, stdin: Option<&[u8]>, timeout: Option<Duration>) -> Result<Output, SymbolError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|source| SymbolError::Spawn { program: program.clone(), source })?;

    // Pipes are drained on helper threads so a chatty child can never block
    // on a full pipe while we wait on it.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        if let Err(e) = pipe.write_all(input) {
            drop(pipe);
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(program = %program, error = %e, "killed child after failed stdin write");
            return Err(SymbolError::Io(e));
        }
    }

    let success = match wait(&mut child, timeout)? {
        Some(status) => status.success(),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(program = %program, "killed child after timeout");
            return Err(SymbolError::Timeout {
                program,
                timeout: timeout.unwrap_or_default(),
            });
        }
    };

    Ok(Output {
        success,
        stdout: join(stdout)?,
        stderr: join(stderr)?,
    })
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> std::io::Result<Option<std::process::ExitStatus>> {
    let Some(limit) = timeout else {
        return child.wait().map(Some);
    };
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

type Drain = Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut r| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            r.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join(handle: Drain) -> Result<Vec<u8>, SymbolError> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| SymbolError::Decode("pipe reader panicked".into()))?
            .map_err(SymbolError::Io),
        None => Ok(Vec::new()),
    }
}
