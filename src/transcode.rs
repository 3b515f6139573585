//! External `.webp` -> `.jpg` transcoding.
//!
//! The dataset's webp sources historically went through ImageMagick, so the
//! production path shells out to `magick`. The trait seam keeps the pipeline
//! testable on machines without it.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to launch transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder exited with {0}")]
    Failed(ExitStatus),

    #[error("transcoder timed out after {0:?}")]
    TimedOut(Duration),

    #[error("i/o error while waiting on transcoder: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Transcoder {
    fn webp_to_jpg(&self, src: &Path, dst: &Path) -> Result<(), TranscodeError>;
}

/// Blocking `magick convert` invocation with a per-file timeout. A timeout or
/// non-zero exit is a file-level error; the caller decides whether the batch
/// continues.
#[derive(Debug, Clone)]
pub struct MagickTranscoder {
    timeout: Duration,
}

impl MagickTranscoder {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for MagickTranscoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl Transcoder for MagickTranscoder {
    fn webp_to_jpg(&self, src: &Path, dst: &Path) -> Result<(), TranscodeError> {
        let mut child = Command::new("magick")
            .arg("convert")
            .arg(src)
            .arg(dst)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(TranscodeError::Spawn)?;

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return if status.success() {
                    Ok(())
                } else {
                    Err(TranscodeError::Failed(status))
                };
            }
            if start.elapsed() >= self.timeout {
                child.kill().ok();
                child.wait().ok();
                return Err(TranscodeError::TimedOut(self.timeout));
            }
            thread::sleep(Duration::from_millis(50));
        }
    }
}
