//! The external decode + resample + filter-graph process.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::process::ProcessHandle;

/// Raw s16le stereo PCM coming out of a launched transcoder.
pub struct TranscoderOutput {
    pub reader: Box<dyn Read + Send>,
    /// `None` for transcoders that do not run as a separate process.
    pub process: Option<ProcessHandle>,
}

pub trait Transcoder: Send + Sync {
    fn launch(&self, args: &[String]) -> io::Result<TranscoderOutput>;
}

/// Runs `ffmpeg` (or whatever `program` points to) with stdout piped.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn launch(&self, args: &[String]) -> io::Result<TranscoderOutput> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "transcoder stdout missing"))?;
        Ok(TranscoderOutput {
            reader: Box::new(stdout),
            process: Some(ProcessHandle::new("transcoder", child)),
        })
    }
}
