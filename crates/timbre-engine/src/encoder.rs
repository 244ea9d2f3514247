//! The last stage: turns processed PCM into frames for the transport.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use flume::Sender;
use log::{debug, warn};
use timbre_filters::{CHANNELS, FRAME_SIZE, SAMPLE_RATE};

use crate::dsp::sample::FRAME_BYTES;
use crate::process::ProcessHandle;

/// Bytes of one 20 ms PCM frame.
pub const PCM_FRAME_BYTES: usize = FRAME_SIZE * FRAME_BYTES;

/// Where the stage worker writes processed PCM. Closing `input` ends the stream.
pub struct EncoderSession {
    pub input: Box<dyn Write + Send>,
    pub process: Option<ProcessHandle>,
}

pub trait Encoder: Send + Sync {
    /// Starts an encoder that delivers its frames to `frames`.
    fn open(&self, frames: Sender<Vec<u8>>) -> io::Result<EncoderSession>;
}

/// Ogg/Opus through an `ffmpeg` process.
#[derive(Debug, Clone)]
pub struct OpusEncoder {
    program: PathBuf,
    bitrate: u32,
    chunk_size: usize,
}

impl OpusEncoder {
    pub fn new(program: impl Into<PathBuf>, bitrate: u32, chunk_size: usize) -> Self {
        Self {
            program: program.into(),
            bitrate,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn args(&self) -> Vec<String> {
        let rate = SAMPLE_RATE.to_string();
        let channels = CHANNELS.to_string();
        let bitrate = self.bitrate.to_string();
        [
            "-loglevel", "0",
            "-f", "s16le",
            "-ar", rate.as_str(),
            "-ac", channels.as_str(),
            "-i", "pipe:0",
            "-c:a", "libopus",
            "-b:a", bitrate.as_str(),
            "-frame_duration", "20",
            "-f", "ogg",
            "pipe:1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

impl Encoder for OpusEncoder {
    fn open(&self, frames: Sender<Vec<u8>>) -> io::Result<EncoderSession> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let missing = |what: &str| io::Error::new(io::ErrorKind::BrokenPipe, format!("encoder {what} missing"));
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let mut stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;

        let chunk_size = self.chunk_size;
        thread::Builder::new()
            .name("timbre-encoder-out".into())
            .spawn(move || loop {
                let mut buf = vec![0u8; chunk_size];
                match stdout.read(&mut buf) {
                    Ok(0) => {
                        debug!("encoder output finished");
                        break;
                    }
                    Ok(n) => {
                        buf.truncate(n);
                        if frames.send(buf).is_err() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => {
                        warn!("encoder output read failed: {err}");
                        break;
                    }
                }
            })?;

        Ok(EncoderSession {
            input: Box::new(stdin),
            process: Some(ProcessHandle::new("encoder", child)),
        })
    }
}

/// No compression: cuts the PCM into 20 ms frames. Used for local monitoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmEncoder;

impl Encoder for PcmEncoder {
    fn open(&self, frames: Sender<Vec<u8>>) -> io::Result<EncoderSession> {
        Ok(EncoderSession {
            input: Box::new(PcmFramer::new(frames)),
            process: None,
        })
    }
}

/// `Write` side of [`PcmEncoder`]. A short final frame is sent on drop.
pub struct PcmFramer {
    pending: Vec<u8>,
    frames: Sender<Vec<u8>>,
}

impl PcmFramer {
    pub fn new(frames: Sender<Vec<u8>>) -> Self {
        Self {
            pending: Vec::with_capacity(PCM_FRAME_BYTES),
            frames,
        }
    }

    fn send(&self, frame: Vec<u8>) -> io::Result<()> {
        self.frames
            .send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "frame receiver dropped"))
    }
}

impl Write for PcmFramer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while self.pending.len() >= PCM_FRAME_BYTES {
            let rest = self.pending.split_off(PCM_FRAME_BYTES);
            let frame = std::mem::replace(&mut self.pending, rest);
            self.send(frame)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PcmFramer {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            let _ = self.frames.send(std::mem::take(&mut self.pending));
        }
    }
}
