//! Joins the transcoder, the in-process stages and the encoder into one
//! consumable stream.
//!
//! ```text
//! transcoder stdout --relay--> [bounded] --stages--> encoder --> [bounded] --> FilterStream
//! ```
//!
//! Every hop is a bounded channel or a blocking pipe, so a slow consumer
//! stalls the whole chain instead of buffering ahead.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::dsp::gain::VolumeHandle;
use crate::graph::{Chain, FrameAligner};
use crate::pipeline::StageKind;
use crate::process::Cancellation;

pub struct StreamJoiner {
    relay_capacity: usize,
    chunk_size: usize,
}

impl StreamJoiner {
    pub fn new(relay_capacity: usize, chunk_size: usize) -> Self {
        Self {
            relay_capacity: relay_capacity.max(1),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Starts the relay and stage workers.
    ///
    /// `first` is the part of the transcoder output already read; `sink` feeds
    /// the encoder. Both workers stop once `cancel` fires.
    pub fn join(
        &self,
        first: Vec<u8>,
        reader: Box<dyn Read + Send>,
        chain: Chain,
        sink: Box<dyn Write + Send>,
        cancel: &Cancellation,
    ) -> io::Result<()> {
        let (pcm_tx, pcm_rx) = flume::bounded(self.relay_capacity);

        let relay_cancel = cancel.clone();
        let chunk_size = self.chunk_size;
        thread::Builder::new()
            .name("timbre-relay".into())
            .spawn(move || relay(first, reader, pcm_tx, relay_cancel, chunk_size))?;

        let stage_cancel = cancel.clone();
        thread::Builder::new()
            .name("timbre-stages".into())
            .spawn(move || run_stages(pcm_rx, chain, sink, stage_cancel))?;
        Ok(())
    }
}

/// Copies transcoder output into the channel untouched, in order.
fn relay(
    first: Vec<u8>,
    mut reader: Box<dyn Read + Send>,
    tx: Sender<Vec<u8>>,
    cancel: Cancellation,
    chunk_size: usize,
) {
    if !first.is_empty() && tx.send(first).is_err() {
        return;
    }
    while !cancel.is_cancelled() {
        let mut buf = vec![0u8; chunk_size];
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("transcoder output finished");
                break;
            }
            Ok(n) => {
                buf.truncate(n);
                if tx.send(buf).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                if !cancel.is_cancelled() {
                    warn!("transcoder output read failed: {err}");
                }
                break;
            }
        }
    }
}

fn run_stages(
    rx: Receiver<Vec<u8>>,
    mut chain: Chain,
    mut sink: Box<dyn Write + Send>,
    cancel: Cancellation,
) {
    let mut aligner = FrameAligner::new();

    for chunk in rx.iter() {
        if cancel.is_cancelled() {
            return;
        }
        let mut block = aligner.align(chunk);
        if block.is_empty() {
            continue;
        }
        chain.process(&mut block);
        if let Err(err) = sink.write_all(&block) {
            if !cancel.is_cancelled() {
                warn!("encoder input closed: {err}");
            }
            return;
        }
    }

    let tail = aligner.finish();
    if !tail.is_empty() {
        debug!("passing {} trailing byte(s) through unprocessed", tail.len());
        if sink.write_all(&tail).is_err() {
            return;
        }
    }
    if let Err(err) = sink.flush() {
        warn!("encoder flush failed: {err}");
    }
    debug!("stage chain finished");
}

/// Encoded frames of one filtered track, in order.
///
/// Dropping the stream cancels it: the transcoder and encoder processes are
/// killed and every worker exits.
pub struct FilterStream {
    frames: Receiver<Vec<u8>>,
    cancel: Cancellation,
    volume: VolumeHandle,
    stages: Vec<StageKind>,
}

impl FilterStream {
    /// `frames` is the encoder output; `stages` the plan the chain was built from.
    pub fn new(
        frames: Receiver<Vec<u8>>,
        cancel: Cancellation,
        volume: VolumeHandle,
        stages: Vec<StageKind>,
    ) -> Self {
        Self {
            frames,
            cancel,
            volume,
            stages,
        }
    }

    /// The stage order this stream was built with.
    pub fn stages(&self) -> &[StageKind] {
        &self.stages
    }

    /// Live gain of the volume stage.
    pub fn volume(&self) -> &VolumeHandle {
        &self.volume
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Like `next`, but gives up after `timeout`. `Ok(None)` means the stream ended.
    pub fn next_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>, RecvTimeoutError> {
        match self.frames.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Iterator for FilterStream {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.frames.recv().ok()
    }
}

impl Drop for FilterStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
