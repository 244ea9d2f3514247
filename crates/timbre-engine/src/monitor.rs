//! Plays a filtered stream on a local output device.
//!
//! Only meaningful with [`PcmEncoder`](crate::PcmEncoder) output: frames are
//! raw s16le stereo at the pipeline rate.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::info;
use timbre_filters::{CHANNELS, SAMPLE_RATE};

use crate::dsp::sample::{read_sample, SAMPLE_BYTES};

#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Case-insensitive substring of the device name.
    pub output_name: Option<String>,
    /// Position among output-capable devices; wins over `output_name`.
    pub output_index: Option<usize>,
    pub block_size: Option<u32>,
}

pub struct Monitor {
    output_stream: Option<cpal::Stream>,
    ring: Arc<SpscRing>,
}

impl Monitor {
    pub fn start(cfg: &MonitorConfig) -> Result<Self> {
        let host = cpal::default_host();

        let out_dev = pick_output(&host, cfg.output_name.as_deref(), cfg.output_index)?
            .context("No output device matched (and no default available)")?;
        let out_cfg_any = out_dev
            .default_output_config()
            .context("No default output config")?;

        let mut out_cfg = out_cfg_any.config();
        out_cfg.sample_rate = cpal::SampleRate(SAMPLE_RATE);
        out_cfg.channels = CHANNELS;
        if let Some(bs) = cfg.block_size {
            out_cfg.buffer_size = cpal::BufferSize::Fixed(bs);
        }

        // Half a second of interleaved samples
        let cap = next_pow2(SAMPLE_RATE as usize * CHANNELS as usize / 2);
        let ring = Arc::new(SpscRing::with_capacity(cap));
        let ring_rx = ring.clone();

        let output_stream = match out_cfg_any.sample_format() {
            cpal::SampleFormat::F32 => out_dev.build_output_stream::<f32, _, _>(
                &out_cfg,
                move |out: &mut [f32], _| {
                    ring_rx.pop_with(out, 0.0, |s| s as f32 / 32768.0);
                },
                move |err| log::error!("output stream error: {err}"),
                None,
            )?,
            cpal::SampleFormat::I16 => out_dev.build_output_stream::<i16, _, _>(
                &out_cfg,
                move |out: &mut [i16], _| {
                    ring_rx.pop_with(out, 0, |s| s);
                },
                move |err| log::error!("output stream error: {err}"),
                None,
            )?,
            cpal::SampleFormat::U16 => out_dev.build_output_stream::<u16, _, _>(
                &out_cfg,
                move |out: &mut [u16], _| {
                    ring_rx.pop_with(out, 32768, |s| (s as i32 + 32768) as u16);
                },
                move |err| log::error!("output stream error: {err}"),
                None,
            )?,
            other => return Err(anyhow!("Unsupported output format: {other:?}")),
        };

        output_stream
            .play()
            .context("Failed to play output stream")?;
        info!(
            "monitoring on {}",
            out_dev.name().unwrap_or_else(|_| "<unknown>".to_string())
        );

        Ok(Self {
            output_stream: Some(output_stream),
            ring,
        })
    }

    /// Queues PCM, waiting while the device catches up.
    pub fn play(&self, pcm: &[u8]) {
        let mut offset = 0;
        while offset + SAMPLE_BYTES <= pcm.len() {
            let pushed = self.ring.push_pcm(&pcm[offset..]);
            if pushed == 0 {
                thread::sleep(Duration::from_millis(5));
            }
            offset += pushed;
        }
    }

    /// Waits until everything queued has been handed to the device.
    pub fn drain(&self) {
        while !self.ring.is_empty() {
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn stop(&mut self) {
        self.output_stream = None;
    }
}

/// Index, then name, then the host default. An index or name that matches
/// nothing falls back to the default device.
fn pick_output(
    host: &cpal::Host,
    name: Option<&str>,
    index: Option<usize>,
) -> Result<Option<cpal::Device>> {
    let plays = |dev: &cpal::Device| dev.supported_output_configs().is_ok();

    if let Some(index) = index {
        if let Some(dev) = host.devices()?.filter(plays).nth(index) {
            return Ok(Some(dev));
        }
    }
    if let Some(name) = name {
        let wanted = name.to_lowercase();
        let found = host.devices()?.filter(plays).find(|dev| {
            dev.name()
                .map(|n| n.to_lowercase().contains(&wanted))
                .unwrap_or(false)
        });
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(host.default_output_device())
}

fn next_pow2(x: usize) -> usize {
    x.max(1).next_power_of_two()
}

/// Interleaved i16 samples between the pipeline thread and the device callback.
/// One slot stays free so a full ring is distinguishable from an empty one.
struct SpscRing {
    buf: UnsafeCell<Box<[i16]>>,
    mask: usize,
    write: AtomicUsize,
    read: AtomicUsize,
}

// Safety: one producer (`Monitor::play`) and one consumer (the device callback).
// The producer only writes slots outside [read..write) and publishes with a
// release store; the consumer only reads slots inside it.
unsafe impl Send for SpscRing {}
unsafe impl Sync for SpscRing {}

impl SpscRing {
    fn with_capacity(cap: usize) -> Self {
        let slots = next_pow2(cap);
        Self {
            buf: UnsafeCell::new(vec![0i16; slots].into_boxed_slice()),
            mask: slots - 1,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    fn queued(&self, w: usize, r: usize) -> usize {
        w.wrapping_sub(r) & self.mask
    }

    fn is_empty(&self) -> bool {
        self.write.load(Ordering::Acquire) == self.read.load(Ordering::Acquire)
    }

    /// Pushes as many whole s16le samples as fit; returns the bytes taken.
    fn push_pcm(&self, pcm: &[u8]) -> usize {
        let r = self.read.load(Ordering::Acquire);
        let w = self.write.load(Ordering::Relaxed);
        let free = self.mask - self.queued(w, r);
        let count = free.min(pcm.len() / SAMPLE_BYTES);

        let buf = unsafe { &mut *self.buf.get() };
        let mut wi = w;
        for i in 0..count {
            buf[wi & self.mask] = read_sample(pcm, i * SAMPLE_BYTES);
            wi = wi.wrapping_add(1);
        }
        self.write.store(wi, Ordering::Release);
        count * SAMPLE_BYTES
    }

    /// Fills `out`, padding with `silence` when the ring runs dry. Returns the
    /// number of queued samples used.
    fn pop_with<T: Copy>(&self, out: &mut [T], silence: T, convert: impl Fn(i16) -> T) -> usize {
        let w = self.write.load(Ordering::Acquire);
        let r = self.read.load(Ordering::Relaxed);
        let count = self.queued(w, r).min(out.len());

        let buf = unsafe { &*self.buf.get() };
        let mut ri = r;
        for o in out[..count].iter_mut() {
            *o = convert(buf[ri & self.mask]);
            ri = ri.wrapping_add(1);
        }
        out[count..].fill(silence);
        self.read.store(ri, Ordering::Release);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn ring_round_trips_in_order_and_pads_with_silence() {
        let ring = SpscRing::with_capacity(8);
        assert_eq!(ring.push_pcm(&pcm(&[1, -2, 3])), 6);

        let mut out = [9i16; 5];
        assert_eq!(ring.pop_with(&mut out, 0, |s| s), 3);
        assert_eq!(out, [1, -2, 3, 0, 0]);
        assert!(ring.is_empty());
    }

    #[test]
    fn ring_push_stops_when_full() {
        // capacity 8 holds 7 samples
        let ring = SpscRing::with_capacity(8);
        let consumed = ring.push_pcm(&pcm(&[7; 10]));
        assert_eq!(consumed, 7 * SAMPLE_BYTES);
        assert_eq!(ring.push_pcm(&pcm(&[7])), 0);
    }

    #[test]
    fn ring_ignores_a_dangling_byte() {
        let ring = SpscRing::with_capacity(8);
        assert_eq!(ring.push_pcm(&[1, 0, 5]), 2);
    }
}
