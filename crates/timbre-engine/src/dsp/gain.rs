use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::effect::Stage;
use super::sample::{read_sample, write_sample, SAMPLE_BYTES};

/// Shared linear gain of a running stream. Cloning shares the value.
#[derive(Debug, Clone)]
pub struct VolumeHandle {
    bits: Arc<AtomicU64>,
}

impl VolumeHandle {
    pub fn new(volume: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(volume.to_bits())),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Negative and non-finite values are ignored.
    pub fn set(&self, volume: f64) {
        if volume.is_finite() && volume >= 0.0 {
            self.bits.store(volume.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn set_db(&self, db: f64) {
        self.set(10f64.powf(db / 20.0));
    }
}

impl Default for VolumeHandle {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Linear gain over both channels, read from a [`VolumeHandle`] once per block.
pub struct VolumeStage {
    volume: VolumeHandle,
}

impl VolumeStage {
    pub fn new(volume: VolumeHandle) -> Self {
        Self { volume }
    }
}

impl Stage for VolumeStage {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn process(&mut self, block: &mut [u8]) {
        let gain = self.volume.get();
        if gain == 1.0 {
            return;
        }
        let whole = block.len() - block.len() % SAMPLE_BYTES;
        for offset in (0..whole).step_by(SAMPLE_BYTES) {
            let s = read_sample(block, offset) as f64;
            write_sample(block, offset, s * gain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn unity_gain_is_a_no_op() {
        let mut stage = VolumeStage::new(VolumeHandle::default());
        let mut b = block(&[1, -2, 3, -4]);
        stage.process(&mut b);
        assert_eq!(b, block(&[1, -2, 3, -4]));
    }

    #[test]
    fn gain_applies_to_both_channels_and_clamps() {
        let handle = VolumeHandle::default();
        let mut stage = VolumeStage::new(handle.clone());
        handle.set(2.0);
        let mut b = block(&[100, -100, 20000, -20000]);
        stage.process(&mut b);
        assert_eq!(b, block(&[200, -200, i16::MAX, i16::MIN]));
    }

    #[test]
    fn decibels_convert_to_linear() {
        let handle = VolumeHandle::default();
        handle.set_db(-20.0);
        assert!((handle.get() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn invalid_volume_is_ignored() {
        let handle = VolumeHandle::new(0.5);
        handle.set(-1.0);
        handle.set(f64::NAN);
        assert_eq!(handle.get(), 0.5);
    }
}
