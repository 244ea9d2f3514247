//! Reading and writing single s16le amplitudes inside a PCM buffer.

use byteorder::{ByteOrder, LittleEndian};
use timbre_filters::CHANNELS;

pub const SAMPLE_BYTES: usize = 2;

/// One interleaved stereo frame: left sample then right sample.
pub const FRAME_BYTES: usize = SAMPLE_BYTES * CHANNELS as usize;

/// Offset of the right sample inside a frame.
pub const RIGHT_OFFSET: usize = SAMPLE_BYTES;

/// Reads the amplitude starting at `offset`. Panics if fewer than two bytes remain.
#[inline]
pub fn read_sample(buf: &[u8], offset: usize) -> i16 {
    LittleEndian::read_i16(&buf[offset..offset + SAMPLE_BYTES])
}

/// Writes `value` at `offset`, rounded and clamped to the i16 range.
#[inline]
pub fn write_sample(buf: &mut [u8], offset: usize, value: f64) {
    LittleEndian::write_i16(&mut buf[offset..offset + SAMPLE_BYTES], clamp16(value));
}

#[inline]
pub fn clamp16(value: f64) -> i16 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
