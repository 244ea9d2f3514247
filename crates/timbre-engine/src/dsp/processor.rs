//! Stateful per-frame effects that run inside the process.
//!
//! A [`ChannelProcessor`] is created fresh for every stream that needs the
//! effect and is dropped with it; nothing is shared between streams.

use std::f64::consts::TAU;

use timbre_filters::EQUALIZER_BANDS;

use super::coefficients::COEFFICIENTS_48000;
use super::sample::{read_sample, write_sample, RIGHT_OFFSET};

#[derive(Debug, Clone)]
pub enum ChannelProcessor {
    Equalizer(Equalizer),
    Tremolo(Tremolo),
    Rotation(Rotation),
}

impl ChannelProcessor {
    pub fn equalizer(gains: [f64; EQUALIZER_BANDS]) -> Self {
        Self::Equalizer(Equalizer::new(gains))
    }

    pub fn tremolo(frequency: f64, depth: f64, sample_rate: u32) -> Self {
        Self::Tremolo(Tremolo::new(frequency, depth, sample_rate))
    }

    pub fn rotation(rotation_hz: f64, sample_rate: u32) -> Self {
        Self::Rotation(Rotation::new(rotation_hz, sample_rate))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Equalizer(_) => "equalizer",
            Self::Tremolo(_) => "tremolo",
            Self::Rotation(_) => "rotation",
        }
    }

    /// Processes one stereo frame (4 bytes) in place.
    ///
    /// Equalizer and tremolo are mono effects: they read and rewrite the left
    /// sample only and the right sample passes through. Rotation works on both.
    pub fn process_frame(&mut self, frame: &mut [u8]) {
        let left = read_sample(frame, 0) as f64;
        match self {
            Self::Equalizer(eq) => write_sample(frame, 0, eq.process(left)),
            Self::Tremolo(tremolo) => write_sample(frame, 0, tremolo.process(left)),
            Self::Rotation(rotation) => {
                let right = read_sample(frame, RIGHT_OFFSET) as f64;
                let (left, right) = rotation.process(left, right);
                write_sample(frame, 0, left);
                write_sample(frame, RIGHT_OFFSET, right);
            }
        }
    }
}

/// Parallel bank of second-order band filters.
///
/// Each band keeps three input and three output values in `history`
/// (`x = band * 6` for inputs, `y = x + 3` for outputs). `current`, `minus1`
/// and `minus2` rotate through 0..3 so the slots are reused in place.
#[derive(Debug, Clone)]
pub struct Equalizer {
    gains: [f64; EQUALIZER_BANDS],
    history: [f64; EQUALIZER_BANDS * 6],
    current: usize,
    minus1: usize,
    minus2: usize,
}

impl Equalizer {
    pub fn new(gains: [f64; EQUALIZER_BANDS]) -> Self {
        Self {
            gains,
            history: [0.0; EQUALIZER_BANDS * 6],
            current: 0,
            minus1: 2,
            minus2: 1,
        }
    }

    pub fn indices(&self) -> (usize, usize, usize) {
        (self.current, self.minus1, self.minus2)
    }

    pub fn process(&mut self, sample: f64) -> f64 {
        let mut out = sample * 0.25;

        for (band, c) in COEFFICIENTS_48000.iter().enumerate() {
            let x = band * 6;
            let y = x + 3;

            let result = c.alpha * (sample - self.history[x + self.minus2])
                + c.gamma * self.history[y + self.minus1]
                - c.beta * self.history[y + self.minus2];

            self.history[x + self.current] = sample;
            self.history[y + self.current] = result;

            out += result * self.gains[band];
        }

        self.current = (self.current + 1) % 3;
        self.minus1 = (self.minus1 + 1) % 3;
        self.minus2 = (self.minus2 + 1) % 3;

        out * 4.0
    }
}

/// Amplitude modulation by a sine LFO.
#[derive(Debug, Clone)]
pub struct Tremolo {
    frequency: f64,
    depth: f64,
    sample_rate: f64,
    /// Samples per LFO period; `phase` wraps to 0 when it gets there.
    period: f64,
    phase: u64,
}

impl Tremolo {
    pub fn new(frequency: f64, depth: f64, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f64;
        Self {
            frequency,
            depth,
            sample_rate,
            period: sample_rate / frequency,
            phase: 0,
        }
    }

    pub fn phase(&self) -> u64 {
        self.phase
    }

    pub fn process(&mut self, sample: f64) -> f64 {
        let lfo = (TAU * self.frequency * self.phase as f64 / self.sample_rate).sin();
        let out = sample * ((1.0 - self.depth) + self.depth * lfo);

        self.phase += 1;
        if self.phase as f64 >= self.period {
            self.phase = 0;
        }

        out
    }
}

/// Swings the source between the ears.
#[derive(Debug, Clone)]
pub struct Rotation {
    /// Radians, kept in [0, 2π).
    phase: f64,
    step: f64,
}

impl Rotation {
    pub fn new(rotation_hz: f64, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            step: TAU * rotation_hz / sample_rate as f64,
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let (left_gain, right_gain) = pan_multipliers(self.phase.sin());

        self.phase = (self.phase + self.step).rem_euclid(TAU);

        (left * left_gain, right * right_gain)
    }
}

/// Left and right multipliers for a panning value in [-1, 1].
///
/// Positive panning fades the left channel out, negative fades the right.
pub fn pan_multipliers(panning: f64) -> (f64, f64) {
    let left = if panning <= 0.0 { 1.0 } else { 1.0 - panning };
    let right = if panning >= 0.0 { 1.0 } else { 1.0 + panning };
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::sample::FRAME_BYTES;

    const SR: u32 = 48_000;

    fn frame(left: i16, right: i16) -> [u8; FRAME_BYTES] {
        let mut f = [0u8; FRAME_BYTES];
        f[..2].copy_from_slice(&left.to_le_bytes());
        f[2..].copy_from_slice(&right.to_le_bytes());
        f
    }

    #[test]
    fn flat_equalizer_is_identity() {
        let mut eq = Equalizer::new([0.0; EQUALIZER_BANDS]);
        let input = [0.0, 1000.0, -32768.0, 32767.0, 12.5, -7.0, 4096.0];
        for s in input.iter().cycle().take(500) {
            assert_eq!(eq.process(*s), *s);
        }
    }

    #[test]
    fn equalizer_indices_cycle_through_three_slots() {
        let mut eq = Equalizer::new([0.0; EQUALIZER_BANDS]);
        assert_eq!(eq.indices(), (0, 2, 1));
        eq.process(1.0);
        assert_eq!(eq.indices(), (1, 0, 2));
        eq.process(1.0);
        assert_eq!(eq.indices(), (2, 1, 0));
        eq.process(1.0);
        assert_eq!(eq.indices(), (0, 2, 1));
    }

    #[test]
    fn boosted_band_changes_the_signal_and_stays_bounded() {
        let mut gains = [0.0; EQUALIZER_BANDS];
        gains[13] = 1.0;
        let mut eq = Equalizer::new(gains);

        let mut differs = false;
        for n in 0..48_000 {
            let s = 8000.0 * (TAU * 6000.0 * n as f64 / SR as f64).sin();
            let out = eq.process(s);
            assert!(out.is_finite());
            assert!(out.abs() < 1.0e6);
            if (out - s).abs() > 1.0 {
                differs = true;
            }
        }
        assert!(differs);
    }

    #[test]
    fn equalizer_decays_after_input_stops() {
        let mut gains = [0.0; EQUALIZER_BANDS];
        gains[0] = 1.0;
        let mut eq = Equalizer::new(gains);
        eq.process(30000.0);
        let mut last = 0.0;
        for _ in 0..200_000 {
            last = eq.process(0.0);
        }
        assert!(last.abs() < 1.0);
    }

    #[test]
    fn tremolo_phase_resets_every_period() {
        // 48000 / 4800 = 10 samples per period
        let mut tremolo = Tremolo::new(4800.0, 0.5, SR);
        for expected in (0..10).chain(0..10) {
            assert_eq!(tremolo.phase(), expected);
            tremolo.process(1.0);
        }
        assert_eq!(tremolo.phase(), 0);
    }

    #[test]
    fn tremolo_without_depth_is_identity() {
        let mut tremolo = Tremolo::new(5.0, 0.0, SR);
        for s in [-32768.0, -1.0, 0.0, 1.0, 1234.0, 32767.0] {
            assert_eq!(tremolo.process(s), s);
        }
    }

    #[test]
    fn tremolo_at_phase_zero_scales_by_one_minus_depth() {
        let mut tremolo = Tremolo::new(2.0, 0.25, SR);
        assert_eq!(tremolo.process(1000.0), 750.0);
    }

    #[test]
    fn pan_multipliers_match_crossfade() {
        assert_eq!(pan_multipliers(0.0), (1.0, 1.0));
        assert_eq!(pan_multipliers(1.0), (0.0, 1.0));
        assert_eq!(pan_multipliers(-1.0), (1.0, 0.0));
        assert_eq!(pan_multipliers(0.5), (0.5, 1.0));
        assert_eq!(pan_multipliers(-0.25), (1.0, 0.75));
    }

    #[test]
    fn rotation_phase_wraps_within_a_turn() {
        // a quarter turn per frame
        let mut rotation = Rotation::new(SR as f64 / 4.0, SR);
        for _ in 0..9 {
            rotation.process(1.0, 1.0);
            assert!(rotation.phase() >= 0.0 && rotation.phase() < TAU);
        }
        assert!((rotation.phase() - TAU / 4.0).abs() < 1e-9);
    }

    #[test]
    fn negative_rotation_wraps_backwards() {
        let mut rotation = Rotation::new(-(SR as f64) / 4.0, SR);
        rotation.process(1.0, 1.0);
        assert!((rotation.phase() - 3.0 * TAU / 4.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_first_frame_is_untouched() {
        let mut rotation = Rotation::new(0.2, SR);
        assert_eq!(rotation.process(500.0, -500.0), (500.0, -500.0));
    }

    #[test]
    fn mono_effects_leave_the_right_sample_alone() {
        let mut gains = [0.0; EQUALIZER_BANDS];
        gains[5] = 0.8;
        let mut processors = [
            ChannelProcessor::equalizer(gains),
            ChannelProcessor::tremolo(3.0, 1.0, SR),
        ];
        for processor in processors.iter_mut() {
            for _ in 0..100 {
                let mut f = frame(9000, -4321);
                processor.process_frame(&mut f);
                assert_eq!(read_sample(&f, RIGHT_OFFSET), -4321, "{}", processor.name());
            }
        }
    }

    #[test]
    fn rotation_frame_rewrites_both_channels() {
        // step of a quarter turn: second frame sits at sin(pi/2) = 1
        let mut processor = ChannelProcessor::rotation(SR as f64 / 4.0, SR);
        let mut first = frame(1000, 1000);
        processor.process_frame(&mut first);
        assert_eq!(first, frame(1000, 1000));

        let mut second = frame(1000, 1000);
        processor.process_frame(&mut second);
        assert_eq!(read_sample(&second, 0), 0);
        assert_eq!(read_sample(&second, RIGHT_OFFSET), 1000);
    }
}
