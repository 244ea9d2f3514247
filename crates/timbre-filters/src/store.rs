use log::debug;

use crate::directive::Directive;
use crate::params::{
    ChannelMix, Distortion, Karaoke, LowPass, NormalizedFilterSet, Rotation, Timescale, Tremolo,
    Vibrato,
};
use crate::policy::FilterPolicy;
use crate::request::{given, EqualizerBand, FilterRequest};
use crate::EQUALIZER_BANDS;

const MIN_GAIN: f64 = -0.25;
const MAX_GAIN: f64 = 1.0;

/// Validates filter requests and keeps the equalizer band gains between them.
///
/// The band gains are the only state that survives a `configure` call: a
/// request only overwrites the bands it names.
#[derive(Debug, Clone)]
pub struct FilterStore {
    policy: FilterPolicy,
    bands: [f64; EQUALIZER_BANDS],
    current: NormalizedFilterSet,
}

impl FilterStore {
    pub fn new(policy: FilterPolicy) -> Self {
        Self {
            policy,
            bands: [0.0; EQUALIZER_BANDS],
            current: NormalizedFilterSet::default(),
        }
    }

    /// Copy of the current band gains, handed to the equalizer stage by value.
    pub fn bands(&self) -> [f64; EQUALIZER_BANDS] {
        self.bands
    }

    pub fn equalizer_active(&self) -> bool {
        self.bands.iter().any(|&gain| gain != 0.0)
    }

    /// The set produced by the last `configure` call.
    pub fn current(&self) -> &NormalizedFilterSet {
        &self.current
    }

    pub fn configure(&mut self, request: &FilterRequest) -> NormalizedFilterSet {
        let policy = self.policy;
        let mut set = NormalizedFilterSet::default();

        if policy.volume {
            if let Some(volume) = given(request.volume) {
                set.volume = Some(volume);
                set.directives.push(Directive::Volume(volume));
            }
        }

        if policy.equalizer {
            if let Some(bands) = request.equalizer.as_deref().filter(|b| !b.is_empty()) {
                self.apply_bands(bands);
                set.equalizer = Some(self.band_list());
            }
        }

        if policy.karaoke {
            if let Some(karaoke) = request.karaoke.as_ref().and_then(Karaoke::normalize) {
                set.karaoke = Some(karaoke);
                set.directives.push(Directive::Karaoke(karaoke));
            }
        }

        if policy.timescale {
            if let Some(timescale) = request.timescale.as_ref().and_then(Timescale::normalize) {
                set.timescale = Some(timescale);
                set.directives.push(Directive::Timescale(timescale));
            }
        }

        if policy.tremolo {
            set.tremolo = request.tremolo.as_ref().and_then(Tremolo::normalize);
        }

        if policy.vibrato {
            if let Some(vibrato) = request.vibrato.as_ref().and_then(Vibrato::normalize) {
                set.vibrato = Some(vibrato);
                set.directives.push(Directive::Vibrato(vibrato));
            }
        }

        if policy.rotation {
            set.rotation = request.rotation.as_ref().and_then(Rotation::normalize);
        }

        if policy.distortion {
            if let Some(distortion) = request.distortion.as_ref().and_then(Distortion::normalize) {
                set.distortion = Some(distortion);
                set.directives.push(Directive::Distortion(distortion));
            }
        }

        if policy.channel_mix {
            if let Some(mix) = request.channel_mix.as_ref().and_then(ChannelMix::normalize) {
                set.channel_mix = Some(mix);
                set.directives.push(Directive::ChannelMix(mix));
            }
        }

        if policy.low_pass {
            if let Some(low_pass) = request.low_pass.as_ref().and_then(LowPass::normalize) {
                set.low_pass = Some(low_pass);
                set.directives.push(Directive::LowPass(low_pass));
            }
        }

        debug!(
            "configured filters: {} graph directive(s), equalizer {}",
            set.directives.len(),
            if self.equalizer_active() { "on" } else { "off" }
        );

        self.current = set.clone();
        set
    }

    fn apply_bands(&mut self, bands: &[EqualizerBand]) {
        for band in bands {
            match usize::try_from(band.band) {
                Ok(index) if index < EQUALIZER_BANDS && band.gain.is_finite() => {
                    self.bands[index] = band.gain.clamp(MIN_GAIN, MAX_GAIN);
                }
                _ => debug!("ignoring equalizer band {}", band.band),
            }
        }
    }

    fn band_list(&self) -> Vec<EqualizerBand> {
        self.bands
            .iter()
            .enumerate()
            .map(|(index, &gain)| EqualizerBand {
                band: index as i64,
                gain,
            })
            .collect()
    }
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new(FilterPolicy::default())
    }
}
