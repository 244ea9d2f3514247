use serde::{Deserialize, Serialize};

/// Which filters clients are allowed to turn on.
///
/// A sub-object of a request is ignored when its flag is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterPolicy {
    pub volume: bool,
    pub equalizer: bool,
    pub karaoke: bool,
    pub timescale: bool,
    pub tremolo: bool,
    pub vibrato: bool,
    pub rotation: bool,
    pub distortion: bool,
    pub channel_mix: bool,
    pub low_pass: bool,
}

impl FilterPolicy {
    pub fn all_enabled() -> Self {
        Self {
            volume: true,
            equalizer: true,
            karaoke: true,
            timescale: true,
            tremolo: true,
            vibrato: true,
            rotation: true,
            distortion: true,
            channel_mix: true,
            low_pass: true,
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            volume: false,
            equalizer: false,
            karaoke: false,
            timescale: false,
            tremolo: false,
            vibrato: false,
            rotation: false,
            distortion: false,
            channel_mix: false,
            low_pass: false,
        }
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::all_enabled()
    }
}
