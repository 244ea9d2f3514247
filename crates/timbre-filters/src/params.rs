use serde::Serialize;

use crate::directive::{join_directives, Directive};
use crate::request::{
    given, ChannelMixRequest, DistortionRequest, EqualizerBand, KaraokeRequest, LowPassRequest,
    RotationRequest, TimescaleRequest, TremoloRequest, VibratoRequest,
};

/// The validated, clamped mirror of a [`FilterRequest`](crate::FilterRequest).
///
/// `directives` holds the filters delegated to the external filter graph, in
/// the order the graph has to apply them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFilterSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equalizer: Option<Vec<EqualizerBand>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karaoke: Option<Karaoke>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timescale: Option<Timescale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<Tremolo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<Vibrato>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distortion: Option<Distortion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_mix: Option<ChannelMix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_pass: Option<LowPass>,
    pub directives: Vec<Directive>,
}

impl NormalizedFilterSet {
    /// The comma-joined `-af` argument, or `None` when nothing is delegated.
    pub fn directive_string(&self) -> Option<String> {
        if self.directives.is_empty() {
            None
        } else {
            Some(join_directives(&self.directives))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Karaoke {
    pub level: f64,
    pub mono_level: f64,
    pub filter_band: f64,
    pub filter_width: f64,
}

impl Karaoke {
    pub(crate) fn normalize(req: &KaraokeRequest) -> Option<Self> {
        Some(Self {
            level: given(req.level)?.clamp(0.0, 1.0),
            mono_level: given(req.mono_level)?.clamp(0.0, 1.0),
            filter_band: given(req.filter_band)?,
            filter_width: given(req.filter_width)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timescale {
    pub speed: f64,
    pub pitch: f64,
    pub rate: f64,
}

impl Timescale {
    pub(crate) fn normalize(req: &TimescaleRequest) -> Option<Self> {
        Some(Self {
            speed: given(req.speed)?.max(0.0),
            pitch: given(req.pitch)?.max(0.0),
            rate: given(req.rate)?.max(0.0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tremolo {
    pub frequency: f64,
    pub depth: f64,
}

impl Tremolo {
    /// A negative frequency clamps to 0, which leaves no LFO period to run,
    /// so it is treated like an unset one.
    pub(crate) fn normalize(req: &TremoloRequest) -> Option<Self> {
        let frequency = given(req.frequency)?.max(0.0);
        let depth = given(req.depth)?.clamp(0.0, 1.0);
        (frequency > 0.0).then_some(Self { frequency, depth })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vibrato {
    pub frequency: f64,
    pub depth: f64,
}

impl Vibrato {
    pub(crate) fn normalize(req: &VibratoRequest) -> Option<Self> {
        Some(Self {
            frequency: given(req.frequency)?.clamp(0.0, 14.0),
            depth: given(req.depth)?.clamp(0.0, 1.0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    pub rotation_hz: f64,
}

impl Rotation {
    pub(crate) fn normalize(req: &RotationRequest) -> Option<Self> {
        Some(Self {
            rotation_hz: given(req.rotation_hz)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distortion {
    pub sin_offset: f64,
    pub sin_scale: f64,
    pub cos_offset: f64,
    pub cos_scale: f64,
    pub tan_offset: f64,
    pub tan_scale: f64,
    pub offset: f64,
    pub scale: f64,
}

impl Distortion {
    pub(crate) fn normalize(req: &DistortionRequest) -> Option<Self> {
        Some(Self {
            sin_offset: given(req.sin_offset)?,
            sin_scale: given(req.sin_scale)?,
            cos_offset: given(req.cos_offset)?,
            cos_scale: given(req.cos_scale)?,
            tan_offset: given(req.tan_offset)?,
            tan_scale: given(req.tan_scale)?,
            offset: given(req.offset)?,
            scale: given(req.scale)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMix {
    pub left_to_left: f64,
    pub left_to_right: f64,
    pub right_to_left: f64,
    pub right_to_right: f64,
}

impl ChannelMix {
    pub(crate) fn normalize(req: &ChannelMixRequest) -> Option<Self> {
        Some(Self {
            left_to_left: given(req.left_to_left)?.clamp(0.0, 1.0),
            left_to_right: given(req.left_to_right)?.clamp(0.0, 1.0),
            right_to_left: given(req.right_to_left)?.clamp(0.0, 1.0),
            right_to_right: given(req.right_to_right)?.clamp(0.0, 1.0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LowPass {
    pub smoothing: f64,
}

impl LowPass {
    pub(crate) fn normalize(req: &LowPassRequest) -> Option<Self> {
        Some(Self {
            smoothing: given(req.smoothing)?.max(1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn karaoke_levels_clamp_into_unit_range() {
        let k = Karaoke::normalize(&KaraokeRequest {
            level: Some(5.0),
            mono_level: Some(-3.0),
            filter_band: Some(220.0),
            filter_width: Some(100.0),
        })
        .unwrap();
        assert_eq!(k.level, 1.0);
        assert_eq!(k.mono_level, 0.0);
        assert_eq!(k.filter_band, 220.0);
    }

    #[test]
    fn karaoke_needs_every_field() {
        let k = Karaoke::normalize(&KaraokeRequest {
            level: Some(1.0),
            mono_level: Some(1.0),
            filter_band: Some(220.0),
            filter_width: Some(0.0),
        });
        assert!(k.is_none());
    }

    #[test]
    fn vibrato_frequency_caps_at_fourteen() {
        let v = Vibrato::normalize(&VibratoRequest {
            frequency: Some(40.0),
            depth: Some(2.0),
        })
        .unwrap();
        assert_eq!(v.frequency, 14.0);
        assert_eq!(v.depth, 1.0);
    }

    #[test]
    fn negative_tremolo_frequency_is_not_applied() {
        let t = Tremolo::normalize(&TremoloRequest {
            frequency: Some(-4.0),
            depth: Some(0.5),
        });
        assert!(t.is_none());
    }

    #[test]
    fn low_pass_smoothing_has_a_floor_of_one() {
        let lp = LowPass::normalize(&LowPassRequest {
            smoothing: Some(0.2),
        })
        .unwrap();
        assert_eq!(lp.smoothing, 1.0);
    }

    #[test]
    fn timescale_never_goes_negative() {
        let ts = Timescale::normalize(&TimescaleRequest {
            speed: Some(-1.0),
            pitch: Some(1.5),
            rate: Some(-0.5),
        })
        .unwrap();
        assert_eq!(ts.speed, 0.0);
        assert_eq!(ts.pitch, 1.5);
        assert_eq!(ts.rate, 0.0);
    }
}
