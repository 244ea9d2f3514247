use std::fmt;

use serde::{Serialize, Serializer};

use crate::params::{ChannelMix, Distortion, Karaoke, LowPass, Timescale, Vibrato};
use crate::SAMPLE_RATE;

/// One filter in the external transcoder's filter graph.
///
/// The graph applies filters left to right, so a `Vec<Directive>` is ordered.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Volume(f64),
    Karaoke(Karaoke),
    Timescale(Timescale),
    Vibrato(Vibrato),
    Distortion(Distortion),
    ChannelMix(ChannelMix),
    LowPass(LowPass),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Volume(v) => write!(f, "volume={v}"),
            Directive::Karaoke(k) => write!(
                f,
                "stereotools=mlev={}:mwid={}:k={}:kc={}",
                k.mono_level, k.filter_width, k.level, k.filter_band
            ),
            Directive::Timescale(t) => {
                let rate_shift = 1.0 - t.rate;
                let tempo = t.speed + (1.0 - t.pitch);
                write!(
                    f,
                    "asetrate={SAMPLE_RATE}*{},atempo={tempo},aresample={SAMPLE_RATE}",
                    t.pitch + rate_shift
                )
            }
            Directive::Vibrato(v) => write!(f, "vibrato=f={}:d={}", v.frequency, v.depth),
            Directive::Distortion(d) => {
                let expr = format!(
                    "hypot(re,im)*sin(0.1*{}*PI*t)*{}+hypot(re,im)*cos(0.1*{}*PI*t)*{}+hypot(re,im)*tan(0.1*{}*PI*t)*{}+{}",
                    d.sin_offset, d.sin_scale, d.cos_offset, d.cos_scale, d.tan_offset, d.tan_scale, d.offset
                );
                write!(
                    f,
                    "afftfilt=real='{expr}':imag='{expr}':win_size=512:overlap=0.75:scale={}",
                    d.scale
                )
            }
            Directive::ChannelMix(m) => write!(
                f,
                "pan=stereo|c0<c0*{}+c1*{}|c1<c0*{}+c1*{}",
                m.left_to_left, m.right_to_left, m.left_to_right, m.right_to_right
            ),
            // Clamped smoothing (>= 1), so the cutoff never drops below 1/500.
            Directive::LowPass(lp) => write!(f, "lowpass=f={}", lp.smoothing / 500.0),
        }
    }
}

impl Serialize for Directive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Joins directives into the single comma-separated `-af` argument.
pub fn join_directives(directives: &[Directive]) -> String {
    directives
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
