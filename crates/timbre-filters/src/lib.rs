//! Client filter requests for a streamed voice track.
//!
//! A [`FilterRequest`] is untrusted JSON. [`FilterStore::configure`] checks it
//! against a [`FilterPolicy`], clamps every value into range and produces a
//! [`NormalizedFilterSet`] together with the ordered filter-graph
//! [`Directive`]s handed to the external transcoder.

pub mod directive;
pub mod error;
pub mod params;
pub mod policy;
pub mod request;
pub mod store;

pub use directive::{join_directives, Directive};
pub use error::FilterError;
pub use params::{
    ChannelMix, Distortion, Karaoke, LowPass, NormalizedFilterSet, Rotation, Timescale, Tremolo,
    Vibrato,
};
pub use policy::FilterPolicy;
pub use request::{EqualizerBand, FilterRequest};
pub use store::FilterStore;

/// Number of graphic equalizer bands.
pub const EQUALIZER_BANDS: usize = 15;

/// Output sample rate of the transcoder and every in-process stage.
pub const SAMPLE_RATE: u32 = 48_000;

/// Interleaved channel count (stereo).
pub const CHANNELS: u16 = 2;

/// Samples per channel in one 20 ms encoded frame.
pub const FRAME_SIZE: usize = 960;
