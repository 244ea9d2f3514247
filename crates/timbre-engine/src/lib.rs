//! Streaming filter pipeline for one voice track.
//!
//! [`PipelineAssembler::get_resource`] launches the external transcoder with
//! the filter-graph directives, runs the in-process stages (volume, equalizer,
//! tremolo, rotation) over its PCM output and hands the result to an encoder.
//! The caller gets either a [`FilterStream`] of encoded frames or a
//! [`ResourceFailure`].

pub mod config;
pub mod devices;
pub mod dsp;
pub mod encoder;
pub mod error;
pub mod graph;
pub mod monitor;
pub mod pipeline;
pub mod process;
pub mod stream;
pub mod transcoder;

pub use config::EngineConfig;
pub use dsp::gain::VolumeHandle;
pub use encoder::{Encoder, OpusEncoder, PcmEncoder};
pub use error::{PipelineError, ResourceFailure};
pub use monitor::{Monitor, MonitorConfig};
pub use pipeline::{PipelineAssembler, ResourceRequest, StageKind, TrackInfo, UrlRewriter};
pub use stream::FilterStream;
pub use transcoder::{FfmpegTranscoder, Transcoder, TranscoderOutput};
