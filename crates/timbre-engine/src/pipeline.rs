//! Decides which stages a filtered track needs and starts them.

use std::collections::HashMap;
use std::io::{self, Read};

use log::{debug, info, warn};
use serde::Serialize;
use timbre_filters::{FilterStore, NormalizedFilterSet, CHANNELS, EQUALIZER_BANDS, SAMPLE_RATE};

use crate::config::EngineConfig;
use crate::dsp::gain::{VolumeHandle, VolumeStage};
use crate::dsp::processor::ChannelProcessor;
use crate::dsp::stage::EffectStage;
use crate::encoder::{Encoder, OpusEncoder};
use crate::error::{PipelineError, ResourceFailure};
use crate::graph::Chain;
use crate::process::{Cancellation, ProcessHandle};
use crate::stream::{FilterStream, StreamJoiner};
use crate::transcoder::{FfmpegTranscoder, Transcoder};

/// One unit of the assembled chain, in the order it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Volume,
    Equalizer,
    Tremolo,
    Rotation,
    Encode,
}

/// What the track lookup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub source_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub track: TrackInfo,
    pub url: String,
    pub protocol: String,
    /// Milliseconds to seek before decoding.
    pub start_time: Option<u64>,
    /// Milliseconds of audio to produce.
    pub end_time: Option<u64>,
}

/// Exchanges a playback url for one the transcoder can open, e.g. a signed url.
pub trait UrlRewriter: Send + Sync {
    fn rewrite(&self, url: &str, protocol: &str) -> anyhow::Result<String>;
}

pub struct PipelineAssembler {
    config: EngineConfig,
    transcoder: Box<dyn Transcoder>,
    encoder: Box<dyn Encoder>,
    rewriters: HashMap<String, Box<dyn UrlRewriter>>,
}

impl PipelineAssembler {
    /// `ffmpeg` for decoding and Ogg/Opus encoding, as configured.
    pub fn new(config: EngineConfig) -> Self {
        let transcoder = FfmpegTranscoder::new(config.ffmpeg_path.clone());
        let encoder = OpusEncoder::new(
            config.ffmpeg_path.clone(),
            config.opus_bitrate,
            config.chunk_size,
        );
        Self::with_collaborators(config, Box::new(transcoder), Box::new(encoder))
    }

    pub fn with_collaborators(
        config: EngineConfig,
        transcoder: Box<dyn Transcoder>,
        encoder: Box<dyn Encoder>,
    ) -> Self {
        Self {
            config,
            transcoder,
            encoder,
            rewriters: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers the url rewrite for tracks from `source_name`.
    pub fn register_rewriter(&mut self, source_name: &str, rewriter: Box<dyn UrlRewriter>) {
        self.rewriters
            .insert(source_name.to_ascii_lowercase(), rewriter);
    }

    /// Stage order for a configured filter set. Always starts with volume and
    /// ends with encode.
    pub fn stage_plan(set: &NormalizedFilterSet, bands: &[f64; EQUALIZER_BANDS]) -> Vec<StageKind> {
        let mut plan = vec![StageKind::Volume];
        if bands.iter().any(|&gain| gain != 0.0) {
            plan.push(StageKind::Equalizer);
        }
        if set.tremolo.is_some() {
            plan.push(StageKind::Tremolo);
        }
        if set.rotation.is_some() {
            plan.push(StageKind::Rotation);
        }
        plan.push(StageKind::Encode);
        plan
    }

    /// In-process stages for `plan`.
    ///
    /// Tremolo frequency and depth and the rotation rate are halved on the way
    /// into the processors; audible timing depends on those factors.
    pub fn build_chain(
        plan: &[StageKind],
        set: &NormalizedFilterSet,
        bands: [f64; EQUALIZER_BANDS],
        volume: VolumeHandle,
    ) -> Chain {
        let mut chain = Chain::new();
        for kind in plan {
            match kind {
                StageKind::Volume => chain.push(Box::new(VolumeStage::new(volume.clone()))),
                StageKind::Equalizer => chain.push(Box::new(EffectStage::new(
                    ChannelProcessor::equalizer(bands),
                ))),
                StageKind::Tremolo => {
                    if let Some(t) = set.tremolo {
                        chain.push(Box::new(EffectStage::new(ChannelProcessor::tremolo(
                            t.frequency / 2.0,
                            t.depth / 2.0,
                            SAMPLE_RATE,
                        ))));
                    }
                }
                StageKind::Rotation => {
                    if let Some(r) = set.rotation {
                        chain.push(Box::new(EffectStage::new(ChannelProcessor::rotation(
                            r.rotation_hz / 2.0,
                            SAMPLE_RATE,
                        ))));
                    }
                }
                StageKind::Encode => {}
            }
        }
        chain
    }

    /// Arguments for the transcoder process.
    pub fn transcoder_args(
        &self,
        url: &str,
        request: &ResourceRequest,
        set: &NormalizedFilterSet,
    ) -> Vec<String> {
        let threads = self.config.threads.to_string();
        let mut args: Vec<String> = vec![
            "-loglevel".into(),
            "0".into(),
            "-analyzeduration".into(),
            "0".into(),
            "-hwaccel".into(),
            "auto".into(),
            "-threads".into(),
            threads.clone(),
            "-filter_threads".into(),
            threads.clone(),
            "-filter_complex_threads".into(),
            threads,
        ];
        if let Some(start) = request.start_time.filter(|&ms| ms > 0) {
            args.push("-ss".into());
            args.push(format!("{start}ms"));
        }
        args.push("-i".into());
        args.push(normalize_url(url));
        if let Some(graph) = set.directive_string() {
            args.push("-af".into());
            args.push(graph);
        }
        if let Some(end) = request.end_time.filter(|&ms| ms > 0) {
            args.push("-t".into());
            args.push(format!("{end}ms"));
        }
        args.extend([
            "-f".to_string(),
            "s16le".to_string(),
            "-ar".to_string(),
            SAMPLE_RATE.to_string(),
            "-ac".to_string(),
            CHANNELS.to_string(),
            "-crf".to_string(),
            "0".to_string(),
            "pipe:1".to_string(),
        ]);
        args
    }

    /// Builds the filtered stream for a track, or the structured failure.
    pub fn get_resource(
        &self,
        store: &FilterStore,
        request: &ResourceRequest,
    ) -> Result<FilterStream, ResourceFailure> {
        self.open(store, request).map_err(|err| {
            warn!("{} ({}): {err}", request.track.title, request.track.source_name);
            ResourceFailure::from(err)
        })
    }

    fn open(
        &self,
        store: &FilterStore,
        request: &ResourceRequest,
    ) -> Result<FilterStream, PipelineError> {
        let track = &request.track;
        if self.config.is_unsupported(&track.source_name) {
            debug!("{}: filtering unsupported for {}", track.title, track.source_name);
            return Err(PipelineError::UnsupportedSource(track.source_name.clone()));
        }

        let url = match self.rewriters.get(&track.source_name.to_ascii_lowercase()) {
            Some(rewriter) => {
                debug!("rewriting {} url for {}", track.source_name, track.title);
                rewriter
                    .rewrite(&request.url, &request.protocol)
                    .map_err(|err| PipelineError::UrlRewrite {
                        source_name: track.source_name.clone(),
                        reason: format!("{err:#}"),
                    })?
            }
            None => request.url.clone(),
        };

        let set = store.current();
        let args = self.transcoder_args(&url, request, set);
        debug!("transcoder args: {args:?}");

        let cancel = Cancellation::new();
        let output = self
            .transcoder
            .launch(&args)
            .map_err(PipelineError::TranscoderStartup)?;
        let mut reader = output.reader;
        if let Some(process) = output.process.clone() {
            debug!("transcoder started (pid {})", process.id());
            cancel.track(process);
        }

        let first = match first_chunk(&mut *reader, self.config.chunk_size, output.process.as_ref()) {
            Ok(first) => first,
            Err(err) => {
                cancel.cancel();
                return Err(err);
            }
        };

        let bands = store.bands();
        let plan = Self::stage_plan(set, &bands);
        let volume = VolumeHandle::default();
        let chain = Self::build_chain(&plan, set, bands, volume.clone());

        let (frame_tx, frame_rx) = flume::bounded(self.config.relay_capacity.max(1));
        let session = match self.encoder.open(frame_tx) {
            Ok(session) => session,
            Err(err) => {
                cancel.cancel();
                return Err(PipelineError::EncoderStartup(err));
            }
        };
        if let Some(process) = session.process {
            cancel.track(process);
        }

        info!("streaming {} through {:?}", track.title, plan);
        StreamJoiner::new(self.config.relay_capacity, self.config.chunk_size)
            .join(first, reader, chain, session.input, &cancel)
            .map_err(|err| {
                cancel.cancel();
                PipelineError::EncoderStartup(err)
            })?;
        Ok(FilterStream::new(frame_rx, cancel, volume, plan))
    }
}

/// Blocks until the transcoder produced its first bytes.
///
/// Ending with no output is only an error when the process reports failure; a
/// clean exit yields an empty stream.
fn first_chunk(
    reader: &mut (dyn Read + Send),
    chunk_size: usize,
    process: Option<&ProcessHandle>,
) -> Result<Vec<u8>, PipelineError> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                if let Some(process) = process {
                    let status = process.wait().map_err(PipelineError::TranscoderRead)?;
                    if !status.success() {
                        return Err(PipelineError::TranscoderExited(status.to_string()));
                    }
                }
                return Ok(Vec::new());
            }
            Ok(n) => {
                buf.truncate(n);
                return Ok(buf);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(PipelineError::TranscoderRead(err)),
        }
    }
}

/// Absolute urls go through WHATWG serialization: characters outside the url
/// syntax are percent-encoded, the host is lowercased, `.`/`..` path segments
/// are resolved and a bare origin gains a trailing `/`. Anything that does not
/// parse (a local path) is passed as is.
fn normalize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timbre_filters::FilterRequest;

    fn request() -> ResourceRequest {
        ResourceRequest {
            track: TrackInfo {
                title: "song".into(),
                source_name: "http".into(),
            },
            url: "https://media.example.com/a song.mp3".into(),
            protocol: "https".into(),
            start_time: None,
            end_time: None,
        }
    }

    fn configured(json: &str) -> FilterStore {
        let mut store = FilterStore::default();
        store.configure(&FilterRequest::from_json(json).unwrap());
        store
    }

    #[test]
    fn plan_without_effects_is_volume_then_encode() {
        let store = FilterStore::default();
        let plan = PipelineAssembler::stage_plan(store.current(), &store.bands());
        assert_eq!(plan, vec![StageKind::Volume, StageKind::Encode]);
    }

    #[test]
    fn rotation_always_follows_tremolo() {
        let store = configured(
            r#"{"rotation":{"rotationHz":0.2},"tremolo":{"frequency":2,"depth":0.5},
                "equalizer":[{"band":1,"gain":0.25}]}"#,
        );
        let plan = PipelineAssembler::stage_plan(store.current(), &store.bands());
        assert_eq!(
            plan,
            vec![
                StageKind::Volume,
                StageKind::Equalizer,
                StageKind::Tremolo,
                StageKind::Rotation,
                StageKind::Encode,
            ]
        );
    }

    #[test]
    fn chain_halves_modulation_rates() {
        let store = configured(r#"{"tremolo":{"frequency":4,"depth":0.8},"rotation":{"rotationHz":2}}"#);
        let plan = PipelineAssembler::stage_plan(store.current(), &store.bands());
        let chain =
            PipelineAssembler::build_chain(&plan, store.current(), store.bands(), VolumeHandle::default());
        assert_eq!(chain.names(), vec!["volume", "tremolo", "rotation"]);

        // tremolo at 2 Hz needs 24000 samples per period; at depth 0.4 the
        // first frame is scaled by 0.6
        let mut block: Vec<u8> = [10000i16, 10000].iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut chain = chain;
        chain.process(&mut block);
        assert_eq!(i16::from_le_bytes([block[0], block[1]]), 6000);
    }

    #[test]
    fn args_follow_the_output_contract() {
        let store = configured(r#"{"volume":0.5,"lowPass":{"smoothing":20}}"#);
        let assembler = PipelineAssembler::new(EngineConfig::default());
        let mut req = request();
        req.start_time = Some(1500);
        req.end_time = Some(30000);
        let args = assembler.transcoder_args(&req.url, &req, store.current());
        let joined = args.join(" ");

        assert!(joined.starts_with(
            "-loglevel 0 -analyzeduration 0 -hwaccel auto -threads 4 -filter_threads 4 -filter_complex_threads 4 -ss 1500ms -i "
        ));
        assert!(joined.contains("-i https://media.example.com/a%20song.mp3 -af volume=0.5,lowpass=f=0.04 -t 30000ms"));
        assert!(joined.ends_with("-f s16le -ar 48000 -ac 2 -crf 0 pipe:1"));
    }

    #[test]
    fn urls_are_serialized_and_paths_pass_through() {
        assert_eq!(
            normalize_url("https://CDN.example.com/a/../my track.mp3"),
            "https://cdn.example.com/my%20track.mp3"
        );
        assert_eq!(normalize_url("https://example.com"), "https://example.com/");
        assert_eq!(normalize_url("/music/my track.flac"), "/music/my track.flac");
    }

    #[test]
    fn args_skip_optional_parts() {
        let store = FilterStore::default();
        let assembler = PipelineAssembler::new(EngineConfig::default());
        let mut req = request();
        req.url = "/music/local file.flac".into();
        let args = assembler.transcoder_args(&req.url, &req, store.current());
        assert!(!args.iter().any(|a| a == "-ss" || a == "-af" || a == "-t"));
        assert!(args.iter().any(|a| a == "/music/local file.flac"));
    }
}
