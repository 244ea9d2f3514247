use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use timbre_engine::{
    EngineConfig, FfmpegTranscoder, Monitor, MonitorConfig, PcmEncoder, PipelineAssembler,
    ResourceRequest, TrackInfo,
};
use timbre_filters::{FilterRequest, FilterStore};

#[derive(Parser)]
#[command(name = "timbre", version, about = "Filtered voice-track pipeline")]
struct Cli {
    /// JSON engine config (missing keys use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List output devices
    Devices,
    /// Normalize a filter request and print the result
    Filters {
        /// Filter request JSON, or @path to read it from a file
        request: String,
    },
    /// Print the transcoder arguments for a track
    Args(TrackArgs),
    /// Run the pipeline for a track
    Play {
        #[command(flatten)]
        track: TrackArgs,
        /// Write Ogg/Opus output to this file
        #[arg(long, conflicts_with = "monitor")]
        out: Option<PathBuf>,
        /// Play raw PCM output on an audio device instead of encoding
        #[arg(long)]
        monitor: bool,
        /// Output device name (substring match) for --monitor
        #[arg(long)]
        device: Option<String>,
        /// Linear output volume
        #[arg(long, default_value_t = 1.0)]
        volume: f64,
    },
}

#[derive(Args)]
struct TrackArgs {
    /// Playable url or local file
    #[arg(long)]
    url: String,
    /// Source platform of the track
    #[arg(long, default_value = "http")]
    source: String,
    #[arg(long, default_value = "untitled")]
    title: String,
    /// Filter request JSON, or @path
    #[arg(long)]
    filters: Option<String>,
    /// Start offset in milliseconds
    #[arg(long)]
    start: Option<u64>,
    /// Duration limit in milliseconds
    #[arg(long)]
    end: Option<u64>,
}

impl TrackArgs {
    fn request(&self) -> ResourceRequest {
        let protocol = self
            .url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_string())
            .unwrap_or_else(|| "file".to_string());
        ResourceRequest {
            track: TrackInfo {
                title: self.title.clone(),
                source_name: self.source.clone(),
            },
            url: self.url.clone(),
            protocol,
            start_time: self.start,
            end_time: self.end,
        }
    }

    fn store(&self, config: &EngineConfig) -> Result<FilterStore> {
        let mut store = FilterStore::new(config.filters);
        if let Some(filters) = &self.filters {
            store.configure(&read_request(filters)?);
        }
        Ok(store)
    }
}

fn read_request(arg: &str) -> Result<FilterRequest> {
    let json = match arg.strip_prefix('@') {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?
        }
        None => arg.to_string(),
    };
    FilterRequest::from_json(&json).context("parsing filter request")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    match cli.cmd {
        Command::Devices => timbre_engine::devices::print_devices()?,
        Command::Filters { request } => {
            let mut store = FilterStore::new(config.filters);
            let set = store.configure(&read_request(&request)?);
            println!("{}", serde_json::to_string_pretty(&set)?);
            if let Some(graph) = set.directive_string() {
                println!("-af {graph}");
            }
        }
        Command::Args(track) => {
            let store = track.store(&config)?;
            let request = track.request();
            let assembler = PipelineAssembler::new(config);
            let args = assembler.transcoder_args(&request.url, &request, store.current());
            println!("{}", args.join(" "));
        }
        Command::Play {
            track,
            out,
            monitor,
            device,
            volume,
        } => {
            let store = track.store(&config)?;
            let request = track.request();
            if monitor {
                play_on_device(config, &store, &request, device, volume)?;
            } else {
                let out = out.context("either --out or --monitor is required")?;
                encode_to_file(config, &store, &request, &out, volume)?;
            }
        }
    }
    Ok(())
}

fn encode_to_file(
    config: EngineConfig,
    store: &FilterStore,
    request: &ResourceRequest,
    out: &Path,
    volume: f64,
) -> Result<()> {
    let assembler = PipelineAssembler::new(config);
    let stream = assembler.get_resource(store, request)?;
    stream.volume().set(volume);

    let mut file = BufWriter::new(
        File::create(out).with_context(|| format!("creating {}", out.display()))?,
    );
    let mut written = 0usize;
    for chunk in stream {
        file.write_all(&chunk)?;
        written += chunk.len();
    }
    file.flush()?;
    info!("wrote {written} bytes to {}", out.display());
    Ok(())
}

fn play_on_device(
    config: EngineConfig,
    store: &FilterStore,
    request: &ResourceRequest,
    device: Option<String>,
    volume: f64,
) -> Result<()> {
    let transcoder = FfmpegTranscoder::new(config.ffmpeg_path.clone());
    let assembler =
        PipelineAssembler::with_collaborators(config, Box::new(transcoder), Box::new(PcmEncoder));

    let mut monitor = Monitor::start(&MonitorConfig {
        output_name: device,
        ..MonitorConfig::default()
    })?;

    let stream = assembler.get_resource(store, request)?;
    stream.volume().set(volume);
    for frame in stream {
        monitor.play(&frame);
    }
    monitor.drain();
    monitor.stop();
    Ok(())
}
