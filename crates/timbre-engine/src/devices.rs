use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};
use timbre_filters::{CHANNELS, SAMPLE_RATE};

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default_output: bool,
    /// Accepts the pipeline's stereo 48 kHz output without resampling.
    pub plays_pipeline_rate: bool,
}

/// Output-capable devices of the default host, in monitor index order.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();

    let default_out = host.default_output_device().map(|d| d.name().unwrap_or_default());

    let mut out = Vec::new();

    for dev in host.devices()? {
        let Ok(configs) = dev.supported_output_configs() else {
            continue;
        };
        let plays_pipeline_rate = configs.into_iter().any(|range| {
            range.channels() == CHANNELS
                && range.min_sample_rate().0 <= SAMPLE_RATE
                && range.max_sample_rate().0 >= SAMPLE_RATE
        });
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        let is_default_output = default_out.as_ref().map(|n| n == &name).unwrap_or(false);
        out.push(DeviceInfo {
            name,
            is_default_output,
            plays_pipeline_rate,
        });
    }
    Ok(out)
}

/// Pretty-print for CLI
pub fn print_devices() -> Result<()> {
    let list = list_devices()?;
    if list.is_empty() {
        println!("(no output devices found)");
        return Ok(());
    }
    for (i, d) in list.iter().enumerate() {
        let mut marks = String::new();
        if d.is_default_output {
            marks.push_str("*O");
        }
        if !d.plays_pipeline_rate {
            if !marks.is_empty() {
                marks.push(' ');
            }
            marks.push_str("no 48k stereo");
        }
        if !marks.is_empty() {
            print!("[{marks}] ");
        }
        println!("{:>2}  {}", i, d.name);
    }
    Ok(())
}
