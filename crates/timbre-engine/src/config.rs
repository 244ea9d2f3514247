use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use timbre_filters::FilterPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub ffmpeg_path: PathBuf,
    /// Passed as -threads, -filter_threads and -filter_complex_threads.
    pub threads: u32,
    /// Source names that cannot be filtered (matched case-insensitively).
    pub unsupported_sources: Vec<String>,
    pub filters: FilterPolicy,
    /// Capacity, in chunks, of each bounded channel between workers.
    pub relay_capacity: usize,
    /// Bytes per read from a subprocess pipe.
    pub chunk_size: usize,
    /// Opus bitrate in bits per second.
    pub opus_bitrate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            threads: 4,
            unsupported_sources: vec!["deezer".to_string()],
            filters: FilterPolicy::default(),
            relay_capacity: 16,
            chunk_size: 8192,
            opus_bitrate: 128_000,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn is_unsupported(&self, source_name: &str) -> bool {
        self.unsupported_sources
            .iter()
            .any(|s| s.eq_ignore_ascii_case(source_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"threads": 2, "filters": {"tremolo": false}}"#).unwrap();
        assert_eq!(cfg.threads, 2);
        assert!(!cfg.filters.tremolo);
        assert!(cfg.filters.rotation);
        assert_eq!(cfg.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(cfg.unsupported_sources, vec!["deezer".to_string()]);
    }

    #[test]
    fn unsupported_source_match_ignores_case() {
        let cfg = EngineConfig::default();
        assert!(cfg.is_unsupported("Deezer"));
        assert!(!cfg.is_unsupported("soundcloud"));
    }
}
