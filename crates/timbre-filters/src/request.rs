use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FilterError;

/// Filters as sent by a client. Nothing here is trusted yet.
///
/// Every sub-object is optional. A sub-object (or equalizer band) that does
/// not have the expected shape is dropped while parsing instead of failing the
/// whole request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    #[serde(default, deserialize_with = "lenient")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bands")]
    pub equalizer: Option<Vec<EqualizerBand>>,
    #[serde(default, deserialize_with = "lenient")]
    pub karaoke: Option<KaraokeRequest>,
    #[serde(default, deserialize_with = "lenient")]
    pub timescale: Option<TimescaleRequest>,
    #[serde(default, deserialize_with = "lenient")]
    pub tremolo: Option<TremoloRequest>,
    #[serde(default, deserialize_with = "lenient")]
    pub vibrato: Option<VibratoRequest>,
    #[serde(default, deserialize_with = "lenient")]
    pub rotation: Option<RotationRequest>,
    #[serde(default, deserialize_with = "lenient")]
    pub distortion: Option<DistortionRequest>,
    #[serde(default, deserialize_with = "lenient")]
    pub channel_mix: Option<ChannelMixRequest>,
    #[serde(default, deserialize_with = "lenient")]
    pub low_pass: Option<LowPassRequest>,
}

impl FilterRequest {
    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One equalizer band update. `index` is accepted as an alias of `band`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualizerBand {
    #[serde(alias = "index")]
    pub band: i64,
    pub gain: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KaraokeRequest {
    pub level: Option<f64>,
    pub mono_level: Option<f64>,
    pub filter_band: Option<f64>,
    pub filter_width: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimescaleRequest {
    pub speed: Option<f64>,
    pub pitch: Option<f64>,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TremoloRequest {
    pub frequency: Option<f64>,
    pub depth: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VibratoRequest {
    pub frequency: Option<f64>,
    pub depth: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RotationRequest {
    pub rotation_hz: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DistortionRequest {
    pub sin_offset: Option<f64>,
    pub sin_scale: Option<f64>,
    pub cos_offset: Option<f64>,
    pub cos_scale: Option<f64>,
    pub tan_offset: Option<f64>,
    pub tan_scale: Option<f64>,
    pub offset: Option<f64>,
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelMixRequest {
    pub left_to_left: Option<f64>,
    pub left_to_right: Option<f64>,
    pub right_to_left: Option<f64>,
    pub right_to_right: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LowPassRequest {
    pub smoothing: Option<f64>,
}

/// A numeric field counts as set only when it is present, finite and non-zero.
/// Zero means "unset", not "disable".
pub(crate) fn given(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn lenient_bands<'de, D>(deserializer: D) -> Result<Option<Vec<EqualizerBand>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| EqualizerBand::deserialize(item).ok())
            .collect(),
    ))
}
