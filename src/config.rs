//! Creative payload schema and runtime settings
//!
//! The wrapper hands the creative a JSON blob (`creativeData.AdParameters`).
//! It is parsed into the structs below; anything missing or malformed is a
//! `ConfigError` rather than a silently undefined value.

use serde::Deserialize;
use url::Url;

/// Token replaced by the current epoch milliseconds when a pixel is loaded
pub const DEFAULT_TIMESTAMP_MACRO: &str = "[timestamp]";

/// Token in the redirect template replaced by the click-through destination
pub const DESTINATION_MACRO: &str = "[destination]";

/// Errors raised while reading the creative payload
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("creative payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("redirect template {template:?} is not a valid URL: {source}")]
    Template {
        template: String,
        #[source]
        source: url::ParseError,
    },

    #[error("redirect template {0:?} has no path to derive event URLs from")]
    TemplateWithoutPath(String),

    #[error("point-of-interest reference is malformed: {0}")]
    Poi(String),
}

/// A media file offered by the payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaCandidate {
    pub url: String,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
}

/// `config.macro` section of the payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MacroConfig {
    /// Base redirect template
    pub url: String,
    #[serde(default = "default_timestamp_macro")]
    pub timestamp: String,
    /// Ad-exchange click confirmation URL, possibly an unresolved macro
    #[serde(rename = "gClick", default)]
    pub g_click: String,
}

fn default_timestamp_macro() -> String {
    DEFAULT_TIMESTAMP_MACRO.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackingSection {
    #[serde(rename = "macro")]
    pub macros: MacroConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct PoiRef {
    id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct RawPayload {
    #[serde(default)]
    videos: Vec<MediaCandidate>,
    #[serde(default)]
    poi: Option<String>,
    config: TrackingSection,
    #[serde(default)]
    cc: Option<String>,
}

/// Parsed and validated creative payload
#[derive(Debug, Clone, PartialEq)]
pub struct CreativePayload {
    pub videos: Vec<MediaCandidate>,
    pub poi_id: Option<String>,
    pub campaign_code: Option<String>,
    pub tracking: TrackingConfig,
}

impl CreativePayload {
    pub fn parse(creative_data: &str) -> Result<Self, ConfigError> {
        let raw: RawPayload = serde_json::from_str(creative_data)?;

        let poi_id = match raw.poi.as_deref().map(str::trim) {
            Some(encoded) if !encoded.is_empty() => Some(decode_poi(encoded)?),
            _ => None,
        };

        Ok(Self {
            videos: raw.videos,
            poi_id,
            campaign_code: raw.cc.filter(|cc| !cc.is_empty()),
            tracking: TrackingConfig::new(raw.config.macros)?,
        })
    }
}

/// Tracking parameters shared by the pixel dispatcher and the click gate
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    template: String,
    base: Url,
    timestamp_macro: String,
    g_click: String,
}

impl TrackingConfig {
    pub fn new(macros: MacroConfig) -> Result<Self, ConfigError> {
        let mut base = Url::parse(&macros.url).map_err(|source| ConfigError::Template {
            template: macros.url.clone(),
            source,
        })?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::TemplateWithoutPath(macros.url));
        }
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            template: macros.url,
            base,
            timestamp_macro: macros.timestamp,
            g_click: macros.g_click,
        })
    }

    /// The redirect template exactly as delivered
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn timestamp_macro(&self) -> &str {
        &self.timestamp_macro
    }

    pub fn g_click(&self) -> &str {
        &self.g_click
    }

    /// Tracker URL for `event`: the template with its redirect path segment
    /// replaced by the event name and no query
    pub fn event_url(&self, event: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().pop().push(event);
        }
        url
    }
}

/// Runtime knobs with the values the creative ships with
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CreativeSettings {
    /// Total fires allowed per non-click interaction event
    pub interaction_fire_ceiling: u32,
    /// Upper bound of the reported elapsed time, in seconds
    pub max_elapsed_secs: f64,
    /// Delay between `stopAd` and the stopped event
    pub stop_delay_ms: u32,
    /// Period of the remaining-time ticker
    pub remaining_time_tick_ms: u32,
    /// One-shot timing events armed on first play
    pub timing_schedule: Vec<TimingMark>,
}

/// A timing event fired once, `delay_ms` after playback first starts
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimingMark {
    pub name: String,
    pub delay_ms: u32,
}

impl TimingMark {
    pub fn new(name: impl Into<String>, delay_ms: u32) -> Self {
        Self {
            name: name.into(),
            delay_ms,
        }
    }
}

impl Default for CreativeSettings {
    fn default() -> Self {
        Self {
            interaction_fire_ceiling: 30,
            max_elapsed_secs: 3000.0,
            stop_delay_ms: 75,
            remaining_time_tick_ms: 250,
            timing_schedule: vec![
                TimingMark::new("time_1s", 1_000),
                TimingMark::new("time_5s", 5_000),
                TimingMark::new("time_10s", 10_000),
                TimingMark::new("time_15s", 15_000),
                TimingMark::new("time_30s", 30_000),
            ],
        }
    }
}

/// Decode the URL-encoded JSON `{id}` reference
fn decode_poi(encoded: &str) -> Result<String, ConfigError> {
    let decoded = percent_encoding::percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| ConfigError::Poi(e.to_string()))?;

    let poi: PoiRef =
        serde_json::from_str(&decoded).map_err(|e| ConfigError::Poi(format!("{decoded}: {e}")))?;
    if poi.id.is_empty() {
        return Err(ConfigError::Poi("empty id".to_string()));
    }
    Ok(poi.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "videos": [
            {"url": "a.mp4", "mimetype": "video/mp4"},
            {"url": "b.webm", "mimetype": "video/webm"}
        ],
        "poi": "%7B%22id%22%3A%22u09tv%22%7D",
        "config": {"macro": {
            "url": "https://trk.example.com/v1/redirect?dest=[destination]&cb=[timestamp]",
            "gClick": "https://adclick.example.net/pcs/click?xai=abc&adurl="
        }},
        "cc": "FR"
    }"#;

    #[test]
    fn test_parse_payload() {
        let payload = CreativePayload::parse(PAYLOAD).unwrap();
        assert_eq!(payload.videos.len(), 2);
        assert_eq!(payload.videos[1].mime_type, "video/webm");
        assert_eq!(payload.poi_id.as_deref(), Some("u09tv"));
        assert_eq!(payload.campaign_code.as_deref(), Some("FR"));
        assert_eq!(payload.tracking.timestamp_macro(), DEFAULT_TIMESTAMP_MACRO);
        assert!(payload.tracking.g_click().starts_with("https://adclick"));
    }

    #[test]
    fn test_event_url_replaces_redirect_segment() {
        let payload = CreativePayload::parse(PAYLOAD).unwrap();
        assert_eq!(
            payload.tracking.event_url("midpoint").as_str(),
            "https://trk.example.com/v1/midpoint"
        );
    }

    #[test]
    fn test_missing_config_is_a_typed_error() {
        let result = CreativePayload::parse(r#"{"videos": []}"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_bad_template_is_rejected() {
        let result = CreativePayload::parse(r#"{"config": {"macro": {"url": "not a url"}}}"#);
        assert!(matches!(result, Err(ConfigError::Template { .. })));

        let result = CreativePayload::parse(r#"{"config": {"macro": {"url": "mailto:x@y.z"}}}"#);
        assert!(matches!(result, Err(ConfigError::TemplateWithoutPath(_))));
    }

    #[test]
    fn test_poi_must_decode_to_an_id() {
        let result = CreativePayload::parse(
            r#"{"poi": "%7Bnope", "config": {"macro": {"url": "https://t.example.com/r"}}}"#,
        );
        assert!(matches!(result, Err(ConfigError::Poi(_))));

        let payload = CreativePayload::parse(
            r#"{"poi": "", "config": {"macro": {"url": "https://t.example.com/r"}}}"#,
        )
        .unwrap();
        assert_eq!(payload.poi_id, None);
    }

    #[test]
    fn test_poi_keeps_literal_plus_and_ampersand() {
        let payload = CreativePayload::parse(
            r#"{"poi": "%7B%22id%22%3A%22a+b&c=d%22%7D", "config": {"macro": {"url": "https://t.example.com/r"}}}"#,
        )
        .unwrap();
        assert_eq!(payload.poi_id.as_deref(), Some("a+b&c=d"));

        let result = CreativePayload::parse(
            r#"{"poi": "%7B%22id%22%3A%22%FF%22%7D", "config": {"macro": {"url": "https://t.example.com/r"}}}"#,
        );
        assert!(matches!(result, Err(ConfigError::Poi(_))));
    }

    #[test]
    fn test_default_settings() {
        let settings = CreativeSettings::default();
        assert_eq!(settings.interaction_fire_ceiling, 30);
        assert_eq!(settings.stop_delay_ms, 75);
        assert_eq!(settings.remaining_time_tick_ms, 250);
        assert_eq!(settings.timing_schedule.len(), 5);
    }
}
