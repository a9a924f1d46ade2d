//! Lifecycle event names and payloads

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The closed set of lifecycle events a subscriber can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventName {
    Loaded,
    Started,
    Impression,
    VideoStart,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    Complete,
    DurationChange,
    Paused,
    Playing,
    RemainingTimeChange,
    VolumeChange,
    SizeChange,
    ExpandedChange,
    Skipped,
    Stopped,
    Error,
    ClickThru,
    Interaction,
}

impl EventName {
    pub const ALL: [EventName; 20] = [
        EventName::Loaded,
        EventName::Started,
        EventName::Impression,
        EventName::VideoStart,
        EventName::FirstQuartile,
        EventName::Midpoint,
        EventName::ThirdQuartile,
        EventName::Complete,
        EventName::DurationChange,
        EventName::Paused,
        EventName::Playing,
        EventName::RemainingTimeChange,
        EventName::VolumeChange,
        EventName::SizeChange,
        EventName::ExpandedChange,
        EventName::Skipped,
        EventName::Stopped,
        EventName::Error,
        EventName::ClickThru,
        EventName::Interaction,
    ];

    /// Name used on the wire by the wrapper
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Loaded => "AdLoaded",
            EventName::Started => "AdStarted",
            EventName::Impression => "AdImpression",
            EventName::VideoStart => "AdVideoStart",
            EventName::FirstQuartile => "AdVideoFirstQuartile",
            EventName::Midpoint => "AdVideoMidpoint",
            EventName::ThirdQuartile => "AdVideoThirdQuartile",
            EventName::Complete => "AdVideoComplete",
            EventName::DurationChange => "AdDurationChange",
            EventName::Paused => "AdPaused",
            EventName::Playing => "AdPlaying",
            EventName::RemainingTimeChange => "AdRemainingTimeChange",
            EventName::VolumeChange => "AdVolumeChange",
            EventName::SizeChange => "AdSizeChange",
            EventName::ExpandedChange => "AdExpandedChange",
            EventName::Skipped => "AdSkipped",
            EventName::Stopped => "AdStopped",
            EventName::Error => "AdError",
            EventName::ClickThru => "AdClickThru",
            EventName::Interaction => "AdInteraction",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}

/// Arguments delivered alongside an event
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventData {
    #[default]
    None,
    Error {
        message: String,
    },
    ClickThru {
        url: String,
        id: String,
        player_handles: bool,
    },
    Interaction {
        id: String,
    },
}

impl EventData {
    pub fn error(message: impl Into<String>) -> Self {
        EventData::Error {
            message: message.into(),
        }
    }
}
