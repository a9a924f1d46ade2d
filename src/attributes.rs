//! Observable ad state
//!
//! The wrapper reads these values at any time through the getters; only the
//! controller writes them. Access is either typed (struct fields via methods)
//! or by name through `get`/`set`, which is what the lifecycle boundary uses.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Names of every attribute the creative exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeName {
    Width,
    Height,
    ViewMode,
    DesiredBitrate,
    Volume,
    Duration,
    RemainingTime,
    Expanded,
    SkippableState,
    Linear,
    Icons,
    Companions,
}

impl AttributeName {
    pub const ALL: [AttributeName; 12] = [
        AttributeName::Width,
        AttributeName::Height,
        AttributeName::ViewMode,
        AttributeName::DesiredBitrate,
        AttributeName::Volume,
        AttributeName::Duration,
        AttributeName::RemainingTime,
        AttributeName::Expanded,
        AttributeName::SkippableState,
        AttributeName::Linear,
        AttributeName::Icons,
        AttributeName::Companions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeName::Width => "width",
            AttributeName::Height => "height",
            AttributeName::ViewMode => "viewMode",
            AttributeName::DesiredBitrate => "desiredBitrate",
            AttributeName::Volume => "volume",
            AttributeName::Duration => "duration",
            AttributeName::RemainingTime => "remainingTime",
            AttributeName::Expanded => "expanded",
            AttributeName::SkippableState => "skippableState",
            AttributeName::Linear => "linear",
            AttributeName::Icons => "icons",
            AttributeName::Companions => "companions",
        }
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownAttribute(s.to_string()))
    }
}

/// A single attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl AttributeValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AttributeValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Duration or remaining time that is not known yet
pub const UNKNOWN_TIME: f64 = -2.0;

/// The ad's attribute store
#[derive(Debug, Clone, PartialEq)]
pub struct AdAttributes {
    width: u32,
    height: u32,
    view_mode: String,
    desired_bitrate: u32,
    volume: f64,
    duration: f64,
    remaining_time: f64,
    expanded: bool,
    skippable_state: bool,
    linear: bool,
    icons: bool,
    companions: String,
}

impl Default for AdAttributes {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            view_mode: "normal".to_string(),
            desired_bitrate: 256,
            volume: 1.0,
            duration: UNKNOWN_TIME,
            remaining_time: UNKNOWN_TIME,
            expanded: false,
            skippable_state: false,
            linear: true,
            icons: false,
            companions: String::new(),
        }
    }
}

impl AdAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an attribute by name
    pub fn get(&self, name: AttributeName) -> AttributeValue {
        match name {
            AttributeName::Width => AttributeValue::Number(f64::from(self.width)),
            AttributeName::Height => AttributeValue::Number(f64::from(self.height)),
            AttributeName::ViewMode => AttributeValue::Text(self.view_mode.clone()),
            AttributeName::DesiredBitrate => {
                AttributeValue::Number(f64::from(self.desired_bitrate))
            }
            AttributeName::Volume => AttributeValue::Number(self.volume),
            AttributeName::Duration => AttributeValue::Number(self.duration),
            AttributeName::RemainingTime => AttributeValue::Number(self.remaining_time),
            AttributeName::Expanded => AttributeValue::Flag(self.expanded),
            AttributeName::SkippableState => AttributeValue::Flag(self.skippable_state),
            AttributeName::Linear => AttributeValue::Flag(self.linear),
            AttributeName::Icons => AttributeValue::Flag(self.icons),
            AttributeName::Companions => AttributeValue::Text(self.companions.clone()),
        }
    }

    /// Write an attribute by name
    pub fn set(&mut self, name: AttributeName, value: AttributeValue) -> Result<(), Error> {
        let mismatch = |expected| Error::AttributeType {
            name: name.as_str(),
            expected,
        };

        match name {
            AttributeName::Width => {
                self.width = to_dimension(value.as_number().ok_or_else(|| mismatch("number"))?)
            }
            AttributeName::Height => {
                self.height = to_dimension(value.as_number().ok_or_else(|| mismatch("number"))?)
            }
            AttributeName::DesiredBitrate => {
                self.desired_bitrate =
                    to_dimension(value.as_number().ok_or_else(|| mismatch("number"))?)
            }
            AttributeName::Volume => {
                self.set_volume(value.as_number().ok_or_else(|| mismatch("number"))?);
            }
            AttributeName::Duration => {
                self.duration = value.as_number().ok_or_else(|| mismatch("number"))?
            }
            AttributeName::RemainingTime => {
                self.remaining_time = value.as_number().ok_or_else(|| mismatch("number"))?
            }
            AttributeName::ViewMode => {
                self.view_mode = value.as_text().ok_or_else(|| mismatch("text"))?.to_string()
            }
            AttributeName::Companions => {
                self.companions = value.as_text().ok_or_else(|| mismatch("text"))?.to_string()
            }
            AttributeName::Expanded => {
                self.expanded = value.as_flag().ok_or_else(|| mismatch("flag"))?
            }
            AttributeName::SkippableState => {
                self.skippable_state = value.as_flag().ok_or_else(|| mismatch("flag"))?
            }
            AttributeName::Linear => {
                self.linear = value.as_flag().ok_or_else(|| mismatch("flag"))?
            }
            AttributeName::Icons => self.icons = value.as_flag().ok_or_else(|| mismatch("flag"))?,
        }
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn view_mode(&self) -> &str {
        &self.view_mode
    }

    pub fn desired_bitrate(&self) -> u32 {
        self.desired_bitrate
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn remaining_time(&self) -> f64 {
        self.remaining_time
    }

    pub fn expanded(&self) -> bool {
        self.expanded
    }

    pub fn skippable_state(&self) -> bool {
        self.skippable_state
    }

    pub fn linear(&self) -> bool {
        self.linear
    }

    pub fn icons(&self) -> bool {
        self.icons
    }

    pub fn companions(&self) -> &str {
        &self.companions
    }

    pub fn set_size(&mut self, width: u32, height: u32, view_mode: &str) {
        self.width = width;
        self.height = height;
        self.view_mode = view_mode.to_string();
    }

    pub fn set_desired_bitrate(&mut self, bitrate: u32) {
        self.desired_bitrate = bitrate;
    }

    /// Store a volume clamped into `[0, 1]`. NaN is ignored.
    ///
    /// Returns whether the stored value was updated.
    pub fn set_volume(&mut self, volume: f64) -> bool {
        if volume.is_nan() {
            return false;
        }
        self.volume = volume.clamp(0.0, 1.0);
        true
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    /// Lower the remaining time, never raising a known value and never
    /// dropping below zero. An unknown remaining time accepts any value.
    pub fn lower_remaining_time(&mut self, remaining: f64) {
        let remaining = remaining.max(0.0);
        if self.remaining_time < 0.0 || remaining < self.remaining_time {
            self.remaining_time = remaining;
        }
    }

    /// Count the remaining time down by `seconds`, flooring at zero.
    /// Unknown remaining time stays unknown.
    pub fn tick_remaining_time(&mut self, seconds: f64) {
        if self.remaining_time >= 0.0 {
            self.remaining_time = (self.remaining_time - seconds).max(0.0);
        }
    }

    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }
}

fn to_dimension(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let attributes = AdAttributes::default();
        assert_eq!(attributes.view_mode(), "normal");
        assert_eq!(attributes.volume(), 1.0);
        assert_eq!(attributes.duration(), UNKNOWN_TIME);
        assert!(attributes.linear());
        assert!(!attributes.skippable_state());
    }

    #[test]
    fn test_get_set_by_name() {
        let mut attributes = AdAttributes::default();
        let name: AttributeName = "remainingTime".parse().unwrap();
        attributes
            .set(name, AttributeValue::Number(12.5))
            .unwrap();
        assert_eq!(attributes.get(name), AttributeValue::Number(12.5));

        attributes
            .set(AttributeName::Companions, AttributeValue::Text("<div/>".into()))
            .unwrap();
        assert_eq!(attributes.companions(), "<div/>");
    }

    #[test]
    fn test_unknown_name_and_wrong_shape_are_rejected() {
        assert!(matches!(
            "bogus".parse::<AttributeName>(),
            Err(Error::UnknownAttribute(_))
        ));

        let mut attributes = AdAttributes::default();
        let result = attributes.set(AttributeName::Linear, AttributeValue::Number(1.0));
        assert!(matches!(
            result,
            Err(Error::AttributeType { name: "linear", .. })
        ));
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut attributes = AdAttributes::default();
        attributes.set_volume(1.7);
        assert_eq!(attributes.volume(), 1.0);
        attributes.set_volume(-0.3);
        assert_eq!(attributes.volume(), 0.0);
        assert!(!attributes.set_volume(f64::NAN));
        assert_eq!(attributes.volume(), 0.0);
    }

    #[test]
    fn test_remaining_time_only_decreases() {
        let mut attributes = AdAttributes::default();
        attributes.tick_remaining_time(0.25);
        assert_eq!(attributes.remaining_time(), UNKNOWN_TIME);

        attributes.lower_remaining_time(30.0);
        assert_eq!(attributes.remaining_time(), 30.0);
        attributes.lower_remaining_time(40.0);
        assert_eq!(attributes.remaining_time(), 30.0);

        attributes.tick_remaining_time(0.25);
        assert_eq!(attributes.remaining_time(), 29.75);

        attributes.lower_remaining_time(0.1);
        attributes.tick_remaining_time(0.25);
        assert_eq!(attributes.remaining_time(), 0.0);
    }
}
