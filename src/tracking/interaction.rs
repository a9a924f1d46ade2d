//! Page-wide interaction capture
//!
//! Every pointer-down, touch-start or click anywhere on the page updates the
//! last interaction position. Positions are percentages of the viewport so
//! they compare across screen sizes.

use crate::platform::Viewport;

/// Position reported when an event carries no usable coordinates
pub const UNKNOWN_POSITION: &str = "0_0";

/// DOM interaction observed at the document level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    PointerDown,
    TouchStart,
    Click,
}

impl InteractionKind {
    /// DOM event type
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::PointerDown => "pointerdown",
            InteractionKind::TouchStart => "touchstart",
            InteractionKind::Click => "click",
        }
    }

    /// Whether this interaction is reported as a tracking event of its own.
    /// Clicks only update the position; the click pixel belongs to the gate.
    pub fn is_reported(&self) -> bool {
        !matches!(self, InteractionKind::Click)
    }
}

/// Client coordinates of an interaction, when the event had them
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerSample {
    pub client_x: Option<f64>,
    pub client_y: Option<f64>,
}

impl PointerSample {
    pub fn at(client_x: f64, client_y: f64) -> Self {
        Self {
            client_x: Some(client_x),
            client_y: Some(client_y),
        }
    }

    /// A sample from an event without coordinates
    pub fn missing() -> Self {
        Self::default()
    }
}

/// `round(x/w*100)_round(y/h*100)`, or `"0_0"` when that cannot be computed
pub fn normalized_position(sample: PointerSample, viewport: Viewport) -> String {
    let (Some(x), Some(y)) = (sample.client_x, sample.client_y) else {
        return UNKNOWN_POSITION.to_string();
    };

    let usable = |v: f64| v.is_finite();
    let usable_extent = |v: f64| v.is_finite() && v > 0.0;
    if !(usable(x) && usable(y) && usable_extent(viewport.width) && usable_extent(viewport.height))
    {
        return UNKNOWN_POSITION.to_string();
    }

    let px = (x / viewport.width * 100.0).round() as i64;
    let py = (y / viewport.height * 100.0).round() as i64;
    format!("{px}_{py}")
}

#[derive(Debug, Clone)]
pub struct InteractionTracker {
    last_position: String,
}

impl Default for InteractionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self {
            last_position: UNKNOWN_POSITION.to_string(),
        }
    }

    /// Record an interaction and return the new last position
    pub fn record(&mut self, kind: InteractionKind, sample: PointerSample, viewport: Viewport) -> &str {
        self.last_position = normalized_position(sample, viewport);
        log::trace!("{} at {}", kind.as_str(), self.last_position);
        &self.last_position
    }

    pub fn last_position(&self) -> &str {
        &self.last_position
    }
}
