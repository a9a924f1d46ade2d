//! Playback progress milestones
//!
//! Turns media time updates into the ordered quartile events. The cursor into
//! the threshold table only moves forward, so each milestone is reported once
//! per playback session even when a single update jumps past several of them.

use crate::events::EventName;

/// A milestone and the percentage of playback at which it is reached
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub event: EventName,
    /// Name of the timing pixel reported alongside the lifecycle event
    pub pixel: &'static str,
    pub percent: f64,
}

/// Milestones in strictly increasing order
pub const QUARTILE_THRESHOLDS: [Threshold; 5] = [
    Threshold {
        event: EventName::VideoStart,
        pixel: "start",
        percent: 0.0,
    },
    Threshold {
        event: EventName::FirstQuartile,
        pixel: "firstQuartile",
        percent: 25.0,
    },
    Threshold {
        event: EventName::Midpoint,
        pixel: "midpoint",
        percent: 50.0,
    },
    Threshold {
        event: EventName::ThirdQuartile,
        pixel: "thirdQuartile",
        percent: 75.0,
    },
    Threshold {
        event: EventName::Complete,
        pixel: "complete",
        percent: 100.0,
    },
];

/// What a single progress update produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    /// Milestones crossed by this update, in threshold order
    pub reached: Vec<Threshold>,
    /// New duration when the media reported a different one
    pub duration_changed: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct QuartileTracker {
    cursor: usize,
    cached_duration: f64,
}

impl QuartileTracker {
    /// Create a tracker with the currently known duration
    pub fn new(known_duration: f64) -> Self {
        Self {
            cursor: 0,
            cached_duration: known_duration,
        }
    }

    /// Start a fresh playback session
    pub fn reset(&mut self, known_duration: f64) {
        self.cursor = 0;
        self.cached_duration = known_duration;
    }

    /// Index of the next milestone to report
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= QUARTILE_THRESHOLDS.len()
    }

    pub fn cached_duration(&self) -> f64 {
        self.cached_duration
    }

    pub fn on_progress(&mut self, current_time: f64, media_duration: f64) -> ProgressUpdate {
        let mut update = ProgressUpdate::default();

        if media_duration.is_finite() && media_duration > 0.0 && current_time.is_finite() {
            let percent = current_time / media_duration * 100.0;
            while let Some(threshold) = QUARTILE_THRESHOLDS.get(self.cursor) {
                if percent < threshold.percent {
                    break;
                }
                update.reached.push(*threshold);
                self.cursor += 1;
            }
        }

        if media_duration.is_finite() && media_duration != self.cached_duration {
            log::debug!(
                "duration changed from {} to {}",
                self.cached_duration,
                media_duration
            );
            self.cached_duration = media_duration;
            update.duration_changed = Some(media_duration);
        }

        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(update: &ProgressUpdate) -> Vec<EventName> {
        update.reached.iter().map(|t| t.event).collect()
    }

    #[test]
    fn test_each_quartile_fires_once_in_order() {
        let mut tracker = QuartileTracker::new(20.0);
        let mut fired = Vec::new();

        for tick in 0..=100 {
            let update = tracker.on_progress(f64::from(tick) * 0.2, 20.0);
            fired.extend(events(&update));
        }

        assert_eq!(
            fired,
            vec![
                EventName::VideoStart,
                EventName::FirstQuartile,
                EventName::Midpoint,
                EventName::ThirdQuartile,
                EventName::Complete,
            ]
        );
        assert!(tracker.is_complete());
        assert!(tracker.on_progress(20.0, 20.0).reached.is_empty());
    }

    #[test]
    fn test_jump_fires_all_skipped_thresholds() {
        let mut tracker = QuartileTracker::new(10.0);
        assert_eq!(events(&tracker.on_progress(0.0, 10.0)), vec![EventName::VideoStart]);

        let update = tracker.on_progress(8.0, 10.0);
        assert_eq!(
            events(&update),
            vec![
                EventName::FirstQuartile,
                EventName::Midpoint,
                EventName::ThirdQuartile
            ]
        );
        assert_eq!(tracker.cursor(), 4);
    }

    #[test]
    fn test_cursor_never_regresses() {
        let mut tracker = QuartileTracker::new(10.0);
        tracker.on_progress(6.0, 10.0);
        assert_eq!(tracker.cursor(), 3);

        assert!(tracker.on_progress(1.0, 10.0).reached.is_empty());
        assert_eq!(tracker.cursor(), 3);
    }

    #[test]
    fn test_duration_change_fires_once_per_change() {
        let mut tracker = QuartileTracker::new(-2.0);

        assert_eq!(tracker.on_progress(0.0, 30.0).duration_changed, Some(30.0));
        assert_eq!(tracker.on_progress(1.0, 30.0).duration_changed, None);
        assert_eq!(tracker.on_progress(2.0, 32.0).duration_changed, Some(32.0));
        assert_eq!(tracker.on_progress(3.0, 32.0).duration_changed, None);
    }

    #[test]
    fn test_duration_checks_continue_after_complete() {
        let mut tracker = QuartileTracker::new(10.0);
        tracker.on_progress(10.0, 10.0);
        assert!(tracker.is_complete());

        let update = tracker.on_progress(10.0, 11.0);
        assert!(update.reached.is_empty());
        assert_eq!(update.duration_changed, Some(11.0));
    }

    #[test]
    fn test_unknown_duration_reports_nothing() {
        let mut tracker = QuartileTracker::new(-2.0);
        assert_eq!(tracker.on_progress(3.0, f64::NAN), ProgressUpdate::default());
        assert!(tracker.on_progress(3.0, 0.0).reached.is_empty());
        assert_eq!(tracker.cursor(), 0);
    }
}
