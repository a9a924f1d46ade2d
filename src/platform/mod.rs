// Platform adapters for the creative
//
// Everything the creative needs from its host page goes through the traits in
// this module: the clock, timers, pixel delivery, the viewport and the media
// elements. The browser implementation lives in `web`, the deterministic one in
// `headless`.

pub mod headless;

#[cfg(feature = "web")]
pub mod web;

/// Opaque handle to a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub(crate) i64);

impl TimerHandle {
    /// Create a handle from a raw host timer id
    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    /// The raw host timer id
    pub fn raw(&self) -> i64 {
        self.0
    }
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Wall-clock source
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> f64;
}

/// Fire-and-forget delivery of tracking pixels
pub trait PixelSink {
    /// Issue a GET for `url`. No response handling, no retry.
    fn fire(&self, url: &str);
}

/// Timer facility of the host event loop
pub trait Scheduler {
    /// Run `task` once after `delay_ms`
    fn set_timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerHandle;

    /// Run `task` every `period_ms` until cleared
    fn set_interval(&self, period_ms: u32, task: Box<dyn FnMut()>) -> TimerHandle;

    /// Cancel a pending timeout or interval. Unknown handles are ignored.
    fn clear_timer(&self, handle: TimerHandle);
}

/// Source of the current viewport size
pub trait ViewportSource {
    fn viewport(&self) -> Viewport;
}

/// Everything the controller needs from the embedding page
pub trait Host: Clock + PixelSink + Scheduler + ViewportSource {}

impl<T: Clock + PixelSink + Scheduler + ViewportSource + ?Sized> Host for T {}

/// Answer of a media element's capability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanPlay {
    No,
    Maybe,
    Probably,
}

impl CanPlay {
    /// Interpret the string answer of `canPlayType`
    pub fn from_answer(answer: &str) -> Self {
        match answer {
            "probably" => CanPlay::Probably,
            "maybe" => CanPlay::Maybe,
            _ => CanPlay::No,
        }
    }

    pub fn is_playable(&self) -> bool {
        !matches!(self, CanPlay::No)
    }
}

/// A video or audio element owned by the creative
pub trait MediaElement {
    fn can_play_type(&self, mime_type: &str) -> CanPlay;

    fn set_src(&mut self, url: &str);

    fn src(&self) -> Option<String>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Duration in seconds, NaN while unknown
    fn duration(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    /// Apply display size. The DOM may refuse; callers treat this as best-effort.
    fn set_size(&mut self, width: u32, height: u32) -> Result<(), crate::Error>;
}
