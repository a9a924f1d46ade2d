//! Deterministic in-memory platform
//!
//! `HeadlessHost` keeps a virtual clock and a manual timer queue so the whole
//! lifecycle can be driven without a browser. Time only moves when `advance` is
//! called; due timers run in (due time, registration) order. `HeadlessMedia`
//! is a scripted media element whose state stays observable after it has been
//! handed to the controller.

use std::cell::RefCell;
use std::rc::Rc;

use super::{CanPlay, Clock, MediaElement, PixelSink, Scheduler, TimerHandle, Viewport, ViewportSource};

enum Task {
    Once(Box<dyn FnOnce()>),
    Repeat(Box<dyn FnMut()>),
}

struct PendingTimer {
    id: i64,
    due: f64,
    period: Option<f64>,
    task: Task,
}

#[derive(Default)]
struct TimerQueue {
    next_id: i64,
    pending: Vec<PendingTimer>,
    // Interval currently executing; its slot is empty while the task runs.
    running: Option<i64>,
    running_cleared: bool,
}

/// In-memory host for tests and non-browser embeddings
pub struct HeadlessHost {
    now: RefCell<f64>,
    viewport: RefCell<Viewport>,
    pixels: RefCell<Vec<String>>,
    timers: RefCell<TimerQueue>,
}

impl std::fmt::Debug for HeadlessHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessHost")
            .field("now", &self.now.borrow())
            .field("viewport", &self.viewport.borrow())
            .field("pixels", &self.pixels.borrow().len())
            .field("timers", &self.timers.borrow().pending.len())
            .finish()
    }
}

impl HeadlessHost {
    /// Create a host whose clock starts at `start_ms`
    pub fn new(start_ms: f64, viewport: Viewport) -> Self {
        Self {
            now: RefCell::new(start_ms),
            viewport: RefCell::new(viewport),
            pixels: RefCell::new(Vec::new()),
            timers: RefCell::new(TimerQueue {
                next_id: 1,
                ..TimerQueue::default()
            }),
        }
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.borrow_mut() = viewport;
    }

    /// Every pixel fired so far, in order
    pub fn pixels(&self) -> Vec<String> {
        self.pixels.borrow().clone()
    }

    /// Pixels whose URL contains `needle`
    pub fn pixels_matching(&self, needle: &str) -> Vec<String> {
        self.pixels
            .borrow()
            .iter()
            .filter(|url| url.contains(needle))
            .cloned()
            .collect()
    }

    pub fn clear_pixels(&self) {
        self.pixels.borrow_mut().clear();
    }

    /// Number of timers waiting to run
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().pending.len()
    }

    /// Move the clock forward by `ms`, running every timer that falls due
    pub fn advance(&self, ms: f64) {
        let target = *self.now.borrow() + ms;

        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let position = timers
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by(|(_, a), (_, b)| {
                        a.due.total_cmp(&b.due).then(a.id.cmp(&b.id))
                    })
                    .map(|(index, _)| index);

                match position {
                    Some(index) => {
                        let timer = timers.pending.remove(index);
                        if timer.period.is_some() {
                            timers.running = Some(timer.id);
                            timers.running_cleared = false;
                        }
                        Some(timer)
                    }
                    None => None,
                }
            };

            let Some(timer) = next else {
                break;
            };

            *self.now.borrow_mut() = timer.due;

            match timer.task {
                Task::Once(task) => task(),
                Task::Repeat(mut task) => {
                    task();

                    let mut timers = self.timers.borrow_mut();
                    let cleared = timers.running_cleared;
                    timers.running = None;
                    timers.running_cleared = false;

                    if !cleared {
                        let period = timer.period.unwrap_or(0.0).max(1.0);
                        timers.pending.push(PendingTimer {
                            id: timer.id,
                            due: timer.due + period,
                            period: timer.period,
                            task: Task::Repeat(task),
                        });
                    }
                }
            }
        }

        *self.now.borrow_mut() = target;
    }

    fn schedule(&self, delay_ms: u32, period: Option<f64>, task: Task) -> TimerHandle {
        let due = *self.now.borrow() + f64::from(delay_ms);
        let mut timers = self.timers.borrow_mut();
        let id = timers.next_id;
        timers.next_id += 1;
        timers.pending.push(PendingTimer {
            id,
            due,
            period,
            task,
        });
        TimerHandle(id)
    }
}

impl Clock for HeadlessHost {
    fn now_ms(&self) -> f64 {
        *self.now.borrow()
    }
}

impl PixelSink for HeadlessHost {
    fn fire(&self, url: &str) {
        self.pixels.borrow_mut().push(url.to_string());
    }
}

impl Scheduler for HeadlessHost {
    fn set_timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerHandle {
        self.schedule(delay_ms, None, Task::Once(task))
    }

    fn set_interval(&self, period_ms: u32, task: Box<dyn FnMut()>) -> TimerHandle {
        self.schedule(period_ms, Some(f64::from(period_ms)), Task::Repeat(task))
    }

    fn clear_timer(&self, handle: TimerHandle) {
        let mut timers = self.timers.borrow_mut();
        if timers.running == Some(handle.0) {
            timers.running_cleared = true;
        }
        timers.pending.retain(|timer| timer.id != handle.0);
    }
}

impl ViewportSource for HeadlessHost {
    fn viewport(&self) -> Viewport {
        *self.viewport.borrow()
    }
}

/// Observable state of a `HeadlessMedia`
#[derive(Debug, Clone, Default)]
pub struct MediaState {
    pub supported: Vec<String>,
    pub src: Option<String>,
    pub playing: bool,
    pub play_calls: usize,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f64,
    pub size: Option<(u32, u32)>,
    pub fail_resize: bool,
}

/// Scripted media element; clones share state
#[derive(Debug, Clone)]
pub struct HeadlessMedia {
    state: Rc<RefCell<MediaState>>,
}

impl HeadlessMedia {
    /// A media element that can play the listed MIME types
    pub fn supporting(mime_types: &[&str]) -> Self {
        Self {
            state: Rc::new(RefCell::new(MediaState {
                supported: mime_types.iter().map(|m| m.to_string()).collect(),
                duration: f64::NAN,
                volume: 1.0,
                ..MediaState::default()
            })),
        }
    }

    pub fn state(&self) -> MediaState {
        self.state.borrow().clone()
    }

    pub fn set_position(&self, current_time: f64, duration: f64) {
        let mut state = self.state.borrow_mut();
        state.current_time = current_time;
        state.duration = duration;
    }

    pub fn fail_resize(&self, fail: bool) {
        self.state.borrow_mut().fail_resize = fail;
    }

    /// Boxed handle sharing this element's state
    pub fn boxed(&self) -> Box<dyn MediaElement> {
        Box::new(self.clone())
    }
}

impl MediaElement for HeadlessMedia {
    fn can_play_type(&self, mime_type: &str) -> CanPlay {
        if self.state.borrow().supported.iter().any(|m| m == mime_type) {
            CanPlay::Probably
        } else {
            CanPlay::No
        }
    }

    fn set_src(&mut self, url: &str) {
        self.state.borrow_mut().src = Some(url.to_string());
    }

    fn src(&self) -> Option<String> {
        self.state.borrow().src.clone()
    }

    fn play(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = true;
        state.play_calls += 1;
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.borrow_mut().volume = volume;
    }

    fn set_size(&mut self, width: u32, height: u32) -> Result<(), crate::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_resize {
            return Err(crate::Error::Platform("element refused resize".to_string()));
        }
        state.size = Some((width, height));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_timers_run_in_due_order() {
        let host = HeadlessHost::new(0.0, Viewport::new(100.0, 100.0));
        let order = Rc::new(RefCell::new(Vec::new()));

        let late = order.clone();
        host.set_timeout(200, Box::new(move || late.borrow_mut().push("late")));
        let early = order.clone();
        host.set_timeout(50, Box::new(move || early.borrow_mut().push("early")));

        host.advance(100.0);
        assert_eq!(*order.borrow(), vec!["early"]);
        assert_eq!(host.now_ms(), 100.0);

        host.advance(100.0);
        assert_eq!(*order.borrow(), vec!["early", "late"]);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn test_interval_repeats_until_cleared() {
        let host = Rc::new(HeadlessHost::new(0.0, Viewport::new(100.0, 100.0)));
        let ticks = Rc::new(Cell::new(0));

        let counter = ticks.clone();
        let handle = host.set_interval(250, Box::new(move || counter.set(counter.get() + 1)));

        host.advance(1000.0);
        assert_eq!(ticks.get(), 4);

        host.clear_timer(handle);
        host.advance(1000.0);
        assert_eq!(ticks.get(), 4);
    }

    #[test]
    fn test_interval_can_clear_itself() {
        let host = Rc::new(HeadlessHost::new(0.0, Viewport::new(100.0, 100.0)));
        let ticks = Rc::new(Cell::new(0));
        let handle: Rc<Cell<Option<TimerHandle>>> = Rc::new(Cell::new(None));

        let counter = ticks.clone();
        let own_handle = handle.clone();
        let weak_host = Rc::downgrade(&host);
        let id = host.set_interval(
            100,
            Box::new(move || {
                counter.set(counter.get() + 1);
                if counter.get() == 2 {
                    if let (Some(host), Some(h)) = (weak_host.upgrade(), own_handle.get()) {
                        host.clear_timer(h);
                    }
                }
            }),
        );
        handle.set(Some(id));

        host.advance(1000.0);
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn test_timeout_handles_are_released_after_running() {
        let host = Rc::new(HeadlessHost::new(0.0, Viewport::new(100.0, 100.0)));
        let ticks = Rc::new(Cell::new(0));

        let counter = ticks.clone();
        let interval = host.set_interval(100, Box::new(move || counter.set(counter.get() + 1)));
        let weak_host = Rc::downgrade(&host);
        let timeout = host.set_timeout(
            250,
            Box::new(move || {
                if let Some(host) = weak_host.upgrade() {
                    host.clear_timer(interval);
                }
            }),
        );

        host.advance(1000.0);
        assert_eq!(ticks.get(), 2);
        assert_eq!(host.pending_timers(), 0);

        host.clear_timer(timeout);
        host.clear_timer(interval);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn test_media_state_is_shared_with_boxed_handle() {
        let media = HeadlessMedia::supporting(&["video/webm"]);
        let mut boxed = media.boxed();
        boxed.set_src("b.webm");
        boxed.play();

        let state = media.state();
        assert_eq!(state.src.as_deref(), Some("b.webm"));
        assert!(state.playing);
        assert!(boxed.can_play_type("video/webm").is_playable());
        assert!(!boxed.can_play_type("video/mp4").is_playable());
    }
}
