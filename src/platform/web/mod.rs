//! Browser platform
//!
//! Binds the host traits to `window`: wall clock from `Date.now()`, pixels as
//! image loads, timers via gloo's `Timeout`/`Interval`, and the viewport from
//! the window's inner size.

pub mod bindings;
pub mod logger;
pub mod media;

pub use bindings::VpaidAd;
pub use media::WebMedia;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use gloo::timers::callback::{Interval, Timeout};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlImageElement, Window};

use super::{Clock, PixelSink, Scheduler, TimerHandle, Viewport, ViewportSource};

/// Convert a JS exception into a platform error
pub(crate) fn js_error(context: &str, value: JsValue) -> crate::Error {
    crate::Error::Platform(format!("{context}: {value:?}"))
}

enum WebTimer {
    Once(Timeout),
    Repeat(Interval),
}

/// Host backed by the browser window
pub struct WebHost {
    window: Window,
    // Live timers by handle; a timeout removes itself once it has run
    timers: Rc<RefCell<HashMap<i64, WebTimer>>>,
    next_id: Cell<i64>,
}

impl WebHost {
    pub fn new() -> Result<Self, crate::Error> {
        let window = web_sys::window()
            .ok_or_else(|| crate::Error::Platform("no global window".to_string()))?;
        Ok(Self::with_window(window))
    }

    pub fn with_window(window: Window) -> Self {
        Self {
            window,
            timers: Rc::new(RefCell::new(HashMap::new())),
            next_id: Cell::new(1),
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn next_id(&self) -> i64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl Clock for WebHost {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

impl PixelSink for WebHost {
    fn fire(&self, url: &str) {
        match HtmlImageElement::new() {
            Ok(image) => image.set_src(url),
            Err(e) => log::warn!("pixel dropped, cannot create image: {e:?}"),
        }
    }
}

impl Scheduler for WebHost {
    fn set_timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerHandle {
        let id = self.next_id();
        let timers = Rc::downgrade(&self.timers);
        let timeout = Timeout::new(delay_ms, move || {
            task();
            if let Some(timers) = timers.upgrade() {
                let finished = timers.borrow_mut().remove(&id);
                drop(finished);
            }
        });
        self.timers.borrow_mut().insert(id, WebTimer::Once(timeout));
        TimerHandle::from_raw(id)
    }

    fn set_interval(&self, period_ms: u32, task: Box<dyn FnMut()>) -> TimerHandle {
        let id = self.next_id();
        let interval = Interval::new(period_ms, task);
        self.timers.borrow_mut().insert(id, WebTimer::Repeat(interval));
        TimerHandle::from_raw(id)
    }

    fn clear_timer(&self, handle: TimerHandle) {
        let cancelled = self.timers.borrow_mut().remove(&handle.raw());
        match cancelled {
            Some(WebTimer::Once(timeout)) => drop(timeout.cancel()),
            Some(WebTimer::Repeat(interval)) => drop(interval.cancel()),
            None => log::trace!("timer {} already finished", handle.raw()),
        }
    }
}

impl ViewportSource for WebHost {
    fn viewport(&self) -> Viewport {
        let extent = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        Viewport::new(
            extent(self.window.inner_width()),
            extent(self.window.inner_height()),
        )
    }
}
