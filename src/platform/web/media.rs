use web_sys::HtmlMediaElement;

use super::js_error;
use crate::platform::{CanPlay, MediaElement};

/// A `<video>` or `<audio>` element
#[derive(Debug, Clone)]
pub struct WebMedia {
    element: HtmlMediaElement,
}

impl WebMedia {
    pub fn new(element: HtmlMediaElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlMediaElement {
        &self.element
    }
}

impl MediaElement for WebMedia {
    fn can_play_type(&self, mime_type: &str) -> CanPlay {
        CanPlay::from_answer(&self.element.can_play_type(mime_type))
    }

    fn set_src(&mut self, url: &str) {
        self.element.set_src(url);
    }

    fn src(&self) -> Option<String> {
        Some(self.element.src()).filter(|src| !src.is_empty())
    }

    fn play(&mut self) {
        // Autoplay rejections surface on the returned promise and are not ours to handle.
        if let Err(e) = self.element.play() {
            log::debug!("play failed: {e:?}");
        }
    }

    fn pause(&mut self) {
        if let Err(e) = self.element.pause() {
            log::debug!("pause failed: {e:?}");
        }
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }

    fn set_volume(&mut self, volume: f64) {
        self.element.set_volume(volume);
    }

    fn set_size(&mut self, width: u32, height: u32) -> Result<(), crate::Error> {
        self.element
            .set_attribute("width", &width.to_string())
            .map_err(|e| js_error("set width", e))?;
        self.element
            .set_attribute("height", &height.to_string())
            .map_err(|e| js_error("set height", e))?;
        Ok(())
    }
}
