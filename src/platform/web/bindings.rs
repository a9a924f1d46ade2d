//! JavaScript lifecycle interface
//!
//! `getVPAIDAd()` hands the wrapper a `VpaidAd`. Every lifecycle method is
//! forwarded to the controller; failures never throw into the wrapper and are
//! reported as `AdError` instead.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Event, EventTarget, HtmlAnchorElement, HtmlElement, HtmlMediaElement, MouseEvent,
    TouchEvent,
};

use super::{js_error, WebHost, WebMedia};
use crate::controller::{AdController, AdEnvironment, InitParams};
use crate::events::EventData;
use crate::tracking::{InteractionKind, NavigationDecision, PointerSample};
use crate::Error;

const OVERLAY_STYLE: &str =
    "position:absolute;top:0;left:0;width:100%;height:100%;display:block;z-index:2;cursor:pointer;";

struct Attached {
    target: EventTarget,
    kind: &'static str,
    capture: bool,
    listener: Closure<dyn FnMut(Event)>,
}

/// The creative object handed to the wrapper
#[wasm_bindgen]
pub struct VpaidAd {
    controller: AdController<JsValue>,
    host: Rc<WebHost>,
    listeners: RefCell<Vec<Attached>>,
}

/// Factory the wrapper looks up on the creative's frame
#[wasm_bindgen(js_name = getVPAIDAd)]
pub fn get_vpaid_ad() -> Result<VpaidAd, JsValue> {
    console_error_panic_hook::set_once();
    if let Err(e) = crate::init_logging(log::LevelFilter::Info) {
        log::debug!("console logger not installed: {e}");
    }
    VpaidAd::new().map_err(|e| JsValue::from_str(&e.to_string()))
}

impl VpaidAd {
    pub fn new() -> Result<Self, Error> {
        let host = Rc::new(WebHost::new()?);
        Ok(Self {
            controller: AdController::with_defaults(host.clone()),
            host,
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// The controller behind this object
    pub fn controller(&self) -> &AdController<JsValue> {
        &self.controller
    }

    fn settle(&self, result: Result<(), Error>) {
        if let Err(e) = result {
            self.controller.report_error(&e);
        }
    }

    fn try_init(
        &self,
        params: InitParams,
        creative_data: &JsValue,
        environment_vars: &JsValue,
    ) -> Result<(), Error> {
        let payload = ad_parameters(creative_data)?;
        let document = self
            .host
            .window()
            .document()
            .ok_or_else(|| Error::Platform("no document".to_string()))?;

        let slot: HtmlElement = property(environment_vars, "slot")?
            .dyn_into()
            .map_err(|_| Error::Platform("environmentVars.slot is not an element".to_string()))?;
        let video = match property(environment_vars, "videoSlot")?.dyn_into::<HtmlMediaElement>() {
            Ok(video) => video,
            Err(_) => {
                log::debug!("no video slot provided, creating one");
                create_media(&document, &slot, "video")?
            }
        };
        let can_autoplay = property(environment_vars, "videoSlotCanAutoPlay")?
            .as_bool()
            .unwrap_or(false);
        let audio = create_media(&document, &slot, "audio")?;

        let loaded = self.controller.init_ad(
            params,
            &payload,
            AdEnvironment {
                video: Box::new(WebMedia::new(video.clone())),
                audio: Some(Box::new(WebMedia::new(audio))),
                can_autoplay,
            },
        )?;

        // The loaded subscriber may already have started the ad
        if loaded {
            self.attach_media(&video)?;
            self.attach_overlay(&document, &slot)?;
            self.attach_interactions(&document)?;
        }
        Ok(())
    }

    fn listen<F>(&self, target: &EventTarget, kind: &'static str, capture: bool, handler: F) -> Result<(), Error>
    where
        F: FnMut(Event) + 'static,
    {
        let listener = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback_and_bool(kind, listener.as_ref().unchecked_ref(), capture)
            .map_err(|e| js_error(kind, e))?;
        self.listeners.borrow_mut().push(Attached {
            target: target.clone(),
            kind,
            capture,
            listener,
        });
        Ok(())
    }

    fn attach_media(&self, video: &HtmlMediaElement) -> Result<(), Error> {
        let controller = self.controller.clone();
        self.listen(video, "timeupdate", false, move |_| controller.on_time_update())?;

        let controller = self.controller.clone();
        self.listen(video, "ended", false, move |_| controller.on_ended())?;

        let controller = self.controller.clone();
        self.listen(video, "play", false, move |_| controller.on_play())
    }

    /// Transparent anchor over the slot. Its first handler arms the
    /// click-through and points the anchor at the redirect; the second one
    /// cancels the navigation unless the gate lets it through.
    fn attach_overlay(&self, document: &Document, slot: &HtmlElement) -> Result<(), Error> {
        let anchor: HtmlAnchorElement = document
            .create_element("a")
            .map_err(|e| js_error("create overlay", e))?
            .dyn_into()
            .map_err(|_| Error::Platform("<a> is not an anchor".to_string()))?;
        anchor.set_target("_blank");
        anchor
            .set_attribute("style", OVERLAY_STYLE)
            .map_err(|e| js_error("style overlay", e))?;
        slot.append_child(&anchor)
            .map_err(|e| js_error("append overlay", e))?;

        let controller = self.controller.clone();
        let target = anchor.clone();
        self.listen(&anchor, "click", false, move |_| {
            if let Some(href) = controller.request_click_through(None, &[]) {
                target.set_href(&href);
            }
        })?;

        let controller = self.controller.clone();
        self.listen(&anchor, "click", false, move |event: Event| {
            if controller.on_navigation() == NavigationDecision::Prevent {
                event.prevent_default();
            }
        })
    }

    fn attach_interactions(&self, document: &Document) -> Result<(), Error> {
        for kind in [
            InteractionKind::PointerDown,
            InteractionKind::TouchStart,
            InteractionKind::Click,
        ] {
            let controller = self.controller.clone();
            self.listen(document, kind.as_str(), true, move |event: Event| {
                controller.on_interaction(kind, pointer_sample(kind, &event));
            })?;
        }
        Ok(())
    }
}

impl Drop for VpaidAd {
    fn drop(&mut self) {
        for attached in self.listeners.get_mut().drain(..) {
            if let Err(e) = attached.target.remove_event_listener_with_callback_and_bool(
                attached.kind,
                attached.listener.as_ref().unchecked_ref(),
                attached.capture,
            ) {
                log::debug!("failed to detach {} listener: {e:?}", attached.kind);
            }
        }
    }
}

#[wasm_bindgen]
impl VpaidAd {
    #[wasm_bindgen(js_name = handshakeVersion)]
    pub fn handshake_version(&self, version: String) -> String {
        self.controller.handshake_version(&version).to_string()
    }

    #[wasm_bindgen(js_name = initAd)]
    pub fn init_ad(
        &self,
        width: u32,
        height: u32,
        view_mode: String,
        desired_bitrate: u32,
        creative_data: JsValue,
        environment_vars: JsValue,
    ) {
        let params = InitParams {
            width,
            height,
            view_mode,
            desired_bitrate,
        };
        self.settle(self.try_init(params, &creative_data, &environment_vars));
    }

    #[wasm_bindgen(js_name = startAd)]
    pub fn start_ad(&self) {
        self.settle(self.controller.start_ad());
    }

    #[wasm_bindgen(js_name = stopAd)]
    pub fn stop_ad(&self) {
        self.settle(self.controller.stop_ad());
    }

    #[wasm_bindgen(js_name = pauseAd)]
    pub fn pause_ad(&self) {
        self.settle(self.controller.pause_ad());
    }

    #[wasm_bindgen(js_name = resumeAd)]
    pub fn resume_ad(&self) {
        self.settle(self.controller.resume_ad());
    }

    #[wasm_bindgen(js_name = resizeAd)]
    pub fn resize_ad(&self, width: u32, height: u32, view_mode: String) {
        self.settle(self.controller.resize_ad(width, height, &view_mode));
    }

    #[wasm_bindgen(js_name = skipAd)]
    pub fn skip_ad(&self) {
        self.settle(self.controller.skip_ad());
    }

    #[wasm_bindgen(js_name = expandAd)]
    pub fn expand_ad(&self) {
        self.settle(self.controller.expand_ad());
    }

    #[wasm_bindgen(js_name = collapseAd)]
    pub fn collapse_ad(&self) {
        self.settle(self.controller.collapse_ad());
    }

    #[wasm_bindgen(js_name = setAdVolume)]
    pub fn set_ad_volume(&self, volume: f64) {
        self.controller.set_ad_volume(volume);
    }

    #[wasm_bindgen(js_name = getAdVolume)]
    pub fn get_ad_volume(&self) -> f64 {
        self.controller.get_ad_volume()
    }

    #[wasm_bindgen(js_name = getAdWidth)]
    pub fn get_ad_width(&self) -> u32 {
        self.controller.get_ad_width()
    }

    #[wasm_bindgen(js_name = getAdHeight)]
    pub fn get_ad_height(&self) -> u32 {
        self.controller.get_ad_height()
    }

    #[wasm_bindgen(js_name = getAdRemainingTime)]
    pub fn get_ad_remaining_time(&self) -> f64 {
        self.controller.get_ad_remaining_time()
    }

    #[wasm_bindgen(js_name = getAdDuration)]
    pub fn get_ad_duration(&self) -> f64 {
        self.controller.get_ad_duration()
    }

    #[wasm_bindgen(js_name = getAdCompanions)]
    pub fn get_ad_companions(&self) -> String {
        self.controller.get_ad_companions()
    }

    #[wasm_bindgen(js_name = getAdIcons)]
    pub fn get_ad_icons(&self) -> bool {
        self.controller.get_ad_icons()
    }

    #[wasm_bindgen(js_name = getAdLinear)]
    pub fn get_ad_linear(&self) -> bool {
        self.controller.get_ad_linear()
    }

    #[wasm_bindgen(js_name = getAdExpanded)]
    pub fn get_ad_expanded(&self) -> bool {
        self.controller.get_ad_expanded()
    }

    #[wasm_bindgen(js_name = getAdSkippableState)]
    pub fn get_ad_skippable_state(&self) -> bool {
        self.controller.get_ad_skippable_state()
    }

    pub fn subscribe(&self, callback: js_sys::Function, event_name: String, context: JsValue) {
        let result = self.controller.subscribe(
            move |context: &JsValue, data: &EventData| invoke(&callback, context, data),
            &event_name,
            context,
        );
        if let Err(e) = result {
            log::warn!("subscribe ignored: {e}");
        }
    }

    pub fn unsubscribe(&self, event_name: String) {
        if let Err(e) = self.controller.unsubscribe(&event_name) {
            log::warn!("unsubscribe ignored: {e}");
        }
    }
}

fn invoke(callback: &js_sys::Function, context: &JsValue, data: &EventData) {
    let result = match data {
        EventData::None => callback.call0(context),
        EventData::Error { message } => callback.call1(context, &JsValue::from_str(message)),
        EventData::ClickThru {
            url,
            id,
            player_handles,
        } => callback.call3(
            context,
            &JsValue::from_str(url),
            &JsValue::from_str(id),
            &JsValue::from_bool(*player_handles),
        ),
        EventData::Interaction { id } => callback.call1(context, &JsValue::from_str(id)),
    };
    if let Err(e) = result {
        log::warn!("subscriber threw: {e:?}");
    }
}

fn property(target: &JsValue, name: &str) -> Result<JsValue, Error> {
    js_sys::Reflect::get(target, &JsValue::from_str(name)).map_err(|e| js_error(name, e))
}

/// Payload string from `creativeData`: either the string itself or its
/// `AdParameters` field
fn ad_parameters(creative_data: &JsValue) -> Result<String, Error> {
    if let Some(payload) = creative_data.as_string() {
        return Ok(payload);
    }
    property(creative_data, "AdParameters")?
        .as_string()
        .ok_or_else(|| Error::Platform("creativeData.AdParameters is not a string".to_string()))
}

fn create_media(document: &Document, slot: &HtmlElement, tag: &str) -> Result<HtmlMediaElement, Error> {
    let element = document
        .create_element(tag)
        .map_err(|e| js_error("create media element", e))?;
    slot.append_child(&element)
        .map_err(|e| js_error("append media element", e))?;
    element
        .dyn_into()
        .map_err(|_| Error::Platform(format!("<{tag}> is not a media element")))
}

fn pointer_sample(kind: InteractionKind, event: &Event) -> PointerSample {
    match kind {
        InteractionKind::TouchStart => {
            let touch_event: &TouchEvent = event.unchecked_ref();
            touch_event
                .touches()
                .get(0)
                .map(|touch| PointerSample::at(f64::from(touch.client_x()), f64::from(touch.client_y())))
                .unwrap_or_else(PointerSample::missing)
        }
        InteractionKind::PointerDown | InteractionKind::Click => event
            .dyn_ref::<MouseEvent>()
            .map(|mouse| PointerSample::at(f64::from(mouse.client_x()), f64::from(mouse.client_y())))
            .unwrap_or_else(PointerSample::missing),
    }
}
