//! Ad lifecycle controller
//!
//! `AdController` is what the wrapper talks to. It owns the attributes, the
//! media elements, the quartile tracker, the timers and the tracking session,
//! and turns lifecycle calls, media callbacks and page interactions into
//! lifecycle events and tracking pixels.
//!
//! Lifecycle callbacks may call straight back into the controller, so events
//! are collected while the state is borrowed and only dispatched once the
//! borrow has been released.

mod lifecycle;


pub use lifecycle::AdPhase;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::attributes::{AdAttributes, AttributeName, AttributeValue};
use crate::config::{CreativePayload, CreativeSettings};
use crate::events::{EventData, EventDispatcher, EventName};
use crate::media::{poi, select_source};
use crate::platform::{Host, MediaElement, TimerHandle};
use crate::quartile::QuartileTracker;
use crate::tracking::{
    ClickGateState, EventType, InteractionKind, NavigationDecision, Params, PointerSample,
    TrackingSession,
};
use crate::{Error, HANDSHAKE_VERSION};

/// Interaction event reported when the ad starts
pub const LOADED_EVENT: &str = "loaded";

/// Size and quality requested by the wrapper in `initAd`
#[derive(Debug, Clone, PartialEq)]
pub struct InitParams {
    pub width: u32,
    pub height: u32,
    pub view_mode: String,
    pub desired_bitrate: u32,
}

/// Elements handed to the creative by the embedding page
pub struct AdEnvironment {
    pub video: Box<dyn MediaElement>,
    /// Element playing the localized voice-over
    pub audio: Option<Box<dyn MediaElement>>,
    pub can_autoplay: bool,
}

impl std::fmt::Debug for AdEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdEnvironment")
            .field("video", &"[MediaElement]")
            .field("audio", &self.audio.as_ref().map(|_| "[MediaElement]"))
            .field("can_autoplay", &self.can_autoplay)
            .finish()
    }
}

type Pending = Vec<(EventName, EventData)>;

struct ControllerState {
    phase: AdPhase,
    attributes: AdAttributes,
    video: Option<Box<dyn MediaElement>>,
    audio: Option<Box<dyn MediaElement>>,
    payload: Option<CreativePayload>,
    quartiles: QuartileTracker,
    session: Option<TrackingSession>,
    remaining_timer: Option<TimerHandle>,
    timing_armed: bool,
}

impl ControllerState {
    fn new() -> Self {
        let attributes = AdAttributes::default();
        Self {
            phase: AdPhase::Created,
            quartiles: QuartileTracker::new(attributes.duration()),
            attributes,
            video: None,
            audio: None,
            payload: None,
            session: None,
            remaining_timer: None,
            timing_armed: false,
        }
    }

    fn media_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn MediaElement>> {
        self.video.iter_mut().chain(self.audio.iter_mut())
    }
}

struct Inner<C> {
    host: Rc<dyn Host>,
    settings: CreativeSettings,
    state: RefCell<ControllerState>,
    events: RefCell<EventDispatcher<C>>,
}

impl<C: Clone + 'static> Inner<C> {
    fn emit(&self, pending: Pending) {
        for (event, data) in pending {
            log::debug!("dispatch {event}");
            let bound = self.events.borrow().bound(event);
            if let Some(bound) = bound {
                bound.invoke(&data);
            }
        }
    }

    fn cancel_remaining_timer(&self, state: &mut ControllerState) {
        if let Some(handle) = state.remaining_timer.take() {
            self.host.clear_timer(handle);
        }
    }

    fn start_remaining_timer(self: &Rc<Self>, state: &mut ControllerState) {
        self.cancel_remaining_timer(state);

        let weak: Weak<Self> = Rc::downgrade(self);
        let handle = self.host.set_interval(
            self.settings.remaining_time_tick_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_remaining_tick();
                }
            }),
        );
        state.remaining_timer = Some(handle);
    }

    fn on_remaining_tick(&self) {
        {
            let mut state = self.state.borrow_mut();
            let step = f64::from(self.settings.remaining_time_tick_ms) / 1000.0;
            state.attributes.tick_remaining_time(step);
        }
        self.emit(vec![(EventName::RemainingTimeChange, EventData::None)]);
    }

    fn fire_timing(&self, name: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(session) = state.session.as_mut() {
            session.trigger(&*self.host, name, EventType::Timing, &Params::new());
        }
    }

    fn arm_timing_schedule(self: &Rc<Self>) {
        for mark in &self.settings.timing_schedule {
            let weak: Weak<Self> = Rc::downgrade(self);
            let name = mark.name.clone();
            self.host.set_timeout(
                mark.delay_ms,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.fire_timing(&name);
                    }
                }),
            );
        }
    }
}

/// The creative as seen by the wrapper
pub struct AdController<C: Clone + 'static = ()> {
    inner: Rc<Inner<C>>,
}

impl<C: Clone + 'static> Clone for AdController<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Clone + 'static> std::fmt::Debug for AdController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.try_borrow();
        f.debug_struct("AdController")
            .field("phase", &state.as_ref().map(|s| s.phase).ok())
            .field("events", &self.inner.events.try_borrow().ok())
            .finish()
    }
}

impl<C: Clone + 'static> AdController<C> {
    pub fn new(host: Rc<dyn Host>, settings: CreativeSettings) -> Self {
        Self {
            inner: Rc::new(Inner {
                host,
                settings,
                state: RefCell::new(ControllerState::new()),
                events: RefCell::new(EventDispatcher::new()),
            }),
        }
    }

    /// Controller with the settings the creative ships with
    pub fn with_defaults(host: Rc<dyn Host>) -> Self {
        Self::new(host, CreativeSettings::default())
    }

    /// Report a failure to the wrapper as an error event
    pub fn report_error(&self, error: &Error) {
        log::warn!("{error}");
        self.inner
            .emit(vec![(EventName::Error, EventData::error(error.to_string()))]);
    }

    pub fn handshake_version(&self, player_version: &str) -> &'static str {
        log::info!("handshake with player version {player_version}");
        HANDSHAKE_VERSION
    }

    /// Load the creative. Returns whether a playable source was selected.
    /// Subscribers of the loaded event may already have moved the ad on by
    /// the time this returns.
    pub fn init_ad(
        &self,
        params: InitParams,
        creative_data: &str,
        environment: AdEnvironment,
    ) -> Result<bool, Error> {
        let mut pending = Pending::new();
        let loaded = {
            let mut state = self.inner.state.borrow_mut();
            state.phase.require(&[AdPhase::Created], "initAd")?;

            state
                .attributes
                .set_size(params.width, params.height, &params.view_mode);
            state.attributes.set_desired_bitrate(params.desired_bitrate);

            let payload = CreativePayload::parse(creative_data)?;
            let mut video = environment.video;
            let source = select_source(&payload.videos, video.as_ref()).map(|c| c.url.clone());

            state.audio = environment.audio;
            state.payload = Some(payload);

            match source {
                Some(url) => {
                    log::info!("selected media source {url}");
                    video.set_src(&url);
                    video.set_volume(state.attributes.volume());
                    state.video = Some(video);

                    let known_duration = state.attributes.duration();
                    state.quartiles.reset(known_duration);
                    state.phase = AdPhase::Loaded;
                    pending.push((EventName::Loaded, EventData::None));
                    true
                }
                None => {
                    log::warn!("no playable media source in payload");
                    state.video = Some(video);
                    pending.push((
                        EventName::Error,
                        EventData::error("no playable media source"),
                    ));
                    false
                }
            }
        };
        self.inner.emit(pending);
        Ok(loaded)
    }

    pub fn start_ad(&self) -> Result<(), Error> {
        let host = &*self.inner.host;
        {
            let mut state = self.inner.state.borrow_mut();
            state.phase.require(&[AdPhase::Loaded], "startAd")?;

            let Some(payload) = state.payload.clone() else {
                return Err(Error::InvalidTransition {
                    phase: state.phase,
                    operation: "startAd",
                });
            };

            let mut session =
                TrackingSession::new(payload.tracking.clone(), &self.inner.settings, host.now_ms());

            let viewport = host.viewport();
            let mut constants = Params::new();
            constants.insert("w".to_string(), format!("{}", viewport.width.round()));
            constants.insert("h".to_string(), format!("{}", viewport.height.round()));
            if let Some(cc) = &payload.campaign_code {
                constants.insert("cc".to_string(), cc.clone());
            }
            session.set_constants(constants);

            match payload.poi_id.as_deref().and_then(poi::lookup) {
                Some(entry) => {
                    let variant = entry.pick_variant();
                    log::info!("point of interest {} ({}): {variant}", entry.id, entry.city);
                    if let Some(audio) = state.audio.as_mut() {
                        audio.set_src(variant);
                        audio.play();
                    }
                }
                None => {
                    log::warn!(
                        "no audio variant for point of interest {:?}",
                        payload.poi_id
                    );
                }
            }

            if let Some(video) = state.video.as_mut() {
                video.play();
            }

            session.trigger(host, LOADED_EVENT, EventType::Interaction, &Params::new());
            state.session = Some(session);
            state.phase = AdPhase::Started;
        }
        self.inner.emit(vec![
            (EventName::Started, EventData::None),
            (EventName::Impression, EventData::None),
        ]);
        Ok(())
    }

    /// Stop the ad. The stopped event follows after a short delay so pixels
    /// already in flight get out first. Repeated stops are ignored.
    pub fn stop_ad(&self) -> Result<(), Error> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.phase == AdPhase::Stopped {
                log::debug!("stopAd ignored, already stopped");
                return Ok(());
            }
            self.inner.cancel_remaining_timer(&mut state);
            for media in state.media_mut() {
                media.pause();
            }
            state.phase = AdPhase::Stopped;
        }

        let weak: Weak<Inner<C>> = Rc::downgrade(&self.inner);
        self.inner.host.set_timeout(
            self.inner.settings.stop_delay_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.emit(vec![(EventName::Stopped, EventData::None)]);
                }
            }),
        );
        Ok(())
    }

    pub fn pause_ad(&self) -> Result<(), Error> {
        {
            let mut state = self.inner.state.borrow_mut();
            state
                .phase
                .require(&[AdPhase::Started, AdPhase::Paused], "pauseAd")?;
            self.inner.cancel_remaining_timer(&mut state);
            for media in state.media_mut() {
                media.pause();
            }
            state.phase = AdPhase::Paused;
        }
        self.inner.emit(vec![(EventName::Paused, EventData::None)]);
        Ok(())
    }

    pub fn resume_ad(&self) -> Result<(), Error> {
        {
            let mut state = self.inner.state.borrow_mut();
            state
                .phase
                .require(&[AdPhase::Started, AdPhase::Paused], "resumeAd")?;
            for media in state.media_mut() {
                media.play();
            }
            self.inner.start_remaining_timer(&mut state);
            state.phase = AdPhase::Started;
        }
        self.inner.emit(vec![(EventName::Playing, EventData::None)]);
        Ok(())
    }

    /// Store the new size and apply it to the video element. A failing DOM
    /// update is ignored; the size-change event is dispatched regardless.
    pub fn resize_ad(&self, width: u32, height: u32, view_mode: &str) -> Result<(), Error> {
        {
            let mut state = self.inner.state.borrow_mut();
            state.attributes.set_size(width, height, view_mode);
            if let Some(video) = state.video.as_mut() {
                if let Err(e) = video.set_size(width, height) {
                    log::debug!("resize not applied: {e}");
                }
            }
        }
        self.inner.emit(vec![(EventName::SizeChange, EventData::None)]);
        Ok(())
    }

    pub fn skip_ad(&self) -> Result<(), Error> {
        let skippable = self.inner.state.borrow().attributes.skippable_state();
        if skippable {
            self.inner.emit(vec![(EventName::Skipped, EventData::None)]);
        } else {
            log::debug!("skipAd ignored, ad is not skippable");
        }
        Ok(())
    }

    pub fn expand_ad(&self) -> Result<(), Error> {
        self.set_expanded(true)
    }

    pub fn collapse_ad(&self) -> Result<(), Error> {
        self.set_expanded(false)
    }

    fn set_expanded(&self, expanded: bool) -> Result<(), Error> {
        self.inner.state.borrow_mut().attributes.set_expanded(expanded);
        self.inner
            .emit(vec![(EventName::ExpandedChange, EventData::None)]);
        Ok(())
    }

    pub fn set_ad_volume(&self, volume: f64) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let changed = state.attributes.set_volume(volume);
            if changed {
                let clamped = state.attributes.volume();
                for media in state.media_mut() {
                    media.set_volume(clamped);
                }
            }
            changed
        };
        if changed {
            self.inner.emit(vec![(EventName::VolumeChange, EventData::None)]);
        }
    }

    pub fn get_ad_volume(&self) -> f64 {
        self.inner.state.borrow().attributes.volume()
    }

    pub fn get_ad_width(&self) -> u32 {
        self.inner.state.borrow().attributes.width()
    }

    pub fn get_ad_height(&self) -> u32 {
        self.inner.state.borrow().attributes.height()
    }

    pub fn get_ad_remaining_time(&self) -> f64 {
        self.inner.state.borrow().attributes.remaining_time()
    }

    pub fn get_ad_duration(&self) -> f64 {
        self.inner.state.borrow().attributes.duration()
    }

    pub fn get_ad_companions(&self) -> String {
        self.inner.state.borrow().attributes.companions().to_string()
    }

    pub fn get_ad_icons(&self) -> bool {
        self.inner.state.borrow().attributes.icons()
    }

    pub fn get_ad_linear(&self) -> bool {
        self.inner.state.borrow().attributes.linear()
    }

    pub fn get_ad_expanded(&self) -> bool {
        self.inner.state.borrow().attributes.expanded()
    }

    pub fn get_ad_skippable_state(&self) -> bool {
        self.inner.state.borrow().attributes.skippable_state()
    }

    /// Read any attribute by its lifecycle name
    pub fn attribute(&self, name: &str) -> Result<AttributeValue, Error> {
        let name: AttributeName = name.parse()?;
        Ok(self.inner.state.borrow().attributes.get(name))
    }

    /// Snapshot of all attributes
    pub fn attributes(&self) -> AdAttributes {
        self.inner.state.borrow().attributes.clone()
    }

    pub fn phase(&self) -> AdPhase {
        self.inner.state.borrow().phase
    }

    /// Bind `callback` to the event with wire name `event_name`
    pub fn subscribe<F>(&self, callback: F, event_name: &str, context: C) -> Result<(), Error>
    where
        F: Fn(&C, &EventData) + 'static,
    {
        self.inner
            .events
            .borrow_mut()
            .subscribe_named(event_name, callback, context)
    }

    pub fn subscribe_event<F>(&self, event: EventName, callback: F, context: C)
    where
        F: Fn(&C, &EventData) + 'static,
    {
        self.inner
            .events
            .borrow_mut()
            .subscribe(event, callback, context);
    }

    pub fn unsubscribe(&self, event_name: &str) -> Result<(), Error> {
        self.inner.events.borrow_mut().unsubscribe_named(event_name)
    }

    /// Media `timeupdate`: quartiles, their timing pixels and duration changes
    pub fn on_time_update(&self) {
        let host = &*self.inner.host;
        let mut pending = Pending::new();
        {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            if !state.phase.is_active() {
                return;
            }
            let Some(video) = state.video.as_ref() else {
                return;
            };
            let current_time = video.current_time();
            let update = state.quartiles.on_progress(current_time, video.duration());

            for threshold in &update.reached {
                pending.push((threshold.event, EventData::None));
                if let Some(session) = state.session.as_mut() {
                    session.trigger(host, threshold.pixel, EventType::Timing, &Params::new());
                }
            }

            if let Some(duration) = update.duration_changed {
                state.attributes.set_duration(duration);
                state.attributes.lower_remaining_time(duration - current_time);
                pending.push((EventName::DurationChange, EventData::None));
            }
        }
        self.inner.emit(pending);
    }

    /// Media `ended`
    pub fn on_ended(&self) {
        if let Err(e) = self.stop_ad() {
            log::debug!("stop on media end failed: {e}");
        }
    }

    /// Media `play`. The first play arms the timing-event schedule.
    pub fn on_play(&self) {
        let arm = {
            let mut state = self.inner.state.borrow_mut();
            let arm = !state.timing_armed && state.session.is_some();
            if arm {
                state.timing_armed = true;
            }
            arm
        };
        if arm {
            self.inner.arm_timing_schedule();
        }
    }

    /// Document-level pointer-down, touch-start or click
    pub fn on_interaction(&self, kind: InteractionKind, sample: PointerSample) {
        let host = &*self.inner.host;
        let reported = {
            let mut state = self.inner.state.borrow_mut();
            match state.session.as_mut() {
                Some(session) => session
                    .record_interaction(host, kind, sample, host.viewport())
                    .is_some(),
                None => false,
            }
        };
        if reported {
            self.inner.emit(vec![(
                EventName::Interaction,
                EventData::Interaction {
                    id: kind.as_str().to_string(),
                },
            )]);
        }
    }

    /// Overlay anchor click: arm the click-through and return the href the
    /// anchor must navigate to. `None` when there is nothing to arm.
    pub fn request_click_through(&self, destination: Option<&str>, calls: &[String]) -> Option<String> {
        let host = &*self.inner.host;
        let mut state = self.inner.state.borrow_mut();
        state
            .session
            .as_mut()
            .and_then(|session| session.arm_click(host, destination, calls))
    }

    /// Page click handler: whether the browser may follow the anchor
    pub fn on_navigation(&self) -> NavigationDecision {
        let host = &*self.inner.host;
        let (decision, href) = {
            let mut state = self.inner.state.borrow_mut();
            match state.session.as_mut() {
                Some(session) => {
                    let decision = session.resolve_navigation(host);
                    (decision, session.armed_href().map(str::to_string))
                }
                None => (NavigationDecision::Prevent, None),
            }
        };

        if let NavigationDecision::Allow { .. } = decision {
            self.inner.emit(vec![(
                EventName::ClickThru,
                EventData::ClickThru {
                    url: href.unwrap_or_default(),
                    id: String::new(),
                    player_handles: false,
                },
            )]);
        }
        decision
    }

    pub fn click_gate_state(&self) -> Option<ClickGateState> {
        self.inner
            .state
            .borrow()
            .session
            .as_ref()
            .map(TrackingSession::gate_state)
    }

    /// Inspect the current tracking session
    pub fn with_session<R>(&self, f: impl FnOnce(Option<&TrackingSession>) -> R) -> R {
        f(self.inner.state.borrow().session.as_ref())
    }

    /// Source currently set on the voice-over element
    pub fn audio_source(&self) -> Option<String> {
        self.inner
            .state
            .borrow()
            .audio
            .as_ref()
            .and_then(|audio| audio.src())
    }
}
