//! One activation's worth of tracking state
//!
//! Built by `startAd` and owned by the controller. The interaction tracker,
//! click gate and pixel dispatcher only ever see the state through this
//! object, so nothing outlives the activation that created it.

use super::click_gate::{ClickGate, ClickGateState, NavigationDecision};
use super::interaction::{InteractionKind, InteractionTracker, PointerSample};
use super::pixel::{
    load_pixel, EventFireRecord, EventType, FireOutcome, Params, PixelDispatcher, PixelRequest,
    CLICK_EVENT,
};
use super::macros;
use crate::config::{CreativeSettings, TrackingConfig};
use crate::platform::{Clock, PixelSink, Viewport};

/// Tracking event reported for pointer-down and touch-start
pub const INTERACTION_EVENT: &str = "interaction";

#[derive(Debug, Clone)]
pub struct TrackingSession {
    config: TrackingConfig,
    pixels: PixelDispatcher,
    interactions: InteractionTracker,
    gate: ClickGate,
    // Anchor href handed out by the last arm, timestamp resolved
    href: Option<String>,
    confirmations: u32,
}

impl TrackingSession {
    pub fn new(config: TrackingConfig, settings: &CreativeSettings, started_at_ms: f64) -> Self {
        Self {
            config,
            pixels: PixelDispatcher::new(started_at_ms, settings),
            interactions: InteractionTracker::new(),
            gate: ClickGate::new(),
            href: None,
            confirmations: 0,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Parameters merged into every event of this session
    pub fn set_constants(&mut self, constants: Params) {
        self.pixels.set_constants(constants);
    }

    pub fn trigger<H>(&mut self, host: &H, name: &str, event_type: EventType, params: &Params) -> FireOutcome
    where
        H: Clock + PixelSink + ?Sized,
    {
        self.fire(host, name, event_type, params, &[])
    }

    fn fire<H>(
        &mut self,
        host: &H,
        name: &str,
        event_type: EventType,
        params: &Params,
        calls: &[String],
    ) -> FireOutcome
    where
        H: Clock + PixelSink + ?Sized,
    {
        let request = PixelRequest {
            name,
            event_type,
            params,
            calls,
        };
        self.pixels
            .trigger(host, &self.config, request, self.interactions.last_position())
    }

    /// Record a document-level interaction. Pointer-down and touch-start also
    /// report the `interaction` event; the outcome is returned for those.
    pub fn record_interaction<H>(
        &mut self,
        host: &H,
        kind: InteractionKind,
        sample: PointerSample,
        viewport: Viewport,
    ) -> Option<FireOutcome>
    where
        H: Clock + PixelSink + ?Sized,
    {
        self.interactions.record(kind, sample, viewport);
        if !kind.is_reported() {
            return None;
        }

        let mut params = Params::new();
        params.insert("kind".to_string(), kind.as_str().to_string());
        Some(self.trigger(host, INTERACTION_EVENT, EventType::Interaction, &params))
    }

    /// Arm the click-through and report the click along with its call
    /// pixels. Returns the anchor href, or `None` when the session's
    /// click-through is already spent.
    pub fn arm_click<H>(&mut self, host: &H, destination: Option<&str>, calls: &[String]) -> Option<String>
    where
        H: Clock + PixelSink + ?Sized,
    {
        let href = self.gate.arm(&self.config, destination, calls)?;
        self.fire(host, CLICK_EVENT, EventType::Interaction, &Params::new(), calls);
        let href = macros::substitute_timestamp(&href, self.config.timestamp_macro(), host.now_ms());
        self.href = Some(href.clone());
        Some(href)
    }

    /// Resolve the browser navigation of the current click, loading the
    /// exchange confirmation pixel when the navigation goes through
    pub fn resolve_navigation<H>(&mut self, host: &H) -> NavigationDecision
    where
        H: Clock + PixelSink + ?Sized,
    {
        let decision = self.gate.resolve_navigation(&self.config);
        if let NavigationDecision::Allow {
            confirmation: Some(url),
        } = &decision
        {
            load_pixel(host, self.config.timestamp_macro(), url);
            self.confirmations += 1;
        }
        decision
    }

    pub fn gate_state(&self) -> ClickGateState {
        self.gate.state()
    }

    /// Destination of the armed click-through
    pub fn armed_href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub fn last_position(&self) -> &str {
        self.interactions.last_position()
    }

    pub fn fire_record(&self, name: &str) -> Option<&EventFireRecord> {
        self.pixels.record(name)
    }

    /// Confirmation pixels loaded so far
    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }
}
