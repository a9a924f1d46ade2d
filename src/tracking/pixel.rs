//! Tracking pixel construction and rate policy
//!
//! Every tracking event goes through `PixelDispatcher::trigger`, which decides
//! whether the event may fire, builds its URL and hands it to the host's
//! `PixelSink`. Delivery is fire-and-forget: nothing waits for a response and
//! nothing is retried.

use std::collections::{BTreeMap, HashMap};

use super::macros;
use crate::config::{CreativeSettings, TrackingConfig};
use crate::platform::{Clock, PixelSink};

/// Name of the once-only click event
pub const CLICK_EVENT: &str = "click";

/// Extra query parameters of a tracking event, keyed without the `p_` prefix
pub type Params = BTreeMap<String, String>;

/// Kind of tracking event, which drives its rate policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Caused by the user; repeats are reported up to a ceiling
    Interaction,
    /// Caused by the clock or playback; reported once
    Timing,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Interaction => "interaction",
            EventType::Timing => "timing",
        }
    }
}

/// Fire history of one tracking event name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFireRecord {
    pub event_type: EventType,
    pub fire_count: u32,
}

/// Result of a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// The pixel was sent to this URL
    Fired(String),
    /// Rate policy rejected the event
    Suppressed,
}

impl FireOutcome {
    pub fn is_fired(&self) -> bool {
        matches!(self, FireOutcome::Fired(_))
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            FireOutcome::Fired(url) => Some(url),
            FireOutcome::Suppressed => None,
        }
    }
}

/// A tracking event about to be built
#[derive(Debug, Clone, Copy)]
pub struct PixelRequest<'a> {
    pub name: &'a str,
    pub event_type: EventType,
    pub params: &'a Params,
    /// Server-side pixels chained through the tracker
    pub calls: &'a [String],
}

/// Substitute the timestamp macro and fire `url`. Returns the URL as sent.
pub fn load_pixel<H>(host: &H, timestamp_macro: &str, url: &str) -> String
where
    H: Clock + PixelSink + ?Sized,
{
    let resolved = macros::substitute_timestamp(url, timestamp_macro, host.now_ms());
    log::debug!("pixel {resolved}");
    host.fire(&resolved);
    resolved
}

#[derive(Debug, Clone)]
pub struct PixelDispatcher {
    records: HashMap<String, EventFireRecord>,
    clicked: bool,
    constants: Params,
    started_at_ms: f64,
    interaction_ceiling: u32,
    max_elapsed_secs: f64,
}

impl PixelDispatcher {
    /// Create a dispatcher whose elapsed-time clock starts at `started_at_ms`
    pub fn new(started_at_ms: f64, settings: &CreativeSettings) -> Self {
        Self {
            records: HashMap::new(),
            clicked: false,
            constants: Params::new(),
            started_at_ms,
            interaction_ceiling: settings.interaction_fire_ceiling,
            max_elapsed_secs: settings.max_elapsed_secs,
        }
    }

    /// Merge parameters sent with every event
    pub fn set_constants(&mut self, constants: Params) {
        self.constants.extend(constants);
    }

    pub fn constants(&self) -> &Params {
        &self.constants
    }

    pub fn record(&self, name: &str) -> Option<&EventFireRecord> {
        self.records.get(name)
    }

    pub fn has_clicked(&self) -> bool {
        self.clicked
    }

    /// Seconds since the session started, clamped and rounded
    pub fn elapsed_secs(&self, now_ms: f64) -> u64 {
        let elapsed = ((now_ms - self.started_at_ms) / 1000.0).max(0.0);
        elapsed.min(self.max_elapsed_secs).round() as u64
    }

    /// Apply the rate policy and, if allowed, count the fire
    fn admit(&mut self, name: &str, event_type: EventType) -> bool {
        if name == CLICK_EVENT {
            if self.clicked {
                return false;
            }
            self.clicked = true;
        }

        let ceiling = self.interaction_ceiling;
        let record = self
            .records
            .entry(name.to_string())
            .or_insert(EventFireRecord {
                event_type,
                fire_count: 0,
            });

        let allowed = match event_type {
            _ if name == CLICK_EVENT => true,
            EventType::Interaction => record.fire_count < ceiling,
            EventType::Timing => record.fire_count == 0,
        };
        if allowed {
            record.fire_count += 1;
        }
        allowed
    }

    /// Build the tracker URL for an event, leaving the timestamp macro in place
    pub fn build_url(
        &self,
        config: &TrackingConfig,
        request: PixelRequest<'_>,
        position: &str,
        now_ms: f64,
    ) -> String {
        let mut params = self.constants.clone();
        params.extend(request.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        params.insert("t".to_string(), self.elapsed_secs(now_ms).to_string());
        params.insert("type".to_string(), request.event_type.as_str().to_string());
        if request.event_type == EventType::Interaction {
            params.insert("pos".to_string(), position.to_string());
        }

        let mut query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("p_{}={}", macros::encode(key), macros::encode(value)))
            .collect();
        query.extend(
            request
                .calls
                .iter()
                .enumerate()
                .map(|(n, call)| format!("call[{n}]={}", macros::encode(call))),
        );
        query.push(format!("cb={}", config.timestamp_macro()));

        format!("{}?{}", config.event_url(request.name), query.join("&"))
    }

    /// Fire a tracking event if its rate policy allows it
    pub fn trigger<H>(
        &mut self,
        host: &H,
        config: &TrackingConfig,
        request: PixelRequest<'_>,
        position: &str,
    ) -> FireOutcome
    where
        H: Clock + PixelSink + ?Sized,
    {
        if !self.admit(request.name, request.event_type) {
            log::trace!("suppressed {} ({})", request.name, request.event_type.as_str());
            return FireOutcome::Suppressed;
        }

        let url = self.build_url(config, request, position, host.now_ms());
        FireOutcome::Fired(load_pixel(host, config.timestamp_macro(), &url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MacroConfig;
    use crate::platform::headless::HeadlessHost;
    use crate::platform::Viewport;

    fn config() -> TrackingConfig {
        TrackingConfig::new(MacroConfig {
            url: "https://trk.example.com/v1/redirect?dest=[destination]".to_string(),
            timestamp: "[timestamp]".to_string(),
            g_click: String::new(),
        })
        .unwrap()
    }

    fn request<'a>(name: &'a str, event_type: EventType, params: &'a Params) -> PixelRequest<'a> {
        PixelRequest {
            name,
            event_type,
            params,
            calls: &[],
        }
    }

    #[test]
    fn test_interaction_ceiling() {
        let host = HeadlessHost::new(0.0, Viewport::new(100.0, 100.0));
        let config = config();
        let mut dispatcher = PixelDispatcher::new(0.0, &CreativeSettings::default());
        let params = Params::new();

        for n in 1..=30 {
            let outcome =
                dispatcher.trigger(&host, &config, request("swipe", EventType::Interaction, &params), "0_0");
            assert!(outcome.is_fired(), "fire {n} should pass");
        }
        let outcome =
            dispatcher.trigger(&host, &config, request("swipe", EventType::Interaction, &params), "0_0");
        assert_eq!(outcome, FireOutcome::Suppressed);
        assert_eq!(dispatcher.record("swipe").unwrap().fire_count, 30);
        assert_eq!(host.pixels().len(), 30);
    }

    #[test]
    fn test_timing_fires_once() {
        let host = HeadlessHost::new(0.0, Viewport::new(100.0, 100.0));
        let config = config();
        let mut dispatcher = PixelDispatcher::new(0.0, &CreativeSettings::default());
        let params = Params::new();

        assert!(dispatcher
            .trigger(&host, &config, request("midpoint", EventType::Timing, &params), "0_0")
            .is_fired());
        assert!(!dispatcher
            .trigger(&host, &config, request("midpoint", EventType::Timing, &params), "0_0")
            .is_fired());
    }

    #[test]
    fn test_click_fires_once_regardless_of_type() {
        let host = HeadlessHost::new(0.0, Viewport::new(100.0, 100.0));
        let config = config();
        let mut dispatcher = PixelDispatcher::new(0.0, &CreativeSettings::default());
        let params = Params::new();

        assert!(dispatcher
            .trigger(&host, &config, request(CLICK_EVENT, EventType::Interaction, &params), "1_1")
            .is_fired());
        assert!(!dispatcher
            .trigger(&host, &config, request(CLICK_EVENT, EventType::Interaction, &params), "1_1")
            .is_fired());
        assert!(!dispatcher
            .trigger(&host, &config, request(CLICK_EVENT, EventType::Timing, &params), "1_1")
            .is_fired());
        assert!(dispatcher.has_clicked());
    }

    #[test]
    fn test_elapsed_time_is_rounded_and_clamped() {
        let dispatcher = PixelDispatcher::new(10_000.0, &CreativeSettings::default());
        assert_eq!(dispatcher.elapsed_secs(15_000.0), 5);
        assert_eq!(dispatcher.elapsed_secs(16_600.0), 7);
        assert_eq!(dispatcher.elapsed_secs(10_000.0 + 3_500_000.0), 3000);
        assert_eq!(dispatcher.elapsed_secs(0.0), 0);
    }

    #[test]
    fn test_url_layout() {
        let host = HeadlessHost::new(1_000.0, Viewport::new(100.0, 100.0));
        let config = config();
        let mut dispatcher = PixelDispatcher::new(0.0, &CreativeSettings::default());

        let mut constants = Params::new();
        constants.insert("w".to_string(), "1280".to_string());
        dispatcher.set_constants(constants);

        let mut params = Params::new();
        params.insert("kind".to_string(), "tap here".to_string());
        let calls = vec!["https://s2s.example.org/p?a=1".to_string()];

        let outcome = dispatcher.trigger(
            &host,
            &config,
            PixelRequest {
                name: "interaction",
                event_type: EventType::Interaction,
                params: &params,
                calls: &calls,
            },
            "25_75",
        );

        assert_eq!(
            outcome.url(),
            Some(
                "https://trk.example.com/v1/interaction?p_kind=tap+here&p_pos=25_75&p_t=1\
                 &p_type=interaction&p_w=1280\
                 &call[0]=https%3A%2F%2Fs2s.example.org%2Fp%3Fa%3D1&cb=1000"
            )
        );
    }

    #[test]
    fn test_timing_events_carry_no_position() {
        let host = HeadlessHost::new(0.0, Viewport::new(100.0, 100.0));
        let config = config();
        let mut dispatcher = PixelDispatcher::new(0.0, &CreativeSettings::default());

        let outcome =
            dispatcher.trigger(&host, &config, request("complete", EventType::Timing, &Params::new()), "5_5");
        let url = outcome.url().unwrap();
        assert!(url.contains("p_type=timing"));
        assert!(!url.contains("p_pos="));
    }
}
