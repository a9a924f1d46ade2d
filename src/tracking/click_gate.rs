//! Two-phase guard around the creative's single click-through
//!
//! The full-viewport overlay anchor receives every click, so a browser
//! navigation alone does not mean the user meant to leave. The gate separates
//! the two signals: arming computes the destination and marks the click as
//! intended; navigation is only let through when the gate is armed, and only
//! once per session.

use super::macros;
use crate::config::{TrackingConfig, DESTINATION_MACRO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickGateState {
    /// No click-through requested yet
    Idle,
    /// Destination set, waiting for the navigation of the same click
    Armed,
    /// Navigation happened; terminal
    Consumed,
}

/// What the page click handler must do with the browser's default action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Let the browser follow the anchor. `confirmation` is the exchange
    /// click-confirmation URL to load, when the exchange provided one.
    Allow { confirmation: Option<String> },
    /// Call `preventDefault`
    Prevent,
}

#[derive(Debug, Clone)]
pub struct ClickGate {
    state: ClickGateState,
}

impl Default for ClickGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickGate {
    pub fn new() -> Self {
        Self {
            state: ClickGateState::Idle,
        }
    }

    pub fn state(&self) -> ClickGateState {
        self.state
    }

    /// Mark a click-through as intended and return the href for the anchor.
    /// Returns `None` once the gate has been consumed.
    pub fn arm(
        &mut self,
        config: &TrackingConfig,
        destination: Option<&str>,
        calls: &[String],
    ) -> Option<String> {
        if self.state == ClickGateState::Consumed {
            log::debug!("click-through already consumed, not re-arming");
            return None;
        }

        let href = redirect_url(config, destination, calls);
        self.state = ClickGateState::Armed;
        Some(href)
    }

    /// Decide the fate of the browser navigation for the current click
    pub fn resolve_navigation(&mut self, config: &TrackingConfig) -> NavigationDecision {
        match self.state {
            ClickGateState::Armed => {
                self.state = ClickGateState::Consumed;
                let g_click = config.g_click();
                let confirmation = if macros::is_unresolved(g_click) {
                    log::debug!("click confirmation macro unresolved, skipping");
                    None
                } else {
                    Some(g_click.to_string())
                };
                NavigationDecision::Allow { confirmation }
            }
            ClickGateState::Idle | ClickGateState::Consumed => NavigationDecision::Prevent,
        }
    }
}

/// Redirect URL built from the template, an optional destination override and
/// server-side call pixels
pub fn redirect_url(config: &TrackingConfig, destination: Option<&str>, calls: &[String]) -> String {
    let template = config.template();
    let encoded_destination = destination.map(macros::encode);

    // Without an override the macro stays for the tracker's default landing page
    let mut url = match &encoded_destination {
        Some(dest) if template.contains(DESTINATION_MACRO) => template.replace(DESTINATION_MACRO, dest),
        _ => template.to_string(),
    };

    let mut extra: Vec<String> = Vec::new();
    if let (false, Some(dest)) = (template.contains(DESTINATION_MACRO), &encoded_destination) {
        extra.push(format!("url={dest}"));
    }
    extra.extend(
        calls
            .iter()
            .enumerate()
            .map(|(n, call)| format!("call[{n}]={}", macros::encode(call))),
    );

    if !extra.is_empty() {
        let separator = match url.find('?') {
            None => "?",
            Some(_) if url.ends_with('?') || url.ends_with('&') => "",
            Some(_) => "&",
        };
        url.push_str(separator);
        url.push_str(&extra.join("&"));
    }
    url
}
