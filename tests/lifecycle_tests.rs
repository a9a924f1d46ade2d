// Lifecycle test suite
// Drives the controller end to end through the headless host

use std::cell::RefCell;
use std::rc::Rc;

use vpaid_creative::platform::headless::{HeadlessHost, HeadlessMedia};
use vpaid_creative::prelude::*;

const PAYLOAD: &str = r#"{
    "videos": [
        {"url": "https://cdn.example.com/spot.mp4", "mimetype": "video/mp4"},
        {"url": "https://cdn.example.com/spot.webm", "mimetype": "video/webm"}
    ],
    "poi": "%7B%22id%22%3A%22spey61%22%7D",
    "config": {"macro": {
        "url": "https://trk.example.com/v2/redirect?u=[destination]&cb=[timestamp]",
        "gClick": "%%CLICK_URL_UNESC%%"
    }}
}"#;

type Seen = Rc<RefCell<Vec<(String, EventData)>>>;

fn record_all(controller: &AdController<String>) -> Seen {
    let seen: Seen = Rc::new(RefCell::new(Vec::new()));
    for event in EventName::ALL {
        let sink = seen.clone();
        controller
            .subscribe(
                move |ctx: &String, data: &EventData| {
                    sink.borrow_mut().push((format!("{ctx}:{event}"), data.clone()))
                },
                event.as_str(),
                "wrapper".to_string(),
            )
            .unwrap();
    }
    seen
}

fn names(seen: &Seen) -> Vec<String> {
    seen.borrow().iter().map(|(name, _)| name.clone()).collect()
}

fn environment(video: &HeadlessMedia, audio: &HeadlessMedia) -> AdEnvironment {
    AdEnvironment {
        video: video.boxed(),
        audio: Some(audio.boxed()),
        can_autoplay: true,
    }
}

fn init_params() -> InitParams {
    InitParams {
        width: 400,
        height: 300,
        view_mode: "normal".to_string(),
        desired_bitrate: 256,
    }
}

#[test]
fn test_full_playback() {
    let host = Rc::new(HeadlessHost::new(0.0, Viewport::new(400.0, 300.0)));
    let controller: AdController<String> = AdController::with_defaults(host.clone());
    let seen = record_all(&controller);

    let video = HeadlessMedia::supporting(&["video/webm"]);
    let audio = HeadlessMedia::supporting(&["audio/mpeg"]);

    assert_eq!(controller.handshake_version("2.0"), "2.0");
    controller
        .init_ad(init_params(), PAYLOAD, environment(&video, &audio))
        .unwrap();
    assert_eq!(
        video.state().src.as_deref(),
        Some("https://cdn.example.com/spot.webm")
    );

    controller.start_ad().unwrap();
    controller.on_play();

    for second in 0..=8 {
        host.advance(1_000.0);
        video.set_position(f64::from(second), 8.0);
        controller.on_time_update();
    }
    controller.on_ended();
    host.advance(100.0);

    assert_eq!(
        names(&seen),
        vec![
            "wrapper:AdLoaded",
            "wrapper:AdStarted",
            "wrapper:AdImpression",
            "wrapper:AdVideoStart",
            "wrapper:AdDurationChange",
            "wrapper:AdVideoFirstQuartile",
            "wrapper:AdVideoMidpoint",
            "wrapper:AdVideoThirdQuartile",
            "wrapper:AdVideoComplete",
            "wrapper:AdStopped",
        ]
    );
    assert_eq!(controller.phase(), AdPhase::Stopped);
    assert_eq!(controller.get_ad_duration(), 8.0);
    assert_eq!(controller.get_ad_remaining_time(), 8.0);

    for pixel in ["start", "firstQuartile", "midpoint", "thirdQuartile", "complete", "time_1s", "time_5s"] {
        let needle = format!("/v2/{pixel}?");
        assert_eq!(host.pixels_matching(&needle).len(), 1, "{pixel}");
    }
}

#[test]
fn test_out_of_order_calls_are_rejected() {
    let host = Rc::new(HeadlessHost::new(0.0, Viewport::new(400.0, 300.0)));
    let controller: AdController<String> = AdController::with_defaults(host.clone());

    assert!(controller.pause_ad().is_err());
    assert!(controller.resume_ad().is_err());

    let video = HeadlessMedia::supporting(&["video/webm"]);
    let audio = HeadlessMedia::supporting(&[]);
    controller
        .init_ad(init_params(), PAYLOAD, environment(&video, &audio))
        .unwrap();
    let second = controller.init_ad(init_params(), PAYLOAD, environment(&video, &audio));
    assert!(matches!(
        second,
        Err(vpaid_creative::Error::InvalidTransition { .. })
    ));

    controller.stop_ad().unwrap();
    assert!(controller.start_ad().is_err());
}

#[test]
fn test_duration_changes_are_reported_once_each() {
    let host = Rc::new(HeadlessHost::new(0.0, Viewport::new(400.0, 300.0)));
    let controller: AdController<String> = AdController::with_defaults(host.clone());
    let seen = record_all(&controller);

    let video = HeadlessMedia::supporting(&["video/webm"]);
    let audio = HeadlessMedia::supporting(&[]);
    controller
        .init_ad(init_params(), PAYLOAD, environment(&video, &audio))
        .unwrap();
    controller.start_ad().unwrap();

    for (time, duration) in [(0.0, f64::NAN), (0.5, 30.0), (1.0, 30.0), (1.5, 31.0), (2.0, 31.0)] {
        video.set_position(time, duration);
        controller.on_time_update();
    }

    let changes = names(&seen)
        .into_iter()
        .filter(|name| name == "wrapper:AdDurationChange")
        .count();
    assert_eq!(changes, 2);
    assert_eq!(controller.get_ad_duration(), 31.0);
}

#[test]
fn test_unresolved_exchange_macro_skips_confirmation() {
    let host = Rc::new(HeadlessHost::new(0.0, Viewport::new(400.0, 300.0)));
    let controller: AdController<String> = AdController::with_defaults(host.clone());
    let seen = record_all(&controller);

    let video = HeadlessMedia::supporting(&["video/webm"]);
    let audio = HeadlessMedia::supporting(&[]);
    controller
        .init_ad(init_params(), PAYLOAD, environment(&video, &audio))
        .unwrap();
    controller.start_ad().unwrap();

    let calls = vec!["https://third.example.org/imp".to_string()];
    let href = controller
        .request_click_through(Some("https://brand.example.com/"), &calls)
        .unwrap();
    assert!(href.contains("u=https%3A%2F%2Fbrand.example.com%2F"));
    assert!(href.contains("call[0]=https%3A%2F%2Fthird.example.org%2Fimp"));
    assert!(!href.contains("[timestamp]"));

    let decision = controller.on_navigation();
    assert_eq!(decision, NavigationDecision::Allow { confirmation: None });
    assert!(host.pixels_matching("CLICK_URL").is_empty());

    let click_thru = seen
        .borrow()
        .iter()
        .find(|(name, _)| name == "wrapper:AdClickThru")
        .map(|(_, data)| data.clone());
    assert_eq!(
        click_thru,
        Some(EventData::ClickThru {
            url: href,
            id: String::new(),
            player_handles: false,
        })
    );
}
