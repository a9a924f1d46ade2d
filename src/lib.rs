// Core module of the video-ad creative
pub mod attributes;
pub mod config;
pub mod controller;
pub mod events;
pub mod media;
pub mod platform;
pub mod quartile;
pub mod tracking;

/// Version of the creative runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the lifecycle interface this creative speaks
pub const HANDSHAKE_VERSION: &str = "2.0";

/// Re-export of common types for convenience
pub mod prelude {
    pub use crate::attributes::{AdAttributes, AttributeName, AttributeValue};
    pub use crate::config::{CreativePayload, CreativeSettings, TrackingConfig};
    pub use crate::controller::{AdController, AdEnvironment, AdPhase, InitParams};
    pub use crate::events::{EventData, EventDispatcher, EventName};
    pub use crate::platform::{
        CanPlay, Clock, Host, MediaElement, PixelSink, Scheduler, TimerHandle, Viewport,
        ViewportSource,
    };
    pub use crate::tracking::{
        EventType, FireOutcome, InteractionKind, NavigationDecision, PointerSample,
        TrackingSession,
    };
}

/// Initialize logging for the current platform.
///
/// In the browser this installs the console logger; elsewhere the embedding
/// application is expected to install its own `log` backend.
pub fn init_logging(level: log::LevelFilter) -> Result<(), Error> {
    #[cfg(feature = "web")]
    {
        platform::web::logger::install(level)?;
    }

    #[cfg(not(feature = "web"))]
    {
        log::set_max_level(level);
    }

    log::debug!("vpaid-creative {VERSION} logging at {level}");
    Ok(())
}

/// Errors that can occur in the creative
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid lifecycle transition: cannot {operation} while {phase:?}")]
    InvalidTransition {
        phase: controller::AdPhase,
        operation: &'static str,
    },

    #[error("Unknown event name: {0}")]
    UnknownEvent(String),

    #[error("Unknown attribute name: {0}")]
    UnknownAttribute(String),

    #[error("Attribute {name} expects a {expected} value")]
    AttributeType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("Platform error: {0}")]
    Platform(String),
}
