//! Client-side tracking
//!
//! The tracking subsystem provides:
//! - Document-level interaction capture with viewport-relative positions
//! - Rate-limited, deduplicated tracking pixels
//! - The two-phase click gate guarding the single click-through
//! - `TrackingSession`, which owns all of the above for one activation

pub mod click_gate;
pub mod interaction;
pub mod macros;
pub mod pixel;
pub mod session;

pub use click_gate::{ClickGate, ClickGateState, NavigationDecision};
pub use interaction::{InteractionKind, InteractionTracker, PointerSample, UNKNOWN_POSITION};
pub use pixel::{load_pixel, EventFireRecord, EventType, FireOutcome, Params, PixelDispatcher};
pub use session::TrackingSession;
