//! Lifecycle event system
//!
//! The event system provides:
//! - A closed enum of lifecycle event names with their wire spelling
//! - Payloads carried by error, click-through and interaction events
//! - A dispatcher binding at most one callback per event

pub mod dispatcher;
pub mod event;

pub use dispatcher::{BoundCallback, EventDispatcher};
pub use event::{EventData, EventName};
