//! # Event Bus Module
//!
//! Publish/subscribe distribution of [`GenerationEvent`]s:
//! - The orchestrator publishes start, per-tool progress, failure,
//!   cancellation and completion
//! - Subscribers filter by [`EventCategory`] and receive events
//!   synchronously, or poll a broadcast receiver from async code
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pcbmill_core::event_bus::{EventBus, EventCategory, EventFilter, GenerationEvent};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Failure]),
//!     |event| tracing::warn!("{}", event.description()),
//! );
//!
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
