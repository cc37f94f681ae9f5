//! Shared infrastructure for the roster crates.
//!
//! The retry policy and the cache regions both report what they do through
//! the event types in [`events`]. Listeners are plain callbacks, so logging,
//! metrics, or test counters can be attached without either crate knowing
//! about them.

pub mod events;

pub use events::{EventListeners, RosterEvent};
