//! Tests for `roster-cache`.
//!
//! Test organization:
//! - region_expiry.rs: TTL measured from write, capacity bound
//! - region_concurrency.rs: single-flight computes, cancellation, invalidation races
//! - region_events.rs: listener callbacks and statistics

mod region_concurrency;
mod region_events;
