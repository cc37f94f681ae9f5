//! Property-based tests for roster.
//!
//! Run with: cargo test --test property_tests
