//! # latch-core
//!
//! Shared foundation for the latch crates.
//!
//! - [`logging`]: `tracing` subscriber setup and in-memory log capture for tests

#![deny(unsafe_code)]

pub mod logging;

pub use logging::{CapturedLogs, capture_logs, init_subscriber};
