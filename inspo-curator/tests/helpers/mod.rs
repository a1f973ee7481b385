//! Test Helper Utilities
//!
//! Shared utilities for testing inspo-curator

#![allow(dead_code)]

pub mod log_capture;
pub mod scripted;

pub use log_capture::{init_test_logging, scoped, LogCapture};
pub use scripted::{items, ScriptedDescriber, ScriptedModerator};
