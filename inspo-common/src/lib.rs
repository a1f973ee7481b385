//! # Inspo Common Library
//!
//! Shared code for the inspo services including:
//! - Error and result types
//! - TOML bootstrap configuration loading
//! - Event types (InspoEvent enum) and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
