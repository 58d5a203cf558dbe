//! # Rotation Common Library
//!
//! Shared code for the two-dimensional waveform rotation pipeline including:
//! - Channel, segment, signal detection and event models
//! - Parsed channel names (derived channel grammar)
//! - Error taxonomy
//! - Configuration loading
//! - Event bus for derived channel notifications
//! - Geodesy and time helpers

pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod model;
pub mod time;

pub use error::{Error, Result};
