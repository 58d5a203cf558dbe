//! Rotation Engine
//!
//! Rotates pairs of horizontal seismic channels into radial and transverse
//! components, names the derived channels by content hash, and reconciles
//! the results with the signal detections measured on earlier rotations.
//!
//! Entry points live on [`service::RotationService`]; the collaborators it
//! talks to (station metadata, waveform cache, masks, filters, the rotation
//! kernel) are traits in [`collaborators`].

pub mod collaborators;
pub mod definition;
pub mod naming;
pub mod orchestrator;
pub mod pairing;
pub mod reconciliation;
pub mod service;
pub mod template_cache;
pub mod validation;
pub mod waveform;

pub use orchestrator::MaskAndRotate;
pub use reconciliation::{DataState, RotationTransaction, StateStore};
pub use service::{Collaborators, RotationOptions, RotationService, SessionContext};
