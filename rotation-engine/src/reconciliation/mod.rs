//! Reconciling rotation results with the shared state
//!
//! Rotations run in parallel; their results are reconciled in one transaction
//! and committed once.

pub mod hypothesis;
pub mod state;
pub mod store;
pub mod transaction;

pub use hypothesis::{create_working_hypothesis, SdHypothesisArgs};
pub use state::{ChannelStore, DataState, SegmentStore, UNFILTERED};
pub use store::StateStore;
pub use transaction::{ReconciliationConfig, RotationTransaction};
