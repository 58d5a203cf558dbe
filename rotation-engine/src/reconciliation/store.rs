//! Single-writer holder of the shared state

use super::state::DataState;
use super::transaction::RotationTransaction;
use crate::collaborators::EventStore;
use async_trait::async_trait;
use rotation_common::model::Event;
use rotation_common::Result;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Shared state behind a tokio `RwLock`
///
/// Readers get clones. A transaction commits against a clone while the write
/// guard is held, and the clone replaces the state only when the commit succeeds.
#[derive(Debug, Default)]
pub struct StateStore {
    state: RwLock<DataState>,
}

impl StateStore {
    pub fn new(state: DataState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn snapshot(&self) -> DataState {
        self.state.read().await.clone()
    }

    /// Commit `transaction`; on error the state is left unchanged
    pub async fn submit(&self, transaction: RotationTransaction) -> Result<()> {
        let results = transaction.results.len();
        let mut guard = self.state.write().await;
        match transaction.commit(guard.clone()) {
            Ok(next) => {
                *guard = next;
                info!(results, "Rotation transaction committed");
                Ok(())
            }
            Err(e) => {
                error!(results, error = %e, "Rotation transaction rejected");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl EventStore for StateStore {
    async fn events(&self) -> Result<Vec<Event>> {
        Ok(self.state.read().await.events.values().cloned().collect())
    }
}
