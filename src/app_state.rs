//! Shared state injected into the admin handlers.

use std::sync::Arc;

use crate::domain::RegistrationStore;
use crate::service::ReplicationMonitor;

/// State available to every admin handler through Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Store served by this node's registrar.
    pub store: Arc<RegistrationStore>,
    /// Replication stats; present only on the front-end node.
    pub replication: Option<ReplicationMonitor>,
}

impl AppState {
    /// State for a node without replication.
    #[must_use]
    pub fn local(store: Arc<RegistrationStore>) -> Self {
        Self {
            store,
            replication: None,
        }
    }

    /// State for the front-end node.
    #[must_use]
    pub fn front_end(store: Arc<RegistrationStore>, replication: ReplicationMonitor) -> Self {
        Self {
            store,
            replication: Some(replication),
        }
    }

    /// Returns `true` on the front-end node.
    #[must_use]
    pub const fn is_front_end(&self) -> bool {
        self.replication.is_some()
    }
}
