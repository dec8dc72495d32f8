use crate::gateway::GatewayError;
use crate::storage::StoreError;

/// Failures surfaced by session, account and profile operations
///
/// Payloads are owned strings so that one result can be handed to every
/// waiter of a shared in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{endpoint} rejected the request with status {status}")]
    Rejected { endpoint: String, status: u16 },
}

impl SessionError {
    /// Whether the failure came from the network rather than local state
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Gateway(GatewayError::Transport(_) | GatewayError::Timeout(_))
        )
    }
}
