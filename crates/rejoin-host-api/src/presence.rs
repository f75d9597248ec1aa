//! Presence provider trait

use async_trait::async_trait;
use rejoin_api::Observation;
use rejoin_util::{AccountId, SessionHandle};
use thiserror::Error;

/// Errors from a presence query.
///
/// Every variant is treated as "presence unknown" by the decision rules.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Presence request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Presence service returned HTTP {0}")]
    Status(u16),

    #[error("Malformed presence response: {0}")]
    Malformed(String),

    #[error("No presence entry for account {0}")]
    MissingAccount(AccountId),
}

pub type PresenceResult<T> = Result<T, PresenceError>;

/// Queries the remote presence service for one account.
///
/// Implementations make one outbound request per call, perform no retries,
/// and hold no per-instance state.
#[async_trait]
pub trait PresenceProvider: Send + Sync {
    async fn fetch(&self, session: &SessionHandle, account: AccountId)
    -> PresenceResult<Observation>;
}
