//! Status reporter trait

use async_trait::async_trait;
use rejoin_api::StatusSnapshot;
use thiserror::Error;

/// Errors from sending a status report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Report endpoint returned HTTP {status}")]
    Server { status: u16 },

    #[error("Failed to encode report: {0}")]
    Serialization(String),

    #[error("Reporter is disabled")]
    Disabled,
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Delivers an aggregate status snapshot somewhere outside the process.
///
/// Implementations add their own host data (metrics, screenshots). Throttling
/// is the caller's job.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, snapshot: &StatusSnapshot) -> ReportResult<()>;
}
