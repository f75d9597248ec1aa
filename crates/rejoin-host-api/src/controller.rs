//! App controller trait

use async_trait::async_trait;
use rejoin_api::LaunchUri;
use rejoin_util::InstanceId;
use thiserror::Error;

/// Errors from host app control
#[derive(Debug, Error)]
pub enum HostError {
    #[error("`{program}` exited with {code:?}: {output}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Stops and launches an instance's app on the host
#[async_trait]
pub trait AppController: Send + Sync {
    /// Force-stop the instance's app
    async fn stop(&self, instance: &InstanceId) -> HostResult<()>;

    /// Open the instance's app at the deep link
    async fn launch(&self, instance: &InstanceId, uri: &LaunchUri) -> HostResult<()>;

    /// Optional: check if the controller can reach the host
    fn is_healthy(&self) -> bool {
        true
    }
}
