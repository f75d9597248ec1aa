//! Action dispatcher

use rejoin_api::{LaunchUri, RejoinAction};
use rejoin_host_api::{AppController, HostError};
use rejoin_util::InstanceId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// A failed stop or launch. Never fatal to the scheduler.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Stop failed: {0}")]
    Stop(HostError),

    #[error("Launch failed: {0}")]
    Launch(HostError),
}

/// Carries out rejoin actions against the host
#[derive(Clone)]
pub struct ActionDispatcher {
    controller: Arc<dyn AppController>,
    scheme: String,
    settle_delay: Duration,
}

impl ActionDispatcher {
    pub fn new(controller: Arc<dyn AppController>, scheme: impl Into<String>, settle_delay: Duration) -> Self {
        Self {
            controller,
            scheme: scheme.into(),
            settle_delay,
        }
    }

    /// Execute one action.
    ///
    /// With `stop_first`, the app is stopped and the settle delay observed
    /// before launching. A failed stop does not prevent the launch. If both
    /// fail, the launch error is returned.
    pub async fn execute(&self, instance: &InstanceId, action: &RejoinAction) -> Result<(), ActionError> {
        let mut stop_error = None;

        if action.stop_first {
            if let Err(e) = self.controller.stop(instance).await {
                warn!(instance = %instance, error = %e, "Stop failed, launching anyway");
                stop_error = Some(e);
            }
            tokio::time::sleep(self.settle_delay).await;
        }

        let uri = LaunchUri::for_action(&self.scheme, action);
        if let Err(e) = self.controller.launch(instance, &uri).await {
            warn!(instance = %instance, uri = %uri, error = %e, "Launch failed");
            return Err(ActionError::Launch(e));
        }

        info!(
            instance = %instance,
            uri = %uri,
            stopped = action.stop_first,
            "Relaunch issued"
        );

        match stop_error {
            Some(e) => Err(ActionError::Stop(e)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rejoin_host_api::{ControllerCall, MockController};
    use rejoin_util::LocationId;
    use std::sync::atomic::Ordering;

    fn action(stop_first: bool, sub_token: Option<&str>) -> RejoinAction {
        RejoinAction {
            stop_first,
            target: LocationId::new("2753915549"),
            sub_token: sub_token.map(str::to_string),
        }
    }

    fn setup() -> (Arc<MockController>, ActionDispatcher) {
        let controller = Arc::new(MockController::new());
        let dispatcher = ActionDispatcher::new(controller.clone(), "roblox", Duration::from_secs(1));
        (controller, dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn stop_settle_launch() {
        let (controller, dispatcher) = setup();
        let id = InstanceId::new("com.roblox.client");

        dispatcher.execute(&id, &action(true, Some("abc"))).await.unwrap();

        let calls = controller.calls();
        assert_eq!(calls.len(), 2);
        let (stop_at, launch_at, uri) = match (&calls[0], &calls[1]) {
            (ControllerCall::Stop { at: s, .. }, ControllerCall::Launch { at: l, uri, .. }) => (*s, *l, uri.clone()),
            other => panic!("unexpected calls: {:?}", other),
        };
        assert_eq!(launch_at.duration_since(stop_at), Duration::from_secs(1));
        assert_eq!(uri.as_str(), "roblox://placeID=2753915549&linkCode=abc");
    }

    #[tokio::test(start_paused = true)]
    async fn launch_only_without_stop() {
        let (controller, dispatcher) = setup();
        let id = InstanceId::new("com.roblox.client");

        dispatcher.execute(&id, &action(false, None)).await.unwrap();

        assert_eq!(controller.stop_count(), 0);
        assert_eq!(controller.launch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_failure_still_launches() {
        let (controller, dispatcher) = setup();
        controller.fail_stop.store(true, Ordering::SeqCst);
        let id = InstanceId::new("com.roblox.client");

        let result = dispatcher.execute(&id, &action(true, None)).await;

        assert!(matches!(result, Err(ActionError::Stop(_))));
        assert_eq!(controller.launch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_wins() {
        let (controller, dispatcher) = setup();
        controller.fail_stop.store(true, Ordering::SeqCst);
        controller.fail_launch.store(true, Ordering::SeqCst);
        let id = InstanceId::new("com.roblox.client");

        let result = dispatcher.execute(&id, &action(true, None)).await;
        assert!(matches!(result, Err(ActionError::Launch(_))));
    }
}
