//! App control through the Android activity manager

use async_trait::async_trait;
use rejoin_api::LaunchUri;
use rejoin_host_api::{AppController, HostError, HostResult};
use rejoin_util::InstanceId;
use tracing::{info, warn};

use crate::process::{CommandOutput, HostCommand};

/// Stops and launches app packages with `am`
#[derive(Debug, Clone)]
pub struct AmController {
    activity: String,
    use_su: bool,
}

impl AmController {
    pub fn new(activity: impl Into<String>, use_su: bool) -> Self {
        Self {
            activity: activity.into(),
            use_su,
        }
    }

    pub fn stop_command(&self, instance: &InstanceId) -> HostCommand {
        HostCommand::new("am")
            .args(["force-stop", instance.as_str()])
            .with_su(self.use_su)
    }

    pub fn launch_command(&self, instance: &InstanceId, uri: &LaunchUri) -> HostCommand {
        let component = format!("{}/{}", instance, self.activity);
        HostCommand::new("am")
            .args([
                "start",
                "-n",
                component.as_str(),
                "-a",
                "android.intent.action.VIEW",
                "-d",
                uri.as_str(),
                "--activity-clear-top",
            ])
            .with_su(self.use_su)
    }
}

/// `am` reports some failures on a zero exit status
fn check_am_output(program: &str, output: CommandOutput) -> HostResult<()> {
    let combined = output.combined();
    if combined.contains("Error") {
        return Err(HostError::CommandFailed {
            program: program.to_string(),
            code: output.code,
            output: combined,
        });
    }
    Ok(())
}

#[async_trait]
impl AppController for AmController {
    async fn stop(&self, instance: &InstanceId) -> HostResult<()> {
        let cmd = self.stop_command(instance);
        let output = cmd.run().await?;
        check_am_output(cmd.program(), output)?;
        info!(instance = %instance, "App force-stopped");
        Ok(())
    }

    async fn launch(&self, instance: &InstanceId, uri: &LaunchUri) -> HostResult<()> {
        let cmd = self.launch_command(instance, uri);
        let output = cmd.run().await?;
        if let Err(e) = check_am_output(cmd.program(), output) {
            warn!(instance = %instance, uri = %uri, error = %e, "Launch rejected by activity manager");
            return Err(e);
        }
        info!(instance = %instance, uri = %uri, "Launch intent sent");
        Ok(())
    }
}
