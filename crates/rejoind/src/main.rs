//! rejoind - The rejoin background service
//!
//! This is the main entry point for the rejoind service.
//! It wires together all the components:
//! - Configuration loading
//! - Session loading and account resolution
//! - Host adapters (Android)
//! - Scheduler
//! - Webhook reporting

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use rejoin_config::{RunConfig, SessionSource, load_config};
use rejoin_core::{ActionDispatcher, Instance, ReportingTask, Scheduler, SchedulerConfig, SchedulerHandle};
use rejoin_host_android::{
    AmController, HttpPresenceClient, WebhookReporter, acquire_wake_lock, is_root, release_wake_lock,
};
use rejoin_util::{InstanceId, config_path_without_env};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// rejoind - Keeps app instances in their target location
#[derive(Parser, Debug)]
#[command(name = "rejoind")]
#[command(about = "Keeps app instances in their target location", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/rejoind/config.toml)
    #[arg(short, long, env = "REJOIND_CONFIG", default_value_os_t = config_path_without_env())]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Main service state
struct Service {
    scheduler: Scheduler,
    /// Session sources of admitted instances, re-read on SIGHUP
    sessions: Vec<(InstanceId, SessionSource)>,
    wake_lock: bool,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            instances = config.instances.len(),
            rejected = config.rejected.len(),
            disabled = config.disabled.len(),
            "Configuration loaded"
        );

        for rejected in &config.rejected {
            for error in &rejected.errors {
                warn!(instance = %rejected.id, error = %error, "Instance excluded");
            }
        }
        for id in &config.disabled {
            info!(instance = %id, "Instance disabled");
        }

        if !config.service.use_su && !is_root() {
            warn!("Not running as root and use_su is off; force-stop may fail");
        }

        let mut wake_lock = false;
        if config.service.wake_lock {
            match acquire_wake_lock().await {
                Ok(()) => wake_lock = true,
                Err(e) => warn!(error = %e, "Failed to acquire wake lock"),
            }
        }

        let presence = Arc::new(
            HttpPresenceClient::new(
                config.presence.presence_url.clone(),
                config.presence.account_url.clone(),
                config.presence.user_agent.clone(),
                config.presence.timeout,
            )
            .context("Failed to create presence client")?,
        );

        let controller = Arc::new(AmController::new(
            config.launch.activity.clone(),
            config.service.use_su,
        ));
        let dispatcher = ActionDispatcher::new(
            controller,
            config.launch.scheme.clone(),
            config.launch.settle_delay,
        );

        let mut scheduler = Scheduler::new(
            SchedulerConfig::from_run_config(&config),
            presence.clone(),
            dispatcher,
        );

        if let Some(reporting) = build_reporting(&config)? {
            scheduler = scheduler.with_reporting(reporting);
        }

        let mut sessions = Vec::new();
        for instance_config in &config.instances {
            let id = &instance_config.id;

            let session = match instance_config.session.load(id) {
                Ok(session) => session,
                Err(e) => {
                    warn!(instance = %id, error = %e, "Instance excluded");
                    continue;
                }
            };

            let mut instance_config = instance_config.clone();
            let account = match instance_config.account_id {
                Some(account) => account,
                None => match presence.resolve_account(&session).await {
                    Ok((account, name)) => {
                        info!(instance = %id, account = %account, "Resolved account from session");
                        if instance_config.username.is_none() && !name.is_empty() {
                            instance_config.username = Some(name);
                        }
                        account
                    }
                    Err(e) => {
                        warn!(instance = %id, error = %e, "Instance excluded: account resolution failed");
                        continue;
                    }
                },
            };

            let instance = Instance::from_config(&instance_config, account);
            info!(
                instance = %instance.id,
                label = %instance.label,
                account = %instance.masked_account(),
                target = %instance.target,
                poll_interval_secs = instance.poll_interval.as_secs(),
                session = %instance_config.session.describe(),
                "Instance admitted"
            );

            if scheduler.add_instance(instance, session) {
                sessions.push((instance_config.id.clone(), instance_config.session.clone()));
            }
        }

        if scheduler.instance_count() == 0 {
            if wake_lock && let Err(e) = release_wake_lock().await {
                warn!(error = %e, "Failed to release wake lock");
            }
            bail!("No instances admitted, nothing to do");
        }

        Ok(Self {
            scheduler,
            sessions,
            wake_lock,
        })
    }

    async fn run(self) -> Result<()> {
        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let handle = self.scheduler.start();
        info!(run_id = %handle.run_id(), "Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // SIGHUP - re-read session credentials
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading sessions");
                    reload_sessions(&handle, &self.sessions);
                }
            }
        }

        let snapshot = handle.snapshot();
        info!(
            healthy = snapshot.healthy_count(),
            instances = snapshot.instances.len(),
            relaunches = snapshot.total_relaunches(),
            "Shutting down rejoind"
        );
        handle.shutdown().await;

        if self.wake_lock && let Err(e) = release_wake_lock().await {
            warn!(error = %e, "Failed to release wake lock");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

fn build_reporting(config: &RunConfig) -> Result<Option<ReportingTask>> {
    let Some(reporter_config) = &config.reporter else {
        info!("Reporting disabled");
        return Ok(None);
    };

    let screenshot_path = reporter_config
        .screenshot
        .then(|| reporter_config.screenshot_path.clone());
    let reporter = WebhookReporter::new(
        reporter_config.webhook_url.clone(),
        reporter_config.device_name.clone(),
        screenshot_path,
    )
    .context("Failed to create webhook reporter")?;

    info!(
        device = %reporter_config.device_name,
        interval_secs = reporter_config.interval.as_secs(),
        screenshot = reporter_config.screenshot,
        "Reporting enabled"
    );
    Ok(Some(ReportingTask::new(Arc::new(reporter), reporter_config.interval)))
}

/// Re-read each session source; a failed read keeps the current session.
fn reload_sessions(handle: &SchedulerHandle, sessions: &[(InstanceId, SessionSource)]) {
    for (id, source) in sessions {
        match source.load(id) {
            Ok(session) => {
                handle.refresh_session(id, session);
            }
            Err(e) => warn!(instance = %id, error = %e, "Session reload failed, keeping current session"),
        }
    }
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "rejoind starting"
    );

    let service = Service::new(&args).await?;
    service.run().await
}
