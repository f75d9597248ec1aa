//! Tick-driven scheduler
//!
//! One driver task ticks at a fixed interval and publishes the tick instant
//! on a `watch` channel. Every instance has its own worker task that owns
//! its [`InstanceState`]; on each tick the worker checks whether its poll
//! interval has elapsed and, if so, runs fetch -> evaluate -> record, then
//! spawns a detached relaunch if one is needed. Ticks coalesce in the watch
//! channel, so a slow fetch only delays its own instance.
//!
//! Workers publish an immutable [`InstanceStatus`] after every tick; the
//! driver and [`SchedulerHandle::snapshot`] only ever read those.

use rejoin_api::{InstanceStatus, StatusSnapshot};
use rejoin_config::RunConfig;
use rejoin_host_api::{PresenceError, PresenceProvider};
use rejoin_util::{InstanceId, MonotonicInstant, RunId, SessionHandle, format_countdown};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::{ActionDispatcher, Instance, InstanceState, ReportingTask, evaluate};

/// Scheduler timing
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Driver tick
    pub tick: Duration,
    /// Outer bound on every presence fetch
    pub presence_timeout: Duration,
    /// Ticks between report triggers
    pub report_every_ticks: u32,
}

impl SchedulerConfig {
    pub fn from_run_config(config: &RunConfig) -> Self {
        Self {
            tick: config.service.tick,
            presence_timeout: config.presence.timeout,
            report_every_ticks: config.service.report_every_ticks,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            presence_timeout: Duration::from_secs(10),
            report_every_ticks: 30,
        }
    }
}

/// Scheduler under construction. Instances can only be added before
/// [`Scheduler::start`]; the set is fixed for the run.
pub struct Scheduler {
    config: SchedulerConfig,
    presence: Arc<dyn PresenceProvider>,
    dispatcher: ActionDispatcher,
    reporting: Option<ReportingTask>,
    instances: Vec<(Instance, SessionHandle)>,
    run_id: RunId,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        presence: Arc<dyn PresenceProvider>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            config,
            presence,
            dispatcher,
            reporting: None,
            instances: Vec::new(),
            run_id: RunId::new(),
        }
    }

    pub fn with_reporting(mut self, reporting: ReportingTask) -> Self {
        self.reporting = Some(reporting);
        self
    }

    /// Admit an instance. Returns false if the id is already admitted.
    pub fn add_instance(&mut self, instance: Instance, session: SessionHandle) -> bool {
        if self.instances.iter().any(|(i, _)| i.id == instance.id) {
            warn!(instance = %instance.id, "Duplicate instance ignored");
            return false;
        }
        self.instances.push((instance, session));
        true
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Spawn the driver and one worker per instance
    pub fn start(self) -> SchedulerHandle {
        let now = MonotonicInstant::now();
        let (tick_tx, _) = watch::channel(now);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut workers = Vec::with_capacity(self.instances.len());
        let mut statuses = Vec::with_capacity(self.instances.len());
        let mut sessions = HashMap::with_capacity(self.instances.len());

        for (instance, session) in self.instances {
            let state = InstanceState::new();
            let (status_tx, status_rx) = watch::channel(state.to_status(&instance, now));
            let (session_tx, session_rx) = watch::channel(session);

            sessions.insert(instance.id.clone(), session_tx);
            statuses.push(status_rx);

            let worker = Worker {
                instance,
                state,
                ticks: tick_tx.subscribe(),
                session: session_rx,
                status: status_tx,
                presence: self.presence.clone(),
                dispatcher: self.dispatcher.clone(),
                presence_timeout: self.config.presence_timeout,
                acting: None,
            };
            workers.push(tokio::spawn(worker.run()));
        }

        info!(
            run_id = %self.run_id,
            instances = workers.len(),
            tick_ms = self.config.tick.as_millis() as u64,
            "Scheduler started"
        );

        let driver = Driver {
            tick: self.config.tick,
            report_every_ticks: self.config.report_every_ticks.max(1),
            ticks: tick_tx,
            statuses: statuses.clone(),
            reporting: self.reporting.clone(),
            run_id: self.run_id,
            shutdown: shutdown_rx,
        };

        SchedulerHandle {
            run_id: self.run_id,
            driver: tokio::spawn(driver.run()),
            workers,
            statuses,
            sessions,
            reporting: self.reporting,
            shutdown: shutdown_tx,
        }
    }
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    run_id: RunId,
    driver: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    statuses: Vec<watch::Receiver<InstanceStatus>>,
    sessions: HashMap<InstanceId, watch::Sender<SessionHandle>>,
    reporting: Option<ReportingTask>,
    shutdown: watch::Sender<bool>,
}

impl SchedulerHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Copy of every instance's latest published status
    pub fn snapshot(&self) -> StatusSnapshot {
        take_snapshot(self.run_id, &self.statuses)
    }

    /// Replace an instance's session credential; used from the next fetch on.
    ///
    /// Returns false for an unknown instance.
    pub fn refresh_session(&self, instance: &InstanceId, session: SessionHandle) -> bool {
        match self.sessions.get(instance) {
            Some(tx) => {
                tx.send_replace(session);
                info!(instance = %instance, "Session refreshed");
                true
            }
            None => false,
        }
    }

    /// Trigger a report outside the regular cadence, subject to the throttle.
    ///
    /// Returns true if a send was started.
    pub fn report_now(&self) -> bool {
        match &self.reporting {
            Some(reporting) => reporting.trigger(self.snapshot()).is_some(),
            None => false,
        }
    }

    /// Stop the driver, wait for it, then abort every worker.
    ///
    /// In-flight relaunch and report tasks are abandoned.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.driver.await {
            warn!(error = %e, "Scheduler driver ended abnormally");
        }
        for worker in &self.workers {
            worker.abort();
        }
        for worker in self.workers {
            let _ = worker.await;
        }
        info!(run_id = %self.run_id, "Scheduler stopped");
    }
}

fn take_snapshot(run_id: RunId, statuses: &[watch::Receiver<InstanceStatus>]) -> StatusSnapshot {
    let instances = statuses.iter().map(|rx| rx.borrow().clone()).collect();
    StatusSnapshot::new(run_id, rejoin_util::now(), instances)
}

struct Driver {
    tick: Duration,
    report_every_ticks: u32,
    ticks: watch::Sender<MonotonicInstant>,
    statuses: Vec<watch::Receiver<InstanceStatus>>,
    reporting: Option<ReportingTask>,
    run_id: RunId,
    shutdown: watch::Receiver<bool>,
}

impl Driver {
    async fn run(mut self) {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut report_counter: u32 = 0;

        loop {
            tokio::select! {
                instant = interval.tick() => {
                    self.ticks.send_replace(MonotonicInstant::from(instant));

                    report_counter += 1;
                    if report_counter >= self.report_every_ticks {
                        report_counter = 0;
                        if let Some(reporting) = &self.reporting {
                            reporting.trigger(take_snapshot(self.run_id, &self.statuses));
                        }
                    }
                }
                changed = self.shutdown.changed() => {
                    // A dropped handle also stops the driver
                    if changed.is_err() || *self.shutdown.borrow() {
                        debug!("Scheduler driver shutting down");
                        break;
                    }
                }
            }
        }
    }
}

struct Worker {
    instance: Instance,
    state: InstanceState,
    ticks: watch::Receiver<MonotonicInstant>,
    session: watch::Receiver<SessionHandle>,
    status: watch::Sender<InstanceStatus>,
    presence: Arc<dyn PresenceProvider>,
    dispatcher: ActionDispatcher,
    presence_timeout: Duration,
    /// Most recent relaunch task
    acting: Option<JoinHandle<()>>,
}

impl Worker {
    async fn run(mut self) {
        // Exits when the driver drops the tick sender
        while self.ticks.changed().await.is_ok() {
            let now = *self.ticks.borrow_and_update();

            if self.state.is_due(now, self.instance.poll_interval) {
                self.check(now).await;
            } else {
                trace!(
                    instance = %self.instance.id,
                    next_check = %format_countdown(self.state.time_remaining(now, self.instance.poll_interval)),
                    "Waiting"
                );
            }

            self.status
                .send_replace(self.state.to_status(&self.instance, now));
        }
        debug!(instance = %self.instance.id, "Worker stopped");
    }

    async fn check(&mut self, now: MonotonicInstant) {
        self.state.begin_check();
        self.status
            .send_replace(self.state.to_status(&self.instance, now));

        let session = self.session.borrow().clone();
        let outcome = match tokio::time::timeout(
            self.presence_timeout,
            self.presence.fetch(&session, self.instance.account),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(PresenceError::Timeout),
        };

        let decision = evaluate(&outcome, &self.instance.target);
        let presence_code = outcome.as_ref().ok().and_then(|obs| obs.raw_code);
        let changed = self.state.record(&decision, presence_code, now, rejoin_util::now());

        if changed {
            info!(
                instance = %self.instance.id,
                status = %decision.class,
                detail = %decision.detail,
                "Status changed"
            );
        } else {
            debug!(
                instance = %self.instance.id,
                status = %decision.class,
                detail = %decision.detail,
                "Checked"
            );
        }

        let Some(action) = decision.to_action(&self.instance.target, self.instance.sub_token.as_deref())
        else {
            return;
        };

        if self.acting.as_ref().is_some_and(|task| !task.is_finished()) {
            warn!(
                instance = %self.instance.id,
                "Previous relaunch still in progress, skipping"
            );
            return;
        }

        self.state.record_relaunch();
        let dispatcher = self.dispatcher.clone();
        let id = self.instance.id.clone();
        self.acting = Some(tokio::spawn(async move {
            if let Err(e) = dispatcher.execute(&id, &action).await {
                warn!(instance = %id, error = %e, "Relaunch failed");
            }
        }));
    }
}
