//! Mock host adapters for testing

use async_trait::async_trait;
use rejoin_api::{LaunchUri, Observation, StatusSnapshot};
use rejoin_util::{AccountId, InstanceId, MonotonicInstant, SessionHandle};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::{
    AppController, HostError, HostResult, PresenceError, PresenceProvider, PresenceResult,
    ReportError, ReportResult, Reporter,
};

/// One scripted presence reply
#[derive(Debug, Clone)]
pub enum MockReply {
    Observation(Observation),
    /// Fail with a transport error
    Fail(String),
    /// Never complete; the caller's timeout decides
    Hang,
}

/// Scripted presence provider.
///
/// Each account has a queue of replies; when it runs dry the default reply
/// is used.
pub struct MockPresence {
    scripts: Mutex<HashMap<AccountId, VecDeque<MockReply>>>,
    default_reply: Mutex<MockReply>,
    latency: Mutex<HashMap<AccountId, Duration>>,
    calls: Mutex<Vec<(AccountId, MonotonicInstant)>>,
    sessions: Mutex<Vec<(AccountId, SessionHandle)>>,
}

impl MockPresence {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_reply: Mutex::new(MockReply::Observation(Observation::offline())),
            latency: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Reply used once an account's script is exhausted
    pub fn with_default(self, reply: MockReply) -> Self {
        *self.default_reply.lock().unwrap() = reply;
        self
    }

    /// Append replies to an account's script
    pub fn script(&self, account: AccountId, replies: impl IntoIterator<Item = MockReply>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(account)
            .or_default()
            .extend(replies);
    }

    /// Delay every reply for this account
    pub fn set_latency(&self, account: AccountId, latency: Duration) {
        self.latency.lock().unwrap().insert(account, latency);
    }

    /// Instants at which this account was queried
    pub fn calls_for(&self, account: AccountId) -> Vec<MonotonicInstant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == account)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Session used by the most recent query for this account
    pub fn last_session(&self, account: AccountId) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(a, _)| *a == account)
            .map(|(_, s)| s.clone())
    }
}

impl Default for MockPresence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceProvider for MockPresence {
    async fn fetch(
        &self,
        session: &SessionHandle,
        account: AccountId,
    ) -> PresenceResult<Observation> {
        self.calls
            .lock()
            .unwrap()
            .push((account, MonotonicInstant::now()));
        self.sessions
            .lock()
            .unwrap()
            .push((account, session.clone()));

        let latency = self.latency.lock().unwrap().get(&account).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&account)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| self.default_reply.lock().unwrap().clone());

        match reply {
            MockReply::Observation(obs) => Ok(obs),
            MockReply::Fail(message) => Err(PresenceError::Transport(message)),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

/// A call recorded by [`MockController`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCall {
    Stop {
        instance: InstanceId,
        at: MonotonicInstant,
    },
    Launch {
        instance: InstanceId,
        uri: LaunchUri,
        at: MonotonicInstant,
    },
}

/// Recording app controller
pub struct MockController {
    calls: Mutex<Vec<ControllerCall>>,
    launch_delay: Mutex<Duration>,

    /// Configure stop to fail
    pub fail_stop: AtomicBool,

    /// Configure launch to fail
    pub fail_launch: AtomicBool,
}

impl MockController {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            launch_delay: Mutex::new(Duration::ZERO),
            fail_stop: AtomicBool::new(false),
            fail_launch: AtomicBool::new(false),
        }
    }

    /// Make every launch take this long before it is recorded
    pub fn set_launch_delay(&self, delay: Duration) {
        *self.launch_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<ControllerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, instance: &InstanceId) -> Vec<ControllerCall> {
        self.calls()
            .into_iter()
            .filter(|call| match call {
                ControllerCall::Stop { instance: i, .. } => i == instance,
                ControllerCall::Launch { instance: i, .. } => i == instance,
            })
            .collect()
    }

    pub fn launch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ControllerCall::Launch { .. }))
            .count()
    }

    pub fn stop_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ControllerCall::Stop { .. }))
            .count()
    }
}

impl Default for MockController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppController for MockController {
    async fn stop(&self, instance: &InstanceId) -> HostResult<()> {
        self.calls.lock().unwrap().push(ControllerCall::Stop {
            instance: instance.clone(),
            at: MonotonicInstant::now(),
        });

        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(HostError::Internal("Mock stop failure".into()));
        }
        Ok(())
    }

    async fn launch(&self, instance: &InstanceId, uri: &LaunchUri) -> HostResult<()> {
        let delay = *self.launch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap().push(ControllerCall::Launch {
            instance: instance.clone(),
            uri: uri.clone(),
            at: MonotonicInstant::now(),
        });

        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(HostError::Internal("Mock launch failure".into()));
        }
        Ok(())
    }
}

/// Recording reporter
pub struct MockReporter {
    sent: Mutex<Vec<(MonotonicInstant, StatusSnapshot)>>,
    attempts: AtomicU64,

    /// Configure report to fail
    pub fail: AtomicBool,
}

impl MockReporter {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicU64::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Snapshots that were delivered successfully
    pub fn sent(&self) -> Vec<StatusSnapshot> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn sent_at(&self) -> Vec<MonotonicInstant> {
        self.sent.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    /// All calls, including failed ones
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Reporter for MockReporter {
    async fn report(&self, snapshot: &StatusSnapshot) -> ReportResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReportError::Server { status: 500 });
        }
        self.sent
            .lock()
            .unwrap()
            .push((MonotonicInstant::now(), snapshot.clone()));
        Ok(())
    }
}
