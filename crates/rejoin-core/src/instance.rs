//! Per-instance definition and state

use chrono::{DateTime, Local};
use rejoin_api::{Decision, InstancePhase, InstanceStatus, StatusClass};
use rejoin_config::InstanceConfig;
use rejoin_util::{AccountId, InstanceId, LocationId, MonotonicInstant, ceil_secs, mask_identifier};
use std::time::Duration;

/// An admitted instance. Immutable for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    pub label: String,
    pub account: AccountId,
    /// Display only
    pub username: Option<String>,
    pub target: LocationId,
    pub sub_token: Option<String>,
    pub poll_interval: Duration,
}

impl Instance {
    /// Build from validated config once the account id is known
    pub fn from_config(config: &InstanceConfig, account: AccountId) -> Self {
        Self {
            id: config.id.clone(),
            label: config.label.clone(),
            account,
            username: config.username.clone(),
            target: config.target.clone(),
            sub_token: config.sub_token.clone(),
            poll_interval: config.poll_interval,
        }
    }

    /// Username (or account id) masked for display
    pub fn masked_account(&self) -> String {
        match &self.username {
            Some(name) => mask_identifier(name),
            None => mask_identifier(&self.account.to_string()),
        }
    }
}

/// Mutable state of one instance, owned by its worker task
#[derive(Debug, Clone)]
pub struct InstanceState {
    last_check: Option<MonotonicInstant>,
    last_checked_at: Option<DateTime<Local>>,
    phase: InstancePhase,
    status: StatusClass,
    detail: String,
    relaunch_count: u64,
    last_presence: Option<i64>,
}

impl InstanceState {
    pub fn new() -> Self {
        Self {
            last_check: None,
            last_checked_at: None,
            phase: InstancePhase::Idle,
            status: StatusClass::Initializing,
            detail: "waiting for first check".into(),
            relaunch_count: 0,
            last_presence: None,
        }
    }

    /// True if never checked or at least `interval` has elapsed since the last check
    pub fn is_due(&self, now: MonotonicInstant, interval: Duration) -> bool {
        match self.last_check {
            None => true,
            Some(last) => now.duration_since(last) >= interval,
        }
    }

    /// Whole seconds until the next check, rounded up. Zero if never checked.
    pub fn time_remaining(&self, now: MonotonicInstant, interval: Duration) -> u64 {
        match self.last_check {
            None => 0,
            Some(last) => ceil_secs(interval.saturating_sub(now.duration_since(last))),
        }
    }

    pub fn begin_check(&mut self) {
        self.phase = InstancePhase::Checking;
    }

    /// Record a finished check started at `at`.
    ///
    /// `presence_code` is only updated when the query returned one.
    /// Returns true if the status class changed.
    pub fn record(
        &mut self,
        decision: &Decision,
        presence_code: Option<i64>,
        at: MonotonicInstant,
        wall: DateTime<Local>,
    ) -> bool {
        let changed = self.status != decision.class;
        self.last_check = Some(at);
        self.last_checked_at = Some(wall);
        self.phase = InstancePhase::Idle;
        self.status = decision.class;
        self.detail = decision.detail.clone();
        if presence_code.is_some() {
            self.last_presence = presence_code;
        }
        changed
    }

    pub fn record_relaunch(&mut self) {
        self.relaunch_count += 1;
    }

    /// Immutable view for publishing
    pub fn to_status(&self, instance: &Instance, now: MonotonicInstant) -> InstanceStatus {
        InstanceStatus {
            instance_id: instance.id.clone(),
            label: instance.label.clone(),
            masked_account: instance.masked_account(),
            phase: self.phase,
            status: self.status,
            detail: self.detail.clone(),
            relaunch_count: self.relaunch_count,
            last_presence: self.last_presence,
            seconds_until_check: self.time_remaining(now, instance.poll_interval),
            last_checked_at: self.last_checked_at,
        }
    }
}

impl Default for InstanceState {
    fn default() -> Self {
        Self::new()
    }
}
