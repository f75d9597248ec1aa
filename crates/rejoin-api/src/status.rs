//! Published per-instance status and aggregate snapshots

use chrono::{DateTime, Local};
use rejoin_util::{InstanceId, RunId};
use serde::{Deserialize, Serialize};

use crate::{SNAPSHOT_VERSION, StatusClass};

/// What an instance worker is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePhase {
    Idle,
    Checking,
}

/// Immutable view of one instance, published after every tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub instance_id: InstanceId,
    pub label: String,
    /// Account name or id, masked for display
    pub masked_account: String,
    pub phase: InstancePhase,
    pub status: StatusClass,
    pub detail: String,
    pub relaunch_count: u64,
    /// Raw presence code from the last successful query
    pub last_presence: Option<i64>,
    pub seconds_until_check: u64,
    pub last_checked_at: Option<DateTime<Local>>,
}

/// Snapshot of every instance at one point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub version: u32,
    pub run_id: RunId,
    pub taken_at: DateTime<Local>,
    pub instances: Vec<InstanceStatus>,
}

impl StatusSnapshot {
    pub fn new(run_id: RunId, taken_at: DateTime<Local>, mut instances: Vec<InstanceStatus>) -> Self {
        instances.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        Self {
            version: SNAPSHOT_VERSION,
            run_id,
            taken_at,
            instances,
        }
    }

    /// Number of instances currently at their target
    pub fn healthy_count(&self) -> usize {
        self.instances.iter().filter(|s| s.status.is_healthy()).count()
    }

    pub fn all_healthy(&self) -> bool {
        !self.instances.is_empty() && self.healthy_count() == self.instances.len()
    }

    pub fn total_relaunches(&self) -> u64 {
        self.instances.iter().map(|s| s.relaunch_count).sum()
    }
}
