//! Host metrics for status reports

use rejoin_util::format_uptime;
use std::time::Duration;
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, System};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Point-in-time host resource usage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostMetrics {
    pub cpu_percent: f32,
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub uptime: Duration,
}

impl HostMetrics {
    /// Sample the host. Takes at least `MINIMUM_CPU_UPDATE_INTERVAL`.
    pub async fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == std::path::Path::new("/"))
            .or_else(|| disks.list().iter().max_by_key(|d| d.total_space()));
        let (disk_used, disk_total) = root
            .map(|d| (d.total_space().saturating_sub(d.available_space()), d.total_space()))
            .unwrap_or((0, 0));

        Self {
            cpu_percent: sys.global_cpu_usage(),
            memory_used: sys.used_memory(),
            memory_total: sys.total_memory(),
            disk_used,
            disk_total,
            uptime: Duration::from_secs(System::uptime()),
        }
    }

    pub fn cpu_line(&self) -> String {
        format!("{:.1}%", self.cpu_percent)
    }

    pub fn memory_line(&self) -> String {
        usage_line(self.memory_used, self.memory_total)
    }

    pub fn disk_line(&self) -> String {
        usage_line(self.disk_used, self.disk_total)
    }

    pub fn uptime_line(&self) -> String {
        format_uptime(self.uptime)
    }
}

/// `used / total (percent)` in GiB
fn usage_line(used: u64, total: u64) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    };
    format!(
        "{:.2}GB / {:.2}GB ({:.1}%)",
        used as f64 / GIB,
        total as f64 / GIB,
        percent
    )
}
