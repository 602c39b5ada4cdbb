//! Host system probing for UI layers.

use serde::Serialize;
use sysinfo::{Disks, Pid, ProcessStatus, System};

/// Point-in-time host resource usage.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    /// Global CPU usage in percent.
    pub cpu_usage_percent: f32,
    /// Total physical memory in bytes.
    pub memory_total: u64,
    /// Currently available memory in bytes.
    pub memory_available: u64,
    /// Summed capacity of all disks in bytes.
    pub disk_total: u64,
    /// Summed free space of all disks in bytes.
    pub disk_free: u64,
}

/// Probe the host for CPU, memory, and disk usage.
pub fn snapshot() -> SystemSnapshot {
    let mut sys = System::new_all();
    sys.refresh_all();

    let disks = Disks::new_with_refreshed_list();
    let (disk_total, disk_free) = disks
        .iter()
        .fold((0u64, 0u64), |(total, free), disk| {
            (total + disk.total_space(), free + disk.available_space())
        });

    SystemSnapshot {
        cpu_usage_percent: sys.global_cpu_usage(),
        memory_total: sys.total_memory(),
        memory_available: sys.available_memory(),
        disk_total,
        disk_free,
    }
}

/// Check if a process is alive using sysinfo.
pub fn process_alive(pid: u32) -> bool {
    let mut system = System::new_all();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, false);

    system.process(Pid::from_u32(pid)).is_some_and(|process| {
        matches!(
            process.status(),
            ProcessStatus::Run | ProcessStatus::Sleep | ProcessStatus::Idle
        )
    })
}
